//! Structured generation requests
//!
//! A [`StructuredRequest`] is the internal description of what to ask the
//! text generator, before it is flattened into role-tagged messages. One is
//! built per inbound action, optionally enriched by the tool runner, then
//! compiled once and dropped.

use serde::{Deserialize, Serialize};

const TICKET_SYSTEM_INSTRUCTION: &str =
    "You are an AI assistant that writes polite emails for missing ticket info.";
const TICKET_USER_INSTRUCTION: &str =
    "Generate an email asking for the following missing variables:";
const INBOX_SYSTEM_INSTRUCTION: &str =
    "You are an AI assistant that summarizes recent email inbox content.";
const INBOX_USER_INSTRUCTION: &str = "Summarize the following emails:";
const INBOX_SUMMARY_TICKET: &str = "inbox_summary";

/// Wire name of the inbox summarization tool
pub const SUMMARIZE_INBOX: &str = "summarizeInbox";

/// Request to the text generator, prior to compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredRequest {
    pub system_instruction: String,
    pub user_instruction: String,
    pub context: RequestContext,
    #[serde(default)]
    pub tools: Vec<ToolRef>,
}

/// Free-form context folded into the user message
///
/// `missing_fields` is caller-supplied and may be empty or contain
/// duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    #[serde(default)]
    pub ticket_name: String,
    #[serde(default)]
    pub missing_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbox_summary: Option<String>,
}

/// A named enrichment step requested by a [`StructuredRequest`]
///
/// Only inbox summarization is supported; any other name deserializes to
/// `Unknown` and is skipped (with a warning) by the tool runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ToolRefWire", into = "ToolRefWire")]
pub enum ToolRef {
    SummarizeInbox,
    Unknown(String),
}

impl ToolRef {
    /// Resolve a tool by its wire name
    pub fn from_name(name: &str) -> Self {
        if name == SUMMARIZE_INBOX {
            Self::SummarizeInbox
        } else {
            Self::Unknown(name.to_owned())
        }
    }

    /// Wire name of this tool
    pub fn name(&self) -> &str {
        match self {
            Self::SummarizeInbox => SUMMARIZE_INBOX,
            Self::Unknown(name) => name,
        }
    }
}

/// `{ "name": "..." }` shape used on the wire
#[derive(Serialize, Deserialize)]
struct ToolRefWire {
    name: String,
}

impl From<ToolRefWire> for ToolRef {
    fn from(wire: ToolRefWire) -> Self {
        Self::from_name(&wire.name)
    }
}

impl From<ToolRef> for ToolRefWire {
    fn from(tool: ToolRef) -> Self {
        Self {
            name: tool.name().to_owned(),
        }
    }
}

/// Build the request for a missing-information email about a ticket
///
/// No validation is applied: blank ticket names and empty field lists are
/// accepted, and simply drop the matching line at compile time.
pub fn build_request(ticket_name: &str, missing_fields: Vec<String>) -> StructuredRequest {
    StructuredRequest {
        system_instruction: TICKET_SYSTEM_INSTRUCTION.to_owned(),
        user_instruction: TICKET_USER_INSTRUCTION.to_owned(),
        context: RequestContext {
            ticket_name: ticket_name.to_owned(),
            missing_fields,
            tone: Some("polite".to_owned()),
            language: Some("English".to_owned()),
            inbox_summary: None,
        },
        tools: Vec::new(),
    }
}

/// Build the request that summarizes recent inbox content
pub fn build_inbox_summary_request() -> StructuredRequest {
    StructuredRequest {
        system_instruction: INBOX_SYSTEM_INSTRUCTION.to_owned(),
        user_instruction: INBOX_USER_INSTRUCTION.to_owned(),
        context: RequestContext {
            ticket_name: INBOX_SUMMARY_TICKET.to_owned(),
            ..RequestContext::default()
        },
        tools: vec![ToolRef::SummarizeInbox],
    }
}
