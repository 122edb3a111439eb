//! Input/output DTOs and schema-bearing types
//!
//! Shared by the HTTP and MCP surfaces. Field names follow the JSON the
//! browser front end already sends (`ticketName`, `missingVariables`, ...).

use chrono::{SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ticket::ticket_subject;

/// Literal used when a message has no parseable Date header
pub const INVALID_DATE: &str = "Invalid Date";

/// Normalized view of one recent inbox message
///
/// Fetched fresh per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InboxRecord {
    /// From header, or `Unknown`
    pub from: String,
    /// Subject header, or `(no subject)`
    pub subject: String,
    /// ISO-8601 UTC timestamp, or the literal `Invalid Date`
    pub date: String,
    /// Short body preview
    pub snippet: String,
}

/// Metadata included in all MCP tool responses
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Meta {
    /// Current UTC timestamp in RFC 3339 format with milliseconds
    pub now_utc: String,
    /// Tool execution duration in milliseconds
    pub duration_ms: u64,
}

impl Meta {
    /// Create metadata populated with current time and elapsed duration
    pub fn now(duration_ms: u64) -> Self {
        Self {
            now_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            duration_ms,
        }
    }
}

/// Standard response envelope for all MCP tools
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ToolEnvelope<T>
where
    T: JsonSchema,
{
    /// Human-readable summary of the operation outcome
    pub summary: String,
    /// Tool-specific data payload
    pub data: T,
    /// Execution metadata (timestamp, duration)
    pub meta: Meta,
}

/// Input: generate a missing-information email for a ticket
///
/// `missingVariables` wins when present; otherwise missing fields are
/// detected from the `null` entries of `extractedVariables`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateEmailInput {
    /// Ticket display name
    #[serde(default)]
    pub ticket_name: String,
    /// Explicit list of missing field names
    #[serde(default)]
    pub missing_variables: Option<Vec<String>>,
    /// Extracted ticket fields; `null` values count as missing
    #[serde(default)]
    pub extracted_variables: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Input: send an email
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailInput {
    /// Recipient address
    pub to: String,
    /// Subject line; derived from `ticketName` when omitted
    #[serde(default)]
    pub subject: Option<String>,
    /// HTML body
    pub body: String,
    /// Ticket the email is about, used for the default subject
    #[serde(default)]
    pub ticket_name: Option<String>,
}

impl SendEmailInput {
    /// Explicit subject, else the ticket default, else empty
    pub fn resolved_subject(&self) -> String {
        match (&self.subject, &self.ticket_name) {
            (Some(subject), _) => subject.clone(),
            (None, Some(ticket)) => ticket_subject(ticket),
            (None, None) => String::new(),
        }
    }
}

/// Output of generation and summarization actions
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedText {
    pub result: String,
}

/// Output of a successful send
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SendOutcome {
    pub success: bool,
}

/// Output of the inbox listing
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InboxListing {
    pub emails: Vec<InboxRecord>,
}

/// Opaque failure body returned by the HTTP surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
