//! Flattening of structured requests into chat messages

use serde::{Deserialize, Serialize};

use crate::request::StructuredRequest;

/// Chat role of a compiled message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One role-tagged message for the text generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledMessage {
    pub role: Role,
    pub content: String,
}

/// Compile a request into exactly two messages: system, then user
///
/// The user message is the instruction line followed, in this order and only
/// when non-empty, by `Ticket: <name>`, `Missing: <a, b, ...>` and a blank
/// line plus `Emails:` block holding the inbox summary.
pub fn compile(req: &StructuredRequest) -> Vec<CompiledMessage> {
    let ctx = &req.context;
    let mut user = format!("{}\n", req.user_instruction);

    if !ctx.ticket_name.is_empty() {
        user.push_str(&format!("Ticket: {}\n", ctx.ticket_name));
    }
    if !ctx.missing_fields.is_empty() {
        user.push_str(&format!("Missing: {}\n", ctx.missing_fields.join(", ")));
    }
    if let Some(summary) = ctx.inbox_summary.as_deref().filter(|s| !s.is_empty()) {
        user.push_str(&format!("\nEmails:\n{summary}"));
    }

    vec![
        CompiledMessage {
            role: Role::System,
            content: req.system_instruction.clone(),
        },
        CompiledMessage {
            role: Role::User,
            content: user,
        },
    ]
}
