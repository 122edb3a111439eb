//! MCP server exposing the assistant actions as tools
//!
//! Same four actions as the HTTP surface, wrapped in the standard tool
//! envelope. Failures are logged and reported with an opaque message.

use std::time::Instant;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{ErrorData, ServerCapabilities, ServerInfo};
use rmcp::{Json, ServerHandler, tool, tool_handler, tool_router};

use crate::assistant::MailAssistant;
use crate::errors::AppResult;
use crate::models::{
    GenerateEmailInput, GeneratedText, InboxListing, Meta, SendEmailInput, SendOutcome,
    ToolEnvelope,
};
use crate::ticket::resolve_missing_fields;

/// Ticket mail assistant MCP server
#[derive(Clone)]
pub struct MailAssistantServer {
    assistant: MailAssistant,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl MailAssistantServer {
    pub fn new(assistant: MailAssistant) -> Self {
        Self {
            assistant,
            tool_router: Self::tool_router(),
        }
    }

    /// Tool: Write a polite email asking for missing ticket fields
    #[tool(
        name = "generate_email",
        description = "Generate a polite email asking for a ticket's missing fields"
    )]
    async fn generate_email(
        &self,
        Parameters(input): Parameters<GenerateEmailInput>,
    ) -> Result<Json<ToolEnvelope<GeneratedText>>, ErrorData> {
        let started = Instant::now();
        let missing =
            resolve_missing_fields(input.missing_variables, input.extracted_variables.as_ref());
        let count = missing.len();
        finalize_tool(
            started,
            "Failed to generate email",
            self.assistant
                .generate_email(&input.ticket_name, missing)
                .await
                .map(|result| {
                    (
                        format!("Email drafted for {count} missing field(s)"),
                        GeneratedText { result },
                    )
                }),
        )
    }

    /// Tool: Summarize recent unseen inbox messages
    #[tool(
        name = "summarize_inbox",
        description = "Summarize the most recent unseen inbox messages"
    )]
    async fn summarize_inbox(&self) -> Result<Json<ToolEnvelope<GeneratedText>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(
            started,
            "Failed to summarize inbox",
            self.assistant
                .summarize_inbox()
                .await
                .map(|result| ("Inbox summarized".to_owned(), GeneratedText { result })),
        )
    }

    /// Tool: Send an HTML email
    ///
    /// The subject defaults to the ticket's missing-information subject.
    #[tool(name = "send_email", description = "Send an HTML email")]
    async fn send_email(
        &self,
        Parameters(input): Parameters<SendEmailInput>,
    ) -> Result<Json<ToolEnvelope<SendOutcome>>, ErrorData> {
        let started = Instant::now();
        let subject = input.resolved_subject();
        finalize_tool(
            started,
            "Failed to send email",
            self.assistant
                .send_email(&input.to, &subject, &input.body)
                .await
                .map(|()| {
                    (
                        format!("Email sent to {}", input.to),
                        SendOutcome { success: true },
                    )
                }),
        )
    }

    /// Tool: List the most recent unseen inbox messages
    #[tool(
        name = "list_inbox",
        description = "List the most recent unseen inbox messages"
    )]
    async fn list_inbox(&self) -> Result<Json<ToolEnvelope<InboxListing>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(
            started,
            "Failed to fetch inbox",
            self.assistant.list_inbox().await.map(|emails| {
                (
                    format!("{} message(s)", emails.len()),
                    InboxListing { emails },
                )
            }),
        )
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for MailAssistantServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build()).with_instructions(
            "Ticket mail assistant. Drafts missing-information emails, summarizes the inbox, and sends mail.",
        )
    }
}

fn duration_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

/// Build a tool response envelope, hiding failure detail behind `public_message`
fn finalize_tool<T>(
    started: Instant,
    public_message: &str,
    result: AppResult<(String, T)>,
) -> Result<Json<ToolEnvelope<T>>, ErrorData>
where
    T: schemars::JsonSchema,
{
    match result {
        Ok((summary, data)) => Ok(Json(ToolEnvelope {
            summary,
            data,
            meta: Meta::now(duration_ms(started)),
        })),
        Err(e) => {
            tracing::error!(error = %e, code = e.code(), "{public_message}");
            Err(e.to_error_data(public_message))
        }
    }
}
