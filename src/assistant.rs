//! Action orchestration shared by the HTTP and MCP surfaces
//!
//! Each action runs its pipeline to completion on its own request value;
//! collaborators are shared behind `Arc` and hold no per-request state.

use std::sync::Arc;

use crate::compile::compile;
use crate::config::{SenderBackend, ServerConfig};
use crate::errors::{AppError, AppResult};
use crate::generator::{OpenAiGenerator, TextGenerator};
use crate::inbox::ImapInboxFetcher;
use crate::models::InboxRecord;
use crate::request::{build_inbox_summary_request, build_request};
use crate::sender::{EmailJsSender, MailSender, SmtpSender};
use crate::tools::{InboxFetcher, run_tools};

/// Messages returned by the inbox listing
pub const INBOX_LIST_LIMIT: usize = 2;

/// Owns the external collaborators and runs the four actions
#[derive(Clone)]
pub struct MailAssistant {
    fetcher: Arc<dyn InboxFetcher>,
    generator: Arc<dyn TextGenerator>,
    sender: Arc<dyn MailSender>,
}

impl MailAssistant {
    pub fn new(
        fetcher: Arc<dyn InboxFetcher>,
        generator: Arc<dyn TextGenerator>,
        sender: Arc<dyn MailSender>,
    ) -> Self {
        Self {
            fetcher,
            generator,
            sender,
        }
    }

    /// Wire the IMAP, OpenAI and configured delivery adapters
    ///
    /// # Errors
    ///
    /// Returns an error if an adapter rejects its configuration.
    pub fn from_config(config: &ServerConfig) -> AppResult<Self> {
        let sender: Arc<dyn MailSender> = match config.sender {
            SenderBackend::Smtp => Arc::new(SmtpSender::new(&config.smtp)?),
            SenderBackend::EmailJs => {
                let emailjs = config.emailjs.clone().ok_or_else(|| {
                    AppError::invalid("EmailJS sender selected but not configured")
                })?;
                Arc::new(EmailJsSender::new(emailjs))
            }
        };
        Ok(Self::new(
            Arc::new(ImapInboxFetcher::new(config.imap.clone())),
            Arc::new(OpenAiGenerator::new(&config.openai)?),
            sender,
        ))
    }

    /// Write a missing-information email for a ticket
    pub async fn generate_email(
        &self,
        ticket_name: &str,
        missing_fields: Vec<String>,
    ) -> AppResult<String> {
        let req = build_request(ticket_name, missing_fields);
        self.generator.generate(&compile(&req)).await
    }

    /// Summarize the most recent unseen inbox messages
    ///
    /// A fetch failure fails the action; there is no empty-summary fallback.
    pub async fn summarize_inbox(&self) -> AppResult<String> {
        let req = run_tools(build_inbox_summary_request(), self.fetcher.as_ref())
            .await
            .inspect_err(|e| {
                if e.is_mail_access() {
                    tracing::warn!(code = e.code(), "inbox unavailable, summary aborted");
                }
            })?;
        self.generator.generate(&compile(&req)).await
    }

    pub async fn send_email(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        self.sender.send(to, subject, body).await
    }

    pub async fn list_inbox(&self) -> AppResult<Vec<InboxRecord>> {
        self.fetcher.fetch_recent(INBOX_LIST_LIMIT).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::MailAssistant;
    use crate::compile::{CompiledMessage, Role};
    use crate::errors::{AppError, AppResult};
    use crate::generator::TextGenerator;
    use crate::sender::MailSender;
    use crate::tools::InboxFetcher;
    use crate::tools::tests::{FailingFetcher, StubFetcher, sample_records};

    /// Generator that records the prompt and echoes the user message
    #[derive(Default)]
    pub(crate) struct EchoGenerator {
        pub prompts: Mutex<Vec<Vec<CompiledMessage>>>,
    }

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, messages: &[CompiledMessage]) -> AppResult<String> {
            self.prompts
                .lock()
                .expect("prompt log poisoned")
                .push(messages.to_vec());
            Ok(messages
                .iter()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.clone())
                .unwrap_or_default())
        }
    }

    pub(crate) struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _messages: &[CompiledMessage]) -> AppResult<String> {
            Err(AppError::Generation("model overloaded".to_owned()))
        }
    }

    /// Sender that records deliveries, or fails when `fail` is set
    #[derive(Default)]
    pub(crate) struct RecordingSender {
        pub sent: Mutex<Vec<(String, String, String)>>,
        pub fail: bool,
    }

    #[async_trait]
    impl MailSender for RecordingSender {
        async fn send(&self, to: &str, subject: &str, html_body: &str) -> AppResult<()> {
            if self.fail {
                return Err(AppError::Delivery("relay refused".to_owned()));
            }
            self.sent.lock().expect("send log poisoned").push((
                to.to_owned(),
                subject.to_owned(),
                html_body.to_owned(),
            ));
            Ok(())
        }
    }

    pub(crate) fn assistant_with(
        fetcher: Arc<dyn InboxFetcher>,
        generator: Arc<dyn TextGenerator>,
        sender: Arc<dyn MailSender>,
    ) -> MailAssistant {
        MailAssistant::new(fetcher, generator, sender)
    }

    #[tokio::test]
    async fn generate_email_sends_compiled_ticket_prompt() {
        let generator = Arc::new(EchoGenerator::default());
        let assistant = assistant_with(
            Arc::new(StubFetcher::new(sample_records())),
            generator.clone(),
            Arc::new(RecordingSender::default()),
        );

        let text = assistant
            .generate_email("T1", vec!["a".to_owned(), "b".to_owned()])
            .await
            .expect("generation must succeed");
        assert!(text.contains("Ticket: T1\nMissing: a, b"));

        let prompts = generator.prompts.lock().expect("prompt log poisoned");
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0][0].role, Role::System);
    }

    #[tokio::test]
    async fn summarize_inbox_prompt_contains_cleaned_emails() {
        let assistant = assistant_with(
            Arc::new(StubFetcher::new(sample_records())),
            Arc::new(EchoGenerator::default()),
            Arc::new(RecordingSender::default()),
        );

        let text = assistant
            .summarize_inbox()
            .await
            .expect("summary must succeed");
        assert!(text.contains("\nEmails:\n(1) Subject: Invoice overdue"));
        assert!(text.contains("(2) Subject: (no subject)"));
        assert!(!text.contains("<p>"));
    }

    #[tokio::test]
    async fn summarize_inbox_fails_when_fetch_fails() {
        let generator = Arc::new(EchoGenerator::default());
        let assistant = assistant_with(
            Arc::new(FailingFetcher),
            generator.clone(),
            Arc::new(RecordingSender::default()),
        );

        let err = assistant
            .summarize_inbox()
            .await
            .expect_err("fetch failure must surface");
        assert!(err.is_mail_access());
        assert!(generator.prompts.lock().expect("prompt log poisoned").is_empty());
    }

    #[tokio::test]
    async fn list_inbox_returns_two_most_recent() {
        let assistant = assistant_with(
            Arc::new(StubFetcher::new(sample_records())),
            Arc::new(EchoGenerator::default()),
            Arc::new(RecordingSender::default()),
        );

        let emails = assistant.list_inbox().await.expect("listing must succeed");
        assert_eq!(emails.len(), 2);
        assert_eq!(emails[0].subject, "Invoice overdue");
    }

    #[tokio::test]
    async fn send_email_delegates_to_sender() {
        let sender = Arc::new(RecordingSender::default());
        let assistant = assistant_with(
            Arc::new(StubFetcher::new(Vec::new())),
            Arc::new(EchoGenerator::default()),
            sender.clone(),
        );

        assistant
            .send_email("ana@example.com", "Hi", "<p>Body</p>")
            .await
            .expect("send must succeed");
        let sent = sender.sent.lock().expect("send log poisoned");
        assert_eq!(
            sent.as_slice(),
            [(
                "ana@example.com".to_owned(),
                "Hi".to_owned(),
                "<p>Body</p>".to_owned()
            )]
        );
    }
}
