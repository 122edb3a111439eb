//! Outbound mail delivery
//!
//! Two backends implement [`MailSender`]: an SMTP relay via `lettre`, and the
//! EmailJS transactional API via `reqwest`. HTML bodies are cleaned with
//! `ammonia` before they leave the process.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::config::{EmailJsConfig, SmtpConfig};
use crate::errors::{AppError, AppResult};

/// Delivers a single HTML email
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> AppResult<()>;
}

/// SMTP relay sender
pub struct SmtpSender {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpSender {
    /// Build the relay transport
    ///
    /// `secure` selects implicit TLS; otherwise the connection is upgraded
    /// with STARTTLS.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the sender address is malformed
    /// - `Delivery` if the relay cannot be configured
    pub fn new(config: &SmtpConfig) -> AppResult<Self> {
        let from = parse_mailbox(&config.from, "from")?;
        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| AppError::Delivery(format!("SMTP relay error: {e}")))?;

        let mut builder = builder.port(config.port);
        if !config.user.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.user.clone(),
                config.pass.expose_secret().to_owned(),
            ));
        }

        Ok(Self {
            from,
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl MailSender for SmtpSender {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> AppResult<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(to, "to")?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(clean_html(html_body))
            .map_err(|e| AppError::Delivery(format!("failed to build email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::Delivery(format!("SMTP send failed: {e}")))?;

        tracing::info!(to = %to, subject = subject, "email sent via SMTP");
        Ok(())
    }
}

/// EmailJS transactional API sender
#[derive(Clone)]
pub struct EmailJsSender {
    client: Client,
    config: EmailJsConfig,
}

#[derive(Serialize)]
struct EmailJsRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: TemplateParams<'a>,
}

#[derive(Serialize)]
struct TemplateParams<'a> {
    to_email: &'a str,
    from_name: &'a str,
    subject: &'a str,
    message: String,
}

impl EmailJsSender {
    pub fn new(config: EmailJsConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn request<'a>(&'a self, to: &'a str, subject: &'a str, body: &str) -> EmailJsRequest<'a> {
        EmailJsRequest {
            service_id: &self.config.service_id,
            template_id: &self.config.template_id,
            user_id: &self.config.user_id,
            template_params: TemplateParams {
                to_email: to,
                from_name: &self.config.from_name,
                subject,
                message: clean_html(body),
            },
        }
    }
}

#[async_trait]
impl MailSender for EmailJsSender {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> AppResult<()> {
        parse_mailbox(to, "to")?;
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&self.request(to, subject, html_body))
            .send()
            .await
            .map_err(|e| AppError::Delivery(format!("EmailJS request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Delivery(format!(
                "EmailJS API error ({status}): {error_text}"
            )));
        }

        tracing::info!(to = %to, subject = subject, "email sent via EmailJS");
        Ok(())
    }
}

fn parse_mailbox(address: &str, field: &str) -> AppResult<Mailbox> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| AppError::InvalidInput(format!("invalid {field} address: {e}")))
}

/// Strip scripts and unsafe attributes from an HTML body
fn clean_html(body: &str) -> String {
    ammonia::clean(body)
}
