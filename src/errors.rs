//! Application error model with surface mappings
//!
//! Defines a typed error hierarchy using `thiserror` for internal error handling.
//! Surfaces never forward the error text to callers: they log it and reply
//! with an opaque, action-specific message plus the stable [`AppError::code`].

use rmcp::model::ErrorData;
use serde_json::json;
use thiserror::Error;

/// Application error type
///
/// `MailAccess`, `AuthFailed` and `Timeout` are all mail-store failures
/// raised by the Inbox Fetcher. The pure pipeline stages (sanitizer,
/// builder, compiler) never produce an error.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input (malformed configuration, unparseable address)
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Mail store unreachable, protocol or parse failure
    #[error("mail access failed: {0}")]
    MailAccess(String),
    /// Mail store rejected the credentials
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    /// Mail store operation timed out (TCP connect, TLS handshake, IMAP response)
    #[error("operation timed out: {0}")]
    Timeout(String),
    /// Text generation call failed
    #[error("generation failed: {0}")]
    Generation(String),
    /// Outbound mail delivery failed
    #[error("delivery failed: {0}")]
    Delivery(String),
    /// Internal error (unexpected failure, external crate error)
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Convenience constructor for `InvalidInput`
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Stable category string, safe to hand to callers
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::MailAccess(_) => "mail_access",
            Self::AuthFailed(_) => "auth_failed",
            Self::Timeout(_) => "timeout",
            Self::Generation(_) => "generation",
            Self::Delivery(_) => "delivery",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether this error originated in the mail store
    pub fn is_mail_access(&self) -> bool {
        matches!(
            self,
            Self::MailAccess(_) | Self::AuthFailed(_) | Self::Timeout(_)
        )
    }

    /// Convert to MCP `ErrorData`
    ///
    /// The message is the caller-facing `public_message`; the internal error
    /// text is never included. Only the category `code` is attached.
    pub fn to_error_data(&self, public_message: &str) -> ErrorData {
        ErrorData::internal_error(
            public_message.to_owned(),
            Some(json!({ "code": self.code() })),
        )
    }
}

/// Type alias for fallible return values
pub type AppResult<T> = Result<T, AppError>;
