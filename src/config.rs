//! Configuration for the mail store, outbound delivery, and text generation
//!
//! All configuration is loaded once from environment variables at process
//! start (after `.env` is applied) and is immutable afterwards. Each
//! collaborator receives only its own section.

use std::env;
use std::env::VarError;

use secrecy::SecretString;

use crate::errors::{AppError, AppResult};

/// IMAP mail store configuration
#[derive(Debug, Clone)]
pub struct ImapConfig {
    /// IMAP server hostname
    pub host: String,
    /// IMAP server port (typically 993 for TLS)
    pub port: u16,
    /// Username for authentication
    pub user: String,
    /// Password stored in a type that prevents accidental logging
    pub pass: SecretString,
    /// Mailbox examined for recent messages
    pub mailbox: String,
    /// Only unseen messages received within this many days are considered
    pub lookback_days: u16,
    /// TCP connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// IMAP greeting/TLS handshake timeout in milliseconds
    pub greeting_timeout_ms: u64,
    /// Socket I/O timeout in milliseconds
    pub socket_timeout_ms: u64,
}

/// SMTP relay configuration
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// `true` uses implicit TLS, `false` upgrades with STARTTLS
    pub secure: bool,
    pub user: String,
    pub pass: SecretString,
    /// Envelope and header sender address
    pub from: String,
}

/// OpenAI chat-completions configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: SecretString,
    pub model: String,
    /// API root, without the trailing `/chat/completions`
    pub base_url: String,
    pub timeout_ms: u64,
}

/// EmailJS transactional API configuration
#[derive(Debug, Clone)]
pub struct EmailJsConfig {
    pub service_id: String,
    pub template_id: String,
    pub user_id: String,
    pub from_name: String,
    pub endpoint: String,
}

/// Which outbound delivery backend `send-email` uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderBackend {
    Smtp,
    EmailJs,
}

/// HTTP listener settings
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

/// Server-wide configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub imap: ImapConfig,
    pub smtp: SmtpConfig,
    pub openai: OpenAiConfig,
    /// Present only when all `EMAILJS_*` identifiers are set
    pub emailjs: Option<EmailJsConfig>,
    pub sender: SenderBackend,
    pub http: HttpConfig,
}

impl ServerConfig {
    /// Load all configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if required environment variables are missing
    /// or malformed, or if `MAIL_SENDER=emailjs` is requested without the
    /// EmailJS identifiers.
    ///
    /// # Example Environment
    ///
    /// ```text
    /// IMAP_HOST=imap.gmail.com
    /// IMAP_USER=support@example.com
    /// IMAP_PASS=app-password
    /// SMTP_HOST=smtp.gmail.com
    /// SMTP_USER=support@example.com
    /// SMTP_PASS=app-password
    /// OPENAI_API_KEY=sk-...
    /// MAIL_SENDER=smtp
    /// PORT=4000
    /// ```
    pub fn load_from_env() -> AppResult<Self> {
        let emailjs = load_emailjs()?;
        let sender = parse_sender_backend(optional_env("MAIL_SENDER")?.as_deref())?;
        if sender == SenderBackend::EmailJs && emailjs.is_none() {
            return Err(AppError::invalid(
                "MAIL_SENDER=emailjs requires EMAILJS_SERVICE_ID, EMAILJS_TEMPLATE_ID and EMAILJS_USER_ID",
            ));
        }

        Ok(Self {
            imap: load_imap()?,
            smtp: load_smtp()?,
            openai: load_openai()?,
            emailjs,
            sender,
            http: HttpConfig {
                host: optional_env("HOST")?.unwrap_or_else(|| "0.0.0.0".to_owned()),
                port: parse_u16_env("PORT", 4000)?,
            },
        })
    }
}

fn load_imap() -> AppResult<ImapConfig> {
    require_imap_tls(parse_bool_env("IMAP_SECURE", true)?)?;
    Ok(ImapConfig {
        host: required_env("IMAP_HOST")?,
        port: parse_u16_env("IMAP_PORT", 993)?,
        user: required_env("IMAP_USER")?,
        pass: SecretString::new(required_env("IMAP_PASS")?.into()),
        mailbox: optional_env("IMAP_MAILBOX")?.unwrap_or_else(|| "INBOX".to_owned()),
        lookback_days: parse_u16_env("IMAP_LOOKBACK_DAYS", 7)?,
        connect_timeout_ms: parse_u64_env("IMAP_CONNECT_TIMEOUT_MS", 30_000)?,
        greeting_timeout_ms: parse_u64_env("IMAP_GREETING_TIMEOUT_MS", 15_000)?,
        socket_timeout_ms: parse_u64_env("IMAP_SOCKET_TIMEOUT_MS", 300_000)?,
    })
}

/// IMAP is TLS-only; `IMAP_SECURE=false` is a startup error
fn require_imap_tls(secure: bool) -> AppResult<()> {
    if secure {
        Ok(())
    } else {
        Err(AppError::invalid(
            "insecure IMAP is not supported; set IMAP_SECURE=true",
        ))
    }
}

fn load_smtp() -> AppResult<SmtpConfig> {
    let user = optional_env("SMTP_USER")?.unwrap_or_default();
    let from = optional_env("SMTP_FROM")?.unwrap_or_else(|| user.clone());
    if from.trim().is_empty() {
        return Err(AppError::invalid(
            "missing required environment variable SMTP_FROM (or SMTP_USER)",
        ));
    }
    Ok(SmtpConfig {
        host: required_env("SMTP_HOST")?,
        port: parse_u16_env("SMTP_PORT", 587)?,
        secure: parse_bool_env("SMTP_SECURE", false)?,
        user,
        pass: SecretString::new(optional_env("SMTP_PASS")?.unwrap_or_default().into()),
        from,
    })
}

fn load_openai() -> AppResult<OpenAiConfig> {
    let api_key = match optional_env("OPENAI_API_KEY")? {
        Some(key) => key,
        None => required_env("REACT_APP_OPENAI_API_KEY").map_err(|_| {
            AppError::invalid("missing required environment variable OPENAI_API_KEY")
        })?,
    };
    Ok(OpenAiConfig {
        api_key: SecretString::new(api_key.into()),
        model: optional_env("OPENAI_MODEL")?.unwrap_or_else(|| "gpt-3.5-turbo".to_owned()),
        base_url: optional_env("OPENAI_BASE_URL")?
            .unwrap_or_else(|| "https://api.openai.com/v1".to_owned())
            .trim_end_matches('/')
            .to_owned(),
        timeout_ms: parse_u64_env("OPENAI_TIMEOUT_MS", 60_000)?,
    })
}

/// EmailJS is configured only when all three identifiers are present
fn load_emailjs() -> AppResult<Option<EmailJsConfig>> {
    let service_id = optional_env("EMAILJS_SERVICE_ID")?;
    let template_id = optional_env("EMAILJS_TEMPLATE_ID")?;
    let user_id = optional_env("EMAILJS_USER_ID")?;
    let (Some(service_id), Some(template_id), Some(user_id)) = (service_id, template_id, user_id)
    else {
        return Ok(None);
    };
    Ok(Some(EmailJsConfig {
        service_id,
        template_id,
        user_id,
        from_name: optional_env("EMAILJS_FROM_NAME")?.unwrap_or_else(|| "Support Team".to_owned()),
        endpoint: optional_env("EMAILJS_ENDPOINT")?
            .unwrap_or_else(|| "https://api.emailjs.com/api/v1.0/email/send".to_owned()),
    }))
}

fn parse_sender_backend(value: Option<&str>) -> AppResult<SenderBackend> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("smtp") => Ok(SenderBackend::Smtp),
        Some("emailjs") => Ok(SenderBackend::EmailJs),
        Some(other) => Err(AppError::invalid(format!(
            "invalid MAIL_SENDER '{other}', expected smtp or emailjs"
        ))),
    }
}

/// Read a required environment variable, returning error if missing or empty
fn required_env(key: &str) -> AppResult<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::InvalidInput(format!(
            "missing required environment variable {key}"
        ))),
    }
}

/// Read an optional environment variable; blank values count as unset
fn optional_env(key: &str) -> AppResult<Option<String>> {
    match env::var(key) {
        Ok(v) if v.trim().is_empty() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(AppError::InvalidInput(format!(
            "environment variable {key} contains non-unicode data"
        ))),
    }
}

/// Parse a boolean environment variable with flexible values
///
/// Accepts: `1`, `true`, `yes`, `y`, `on` (truthy) or `0`, `false`, `no`,
/// `n`, `off` (falsy). Case-insensitive. Returns `default` if unset.
fn parse_bool_env(key: &str, default: bool) -> AppResult<bool> {
    match optional_env(key)? {
        Some(v) => parse_bool_value(&v).ok_or_else(|| {
            AppError::InvalidInput(format!("invalid boolean environment variable {key}: '{v}'"))
        }),
        None => Ok(default),
    }
}

fn parse_bool_value(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_u16_env(key: &str, default: u16) -> AppResult<u16> {
    match optional_env(key)? {
        Some(v) => v.trim().parse::<u16>().map_err(|_| {
            AppError::InvalidInput(format!("invalid u16 environment variable {key}: '{v}'"))
        }),
        None => Ok(default),
    }
}

fn parse_u64_env(key: &str, default: u64) -> AppResult<u64> {
    match optional_env(key)? {
        Some(v) => v.trim().parse::<u64>().map_err(|_| {
            AppError::InvalidInput(format!("invalid u64 environment variable {key}: '{v}'"))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::{SenderBackend, parse_bool_value, parse_sender_backend, require_imap_tls};

    #[test]
    fn parse_bool_value_accepts_common_truthy_and_falsy_values() {
        for truthy in ["1", "true", "TRUE", " yes ", "Y", "on"] {
            assert_eq!(parse_bool_value(truthy), Some(true));
        }

        for falsy in ["0", "false", "FALSE", " no ", "N", "off"] {
            assert_eq!(parse_bool_value(falsy), Some(false));
        }
    }

    #[test]
    fn parse_bool_value_rejects_unrecognized_values() {
        for invalid in ["", "2", "maybe", "enabled", "disabled"] {
            assert_eq!(parse_bool_value(invalid), None);
        }
    }

    #[test]
    fn sender_backend_defaults_to_smtp() {
        assert_eq!(parse_sender_backend(None).unwrap(), SenderBackend::Smtp);
        assert_eq!(
            parse_sender_backend(Some(" SMTP ")).unwrap(),
            SenderBackend::Smtp
        );
        assert_eq!(
            parse_sender_backend(Some("EmailJS")).unwrap(),
            SenderBackend::EmailJs
        );
    }

    #[test]
    fn sender_backend_rejects_unknown_names() {
        let err = parse_sender_backend(Some("sendgrid")).expect_err("must fail");
        assert!(err.to_string().contains("MAIL_SENDER"));
    }

    #[test]
    fn insecure_imap_is_rejected_at_load() {
        require_imap_tls(true).expect("TLS must be accepted");
        let err = require_imap_tls(false).expect_err("plaintext must fail");
        assert_eq!(err.code(), "invalid_input");
        assert!(err.to_string().contains("IMAP_SECURE=true"));
    }
}
