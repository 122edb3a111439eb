//! Message parsing and preview extraction
//!
//! Parses RFC822 messages using `mailparse` into [`InboxRecord`] values.
//! The preview prefers the plain-text body and falls back to the HTML body
//! rendered to text with `html2text`.

use chrono::{DateTime, SecondsFormat, Utc};
use mailparse::{DispositionType, MailHeaderMap, ParsedMail};

use crate::errors::{AppError, AppResult};
use crate::models::{INVALID_DATE, InboxRecord};
use crate::sanitize::SNIPPET_MAX_CHARS;

const UNKNOWN_SENDER: &str = "Unknown";
const NO_SUBJECT: &str = "(no subject)";
const NO_PREVIEW: &str = "No preview available";
/// Render width for HTML fallback; wide enough that lines are not wrapped
const HTML_RENDER_WIDTH: usize = 10_000;

/// Parse RFC822 message bytes into an inbox record
///
/// # Errors
///
/// - `MailAccess` if `mailparse` cannot parse the message
pub fn parse_inbox_record(raw: &[u8]) -> AppResult<InboxRecord> {
    let parsed = mailparse::parse_mail(raw)
        .map_err(|e| AppError::MailAccess(format!("failed to parse RFC822 message: {e}")))?;

    let mut body_text = None;
    let mut body_html = None;
    walk_parts(&parsed, &mut body_text, &mut body_html);

    Ok(InboxRecord {
        from: header_or(&parsed, "From", UNKNOWN_SENDER),
        subject: header_or(&parsed, "Subject", NO_SUBJECT),
        date: parsed
            .get_headers()
            .get_first_value("Date")
            .map_or_else(|| INVALID_DATE.to_owned(), |d| iso_date(&d)),
        snippet: preview(body_text.as_deref(), body_html.as_deref()),
    })
}

/// Walk MIME part tree recursively
///
/// Keeps the first inline text/plain and text/html bodies, skipping
/// attachments.
fn walk_parts(
    part: &ParsedMail<'_>,
    body_text: &mut Option<String>,
    body_html: &mut Option<String>,
) {
    if part.subparts.is_empty() {
        let ctype = part.ctype.mimetype.to_ascii_lowercase();
        if part.get_content_disposition().disposition == DispositionType::Attachment {
            return;
        }

        if ctype == "text/plain"
            && body_text.is_none()
            && let Ok(text) = part.get_body()
        {
            *body_text = Some(text);
        }

        if ctype == "text/html"
            && body_html.is_none()
            && let Ok(html) = part.get_body()
        {
            *body_html = Some(html);
        }
        return;
    }

    for sub in &part.subparts {
        walk_parts(sub, body_text, body_html);
    }
}

/// First non-blank value of a header, or `fallback`
fn header_or(parsed: &ParsedMail<'_>, key: &str, fallback: &str) -> String {
    parsed
        .get_headers()
        .get_first_value(key)
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_owned())
}

/// Format a Date header as ISO-8601 UTC with milliseconds
///
/// RFC 2822 is tried first. `mailparse::dateparse` covers the looser forms
/// seen in the wild, but it yields 0 for text it cannot read, so an epoch
/// result counts as unparseable.
fn iso_date(raw: &str) -> String {
    let parsed = DateTime::parse_from_rfc2822(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            mailparse::dateparse(raw)
                .ok()
                .filter(|secs| *secs != 0)
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        });
    parsed.map_or_else(
        || INVALID_DATE.to_owned(),
        |dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

/// Choose the message preview
///
/// Plain text is trimmed. HTML is rendered to text with whitespace
/// collapsed. Either is cut to the snippet bound.
fn preview(text: Option<&str>, html: Option<&str>) -> String {
    if let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) {
        return truncate_chars(text.to_owned(), SNIPPET_MAX_CHARS);
    }

    let rendered = html
        .and_then(|h| html2text::from_read(h.as_bytes(), HTML_RENDER_WIDTH).ok())
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    if rendered.is_empty() {
        return NO_PREVIEW.to_owned();
    }
    truncate_chars(rendered, SNIPPET_MAX_CHARS)
}

/// Truncate string to maximum characters (Unicode-aware)
///
/// Preserves complete characters, never splitting multi-byte sequences.
fn truncate_chars(input: String, max_chars: usize) -> String {
    input.chars().take(max_chars).collect()
}
