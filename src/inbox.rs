//! IMAP-backed inbox fetcher

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};

use crate::config::ImapConfig;
use crate::errors::AppResult;
use crate::imap;
use crate::mime;
use crate::models::InboxRecord;
use crate::tools::InboxFetcher;

/// Reads recent unseen messages from the configured mailbox
///
/// Opens a fresh session per call; nothing is cached between requests.
#[derive(Debug, Clone)]
pub struct ImapInboxFetcher {
    config: Arc<ImapConfig>,
}

impl ImapInboxFetcher {
    pub fn new(config: ImapConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

#[async_trait]
impl InboxFetcher for ImapInboxFetcher {
    async fn fetch_recent(&self, limit: usize) -> AppResult<Vec<InboxRecord>> {
        let config = self.config.as_ref();
        let mut session = imap::connect_authenticated(config).await?;

        let records = read_unseen(config, &mut session, limit).await;
        close_after(records, imap::logout(config, &mut session)).await
    }
}

/// Run `logout` whatever `result` is, then return `result`
///
/// Logout failures are logged and never replace the read outcome.
async fn close_after<T>(
    result: AppResult<T>,
    logout: impl Future<Output = AppResult<()>>,
) -> AppResult<T> {
    if let Err(e) = logout.await {
        tracing::warn!(error = %e, "IMAP logout failed");
    }
    result
}

/// Search and fetch on an open session; the caller always logs out
async fn read_unseen(
    config: &ImapConfig,
    session: &mut imap::ImapSession,
    limit: usize,
) -> AppResult<Vec<InboxRecord>> {
    imap::select_mailbox_readonly(config, session, &config.mailbox).await?;

    let since = Utc::now().date_naive() - ChronoDuration::days(i64::from(config.lookback_days));
    let uids = imap::uid_search(config, session, &unseen_since_query(since)).await?;
    tracing::debug!(
        mailbox = %config.mailbox,
        matched = uids.len(),
        "unseen messages found"
    );

    let mut records = Vec::with_capacity(limit.min(uids.len()));
    for uid in uids.into_iter().take(limit) {
        let raw = imap::fetch_message_peek(config, session, uid).await?;
        records.push(mime::parse_inbox_record(&raw)?);
    }
    Ok(records)
}

/// Build the `UID SEARCH` criteria for unseen mail since `since`
fn unseen_since_query(since: NaiveDate) -> String {
    format!("UNSEEN SINCE {}", imap_date(since))
}

/// Format date as IMAP SEARCH date (e.g., "1-Jan-2025")
fn imap_date(date: NaiveDate) -> String {
    date.format("%-d-%b-%Y").to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use chrono::NaiveDate;

    use super::{close_after, unseen_since_query};
    use crate::errors::AppError;

    #[test]
    fn search_query_uses_imap_date_format() {
        let since = NaiveDate::from_ymd_opt(2025, 3, 7).expect("valid date");
        assert_eq!(unseen_since_query(since), "UNSEEN SINCE 7-Mar-2025");
    }

    #[tokio::test]
    async fn logout_runs_when_the_read_failed() {
        let logged_out = AtomicBool::new(false);
        let result: Result<Vec<u32>, _> = close_after(
            Err(AppError::MailAccess("uid fetch failed".to_owned())),
            async {
                logged_out.store(true, Ordering::SeqCst);
                Ok(())
            },
        )
        .await;

        assert!(logged_out.load(Ordering::SeqCst));
        assert_eq!(result.expect_err("read error is kept").code(), "mail_access");
    }

    #[tokio::test]
    async fn logout_failure_does_not_replace_records() {
        let records = close_after(Ok(vec![7_u32]), async {
            Err(AppError::Timeout("LOGOUT timed out".to_owned()))
        })
        .await
        .expect("records survive a failed logout");
        assert_eq!(records, [7]);
    }
}
