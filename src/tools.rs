//! Tool runner: enriches a structured request before compilation
//!
//! Tools are resolved from [`ToolRef`] variants. The only supported tool,
//! inbox summarization, reads recent unseen messages through an
//! [`InboxFetcher`] and stores a numbered digest in
//! `context.inbox_summary`.

use async_trait::async_trait;

use crate::errors::AppResult;
use crate::models::InboxRecord;
use crate::request::{StructuredRequest, ToolRef};
use crate::sanitize::sanitize;

/// Messages folded into an inbox summary
pub const SUMMARY_MESSAGE_LIMIT: usize = 2;

/// Source of recent unseen inbox messages
///
/// Implementations fail with a mail-access class [`crate::errors::AppError`]
/// when the store is unreachable, rejects the login, or returns data that
/// cannot be parsed.
#[async_trait]
pub trait InboxFetcher: Send + Sync {
    async fn fetch_recent(&self, limit: usize) -> AppResult<Vec<InboxRecord>>;
}

/// Run every tool named by `req`, in order
///
/// Repeated `SummarizeInbox` entries each fetch and overwrite the summary
/// (last write wins). Unknown tools are logged and skipped. A fetch failure
/// aborts the run and is returned unchanged; no partial summary is stored.
pub async fn run_tools(
    mut req: StructuredRequest,
    fetcher: &dyn InboxFetcher,
) -> AppResult<StructuredRequest> {
    for tool in &req.tools {
        match tool {
            ToolRef::SummarizeInbox => {
                let emails = fetcher.fetch_recent(SUMMARY_MESSAGE_LIMIT).await?;
                tracing::debug!(count = emails.len(), "summarizing inbox messages");
                req.context.inbox_summary = Some(summarize(&emails));
            }
            ToolRef::Unknown(name) => {
                tracing::warn!(tool = %name, "ignoring unknown tool");
            }
        }
    }
    Ok(req)
}

/// Format records as `(i) Subject: ...` entries separated by a blank line
fn summarize(emails: &[InboxRecord]) -> String {
    emails
        .iter()
        .enumerate()
        .map(|(i, email)| {
            let subject = if email.subject.is_empty() {
                "(no subject)"
            } else {
                email.subject.as_str()
            };
            format!("({}) Subject: {subject}\n{}", i + 1, sanitize(&email.snippet))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::{InboxFetcher, run_tools};
    use crate::errors::{AppError, AppResult};
    use crate::models::InboxRecord;
    use crate::request::{ToolRef, build_inbox_summary_request, build_request};

    /// Fetcher returning a fixed set of records
    pub(crate) struct StubFetcher {
        pub records: Vec<InboxRecord>,
        pub calls: AtomicUsize,
    }

    impl StubFetcher {
        pub(crate) fn new(records: Vec<InboxRecord>) -> Self {
            Self {
                records,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl InboxFetcher for StubFetcher {
        async fn fetch_recent(&self, limit: usize) -> AppResult<Vec<InboxRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.records.iter().take(limit).cloned().collect())
        }
    }

    /// Fetcher whose store is always unreachable
    pub(crate) struct FailingFetcher;

    #[async_trait]
    impl InboxFetcher for FailingFetcher {
        async fn fetch_recent(&self, _limit: usize) -> AppResult<Vec<InboxRecord>> {
            Err(AppError::MailAccess("connection refused".to_owned()))
        }
    }

    pub(crate) fn sample_records() -> Vec<InboxRecord> {
        vec![
            InboxRecord {
                from: "Ana <ana@example.com>".to_owned(),
                subject: "Invoice overdue".to_owned(),
                date: "2025-01-01T09:00:00.000Z".to_owned(),
                snippet: "<p>Please <b>pay</b> invoice</p> https://pay.example.com/x".to_owned(),
            },
            InboxRecord {
                from: "Bo <bo@example.com>".to_owned(),
                subject: String::new(),
                date: "Invalid Date".to_owned(),
                snippet: "<div>Lunch [image] tomorrow?</div>".to_owned(),
            },
            InboxRecord {
                from: "Cy <cy@example.com>".to_owned(),
                subject: "Third".to_owned(),
                date: "2025-01-02T09:00:00.000Z".to_owned(),
                snippet: "never summarized".to_owned(),
            },
        ]
    }

    #[tokio::test]
    async fn summarize_inbox_numbers_and_cleans_entries() {
        let fetcher = StubFetcher::new(sample_records());
        let req = run_tools(build_inbox_summary_request(), &fetcher)
            .await
            .expect("tools must run");

        let summary = req.context.inbox_summary.expect("summary set");
        assert_eq!(
            summary,
            "(1) Subject: Invoice overdue\nPlease pay invoice\n\n(2) Subject: (no subject)\nLunch tomorrow?"
        );
        assert!(!summary.contains('<'));
        assert!(!summary.contains("Third"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_tool_list_leaves_request_unchanged() {
        let fetcher = StubFetcher::new(sample_records());
        let original = build_request("T1", vec!["a".to_owned()]);
        let req = run_tools(original.clone(), &fetcher)
            .await
            .expect("tools must run");
        assert_eq!(req, original);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn repeated_runs_are_idempotent_for_stable_fetcher() {
        let fetcher = StubFetcher::new(sample_records());
        let once = run_tools(build_inbox_summary_request(), &fetcher)
            .await
            .expect("first run");
        let twice = run_tools(once.clone(), &fetcher).await.expect("second run");
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn duplicate_summarize_entries_overwrite_summary() {
        let fetcher = StubFetcher::new(sample_records());
        let mut req = build_inbox_summary_request();
        req.tools.push(ToolRef::SummarizeInbox);
        let out = run_tools(req, &fetcher).await.expect("tools must run");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert!(out.context.inbox_summary.is_some());
    }

    #[tokio::test]
    async fn unknown_tools_are_skipped() {
        let fetcher = StubFetcher::new(sample_records());
        let mut req = build_request("T1", Vec::new());
        req.tools.push(ToolRef::Unknown("translate".to_owned()));
        let out = run_tools(req.clone(), &fetcher)
            .await
            .expect("unknown tool must not fail");
        assert_eq!(out, req);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_failure_propagates_without_summary() {
        let err = run_tools(build_inbox_summary_request(), &FailingFetcher)
            .await
            .expect_err("fetch failure must surface");
        assert!(err.is_mail_access());
    }

    #[tokio::test]
    async fn empty_inbox_yields_empty_summary() {
        let fetcher = StubFetcher::new(Vec::new());
        let out = run_tools(build_inbox_summary_request(), &fetcher)
            .await
            .expect("tools must run");
        assert_eq!(out.context.inbox_summary.as_deref(), Some(""));
    }
}
