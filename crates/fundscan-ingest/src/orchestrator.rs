//! Source orchestration
//!
//! Drives the selected adapters page by page and gathers their raw records.
//! Failures stay with the source they happened in: a fetch that gives up ends
//! that source's paging, a page that fails to parse is skipped, and neither
//! affects sibling sources.
//!
//! Sources run one after another by default. In concurrent mode every source
//! gets its own logical worker; results are merged at the join in selection
//! order, so the output does not depend on which worker finished first.

use crate::error::{IngestError, SourceError};
use crate::fetch::{FetchContext, HttpFetcher, RateLimiter, RetryPolicy};
use crate::models::{PageDescriptor, RawRecord};
use crate::sources::SourceAdapter;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Per-source counters for the run summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceReport {
    pub source: String,
    pub pages_fetched: usize,
    pub records: usize,
    pub errors: usize,
}

/// Everything the orchestrator gathered
#[derive(Debug, Default)]
pub struct OrchestratorOutput {
    /// Raw records in source, then page, then item order
    pub records: Vec<RawRecord>,
    pub errors: Vec<SourceError>,
    /// One entry per adapter, in selection order
    pub reports: Vec<SourceReport>,
    /// Cancellation stopped at least one source early
    pub interrupted: bool,
}

struct SourceOutcome {
    report: SourceReport,
    records: Vec<RawRecord>,
    errors: Vec<SourceError>,
    interrupted: bool,
}

/// Runs adapters under shared retry policy and per-source rate limiting.
pub struct Orchestrator {
    http: HttpFetcher,
    policy: RetryPolicy,
    delay: Duration,
    concurrent: bool,
    progress: Option<ProgressBar>,
}

impl Orchestrator {
    pub fn new(http: HttpFetcher, policy: RetryPolicy, delay: Duration) -> Self {
        Self {
            http,
            policy,
            delay,
            concurrent: false,
            progress: None,
        }
    }

    /// Run one worker per source instead of one source at a time.
    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Tick `bar` once per finished source.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    /// Fetch and parse up to `max_pages` pages from every adapter.
    ///
    /// Cancelling `cancel` stops further page fetches; whatever was gathered
    /// before that is still returned.
    pub async fn run(
        &self,
        adapters: &[Box<dyn SourceAdapter>],
        max_pages: usize,
        cancel: &CancellationToken,
    ) -> OrchestratorOutput {
        info!(
            phase = "fetch",
            sources = adapters.len(),
            max_pages,
            concurrent = self.concurrent,
            "Starting sources"
        );

        let outcomes = if self.concurrent && adapters.len() > 1 {
            let mut indexed: Vec<(usize, SourceOutcome)> = stream::iter(adapters.iter().enumerate())
                .map(|(index, adapter)| async move {
                    (index, self.run_source(adapter.as_ref(), max_pages, cancel).await)
                })
                .buffer_unordered(adapters.len())
                .collect()
                .await;
            indexed.sort_by_key(|(index, _)| *index);
            indexed.into_iter().map(|(_, outcome)| outcome).collect()
        } else {
            let mut outcomes = Vec::with_capacity(adapters.len());
            for adapter in adapters {
                outcomes.push(self.run_source(adapter.as_ref(), max_pages, cancel).await);
            }
            outcomes
        };

        let mut output = OrchestratorOutput::default();
        for outcome in outcomes {
            output.records.extend(outcome.records);
            output.errors.extend(outcome.errors);
            output.reports.push(outcome.report);
            output.interrupted |= outcome.interrupted;
        }
        output
    }

    async fn run_source(
        &self,
        adapter: &dyn SourceAdapter,
        max_pages: usize,
        cancel: &CancellationToken,
    ) -> SourceOutcome {
        let source = adapter.id().to_string();
        let ctx = FetchContext::new(
            source.clone(),
            RateLimiter::new(self.delay),
            self.policy.clone(),
            self.http.clone(),
        );
        let mut outcome = SourceOutcome {
            report: SourceReport {
                source: source.clone(),
                ..SourceReport::default()
            },
            records: Vec::new(),
            errors: Vec::new(),
            interrupted: false,
        };

        for page in adapter.list_pages(max_pages).take(max_pages) {
            if cancel.is_cancelled() {
                outcome.interrupt(&source, page);
                break;
            }

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = adapter.fetch_page(&page, &ctx) => Some(result),
            };
            let fetched = match fetched {
                Some(result) => result,
                None => {
                    outcome.interrupt(&source, page);
                    break;
                },
            };
            outcome.report.pages_fetched += 1;

            let content = match fetched {
                Ok(content) => content,
                Err(cause) => {
                    warn!(
                        source = %source,
                        phase = "fetch",
                        outcome = "failed",
                        page = %page,
                        detail = %cause,
                        "Giving up on source"
                    );
                    outcome.fail(&source, page, cause);
                    break;
                },
            };

            match adapter.parse_page(&content) {
                Ok(records) => {
                    debug!(
                        source = %source,
                        phase = "parse",
                        outcome = "ok",
                        page = %page,
                        records = records.len(),
                        "Parsed page"
                    );
                    outcome.report.records += records.len();
                    outcome.records.extend(records);
                },
                Err(cause) => {
                    warn!(
                        source = %source,
                        phase = "parse",
                        outcome = "skipped",
                        page = %page,
                        detail = %cause,
                        "Skipping page"
                    );
                    outcome.fail(&source, page, cause);
                },
            }
        }

        info!(
            source = %source,
            phase = "fetch",
            outcome = if outcome.report.errors == 0 { "ok" } else { "failed" },
            pages = outcome.report.pages_fetched,
            records = outcome.report.records,
            errors = outcome.report.errors,
            "Source finished"
        );
        if let Some(bar) = &self.progress {
            bar.set_message(source);
            bar.inc(1);
        }
        outcome
    }
}

impl SourceOutcome {
    fn fail(&mut self, source: &str, page: PageDescriptor, cause: IngestError) {
        self.report.errors += 1;
        self.errors.push(SourceError {
            source: source.to_string(),
            descriptor: Some(page),
            cause,
        });
    }

    fn interrupt(&mut self, source: &str, page: PageDescriptor) {
        info!(
            source = %source,
            phase = "fetch",
            outcome = "skipped",
            page = %page,
            "Cancelled before page"
        );
        self.interrupted = true;
        self.fail(source, page, IngestError::Cancelled);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::{FetchError, Result};
    use crate::models::{PageContent, RecordKind};
    use crate::sources::PageIter;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Endless pages, one record each; counts fetches
    struct Endless {
        id: &'static str,
        fetches: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SourceAdapter for Endless {
        fn id(&self) -> &str {
            self.id
        }

        fn kind(&self) -> RecordKind {
            RecordKind::Startup
        }

        fn list_pages(&self, _max_pages: usize) -> PageIter {
            Box::new((0..).map(|i| PageDescriptor::new(i, format!("gen://{}", i))))
        }

        async fn fetch_page(&self, page: &PageDescriptor, ctx: &FetchContext) -> Result<PageContent> {
            let index = page.index;
            let body = ctx
                .execute(|_| {
                    self.fetches.fetch_add(1, Ordering::SeqCst);
                    async move { Ok::<_, FetchError>(format!("Company {}", index)) }
                })
                .await?;
            Ok(PageContent {
                descriptor: page.clone(),
                body,
            })
        }

        fn parse_page(&self, content: &PageContent) -> Result<Vec<RawRecord>> {
            if content.body.ends_with('1') {
                return Err(IngestError::parse("page one is broken"));
            }
            Ok(vec![RawRecord::new(self.id, RecordKind::Startup, content.descriptor.index)
                .with_field("Company", Some(content.body.clone()))])
        }
    }

    /// Every fetch attempt answers 503
    struct Unavailable {
        attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SourceAdapter for Unavailable {
        fn id(&self) -> &str {
            "down"
        }

        fn kind(&self) -> RecordKind {
            RecordKind::Startup
        }

        fn list_pages(&self, max_pages: usize) -> PageIter {
            Box::new((0..max_pages).map(|i| PageDescriptor::new(i, format!("down://{}", i))))
        }

        async fn fetch_page(&self, _page: &PageDescriptor, ctx: &FetchContext) -> Result<PageContent> {
            ctx.execute(|_| {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<PageContent, _>(FetchError::Status(503)) }
            })
            .await
        }

        fn parse_page(&self, _content: &PageContent) -> Result<Vec<RawRecord>> {
            Ok(Vec::new())
        }
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            HttpFetcher::new(Duration::from_secs(5)).unwrap(),
            RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(100)),
            Duration::ZERO,
        )
    }

    fn endless(id: &'static str) -> (Box<dyn SourceAdapter>, Arc<AtomicUsize>) {
        let fetches = Arc::new(AtomicUsize::new(0));
        let adapter = Endless {
            id,
            fetches: fetches.clone(),
        };
        (Box::new(adapter), fetches)
    }

    #[tokio::test(start_paused = true)]
    async fn test_infinite_source_bounded_by_max_pages() {
        let (adapter, fetches) = endless("gen");
        let out = orchestrator().run(&[adapter], 3, &CancellationToken::new()).await;

        assert_eq!(fetches.load(Ordering::SeqCst), 3);
        assert_eq!(out.reports[0].pages_fetched, 3);
        assert!(!out.interrupted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parse_failure_skips_only_that_page() {
        let (adapter, _) = endless("gen");
        let out = orchestrator().run(&[adapter], 3, &CancellationToken::new()).await;

        let bodies: Vec<_> = out.records.iter().map(|r| r.field("Company").unwrap()).collect();
        assert_eq!(bodies, vec!["Company 0", "Company 2"]);
        assert_eq!(out.errors.len(), 1);
        assert!(matches!(out.errors[0].cause, IngestError::ParseFailed(_)));
        assert_eq!(out.errors[0].descriptor.as_ref().unwrap().index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_source_isolated() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let down: Box<dyn SourceAdapter> = Box::new(Unavailable {
            attempts: attempts.clone(),
        });
        let (healthy, _) = endless("gen");

        let out = orchestrator().run(&[down, healthy], 2, &CancellationToken::new()).await;

        // initial attempt plus three retries, then paging stops
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        let down_errors: Vec<_> = out.errors.iter().filter(|e| e.source == "down").collect();
        assert_eq!(down_errors.len(), 1);
        assert!(matches!(
            down_errors[0].cause,
            IngestError::FetchFailed { attempts: 4, .. }
        ));
        assert_eq!(out.reports[0].records, 0);
        assert_eq!(out.reports[1].records, 1);
        assert!(out.records.iter().all(|r| r.source_id == "gen"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_keeps_selection_order() {
        let (a, _) = endless("first");
        let (b, _) = endless("second");
        let out = orchestrator()
            .concurrent(true)
            .run(&[a, b], 3, &CancellationToken::new())
            .await;

        let sources: Vec<_> = out.records.iter().map(|r| r.source_id.as_str()).collect();
        assert_eq!(sources, vec!["first", "first", "second", "second"]);
        let reports: Vec<_> = out.reports.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(reports, vec!["first", "second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_run_fetches_nothing() {
        let (adapter, fetches) = endless("gen");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let out = orchestrator().run(&[adapter], 3, &cancel).await;

        assert_eq!(fetches.load(Ordering::SeqCst), 0);
        assert!(out.interrupted);
        assert!(out.records.is_empty());
        assert!(matches!(out.errors[0].cause, IngestError::Cancelled));
    }
}
