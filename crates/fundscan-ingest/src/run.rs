//! One end-to-end scrape run
//!
//! A [`ScrapeRun`] owns everything a single invocation needs: the validated
//! configuration, the selected adapters and the HTTP client. Rate limiter
//! state is created inside the run, so nothing leaks between runs.

use crate::config::ScrapeConfig;
use crate::dedup::dedupe;
use crate::error::{IngestError, Result, SourceError};
use crate::export::{export, export_leads, output_path, ExportSchema};
use crate::fetch::HttpFetcher;
use crate::leads::build_leads;
use crate::models::{CanonicalRecord, RecordKind};
use crate::normalize::Normalizer;
use crate::orchestrator::{Orchestrator, SourceReport};
use crate::sources::{build_adapters, SourceAdapter};
use chrono::{NaiveDate, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// What a finished run reports to its caller
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Raw records gathered from all sources
    pub fetched: usize,
    pub normalized: usize,
    /// Records dropped because no company name could be found
    pub missing_name: usize,
    /// Websites that were present but could not be normalized
    pub website_invalid: usize,
    pub kept: usize,
    pub deduped_away: usize,
    pub sources: Vec<SourceReport>,
    pub errors: Vec<SourceError>,
    /// Kept records per round type; records without one count as `Unknown`
    pub by_round: BTreeMap<String, usize>,
    /// Recently funded startups written to the leads export
    pub leads: usize,
    pub written: Vec<PathBuf>,
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Emit the final counts as structured events.
    pub fn log(&self) {
        info!(
            run_id = %self.run_id,
            phase = "run",
            outcome = if self.interrupted { "interrupted" } else { "ok" },
            fetched = self.fetched,
            normalized = self.normalized,
            missing_name = self.missing_name,
            website_invalid = self.website_invalid,
            kept = self.kept,
            deduped_away = self.deduped_away,
            leads = self.leads,
            errors = self.error_count(),
            duration_secs = self.elapsed.as_secs_f64(),
            "Run finished"
        );
        for report in &self.sources {
            info!(
                run_id = %self.run_id,
                source = %report.source,
                phase = "run",
                pages = report.pages_fetched,
                records = report.records,
                errors = report.errors,
                "Source summary"
            );
        }
        for (round, count) in &self.by_round {
            info!(run_id = %self.run_id, phase = "run", round = %round, count, "Round summary");
        }
        for path in &self.written {
            info!(run_id = %self.run_id, phase = "export", path = %path.display(), "Output written");
        }
        if self.kept == 0 {
            warn!(
                run_id = %self.run_id,
                phase = "run",
                outcome = "empty",
                "No records were kept; check source errors and network access"
            );
        }
    }
}

/// A configured, ready-to-execute scrape
pub struct ScrapeRun {
    id: Uuid,
    config: ScrapeConfig,
    adapters: Vec<Box<dyn SourceAdapter>>,
    http: HttpFetcher,
}

impl ScrapeRun {
    /// Validate `config` and build the adapters it selects.
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        config.validate()?;
        let adapters = build_adapters(&config)?;
        Self::with_adapters(config, adapters)
    }

    /// Run `adapters` instead of the ones `config.sources` names.
    pub fn with_adapters(config: ScrapeConfig, adapters: Vec<Box<dyn SourceAdapter>>) -> Result<Self> {
        config.validate()?;
        let http = HttpFetcher::new(config.request_timeout())?;
        Ok(Self {
            id: Uuid::new_v4(),
            config,
            adapters,
            http,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Fetch, normalize, dedupe and export.
    ///
    /// Cancelling `cancel`, or hitting the configured run timeout, stops page
    /// fetching early; records gathered up to that point are still exported.
    /// Only export failures are returned as errors.
    pub async fn execute(&self, cancel: &CancellationToken) -> Result<RunSummary> {
        self.execute_on(cancel, Utc::now().date_naive()).await
    }

    /// [`execute`](Self::execute) with lead recency measured from `today`.
    pub async fn execute_on(&self, cancel: &CancellationToken, today: NaiveDate) -> Result<RunSummary> {
        let started = Instant::now();
        let token = cancel.child_token();
        let timer = self.config.run_timeout().map(|limit| {
            let token = token.clone();
            let run_id = self.id;
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                warn!(
                    run_id = %run_id,
                    phase = "run",
                    outcome = "timeout",
                    limit_secs = limit.as_secs(),
                    "Run timeout reached; stopping fetches"
                );
                token.cancel();
            })
        });

        info!(
            run_id = %self.id,
            phase = "run",
            sources = %self.config.sources,
            max_pages = self.config.max_pages,
            "Run started"
        );

        let mut orchestrator = Orchestrator::new(
            self.http.clone(),
            self.config.retry_policy(),
            self.config.delay(),
        )
        .concurrent(self.config.concurrent);
        let progress = self.config.show_progress.then(|| source_progress(self.adapters.len()));
        if let Some(bar) = &progress {
            orchestrator = orchestrator.with_progress(bar.clone());
        }

        let gathered = orchestrator.run(&self.adapters, self.config.max_pages, &token).await;
        if let Some(timer) = timer {
            timer.abort();
        }
        if let Some(bar) = progress {
            bar.finish_with_message("sources done");
        }

        let fetched = gathered.records.len();
        let normalizer = Normalizer::new()?;
        let (normalized, stats) = normalizer.normalize_all(gathered.records);
        let records = dedupe(normalized);
        let deduped_away = stats.normalized - records.len();

        let mut written = if records.is_empty() {
            warn!(
                run_id = %self.id,
                phase = "export",
                outcome = "skipped",
                "Nothing to export"
            );
            Vec::new()
        } else {
            self.write_outputs(&records)?
        };

        let leads = if self.config.leads {
            let leads = build_leads(&records, today, self.config.lead_window_days);
            if leads.is_empty() {
                info!(
                    run_id = %self.id,
                    phase = "leads",
                    outcome = "empty",
                    window_days = self.config.lead_window_days,
                    "No recently funded startups"
                );
            } else {
                let name = format!("{}_leads", self.config.output_file);
                for format in self.config.output_format.formats() {
                    let path = output_path(&self.config.output_dir, &name, format);
                    export_leads(&leads, format, &path)?;
                    written.push(path);
                }
            }
            leads.len()
        } else {
            0
        };

        let summary = RunSummary {
            run_id: self.id,
            fetched,
            normalized: stats.normalized,
            missing_name: stats.missing_name,
            website_invalid: stats.website_invalid,
            kept: records.len(),
            deduped_away,
            sources: gathered.reports,
            errors: gathered.errors,
            by_round: count_rounds(&records),
            leads,
            written,
            interrupted: gathered.interrupted,
            elapsed: started.elapsed(),
        };
        summary.log();
        Ok(summary)
    }

    fn write_outputs(&self, records: &[CanonicalRecord]) -> Result<Vec<PathBuf>> {
        let dir = &self.config.output_dir;
        std::fs::create_dir_all(dir).map_err(|e| IngestError::export(dir, e))?;

        let base = &self.config.output_file;
        let formats = self.config.output_format.formats();
        let mut written = Vec::new();

        let schema = ExportSchema::for_records(records);
        for &format in &formats {
            let path = output_path(dir, base, format);
            export(records, format, schema, &path)?;
            written.push(path);
        }

        if self.config.split_exports {
            let (startups, agencies): (Vec<CanonicalRecord>, Vec<CanonicalRecord>) = records
                .iter()
                .cloned()
                .partition(|record| record.kind == RecordKind::Startup);
            if !startups.is_empty() && !agencies.is_empty() {
                for (kind, subset) in [(RecordKind::Startup, startups), (RecordKind::Agency, agencies)] {
                    let name = format!("{}_{}", base, split_suffix(kind));
                    for &format in &formats {
                        let path = output_path(dir, &name, format);
                        export(&subset, format, ExportSchema::from(kind), &path)?;
                        written.push(path);
                    }
                }
            }
        }

        Ok(written)
    }
}

fn split_suffix(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Startup => "startups",
        RecordKind::Agency => "agencies",
    }
}

fn count_rounds(records: &[CanonicalRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records.iter().filter(|r| r.kind == RecordKind::Startup) {
        let round = record.round_type.clone().unwrap_or_else(|| "Unknown".to_string());
        *counts.entry(round).or_insert(0) += 1;
    }
    counts
}

fn source_progress(sources: usize) -> ProgressBar {
    let bar = ProgressBar::new(sources as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} sources")
    {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar.set_message("scraping");
    bar
}
