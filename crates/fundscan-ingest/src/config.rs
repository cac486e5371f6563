//! Run configuration
//!
//! A [`ScrapeConfig`] is the only input a run takes. It can be built from
//! defaults, a builder, or `FUNDSCAN_*` environment variables; the CLI layers
//! its flags on top.

use crate::error::{IngestError, Result};
use crate::export::ExportFormat;
use crate::fetch::RetryPolicy;
use crate::sources::{SOURCE_NAMES, TECHCRUNCH_BASE_URL};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_MAX_PAGES: usize = 5;
pub const DEFAULT_OUTPUT_FILE: &str = "funded_startups";
pub const DEFAULT_DELAY_MS: u64 = 2_000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;
pub const DEFAULT_BACKOFF_CAP_MS: u64 = 30_000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LEAD_WINDOW_DAYS: u32 = 30;

/// Named source groups accepted wherever source names are
const SOURCE_GROUPS: &[(&str, &[&str])] = &[
    ("funding", &["crunchbase", "dealroom", "techcrunch"]),
    ("startups", &["crunchbase", "techcrunch", "producthunt", "angellist"]),
    ("agencies", &["clutch"]),
    ("all", &SOURCE_NAMES),
];

// ============================================================================
// Source selection
// ============================================================================

/// Ordered, duplicate-free list of adapter names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceSelection {
    names: Vec<String>,
}

impl SourceSelection {
    pub fn all() -> Self {
        Self {
            names: SOURCE_NAMES.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

impl Default for SourceSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl FromStr for SourceSelection {
    type Err = IngestError;

    /// Comma-separated adapter names and group names (`all`, `funding`,
    /// `startups`, `agencies`).
    fn from_str(s: &str) -> Result<Self> {
        let mut names: Vec<String> = Vec::new();
        let mut add = |name: &str| {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        };

        for token in s.split(',').map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()) {
            if let Some((_, members)) = SOURCE_GROUPS.iter().find(|(group, _)| *group == token) {
                for &name in members.iter() {
                    add(name);
                }
            } else if SOURCE_NAMES.contains(&token.as_str()) {
                add(token.as_str());
            } else {
                return Err(IngestError::UnknownSource(token));
            }
        }

        if names.is_empty() {
            return Err(IngestError::config("no sources selected"));
        }
        Ok(Self { names })
    }
}

impl TryFrom<String> for SourceSelection {
    type Error = IngestError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SourceSelection> for String {
    fn from(selection: SourceSelection) -> Self {
        selection.to_string()
    }
}

impl std::fmt::Display for SourceSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.names.join(","))
    }
}

// ============================================================================
// Output format
// ============================================================================

/// Which files a run writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Both,
}

impl OutputFormat {
    pub fn formats(&self) -> Vec<ExportFormat> {
        match self {
            OutputFormat::Csv => vec![ExportFormat::Csv],
            OutputFormat::Json => vec![ExportFormat::Json],
            OutputFormat::Both => vec![ExportFormat::Csv, ExportFormat::Json],
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Both => "both",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "both" => Ok(OutputFormat::Both),
            _ => Err(format!("Invalid output format: {}. Valid formats: csv, json, both", s)),
        }
    }
}

// ============================================================================
// ScrapeConfig
// ============================================================================

/// Everything a scraping run needs to know
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Adapters to run, in order
    pub sources: SourceSelection,

    /// Page limit per source
    pub max_pages: usize,

    pub output_format: OutputFormat,

    /// Base file name without extension
    pub output_file: String,

    pub output_dir: PathBuf,

    #[serde(default)]
    pub verbose: bool,

    /// Minimum spacing between requests to one source
    pub delay_ms: u64,

    /// Retries after the first attempt on transient fetch failures
    pub max_retries: u32,

    pub backoff_base_ms: u64,

    pub backoff_cap_ms: u64,

    /// Per-request HTTP timeout
    pub timeout_secs: u64,

    /// Whole-run deadline; pages not fetched by then are skipped
    pub run_timeout_secs: Option<u64>,

    /// Run sources concurrently, one worker each
    #[serde(default)]
    pub concurrent: bool,

    /// Also write `<base>_startups` and `<base>_agencies` when both kinds are present
    pub split_exports: bool,

    pub techcrunch_url: String,

    /// Draw a progress bar per finished source
    #[serde(default)]
    pub show_progress: bool,

    /// Also write `<base>_leads` with recently funded startups, scored
    #[serde(default)]
    pub leads: bool,

    /// How many days back a funding date still counts as recent
    #[serde(default = "default_lead_window")]
    pub lead_window_days: u32,
}

fn default_lead_window() -> u32 {
    DEFAULT_LEAD_WINDOW_DAYS
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            sources: SourceSelection::all(),
            max_pages: DEFAULT_MAX_PAGES,
            output_format: OutputFormat::Csv,
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            output_dir: PathBuf::from("."),
            verbose: false,
            delay_ms: DEFAULT_DELAY_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            backoff_cap_ms: DEFAULT_BACKOFF_CAP_MS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            run_timeout_secs: None,
            concurrent: false,
            split_exports: true,
            techcrunch_url: TECHCRUNCH_BASE_URL.to_string(),
            show_progress: false,
            leads: false,
            lead_window_days: DEFAULT_LEAD_WINDOW_DAYS,
        }
    }
}

impl ScrapeConfig {
    pub fn builder() -> ScrapeConfigBuilder {
        ScrapeConfigBuilder::default()
    }

    /// Defaults overridden by `FUNDSCAN_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `FUNDSCAN_*` variable name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(sources) = var("FUNDSCAN_SOURCES") {
            config.sources = sources.parse()?;
        }
        if let Some(value) = var("FUNDSCAN_MAX_PAGES") {
            config.max_pages = parse_var("FUNDSCAN_MAX_PAGES", &value)?;
        }
        if let Some(value) = var("FUNDSCAN_OUTPUT_FORMAT") {
            config.output_format = value.parse().map_err(IngestError::config)?;
        }
        if let Some(value) = var("FUNDSCAN_OUTPUT_FILE") {
            config.output_file = value;
        }
        if let Some(value) = var("FUNDSCAN_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(value);
        }
        if let Some(value) = var("FUNDSCAN_DELAY_MS") {
            config.delay_ms = parse_var("FUNDSCAN_DELAY_MS", &value)?;
        }
        if let Some(value) = var("FUNDSCAN_MAX_RETRIES") {
            config.max_retries = parse_var("FUNDSCAN_MAX_RETRIES", &value)?;
        }
        if let Some(value) = var("FUNDSCAN_BACKOFF_BASE_MS") {
            config.backoff_base_ms = parse_var("FUNDSCAN_BACKOFF_BASE_MS", &value)?;
        }
        if let Some(value) = var("FUNDSCAN_BACKOFF_CAP_MS") {
            config.backoff_cap_ms = parse_var("FUNDSCAN_BACKOFF_CAP_MS", &value)?;
        }
        if let Some(value) = var("FUNDSCAN_TIMEOUT_SECS") {
            config.timeout_secs = parse_var("FUNDSCAN_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = var("FUNDSCAN_RUN_TIMEOUT_SECS") {
            config.run_timeout_secs = Some(parse_var("FUNDSCAN_RUN_TIMEOUT_SECS", &value)?);
        }
        if let Some(value) = var("FUNDSCAN_CONCURRENT") {
            config.concurrent = parse_flag("FUNDSCAN_CONCURRENT", &value)?;
        }
        if let Some(value) = var("FUNDSCAN_SPLIT_EXPORTS") {
            config.split_exports = parse_flag("FUNDSCAN_SPLIT_EXPORTS", &value)?;
        }
        if let Some(value) = var("FUNDSCAN_TECHCRUNCH_URL") {
            config.techcrunch_url = value;
        }
        if let Some(value) = var("FUNDSCAN_LEADS") {
            config.leads = parse_flag("FUNDSCAN_LEADS", &value)?;
        }
        if let Some(value) = var("FUNDSCAN_LEAD_WINDOW_DAYS") {
            config.lead_window_days = parse_var("FUNDSCAN_LEAD_WINDOW_DAYS", &value)?;
        }

        Ok(config)
    }

    /// Reject settings a run cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_pages == 0 {
            return Err(IngestError::config("max_pages must be at least 1"));
        }
        if self.output_file.trim().is_empty() {
            return Err(IngestError::config("output file name cannot be empty"));
        }
        if self.output_file.contains(['/', '\\']) {
            return Err(IngestError::config(
                "output file name must not contain a path; use output_dir",
            ));
        }
        if self.backoff_cap_ms < self.backoff_base_ms {
            return Err(IngestError::config("backoff cap must not be below the backoff base"));
        }
        if self.timeout_secs == 0 {
            return Err(IngestError::config("request timeout must be greater than 0"));
        }
        if self.run_timeout_secs == Some(0) {
            return Err(IngestError::config("run timeout must be greater than 0"));
        }
        if self.lead_window_days == 0 {
            return Err(IngestError::config("lead window must be at least 1 day"));
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.backoff_base_ms),
            Duration::from_millis(self.backoff_cap_ms),
        )
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| IngestError::config(format!("invalid {}='{}': {}", name, value, e)))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(IngestError::config(format!(
            "invalid {}='{}': expected true or false",
            name, value
        ))),
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for ScrapeConfig
#[derive(Debug, Default)]
pub struct ScrapeConfigBuilder {
    config: Option<ScrapeConfig>,
}

impl ScrapeConfigBuilder {
    fn edit(mut self, apply: impl FnOnce(&mut ScrapeConfig)) -> Self {
        apply(self.config.get_or_insert_with(ScrapeConfig::default));
        self
    }

    /// Start from `config` instead of the defaults
    pub fn from_config(config: ScrapeConfig) -> Self {
        Self {
            config: Some(config),
        }
    }

    pub fn sources(self, sources: SourceSelection) -> Self {
        self.edit(|c| c.sources = sources)
    }

    pub fn max_pages(self, max_pages: usize) -> Self {
        self.edit(|c| c.max_pages = max_pages)
    }

    pub fn output_format(self, format: OutputFormat) -> Self {
        self.edit(|c| c.output_format = format)
    }

    pub fn output_file(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.edit(|c| c.output_file = name)
    }

    pub fn output_dir(self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.edit(|c| c.output_dir = dir)
    }

    pub fn verbose(self, verbose: bool) -> Self {
        self.edit(|c| c.verbose = verbose)
    }

    pub fn delay(self, delay: Duration) -> Self {
        self.edit(|c| c.delay_ms = delay.as_millis() as u64)
    }

    pub fn max_retries(self, retries: u32) -> Self {
        self.edit(|c| c.max_retries = retries)
    }

    pub fn backoff(self, base: Duration, cap: Duration) -> Self {
        self.edit(|c| {
            c.backoff_base_ms = base.as_millis() as u64;
            c.backoff_cap_ms = cap.as_millis() as u64;
        })
    }

    pub fn timeout_secs(self, secs: u64) -> Self {
        self.edit(|c| c.timeout_secs = secs)
    }

    pub fn run_timeout_secs(self, secs: Option<u64>) -> Self {
        self.edit(|c| c.run_timeout_secs = secs)
    }

    pub fn concurrent(self, concurrent: bool) -> Self {
        self.edit(|c| c.concurrent = concurrent)
    }

    pub fn split_exports(self, split: bool) -> Self {
        self.edit(|c| c.split_exports = split)
    }

    pub fn techcrunch_url(self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.edit(|c| c.techcrunch_url = url)
    }

    pub fn show_progress(self, show: bool) -> Self {
        self.edit(|c| c.show_progress = show)
    }

    pub fn leads(self, leads: bool) -> Self {
        self.edit(|c| c.leads = leads)
    }

    pub fn lead_window_days(self, days: u32) -> Self {
        self.edit(|c| c.lead_window_days = days)
    }

    pub fn build(self) -> ScrapeConfig {
        self.config.unwrap_or_default()
    }
}
