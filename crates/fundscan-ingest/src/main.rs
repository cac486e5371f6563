//! Fundscan - startup funding and agency scraper

use anyhow::{Context, Result};
use clap::Parser;
use fundscan_common::logging::{init_logging, LogConfig, LogLevel};
use fundscan_ingest::{OutputFormat, ScrapeConfig, ScrapeRun, SourceSelection};
use std::path::PathBuf;
use std::process;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "fundscan")]
#[command(author, version, about = "Scrape startup funding rounds and agency listings")]
struct Cli {
    /// Sources to scrape: all, funding, startups, agencies, or a comma list of
    /// crunchbase, dealroom, techcrunch, producthunt, angellist, clutch
    #[arg(short, long)]
    sources: Option<SourceSelection>,

    /// Maximum pages per source
    #[arg(short = 'p', long)]
    max_pages: Option<usize>,

    /// csv, json or both
    #[arg(short = 'f', long)]
    output_format: Option<OutputFormat>,

    /// Output base name, without extension
    #[arg(short, long)]
    output_file: Option<String>,

    /// Directory for output files
    #[arg(short = 'd', long)]
    output_dir: Option<PathBuf>,

    /// Run sources concurrently
    #[arg(long)]
    concurrent: bool,

    /// Stop fetching after this many seconds and export what was gathered
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Show a progress bar
    #[arg(long)]
    progress: bool,

    /// Also export scored leads for recently funded startups
    #[arg(long)]
    leads: bool,

    /// Days back a funding date still counts as recent for leads
    #[arg(long, value_name = "DAYS")]
    lead_window: Option<u32>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Flags win over `FUNDSCAN_*` environment variables.
    fn into_config(self, mut config: ScrapeConfig) -> ScrapeConfig {
        if let Some(sources) = self.sources {
            config.sources = sources;
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(format) = self.output_format {
            config.output_format = format;
        }
        if let Some(name) = self.output_file {
            config.output_file = name;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if self.timeout.is_some() {
            config.run_timeout_secs = self.timeout;
        }
        if let Some(days) = self.lead_window {
            config.lead_window_days = days;
        }
        config.concurrent |= self.concurrent;
        config.verbose |= self.verbose;
        config.show_progress |= self.progress;
        config.leads |= self.leads;
        config
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Ignore a missing .env file
    let _ = dotenvy::dotenv();

    let log_config = LogConfig::builder()
        .level(LogLevel::from_verbose(cli.verbose))
        .log_file_prefix("fundscan")
        .build();
    let log_config = log_config.clone().with_env().unwrap_or(log_config);
    if let Err(e) = init_logging(&log_config) {
        eprintln!("Warning: logging disabled: {:#}", e);
    }

    if let Err(e) = run(cli).await {
        error!(error = %e, "Run failed");
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.into_config(ScrapeConfig::from_env().context("Failed to read FUNDSCAN_* settings")?);
    let run = ScrapeRun::new(config).context("Invalid run configuration")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!(phase = "run", "Interrupted; finishing with records gathered so far");
            on_interrupt.cancel();
        }
    });

    let summary = run.execute(&cancel).await.context("Run aborted")?;

    for source_error in &summary.errors {
        warn!(source = %source_error.source, phase = "run", detail = %source_error, "Source error");
    }
    info!(
        kept = summary.kept,
        leads = summary.leads,
        files = summary.written.len(),
        errors = summary.error_count(),
        "Done"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "fundscan",
            "--sources",
            "agencies",
            "--max-pages",
            "2",
            "--output-format",
            "both",
            "--timeout",
            "60",
            "--concurrent",
            "--leads",
            "--lead-window",
            "14",
        ]);
        let config = cli.into_config(ScrapeConfig::default());

        assert_eq!(config.sources.names(), ["clutch"]);
        assert_eq!(config.max_pages, 2);
        assert_eq!(config.output_format, OutputFormat::Both);
        assert_eq!(config.run_timeout_secs, Some(60));
        assert!(config.concurrent);
        assert!(config.leads);
        assert_eq!(config.lead_window_days, 14);
        assert_eq!(config.output_file, ScrapeConfig::default().output_file);
    }

    #[test]
    fn test_unknown_source_rejected_by_parser() {
        assert!(Cli::try_parse_from(["fundscan", "--sources", "myspace"]).is_err());
    }
}
