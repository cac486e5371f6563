//! Fundscan ingest library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Scrapes startup funding rounds and agency listings from several sources,
//! normalizes them into one schema, collapses duplicates and exports CSV or
//! JSON.
//!
//! # Pipeline
//!
//! - **Sources** ([`sources`]): one [`SourceAdapter`] per source, live HTML or
//!   bundled sample data, all behind the same fetch/parse contract
//! - **Fetching** ([`fetch`]): per-source rate limiting and bounded retry with
//!   exponential backoff
//! - **Orchestration** ([`orchestrator`]): runs adapters and keeps one
//!   source's failures away from the others
//! - **Normalization** ([`normalize`]), **dedup** ([`dedup`]) and **export**
//!   ([`export`])
//! - **Leads** ([`leads`]): optional scoring of recently funded startups
//!
//! # Example
//!
//! ```no_run
//! use fundscan_ingest::{ScrapeConfig, ScrapeRun};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ScrapeConfig::builder()
//!         .sources("funding".parse()?)
//!         .max_pages(2)
//!         .build();
//!     let summary = ScrapeRun::new(config)?.execute(&CancellationToken::new()).await?;
//!     println!("kept {} records", summary.kept);
//!     Ok(())
//! }
//! ```

pub mod amount;
pub mod config;
pub mod dedup;
pub mod error;
pub mod export;
pub mod fetch;
pub mod leads;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod run;
pub mod sources;

pub use config::{OutputFormat, ScrapeConfig, SourceSelection};
pub use error::{FetchError, IngestError, Result, SourceError};
pub use leads::Lead;
pub use models::{CanonicalRecord, RawRecord, RecordKind};
pub use orchestrator::{Orchestrator, OrchestratorOutput};
pub use run::{RunSummary, ScrapeRun};
pub use sources::SourceAdapter;
