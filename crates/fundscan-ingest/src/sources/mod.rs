//! Source adapters
//!
//! Every source, live or synthetic, implements [`SourceAdapter`]. The
//! orchestrator only sees the trait, so it cannot tell a live HTML scraper
//! from a sample-data generator.

mod sample;
mod techcrunch;

pub use sample::SampleSource;
pub use techcrunch::{TechCrunchSource, DEFAULT_BASE_URL as TECHCRUNCH_BASE_URL};

use crate::config::ScrapeConfig;
use crate::error::{IngestError, Result};
use crate::fetch::FetchContext;
use crate::models::{PageContent, PageDescriptor, RawRecord, RecordKind};
use async_trait::async_trait;

/// Registered adapter names, in default run order
pub const SOURCE_NAMES: [&str; 6] = [
    "crunchbase",
    "dealroom",
    "techcrunch",
    "producthunt",
    "angellist",
    "clutch",
];

/// Lazy sequence of pages for one source
pub type PageIter = Box<dyn Iterator<Item = PageDescriptor> + Send>;

/// Fetch and parse contract shared by all sources
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Registered name, used in logs, errors and the `source` field of records
    fn id(&self) -> &str;

    fn kind(&self) -> RecordKind;

    /// Pages to visit, at most `max_pages` of them.
    ///
    /// Each call starts a fresh sequence.
    fn list_pages(&self, max_pages: usize) -> PageIter;

    /// Fetch one page through `ctx`, which applies rate limiting and retries.
    async fn fetch_page(&self, page: &PageDescriptor, ctx: &FetchContext) -> Result<PageContent>;

    /// Extract raw records. Fails with `ParseFailed` when the page does not
    /// have the expected structure; missing individual fields are not errors.
    fn parse_page(&self, content: &PageContent) -> Result<Vec<RawRecord>>;
}

/// Construct the adapter registered under `name`.
pub fn build_adapter(name: &str, config: &ScrapeConfig) -> Result<Box<dyn SourceAdapter>> {
    let adapter: Box<dyn SourceAdapter> = match name {
        "crunchbase" => Box::new(SampleSource::crunchbase()?),
        "dealroom" => Box::new(SampleSource::dealroom()?),
        "techcrunch" => Box::new(TechCrunchSource::new(&config.techcrunch_url)?),
        "producthunt" => Box::new(SampleSource::producthunt()?),
        "angellist" => Box::new(SampleSource::angellist()?),
        "clutch" => Box::new(SampleSource::clutch()?),
        other => return Err(IngestError::UnknownSource(other.to_string())),
    };
    Ok(adapter)
}

/// Construct the adapters selected by `config`, in selection order.
pub fn build_adapters(config: &ScrapeConfig) -> Result<Vec<Box<dyn SourceAdapter>>> {
    config
        .sources
        .names()
        .iter()
        .map(|name| build_adapter(name, config))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_every_registered_name_builds() {
        let config = ScrapeConfig::default();
        for name in SOURCE_NAMES {
            let adapter = build_adapter(name, &config).unwrap();
            assert_eq!(adapter.id(), name);
        }
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let config = ScrapeConfig::default();
        let err = build_adapter("myspace", &config).err().unwrap();
        assert!(matches!(err, IngestError::UnknownSource(name) if name == "myspace"));
    }

    #[test]
    fn test_build_adapters_follows_selection_order() {
        let config = ScrapeConfig::builder()
            .sources("clutch,crunchbase".parse().unwrap())
            .build();
        let ids: Vec<_> = build_adapters(&config)
            .unwrap()
            .iter()
            .map(|adapter| adapter.id().to_string())
            .collect();
        assert_eq!(ids, vec!["clutch", "crunchbase"]);
    }

    #[test]
    fn test_agency_kind() {
        let config = ScrapeConfig::default();
        assert_eq!(build_adapter("clutch", &config).unwrap().kind(), RecordKind::Agency);
        assert_eq!(build_adapter("techcrunch", &config).unwrap().kind(), RecordKind::Startup);
    }
}
