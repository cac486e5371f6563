//! Synthetic sources backed by embedded sample datasets
//!
//! Used for sources that block scraping or need a login. Each page is a
//! slice of the dataset served as JSON text through the normal fetch path, so
//! rate limiting, retries and parsing behave as for a live source.

use super::{PageIter, SourceAdapter};
use crate::error::{FetchError, IngestError, Result};
use crate::fetch::FetchContext;
use crate::models::{PageContent, PageDescriptor, RawRecord, RecordKind};
use async_trait::async_trait;
use serde_json::{Map, Value};

type Entry = Map<String, Value>;

/// Deterministic page generator over a fixed dataset
#[derive(Debug, Clone)]
pub struct SampleSource {
    id: String,
    kind: RecordKind,
    endpoint: String,
    entries: Vec<Entry>,
    page_size: usize,
}

impl SampleSource {
    pub fn new(
        id: impl Into<String>,
        kind: RecordKind,
        endpoint: impl Into<String>,
        entries: Vec<Entry>,
        page_size: usize,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            endpoint: endpoint.into(),
            entries,
            page_size: page_size.max(1),
        }
    }

    /// Build from a JSON array of objects.
    pub fn from_json(
        id: &str,
        kind: RecordKind,
        endpoint: &str,
        dataset: &str,
        page_size: usize,
    ) -> Result<Self> {
        let entries: Vec<Entry> = serde_json::from_str(dataset)
            .map_err(|e| IngestError::config(format!("invalid sample dataset for {}: {}", id, e)))?;
        Ok(Self::new(id, kind, endpoint, entries, page_size))
    }

    pub fn crunchbase() -> Result<Self> {
        Self::from_json(
            "crunchbase",
            RecordKind::Startup,
            "https://www.crunchbase.com/discover/funding_rounds",
            include_str!("data/crunchbase.json"),
            3,
        )
    }

    pub fn dealroom() -> Result<Self> {
        Self::from_json(
            "dealroom",
            RecordKind::Startup,
            "https://app.dealroom.co/transactions.rounds",
            include_str!("data/dealroom.json"),
            3,
        )
    }

    pub fn producthunt() -> Result<Self> {
        Self::from_json(
            "producthunt",
            RecordKind::Startup,
            "https://www.producthunt.com/leaderboard",
            include_str!("data/producthunt.json"),
            2,
        )
    }

    pub fn angellist() -> Result<Self> {
        Self::from_json(
            "angellist",
            RecordKind::Startup,
            "https://wellfound.com/startups",
            include_str!("data/angellist.json"),
            2,
        )
    }

    pub fn clutch() -> Result<Self> {
        Self::from_json(
            "clutch",
            RecordKind::Agency,
            "https://clutch.co/agencies",
            include_str!("data/clutch.json"),
            4,
        )
    }

    pub fn page_count(&self) -> usize {
        self.entries.len().div_ceil(self.page_size)
    }

    fn page_entries(&self, index: usize) -> &[Entry] {
        let start = (index * self.page_size).min(self.entries.len());
        let end = (start + self.page_size).min(self.entries.len());
        &self.entries[start..end]
    }
}

#[async_trait]
impl SourceAdapter for SampleSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> RecordKind {
        self.kind
    }

    fn list_pages(&self, max_pages: usize) -> PageIter {
        let endpoint = self.endpoint.clone();
        Box::new(
            (0..self.page_count().min(max_pages))
                .map(move |index| PageDescriptor::new(index, format!("{}?page={}", endpoint, index + 1))),
        )
    }

    async fn fetch_page(&self, page: &PageDescriptor, ctx: &FetchContext) -> Result<PageContent> {
        let entries = self.page_entries(page.index);
        let body = ctx
            .execute(|_| async move {
                serde_json::to_string(entries).map_err(|e| FetchError::Malformed(e.to_string()))
            })
            .await?;

        Ok(PageContent {
            descriptor: page.clone(),
            body,
        })
    }

    fn parse_page(&self, content: &PageContent) -> Result<Vec<RawRecord>> {
        let entries: Vec<Entry> = serde_json::from_str(&content.body)
            .map_err(|e| IngestError::parse(format!("expected a JSON array of objects: {}", e)))?;

        let records = entries
            .into_iter()
            .map(|entry| {
                let record = entry.into_iter().fold(
                    RawRecord::new(&self.id, self.kind, content.descriptor.index),
                    |record, (name, value)| record.with_field(name, value_text(&value)),
                );
                record.with_field_if_absent("Source_URL", Some(content.descriptor.locator.as_str()))
            })
            .collect();

        Ok(records)
    }
}

/// Flatten a JSON value into a raw field value; arrays become `", "`-joined text.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Object(_) => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        },
    }
}
