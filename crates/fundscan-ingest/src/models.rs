//! Record types flowing through a scraping run
//!
//! Adapters yield [`RawRecord`]s in their own field vocabulary; the
//! normalizer turns each into a [`CanonicalRecord`]; the deduplicator groups
//! canonical records by [`DedupKey`].

use crate::amount::Amount;
use chrono::{DateTime, NaiveDate, Utc};
use fundscan_common::text::fold_key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which export schema a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    #[default]
    Startup,
    Agency,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Startup => "startup",
            RecordKind::Agency => "agency",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page of a source: its position in the listing and where it lives
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageDescriptor {
    /// Zero-based position in the source's page sequence
    pub index: usize,
    /// URL or synthetic locator
    pub locator: String,
}

impl PageDescriptor {
    pub fn new(index: usize, locator: impl Into<String>) -> Self {
        Self {
            index,
            locator: locator.into(),
        }
    }
}

impl fmt::Display for PageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} ({})", self.index + 1, self.locator)
    }
}

/// Fetched body of a page, handed from `fetch_page` to `parse_page`
#[derive(Debug, Clone)]
pub struct PageContent {
    pub descriptor: PageDescriptor,
    pub body: String,
}

/// A record in source-native shape
///
/// Field names are whatever the source uses; values are raw strings or
/// explicitly absent. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub source_id: String,
    pub kind: RecordKind,
    pub fetched_at: DateTime<Utc>,
    pub page: usize,
    fields: BTreeMap<String, Option<String>>,
}

impl RawRecord {
    pub fn new(source_id: impl Into<String>, kind: RecordKind, page: usize) -> Self {
        Self {
            source_id: source_id.into(),
            kind,
            fetched_at: Utc::now(),
            page,
            fields: BTreeMap::new(),
        }
    }

    /// Set `name` to `value`, replacing any earlier value.
    pub fn with_field(mut self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        self.fields.insert(name.into(), value.map(Into::into));
        self
    }

    /// Set `name` only when it has no non-empty value yet.
    pub fn with_field_if_absent(self, name: &str, value: Option<impl Into<String>>) -> Self {
        if self.field(name).is_some() {
            self
        } else {
            self.with_field(name, value)
        }
    }

    /// Non-empty value of `name`
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|value| value.as_deref())
            .filter(|value| !value.trim().is_empty())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The unified schema every source is normalized into
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub company_name: String,
    pub website: Option<String>,
    pub round_type: Option<String>,
    pub amount: Option<Amount>,
    #[serde(default)]
    pub amount_unparsed: bool,
    #[serde(default)]
    pub investors: Vec<String>,
    pub funding_date: Option<NaiveDate>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub source_url: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
    pub hourly_rate_range: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub kind: RecordKind,
}

impl CanonicalRecord {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            ..Default::default()
        }
    }

    /// Number of populated schema fields, the completeness measure for dedup
    pub fn filled_fields(&self) -> usize {
        let optional = [
            self.website.is_some(),
            self.round_type.is_some(),
            self.amount.is_some(),
            self.funding_date.is_some(),
            self.industry.is_some(),
            self.location.is_some(),
            self.source_url.is_some(),
            self.description.is_some(),
            self.hourly_rate_range.is_some(),
            !self.investors.is_empty(),
            !self.services.is_empty(),
            !self.specialties.is_empty(),
        ];
        let name = usize::from(!self.company_name.is_empty());
        name + optional.iter().filter(|filled| **filled).count()
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::of(self)
    }
}

/// Identity of an entity across sources
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey {
    pub name: String,
    pub site: String,
}

impl DedupKey {
    /// Folded company name plus the website with scheme and `www.` removed.
    pub fn of(record: &CanonicalRecord) -> Self {
        let site = record
            .website
            .as_deref()
            .map(|website| {
                let bare = website
                    .split_once("://")
                    .map_or(website, |(_, rest)| rest)
                    .trim_end_matches('/');
                bare.strip_prefix("www.").unwrap_or(bare).to_lowercase()
            })
            .unwrap_or_default();

        Self {
            name: fold_key(&record.company_name),
            site,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_fields() {
        let raw = RawRecord::new("crunchbase", RecordKind::Startup, 0)
            .with_field("Company", Some("Anthropic"))
            .with_field("Website", None::<String>)
            .with_field("Amount", Some("  "));

        assert_eq!(raw.field("Company"), Some("Anthropic"));
        assert_eq!(raw.field("Website"), None);
        assert_eq!(raw.field("Amount"), None);
        assert_eq!(raw.field("Missing"), None);
        assert_eq!(raw.len(), 3);
    }

    #[test]
    fn test_with_field_if_absent_keeps_existing() {
        let raw = RawRecord::new("techcrunch", RecordKind::Startup, 0)
            .with_field("Source_URL", Some("https://a.example"))
            .with_field_if_absent("Source_URL", Some("https://b.example"))
            .with_field_if_absent("Date", Some("2024-01-15"));

        assert_eq!(raw.field("Source_URL"), Some("https://a.example"));
        assert_eq!(raw.field("Date"), Some("2024-01-15"));
    }

    #[test]
    fn test_filled_fields() {
        let mut record = CanonicalRecord::new("Acme Inc");
        assert_eq!(record.filled_fields(), 1);
        record.website = Some("https://acme.com".into());
        record.investors = vec!["Accel".into()];
        assert_eq!(record.filled_fields(), 3);
    }

    #[test]
    fn test_dedup_key_ignores_case_scheme_and_www() {
        let mut a = CanonicalRecord::new("Acme  Inc");
        a.website = Some("https://www.acme.com".into());
        let mut b = CanonicalRecord::new("acme inc");
        b.website = Some("http://acme.com/".into());
        assert_eq!(a.dedup_key(), b.dedup_key());

        let c = CanonicalRecord::new("Acme Inc");
        assert_ne!(a.dedup_key(), c.dedup_key());
        assert_eq!(c.dedup_key().site, "");
    }

    #[test]
    fn test_page_descriptor_display() {
        let page = PageDescriptor::new(2, "https://techcrunch.com/tag/funding/page/3/");
        assert_eq!(
            page.to_string(),
            "page 3 (https://techcrunch.com/tag/funding/page/3/)"
        );
    }
}
