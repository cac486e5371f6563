//! Raw record to canonical record mapping
//!
//! Source field names are matched through an alias table, values are
//! whitespace-cleaned, and typed fields (amount, date, website, lists) are
//! parsed. Fields outside the canonical schema are dropped. A record whose
//! company name cannot be found or recovered from an article title fails with
//! [`NormalizationFailure::MissingName`].

mod date;
mod extract;
mod website;

pub use date::parse_date;
pub use extract::Extractor;
pub use website::normalize_website;

use crate::amount::{parse_money, Amount};
use crate::error::{IngestError, NormalizationFailure, Result};
use crate::models::{CanonicalRecord, RawRecord};
use fundscan_common::text::{clean_text, split_list};
use std::collections::HashMap;
use tracing::{debug, info};

/// Canonical fields a raw key can map to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    CompanyName,
    Website,
    RoundType,
    Amount,
    Investors,
    FundingDate,
    Industry,
    Location,
    SourceUrl,
    Description,
    Services,
    Specialties,
    HourlyRate,
    ArticleTitle,
}

impl Field {
    /// Map a source field name, ignoring case and treating spaces and dashes
    /// as underscores.
    fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase().replace([' ', '-'], "_");
        let field = match key.as_str() {
            "company" | "company_name" | "name" | "startup" | "organization" => Field::CompanyName,
            "website" | "homepage" | "url" | "domain" | "company_url" => Field::Website,
            "round" | "round_type" | "stage" | "funding_round" | "series" => Field::RoundType,
            "amount" | "amount_raised" | "raised" | "funding_amount" | "money_raised" => Field::Amount,
            "investors" | "investor" | "lead_investors" | "backers" => Field::Investors,
            "date" | "funding_date" | "announced_on" | "announced_date" | "published" => {
                Field::FundingDate
            },
            "industry" | "sector" | "market" | "category" => Field::Industry,
            "location" | "hq" | "hq_location" | "headquarters" | "city" => Field::Location,
            "source_url" | "article_url" | "link" | "permalink" => Field::SourceUrl,
            "description" | "summary" | "pitch" | "excerpt" | "tagline" => Field::Description,
            "services" => Field::Services,
            "specialties" | "specializations" => Field::Specialties,
            "hourly_rate" | "hourly_rate_range" | "rate" => Field::HourlyRate,
            "article_title" | "title" | "headline" => Field::ArticleTitle,
            _ => return None,
        };
        Some(field)
    }
}

/// Counters kept across one normalization pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub normalized: usize,
    pub missing_name: usize,
    pub amount_unparsed: usize,
    pub date_unparsed: usize,
    pub website_invalid: usize,
}

impl NormalizeStats {
    pub fn dropped(&self) -> usize {
        self.missing_name
    }
}

/// Maps raw records into the canonical schema
#[derive(Debug, Clone)]
pub struct Normalizer {
    extractor: Extractor,
}

impl Normalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            extractor: Extractor::new()?,
        })
    }

    /// Normalize one record.
    pub fn normalize(&self, raw: RawRecord) -> Result<CanonicalRecord> {
        self.normalize_counted(raw, &mut NormalizeStats::default())
    }

    /// Normalize a batch in order, dropping and counting records without a name.
    pub fn normalize_all(&self, raws: Vec<RawRecord>) -> (Vec<CanonicalRecord>, NormalizeStats) {
        let mut stats = NormalizeStats::default();
        let mut records = Vec::with_capacity(raws.len());

        for raw in raws {
            let source = raw.source_id.clone();
            let page = raw.page;
            match self.normalize_counted(raw, &mut stats) {
                Ok(record) => records.push(record),
                Err(e) => {
                    stats.missing_name += 1;
                    debug!(
                        source = %source,
                        phase = "normalize",
                        outcome = "dropped",
                        page,
                        detail = %e,
                        "Dropped record"
                    );
                },
            }
        }
        stats.normalized = records.len();

        info!(
            phase = "normalize",
            outcome = "ok",
            normalized = stats.normalized,
            missing_name = stats.missing_name,
            amount_unparsed = stats.amount_unparsed,
            date_unparsed = stats.date_unparsed,
            website_invalid = stats.website_invalid,
            "Normalization finished"
        );

        (records, stats)
    }

    fn normalize_counted(&self, raw: RawRecord, stats: &mut NormalizeStats) -> Result<CanonicalRecord> {
        let values = collect_fields(&raw);
        let get = |field: Field| values.get(&field).map(String::as_str);

        let company_name = get(Field::CompanyName)
            .map(str::to_string)
            .or_else(|| {
                get(Field::ArticleTitle).and_then(|title| self.extractor.company_from_title(title))
            })
            .ok_or(IngestError::NormalizationFailed(NormalizationFailure::MissingName))?;

        // Free text that round type and amount can be recovered from
        let narrative = [get(Field::ArticleTitle), get(Field::Description)];

        let website = get(Field::Website).and_then(|text| {
            let normalized = normalize_website(text);
            if normalized.is_none() {
                stats.website_invalid += 1;
            }
            normalized
        });

        let round_type = match get(Field::RoundType) {
            Some(label) => self.extractor.round_label(label),
            None => narrative
                .iter()
                .flatten()
                .find_map(|text| self.extractor.round(text)),
        };

        let (amount, amount_unparsed) = match get(Field::Amount) {
            Some(text) => {
                let amount = Amount::parse(text);
                let unparsed = amount.is_unparsed();
                if unparsed {
                    stats.amount_unparsed += 1;
                }
                (Some(amount), unparsed)
            },
            None => (
                narrative
                    .iter()
                    .flatten()
                    .find_map(|text| parse_money(text))
                    .map(Amount::Money),
                false,
            ),
        };

        let funding_date = get(Field::FundingDate).and_then(|text| {
            let parsed = parse_date(text);
            if parsed.is_none() {
                stats.date_unparsed += 1;
            }
            parsed
        });

        let list = |field: Field| get(field).map(split_list).unwrap_or_default();
        let text = |field: Field| get(field).map(str::to_string);

        Ok(CanonicalRecord {
            company_name,
            website,
            round_type,
            amount,
            amount_unparsed,
            investors: list(Field::Investors),
            funding_date,
            industry: text(Field::Industry),
            location: text(Field::Location),
            source_url: text(Field::SourceUrl),
            description: text(Field::Description),
            services: list(Field::Services),
            specialties: list(Field::Specialties),
            hourly_rate_range: text(Field::HourlyRate),
            source: raw.source_id,
            kind: raw.kind,
        })
    }
}

/// Cleaned value per canonical field; the first non-empty alias wins.
fn collect_fields(raw: &RawRecord) -> HashMap<Field, String> {
    let mut values = HashMap::new();
    for (key, value) in raw.fields() {
        let Some(field) = Field::from_key(key) else {
            continue;
        };
        if let Some(cleaned) = value.and_then(clean_text) {
            values.entry(field).or_insert(cleaned);
        }
    }
    values
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::amount::{Currency, Money};
    use crate::models::RecordKind;
    use chrono::NaiveDate;

    fn raw() -> RawRecord {
        RawRecord::new("test", RecordKind::Startup, 0)
    }

    #[test]
    fn test_full_record() {
        let normalizer = Normalizer::new().unwrap();
        let record = normalizer
            .normalize(
                raw()
                    .with_field("Company", Some("  Anthropic \n"))
                    .with_field("Website", Some("https://Anthropic.com/"))
                    .with_field("Round", Some("series c"))
                    .with_field("Amount", Some("$750M"))
                    .with_field("Investors", Some("Amazon, Google and Salesforce"))
                    .with_field("Date", Some("2024-01-15"))
                    .with_field("Industry", Some("Artificial   Intelligence"))
                    .with_field("Valuation", Some("$15B")),
            )
            .unwrap();

        assert_eq!(record.company_name, "Anthropic");
        assert_eq!(record.website.as_deref(), Some("https://anthropic.com"));
        assert_eq!(record.round_type.as_deref(), Some("Series C"));
        assert_eq!(
            record.amount.as_ref().and_then(Amount::money),
            Some(Money::new(Currency::Usd, 750_000_000))
        );
        assert!(!record.amount_unparsed);
        assert_eq!(record.investors, vec!["Amazon", "Google", "Salesforce"]);
        assert_eq!(record.funding_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(record.industry.as_deref(), Some("Artificial Intelligence"));
        assert_eq!(record.source, "test");
    }

    #[test]
    fn test_amount_five_million() {
        let normalizer = Normalizer::new().unwrap();
        let record = normalizer
            .normalize(raw().with_field("name", Some("Acme")).with_field("Amount", Some("$5M")))
            .unwrap();
        let money = record.amount.unwrap().money().unwrap();
        assert_eq!(money.value, 5_000_000);
        assert_eq!(money.currency, Currency::Usd);
        assert!(!record.amount_unparsed);
    }

    #[test]
    fn test_unparsed_amount_kept_verbatim() {
        let normalizer = Normalizer::new().unwrap();
        let record = normalizer
            .normalize(raw().with_field("name", Some("Acme")).with_field("Amount", Some("n/a")))
            .unwrap();
        assert!(record.amount_unparsed);
        assert_eq!(record.amount, Some(Amount::Unparsed("n/a".into())));
    }

    #[test]
    fn test_missing_name_fails() {
        let normalizer = Normalizer::new().unwrap();
        let result = normalizer.normalize(
            raw()
                .with_field("Company", Some("   "))
                .with_field("Amount", Some("$4M")),
        );
        assert!(matches!(
            result,
            Err(IngestError::NormalizationFailed(NormalizationFailure::MissingName))
        ));
    }

    #[test]
    fn test_name_round_and_amount_recovered_from_article() {
        let normalizer = Normalizer::new().unwrap();
        let record = normalizer
            .normalize(
                raw()
                    .with_field("Article_Title", Some("Acme raises $12M Series A to automate payroll"))
                    .with_field(
                        "Description",
                        Some("Acme raised $12M in a Series A round led by Accel."),
                    ),
            )
            .unwrap();
        assert_eq!(record.company_name, "Acme");
        assert_eq!(record.round_type.as_deref(), Some("Series A"));
        assert_eq!(record.amount.unwrap().money().unwrap().value, 12_000_000);
        assert!(!record.amount_unparsed);
    }

    #[test]
    fn test_aliases_and_unparseable_values() {
        let normalizer = Normalizer::new().unwrap();
        let record = normalizer
            .normalize(
                raw()
                    .with_field("company_name", Some("Plaid"))
                    .with_field("url", Some("not a url"))
                    .with_field("announced-on", Some("sometime soon"))
                    .with_field("Hourly Rate", Some("$100-300"))
                    .with_field("Specialties", Some("AI/ML, Cloud; Cloud")),
            )
            .unwrap();
        assert_eq!(record.company_name, "Plaid");
        assert_eq!(record.website, None);
        assert_eq!(record.funding_date, None);
        assert_eq!(record.hourly_rate_range.as_deref(), Some("$100-300"));
        assert_eq!(record.specialties, vec!["AI/ML", "Cloud"]);
    }

    #[test]
    fn test_normalize_all_counts_missing_names() {
        let normalizer = Normalizer::new().unwrap();
        let raws = vec![
            raw().with_field("Company", Some("Acme")),
            raw().with_field("Company", None::<String>),
            raw().with_field("Description", Some("no name anywhere")),
            raw()
                .with_field("Company", Some("Orbit"))
                .with_field("Date", Some("yesterday"))
                .with_field("Amount", Some("undisclosed"))
                .with_field("Website", Some("not a url")),
        ];

        let (records, stats) = normalizer.normalize_all(raws);
        assert_eq!(records.len(), 2);
        assert_eq!(stats.normalized, 2);
        assert_eq!(stats.missing_name, 2);
        assert_eq!(stats.dropped(), 2);
        assert_eq!(stats.amount_unparsed, 1);
        assert_eq!(stats.date_unparsed, 1);
        assert_eq!(stats.website_invalid, 1);
    }

    #[test]
    fn test_name_taken_before_colon_in_headline() {
        let normalizer = Normalizer::new().unwrap();
        let record = normalizer
            .normalize(raw().with_field("Article_Title", Some("Acme raises $12M: payroll goes global")))
            .unwrap();
        assert_eq!(record.company_name, "Acme");
        assert_eq!(record.amount.unwrap().money().unwrap().value, 12_000_000);
    }

    #[test]
    fn test_b2b_is_not_an_amount() {
        let normalizer = Normalizer::new().unwrap();
        let record = normalizer
            .normalize(
                raw()
                    .with_field("Company", Some("Ledgerly"))
                    .with_field("Description", Some("One of the top 50 B2B payments startups")),
            )
            .unwrap();
        assert_eq!(record.amount, None);
        assert!(!record.amount_unparsed);
    }
}
