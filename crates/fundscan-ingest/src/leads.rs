//! Sales leads from recently funded startups
//!
//! A lead is a startup whose funding date falls inside a recent window,
//! scored on how much it raised, what it does and how far along it is. The
//! score decides a priority bucket; industry and round pick a pitch angle.

use crate::models::{CanonicalRecord, RecordKind};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

const BILLION: u64 = 1_000_000_000;
const MILLION: u64 = 1_000_000;

/// Priority bucket derived from the lead score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum LeadPriority {
    #[serde(rename = "High Priority")]
    High,
    #[serde(rename = "Medium Priority")]
    Medium,
    #[serde(rename = "Low Priority")]
    Low,
}

impl LeadPriority {
    pub fn from_score(score: u8) -> Self {
        match score {
            5.. => LeadPriority::High,
            3..=4 => LeadPriority::Medium,
            _ => LeadPriority::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadPriority::High => "High Priority",
            LeadPriority::Medium => "Medium Priority",
            LeadPriority::Low => "Low Priority",
        }
    }
}

impl fmt::Display for LeadPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse industry bucket, first match wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IndustryCategory {
    #[serde(rename = "AI/ML")]
    AiMl,
    Data,
    Fintech,
    Healthcare,
    Other,
}

impl IndustryCategory {
    /// Classify free-text industry by whole words, so "retail" is not "AI".
    pub fn classify(industry: Option<&str>) -> Self {
        let Some(industry) = industry else {
            return IndustryCategory::Other;
        };
        let lower = industry.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();
        let has = |options: &[&str]| words.iter().any(|word| options.contains(word));

        if has(&["ai", "ml"])
            || lower.contains("artificial intelligence")
            || lower.contains("machine learning")
        {
            IndustryCategory::AiMl
        } else if has(&["data", "analytics"]) {
            IndustryCategory::Data
        } else if has(&["fintech", "finance", "financial"]) {
            IndustryCategory::Fintech
        } else if has(&["health", "healthcare", "healthtech", "medical", "medtech"]) {
            IndustryCategory::Healthcare
        } else {
            IndustryCategory::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndustryCategory::AiMl => "AI/ML",
            IndustryCategory::Data => "Data",
            IndustryCategory::Fintech => "Fintech",
            IndustryCategory::Healthcare => "Healthcare",
            IndustryCategory::Other => "Other",
        }
    }

    fn points(&self) -> u8 {
        match self {
            IndustryCategory::AiMl | IndustryCategory::Data => 2,
            IndustryCategory::Fintech | IndustryCategory::Healthcare => 1,
            IndustryCategory::Other => 0,
        }
    }
}

impl fmt::Display for IndustryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scored startup ready for outreach
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lead {
    #[serde(flatten)]
    pub record: CanonicalRecord,
    pub industry_category: IndustryCategory,
    pub lead_score: u8,
    pub lead_priority: LeadPriority,
    pub pitch_opportunity: &'static str,
    pub contact_info: String,
}

impl Lead {
    pub fn from_record(record: CanonicalRecord) -> Self {
        let category = IndustryCategory::classify(record.industry.as_deref());
        let lead_score = score(&record);
        Self {
            industry_category: category,
            lead_score,
            lead_priority: LeadPriority::from_score(lead_score),
            pitch_opportunity: pitch_opportunity(&record, category),
            contact_info: contact_info(&record),
            record,
        }
    }
}

/// Whether `date` is at most `window_days` before `today`.
///
/// Undated records are never recent. Dates after `today` count as recent.
pub fn is_recent(date: Option<NaiveDate>, today: NaiveDate, window_days: u32) -> bool {
    date.is_some_and(|date| (today - date).num_days() <= i64::from(window_days))
}

/// Points for amount raised, industry and round stage.
pub fn score(record: &CanonicalRecord) -> u8 {
    amount_points(record) + IndustryCategory::classify(record.industry.as_deref()).points() + round_points(record)
}

fn raised(record: &CanonicalRecord) -> u64 {
    record
        .amount
        .as_ref()
        .and_then(|amount| amount.money())
        .map_or(0, |money| money.value)
}

fn amount_points(record: &CanonicalRecord) -> u8 {
    match raised(record) {
        value if value >= BILLION => 3,
        value if value >= MILLION => 2,
        _ => 1,
    }
}

fn round_stage(record: &CanonicalRecord) -> Option<char> {
    let round = record.round_type.as_deref()?.to_lowercase();
    let stage = round.strip_prefix("series ")?;
    stage.chars().next()
}

fn round_points(record: &CanonicalRecord) -> u8 {
    match round_stage(record) {
        Some('a') => 1,
        Some('b' | 'c') => 2,
        Some('d' | 'e') => 3,
        _ => 0,
    }
}

fn pitch_opportunity(record: &CanonicalRecord, category: IndustryCategory) -> &'static str {
    match category {
        IndustryCategory::AiMl => return "AI/ML Platform Expansion",
        IndustryCategory::Data => return "Data Platform Scaling",
        IndustryCategory::Fintech => return "Financial Technology Solutions",
        IndustryCategory::Healthcare => return "Healthcare Technology",
        IndustryCategory::Other => {},
    }
    match round_stage(record) {
        Some('a') => "Early-Stage Growth Support",
        Some('b' | 'c') => "Scale-Up Solutions",
        _ if raised(record) >= BILLION => "Enterprise-Level Solutions",
        _ => "General Business Solutions",
    }
}

fn contact_info(record: &CanonicalRecord) -> String {
    match &record.website {
        Some(website) => format!("{}/contact", website.trim_end_matches('/')),
        None => format!("LinkedIn: {}", record.company_name),
    }
}

/// Leads from startups funded within `window_days` of `today`, most recent first.
///
/// Records with the same date keep their input order.
pub fn build_leads(records: &[CanonicalRecord], today: NaiveDate, window_days: u32) -> Vec<Lead> {
    let mut recent: Vec<&CanonicalRecord> = records
        .iter()
        .filter(|record| record.kind == RecordKind::Startup)
        .filter(|record| is_recent(record.funding_date, today, window_days))
        .collect();
    recent.sort_by(|a, b| b.funding_date.cmp(&a.funding_date));
    recent
        .into_iter()
        .map(|record| Lead::from_record(record.clone()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::amount::Amount;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn startup(name: &str, amount: &str, round: &str, industry: &str, funded: NaiveDate) -> CanonicalRecord {
        let mut record = CanonicalRecord::new(name);
        record.amount = Some(Amount::parse(amount));
        record.round_type = Some(round.to_string());
        record.industry = Some(industry.to_string());
        record.funding_date = Some(funded);
        record
    }

    #[test]
    fn test_recency_window() {
        let today = date(2024, 3, 31);
        assert!(is_recent(Some(date(2024, 3, 1)), today, 30));
        assert!(!is_recent(Some(date(2024, 2, 29)), today, 30));
        assert!(is_recent(Some(date(2024, 4, 2)), today, 30));
        assert!(!is_recent(None, today, 30));
    }

    #[test]
    fn test_industry_matches_whole_words() {
        assert_eq!(IndustryCategory::classify(Some("Generative AI")), IndustryCategory::AiMl);
        assert_eq!(
            IndustryCategory::classify(Some("Artificial Intelligence")),
            IndustryCategory::AiMl
        );
        assert_eq!(IndustryCategory::classify(Some("Retail")), IndustryCategory::Other);
        assert_eq!(IndustryCategory::classify(Some("Data / Analytics")), IndustryCategory::Data);
        assert_eq!(IndustryCategory::classify(Some("Fintech")), IndustryCategory::Fintech);
        assert_eq!(IndustryCategory::classify(Some("Digital Health")), IndustryCategory::Healthcare);
        assert_eq!(IndustryCategory::classify(None), IndustryCategory::Other);
    }

    #[test]
    fn test_scoring_and_priority() {
        let today = date(2024, 3, 31);

        let big = Lead::from_record(startup("Scale", "$1B", "Series F", "AI", today));
        assert_eq!(big.lead_score, 5);
        assert_eq!(big.lead_priority, LeadPriority::High);
        assert_eq!(big.pitch_opportunity, "AI/ML Platform Expansion");

        let mid = Lead::from_record(startup("Ledgerly", "$20M", "Series B", "Fintech", today));
        assert_eq!(mid.lead_score, 5);
        assert_eq!(mid.industry_category, IndustryCategory::Fintech);

        let small = Lead::from_record(startup("Shoply", "n/a", "Seed", "Retail", today));
        assert_eq!(small.lead_score, 1);
        assert_eq!(small.lead_priority, LeadPriority::Low);
        assert_eq!(small.pitch_opportunity, "General Business Solutions");

        let growth = Lead::from_record(startup("Crate", "$8M", "Series A", "Logistics", today));
        assert_eq!(growth.lead_score, 3);
        assert_eq!(growth.lead_priority, LeadPriority::Medium);
        assert_eq!(growth.pitch_opportunity, "Early-Stage Growth Support");
    }

    #[test]
    fn test_contact_info() {
        let mut record = CanonicalRecord::new("Orbit");
        assert_eq!(Lead::from_record(record.clone()).contact_info, "LinkedIn: Orbit");
        record.website = Some("https://orbit.dev".into());
        assert_eq!(Lead::from_record(record).contact_info, "https://orbit.dev/contact");
    }

    #[test]
    fn test_build_leads_filters_and_orders() {
        let today = date(2024, 3, 31);
        let mut agency = startup("Slalom", "$5M", "Seed", "AI", today);
        agency.kind = RecordKind::Agency;
        let mut undated = startup("Nodate", "$5M", "Seed", "AI", today);
        undated.funding_date = None;
        let records = vec![
            startup("Older", "$5M", "Seed", "AI", date(2024, 3, 10)),
            startup("Stale", "$5M", "Seed", "AI", date(2023, 12, 1)),
            agency,
            undated,
            startup("Newest", "$5M", "Seed", "AI", date(2024, 3, 30)),
            startup("AlsoOlder", "$5M", "Seed", "AI", date(2024, 3, 10)),
        ];

        let leads = build_leads(&records, today, 30);
        let names: Vec<&str> = leads.iter().map(|l| l.record.company_name.as_str()).collect();
        assert_eq!(names, ["Newest", "Older", "AlsoOlder"]);
    }

    #[test]
    fn test_lead_json_is_flat() {
        let lead = Lead::from_record(startup("Scale", "$1B", "Series F", "AI", date(2024, 3, 1)));
        let json = serde_json::to_value(&lead).unwrap();
        assert_eq!(json["company_name"], "Scale");
        assert_eq!(json["lead_priority"], "High Priority");
        assert_eq!(json["industry_category"], "AI/ML");
    }
}
