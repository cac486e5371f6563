//! Field recovery from free text: round names and company names in titles

use crate::error::{IngestError, Result};
use fundscan_common::text::clean_text;
use regex::Regex;

const ROUND_PATTERN: &str =
    r"(?i)\b(pre-seed|seed|series\s+[a-j]|angel|venture|growth|secondary|ipo|acquisition)\b";

const TITLE_PATTERNS: &[&str] = &[
    r"(?i)^(.+?)\s+(?:raises|raised|raise|secures|secured|lands|landed|closes|closed|announces|announced|bags|nabs)\b",
    r"(?i)^(.+?)\s+(?:funding|investment)\b",
];

/// Words that match a title pattern but are never a company name
const NOT_A_NAME: &[&str] = &["the", "a", "an", "startup", "company", "this startup"];

/// Compiled recovery patterns
#[derive(Debug, Clone)]
pub struct Extractor {
    round: Regex,
    titles: Vec<Regex>,
}

impl Extractor {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| IngestError::config(format!("invalid pattern: {}", e)))
        };
        Ok(Self {
            round: compile(ROUND_PATTERN)?,
            titles: TITLE_PATTERNS
                .iter()
                .map(|pattern| compile(*pattern))
                .collect::<Result<_>>()?,
        })
    }

    /// First funding-round term in `text`, in canonical spelling.
    pub fn round(&self, text: &str) -> Option<String> {
        self.round
            .find(text)
            .map(|found| canonical_round(found.as_str()))
    }

    /// Canonical spelling of a round label, or the cleaned label when it is not
    /// in the vocabulary.
    pub fn round_label(&self, label: &str) -> Option<String> {
        let cleaned = clean_text(label)?;
        match self.round.find(&cleaned) {
            Some(found) if found.as_str().len() == cleaned.len() => Some(canonical_round(&cleaned)),
            _ => Some(cleaned),
        }
    }

    /// Company name at the start of a headline like "Acme raises $5M".
    pub fn company_from_title(&self, title: &str) -> Option<String> {
        self.titles.iter().find_map(|pattern| {
            let prefix = pattern.captures(title)?.get(1)?.as_str();
            // "Exclusive: Acme raises ..." puts a kicker before the name
            let prefix = prefix.rsplit(':').next().unwrap_or(prefix);
            let name = clean_text(prefix)?;
            let name = name.trim_end_matches("'s").to_string();
            let plausible = name.chars().count() > 2
                && !NOT_A_NAME.contains(&name.to_lowercase().as_str());
            plausible.then_some(name)
        })
    }
}

fn canonical_round(term: &str) -> String {
    let term = term.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    match term.as_str() {
        "pre-seed" => "Pre-Seed".to_string(),
        "ipo" => "IPO".to_string(),
        _ => term
            .split(' ')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" "),
    }
}
