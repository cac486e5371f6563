//! TechCrunch funding tag listing (live HTML)

use super::{PageIter, SourceAdapter};
use crate::error::{IngestError, Result};
use crate::fetch::FetchContext;
use crate::models::{PageContent, PageDescriptor, RawRecord, RecordKind};
use async_trait::async_trait;
use fundscan_common::text::{clean_text, push_unique, split_list};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://techcrunch.com";

// Layouts change; the first selector with any match wins.
const CARD_SELECTORS: &[&str] = &["div.loop-card", "div.post-block", "li.wp-block-post", "article"];
const TITLE_SELECTORS: &[&str] = &[
    ".loop-card__title a",
    ".post-block__title a",
    "h2 a",
    "h3 a",
    "h2",
    "h3",
];
const EXCERPT_SELECTORS: &[&str] = &[
    ".loop-card__excerpt",
    ".post-block__content",
    ".excerpt",
    "p",
];

const INVESTOR_PATTERNS: &[&str] = &[
    r"(?i)\b(?:co-)?led\s+by\s+([^,.;]+)",
    r"(?i)\bbacked\s+by\s+([^.;]+)",
    r"(?i)\binvestors?\s+(?:include|including)\s+([^.;]+)",
    r"(?i)\bparticipation\s+(?:from|of)\s+([^.;]+)",
];

/// Scrapes article cards from the funding tag pages
pub struct TechCrunchSource {
    base_url: Url,
    cards: Vec<Selector>,
    titles: Vec<Selector>,
    excerpts: Vec<Selector>,
    link: Selector,
    time: Selector,
    investor_patterns: Vec<Regex>,
}

impl TechCrunchSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| IngestError::config(format!("invalid techcrunch URL '{}': {}", base_url, e)))?;

        let investor_patterns = INVESTOR_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| IngestError::config(format!("invalid investor pattern: {}", e)))?;

        Ok(Self {
            base_url,
            cards: selectors(CARD_SELECTORS)?,
            titles: selectors(TITLE_SELECTORS)?,
            excerpts: selectors(EXCERPT_SELECTORS)?,
            link: selector("a[href]")?,
            time: selector("time")?,
            investor_patterns,
        })
    }

    /// Investor names mentioned in `text`, in pattern order, without duplicates.
    pub fn extract_investors(&self, text: &str) -> Vec<String> {
        let mut investors = Vec::new();
        for pattern in &self.investor_patterns {
            for captures in pattern.captures_iter(text) {
                if let Some(group) = captures.get(1) {
                    for name in split_list(group.as_str()) {
                        push_unique(&mut investors, &name);
                    }
                }
            }
        }
        investors
    }

    fn parse_card(&self, card: ElementRef<'_>, page: &PageDescriptor) -> Option<RawRecord> {
        let title_el = first_match(card, &self.titles);
        let title = title_el.and_then(element_text);
        let excerpt = first_match(card, &self.excerpts).and_then(element_text);
        if title.is_none() && excerpt.is_none() {
            return None;
        }

        let link = title_el
            .and_then(|el| {
                if el.value().name() == "a" {
                    Some(el)
                } else {
                    el.select(&self.link).next()
                }
            })
            .or_else(|| card.select(&self.link).next())
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| self.base_url.join(href).ok())
            .map(String::from);

        let date = card.select(&self.time).next().and_then(|time| {
            time.value()
                .attr("datetime")
                .and_then(clean_text)
                .or_else(|| element_text(time))
        });

        let investors = excerpt
            .as_deref()
            .map(|text| self.extract_investors(text))
            .filter(|found| !found.is_empty())
            .map(|found| found.join(", "));

        Some(
            RawRecord::new(self.id(), RecordKind::Startup, page.index)
                .with_field("Article_Title", title)
                .with_field("Source_URL", link.or_else(|| Some(page.locator.clone())))
                .with_field("Date", date)
                .with_field("Description", excerpt)
                .with_field("Investors", investors),
        )
    }
}

#[async_trait]
impl SourceAdapter for TechCrunchSource {
    fn id(&self) -> &str {
        "techcrunch"
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Startup
    }

    fn list_pages(&self, max_pages: usize) -> PageIter {
        let base = self.base_url.as_str().trim_end_matches('/').to_string();
        Box::new((0..max_pages).map(move |index| PageDescriptor::new(index, page_url(&base, index))))
    }

    async fn fetch_page(&self, page: &PageDescriptor, ctx: &FetchContext) -> Result<PageContent> {
        let body = ctx.get_text(&page.locator).await?;
        Ok(PageContent {
            descriptor: page.clone(),
            body,
        })
    }

    fn parse_page(&self, content: &PageContent) -> Result<Vec<RawRecord>> {
        let document = Html::parse_document(&content.body);

        let cards = self
            .cards
            .iter()
            .map(|sel| document.select(sel).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
            .ok_or_else(|| IngestError::parse("no article cards on page"))?;

        Ok(cards
            .into_iter()
            .filter_map(|card| self.parse_card(card, &content.descriptor))
            .collect())
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| IngestError::config(format!("invalid selector '{}': {:?}", css, e)))
}

fn selectors(list: &[&str]) -> Result<Vec<Selector>> {
    list.iter().map(|css| selector(css)).collect()
}

fn first_match<'a>(root: ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|sel| root.select(sel).next())
}

fn element_text(element: ElementRef<'_>) -> Option<String> {
    clean_text(&element.text().collect::<String>())
}

/// Listing page `index` (zero-based) under `base`; the first page has no number.
fn page_url(base: &str, index: usize) -> String {
    if index == 0 {
        format!("{}/tag/funding/", base)
    } else {
        format!("{}/tag/funding/page/{}/", base, index + 1)
    }
}
