//! Live HTML adapter against a mock TechCrunch listing

use fundscan_ingest::amount::{Currency, Money};
use fundscan_ingest::export::{read_csv, ExportSchema};
use fundscan_ingest::sources::{SourceAdapter, TechCrunchSource};
use fundscan_ingest::{IngestError, OutputFormat, ScrapeConfig, ScrapeRun};
use chrono::NaiveDate;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

const FIRST_PAGE: &str = r#"
<html><body>
  <div class="loop-card">
    <h3 class="loop-card__title"><a href="/2024/01/15/acme-raises-12m/">Acme raises $12M Series A to automate payroll</a></h3>
    <time datetime="2024-01-15T14:00:00Z">January 15, 2024</time>
    <p class="loop-card__excerpt">The round was led by Accel, with participation from Index Ventures.</p>
  </div>
  <div class="loop-card">
    <h3 class="loop-card__title"><a href="/2024/01/12/nimbus/">Nimbus secures €3M seed round</a></h3>
    <time>January 12, 2024</time>
  </div>
</body></html>
"#;

fn config(dir: &TempDir) -> ScrapeConfig {
    ScrapeConfig::builder()
        .max_pages(2)
        .max_retries(1)
        .delay(Duration::ZERO)
        .backoff(Duration::from_millis(5), Duration::from_millis(10))
        .output_format(OutputFormat::Csv)
        .output_dir(dir.path())
        .output_file("techcrunch")
        .build()
}

async fn serve_listing(server: &MockServer, second_page: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/tag/funding/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FIRST_PAGE))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tag/funding/page/2/"))
        .respond_with(second_page)
        .mount(server)
        .await;
}

fn adapter(server: &MockServer) -> Vec<Box<dyn SourceAdapter>> {
    vec![Box::new(
        TechCrunchSource::new(&server.uri()).expect("Mock server URI should parse"),
    )]
}

#[tokio::test]
async fn test_listing_scraped_normalized_and_exported() {
    let server = MockServer::start().await;
    serve_listing(&server, ResponseTemplate::new(500)).await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    let run = ScrapeRun::with_adapters(config(&dir), adapter(&server)).expect("Valid config");
    let summary = run.execute(&CancellationToken::new()).await.expect("Run should succeed");

    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.kept, 2);
    assert_eq!(summary.sources[0].pages_fetched, 2);
    assert_eq!(summary.errors.len(), 1);
    assert!(matches!(
        summary.errors[0].cause,
        IngestError::FetchFailed { attempts: 2, .. }
    ));

    let records = read_csv(&dir.path().join("techcrunch.csv"), ExportSchema::Startup)
        .expect("Export should re-import");
    let acme = &records[0];
    assert_eq!(acme.company_name, "Acme");
    assert_eq!(acme.round_type.as_deref(), Some("Series A"));
    assert_eq!(
        acme.amount.as_ref().and_then(|amount| amount.money()),
        Some(Money::new(Currency::Usd, 12_000_000))
    );
    assert_eq!(acme.investors, vec!["Accel", "Index Ventures"]);
    assert_eq!(acme.funding_date, NaiveDate::from_ymd_opt(2024, 1, 15));
    assert_eq!(
        acme.source_url.as_deref(),
        Some(format!("{}/2024/01/15/acme-raises-12m/", server.uri()).as_str())
    );

    let nimbus = &records[1];
    assert_eq!(nimbus.company_name, "Nimbus");
    assert_eq!(nimbus.round_type.as_deref(), Some("Seed"));
    assert_eq!(nimbus.funding_date, NaiveDate::from_ymd_opt(2024, 1, 12));
    assert!(nimbus.investors.is_empty());
}

#[tokio::test]
async fn test_blocked_page_is_skipped_not_fatal() {
    let server = MockServer::start().await;
    serve_listing(
        &server,
        ResponseTemplate::new(200).set_body_string("<html><body><h1>Please verify you are human</h1></body></html>"),
    )
    .await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    let run = ScrapeRun::with_adapters(config(&dir), adapter(&server)).expect("Valid config");
    let summary = run.execute(&CancellationToken::new()).await.expect("Run should succeed");

    assert_eq!(summary.kept, 2);
    assert_eq!(summary.errors.len(), 1);
    assert!(matches!(summary.errors[0].cause, IngestError::ParseFailed(_)));
    assert_eq!(summary.errors[0].descriptor.as_ref().map(|page| page.index), Some(1));
}

#[tokio::test]
async fn test_unreachable_source_yields_no_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    let run = ScrapeRun::with_adapters(config(&dir), adapter(&server)).expect("Valid config");
    let summary = run.execute(&CancellationToken::new()).await.expect("Zero records is not fatal");

    assert_eq!(summary.kept, 0);
    assert!(summary.written.is_empty());
    assert_eq!(summary.sources[0].errors, 1);
}
