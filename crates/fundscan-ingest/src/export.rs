//! CSV and JSON export of canonical records
//!
//! Files are written to a temporary file in the target directory and then
//! renamed over the destination, so an interrupted export never leaves a
//! truncated output behind.

use crate::amount::Amount;
use crate::error::{IngestError, Result};
use crate::leads::Lead;
use crate::models::{CanonicalRecord, RecordKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// On-disk format of one export file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn as_str(&self) -> &str {
        self.extension()
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(format!("Invalid export format: {}. Valid formats: csv, json", s)),
        }
    }
}

const STARTUP_COLUMNS: &[&str] = &[
    "Company",
    "Website",
    "Round",
    "Amount",
    "Investors",
    "Date",
    "Industry",
    "Location",
    "Source_URL",
    "Description",
];

const AGENCY_COLUMNS: &[&str] = &[
    "Company",
    "Website",
    "Industry",
    "Location",
    "Services",
    "Specialties",
    "Hourly_Rate",
    "Source_URL",
    "Description",
];

/// CSV column set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportSchema {
    Startup,
    Agency,
}

impl ExportSchema {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            ExportSchema::Startup => STARTUP_COLUMNS,
            ExportSchema::Agency => AGENCY_COLUMNS,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            ExportSchema::Startup => RecordKind::Startup,
            ExportSchema::Agency => RecordKind::Agency,
        }
    }

    /// Agency columns only when every record is an agency.
    pub fn for_records(records: &[CanonicalRecord]) -> Self {
        if !records.is_empty() && records.iter().all(|r| r.kind == RecordKind::Agency) {
            ExportSchema::Agency
        } else {
            ExportSchema::Startup
        }
    }
}

impl From<RecordKind> for ExportSchema {
    fn from(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Startup => ExportSchema::Startup,
            RecordKind::Agency => ExportSchema::Agency,
        }
    }
}

/// Write `records` to `path` atomically.
pub fn export(
    records: &[CanonicalRecord],
    format: ExportFormat,
    schema: ExportSchema,
    path: &Path,
) -> Result<()> {
    write_atomic(path, |writer| match format {
        ExportFormat::Csv => write_csv(records, schema, writer),
        ExportFormat::Json => serde_json::to_writer_pretty(writer, records).map_err(|e| e.to_string()),
    })?;

    info!(
        phase = "export",
        outcome = "ok",
        format = %format,
        records = records.len(),
        path = %path.display(),
        "Exported records"
    );
    Ok(())
}

const LEAD_COLUMNS: &[&str] = &[
    "Company",
    "Website",
    "Round",
    "Amount",
    "Date",
    "Industry",
    "Industry_Category",
    "Lead_Score",
    "Lead_Priority",
    "Pitch_Opportunity",
    "Contact_Info",
];

/// Write scored leads to `path` atomically.
pub fn export_leads(leads: &[Lead], format: ExportFormat, path: &Path) -> Result<()> {
    write_atomic(path, |writer| match format {
        ExportFormat::Csv => write_lead_csv(leads, writer),
        ExportFormat::Json => serde_json::to_writer_pretty(writer, leads).map_err(|e| e.to_string()),
    })?;

    info!(
        phase = "export",
        outcome = "ok",
        format = %format,
        leads = leads.len(),
        path = %path.display(),
        "Exported leads"
    );
    Ok(())
}

/// `<dir>/<base>.<ext>`
pub fn output_path(dir: &Path, base: &str, format: ExportFormat) -> PathBuf {
    dir.join(format!("{}.{}", base, format.extension()))
}

fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> std::result::Result<(), String>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| IngestError::export(path, e))?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        write(&mut writer).map_err(|e| IngestError::export(path, e))?;
        writer.flush().map_err(|e| IngestError::export(path, e))?;
    }
    temp.as_file()
        .sync_all()
        .map_err(|e| IngestError::export(path, e))?;
    temp.persist(path)
        .map_err(|e| IngestError::export(path, e.error))?;
    Ok(())
}

fn write_csv(records: &[CanonicalRecord], schema: ExportSchema, writer: &mut dyn Write) -> std::result::Result<(), String> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(schema.columns()).map_err(|e| e.to_string())?;
    for record in records {
        let row: Vec<String> = schema
            .columns()
            .iter()
            .map(|column| cell(record, column))
            .collect();
        csv.write_record(&row).map_err(|e| e.to_string())?;
    }
    csv.flush().map_err(|e| e.to_string())
}

fn write_lead_csv(leads: &[Lead], writer: &mut dyn Write) -> std::result::Result<(), String> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(LEAD_COLUMNS).map_err(|e| e.to_string())?;
    for lead in leads {
        let row: Vec<String> = LEAD_COLUMNS
            .iter()
            .map(|column| match *column {
                "Industry_Category" => lead.industry_category.to_string(),
                "Lead_Score" => lead.lead_score.to_string(),
                "Lead_Priority" => lead.lead_priority.to_string(),
                "Pitch_Opportunity" => lead.pitch_opportunity.to_string(),
                "Contact_Info" => lead.contact_info.clone(),
                other => cell(&lead.record, other),
            })
            .collect();
        csv.write_record(&row).map_err(|e| e.to_string())?;
    }
    csv.flush().map_err(|e| e.to_string())
}

fn cell(record: &CanonicalRecord, column: &str) -> String {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    match column {
        "Company" => record.company_name.clone(),
        "Website" => text(&record.website),
        "Round" => text(&record.round_type),
        "Amount" => record.amount.as_ref().map(Amount::to_string).unwrap_or_default(),
        "Investors" => record.investors.join(", "),
        "Date" => record
            .funding_date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        "Industry" => text(&record.industry),
        "Location" => text(&record.location),
        "Source_URL" => text(&record.source_url),
        "Description" => text(&record.description),
        "Services" => record.services.join(", "),
        "Specialties" => record.specialties.join(", "),
        "Hourly_Rate" => text(&record.hourly_rate_range),
        _ => String::new(),
    }
}

/// Re-import a CSV export written with `schema`.
///
/// Columns absent from the schema come back empty; `kind` follows the schema.
pub fn read_csv(path: &Path, schema: ExportSchema) -> Result<Vec<CanonicalRecord>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| read_error(path, e))?;
    let headers = reader.headers().map_err(|e| read_error(path, e))?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| read_error(path, e))?;
        let values: HashMap<&str, &str> = headers.iter().zip(row.iter()).collect();
        let get = |column: &str| {
            values
                .get(column)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };
        let text = |column: &str| get(column).map(str::to_string);
        let list = |column: &str| {
            get(column)
                .map(|value| {
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|item| !item.is_empty())
                        .map(str::to_string)
                        .collect::<Vec<String>>()
                })
                .unwrap_or_default()
        };

        let amount = get("Amount").map(Amount::parse);
        records.push(CanonicalRecord {
            company_name: text("Company").unwrap_or_default(),
            website: text("Website"),
            round_type: text("Round"),
            amount_unparsed: amount.as_ref().is_some_and(Amount::is_unparsed),
            amount,
            investors: list("Investors"),
            funding_date: get("Date").and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            industry: text("Industry"),
            location: text("Location"),
            source_url: text("Source_URL"),
            description: text("Description"),
            services: list("Services"),
            specialties: list("Specialties"),
            hourly_rate_range: text("Hourly_Rate"),
            source: String::new(),
            kind: schema.kind(),
        });
    }
    Ok(records)
}

/// Re-import a JSON export.
pub fn read_json(path: &Path) -> Result<Vec<CanonicalRecord>> {
    let file = File::open(path).map_err(|e| read_error(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| read_error(path, e))
}

fn read_error(path: &Path, cause: impl std::fmt::Display) -> IngestError {
    IngestError::parse(format!("{}: {}", path.display(), cause))
}
