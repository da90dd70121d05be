//! Result documents and output writers
//!
//! Thin I/O wrappers around the run's result: one JSON document, JSONL with
//! one line per record, or CSV with the header taken from the first record's
//! keys and RFC 4180 quoting.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Jsonl,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "jsonl" => Ok(Self::Jsonl),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown output format {other:?} (json|jsonl|csv)")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Jsonl => write!(f, "jsonl"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub page_count: usize,
    pub item_count: usize,
    pub duration_ms: u64,
    pub errors: Vec<String>,
}

/// The run's result document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub data: Vec<Value>,
    pub metadata: ResultMetadata,
}

/// Write the result in the requested format.
pub fn write_result(result: &ScrapeResult, path: &Path, format: OutputFormat) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, result).context("failed to write JSON")?;
            writer.write_all(b"\n")?;
        }
        OutputFormat::Jsonl => write_jsonl(&mut writer, &result.data)?,
        OutputFormat::Csv => write_csv(&mut writer, &result.data)?,
    }
    writer.flush()?;
    log::info!(
        "wrote {} records to {} ({format})",
        result.data.len(),
        path.display()
    );
    Ok(())
}

/// One record per line.
fn write_jsonl<W: Write>(mut w: W, records: &[Value]) -> Result<()> {
    for record in records {
        serde_json::to_writer(&mut w, record).context("failed to write JSONL record")?;
        w.write_all(b"\n")?;
    }
    Ok(())
}

/// CSV with the header row taken from the first record's keys.
///
/// Nested values are serialized as JSON strings; missing keys become empty
/// cells. Quoting follows RFC 4180: fields containing the separator, quotes
/// or line breaks are quoted, embedded quotes doubled.
fn write_csv<W: Write>(mut w: W, records: &[Value]) -> Result<()> {
    let Some(first) = records.first().and_then(Value::as_object) else {
        return Ok(());
    };
    let header: Vec<String> = first.keys().cloned().collect();
    write_csv_row(&mut w, &header)?;
    for record in records {
        let row: Vec<String> = header
            .iter()
            .map(|key| {
                record
                    .get(key)
                    .map_or_else(String::new, cell_text)
            })
            .collect();
        write_csv_row(&mut w, &row)?;
    }
    Ok(())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_csv_row<W: Write>(mut w: W, row: &[String]) -> Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            w.write_all(b",")?;
        }
        first = false;
        if needs_quotes(cell) {
            let escaped = cell.replace('"', "\"\"");
            write!(w, "\"{escaped}\"")?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\r\n")?;
    Ok(())
}
