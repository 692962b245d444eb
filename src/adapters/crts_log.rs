//! Append-only CRTS performance logs: CSV for spreadsheets, JSONL for ingest.

use crate::domain::model::CrtsScore;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Flat row with a stable column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrtsLogRow {
    pub timestamp: String,
    pub query: String,
    pub sf: f64,
    pub crr: f64,
    pub ar: f64,
    pub ga: f64,
    pub crts: f64,
    #[serde(rename = "L")]
    pub latency: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
}

impl CrtsLogRow {
    pub fn new(query: &str, score: &CrtsScore, timestamp: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            timestamp: timestamp.to_rfc3339_opts(chrono::SecondsFormat::Micros, false),
            query: query.to_string(),
            sf: score.sf,
            crr: score.crr,
            ar: score.ar,
            ga: score.ga,
            crts: score.crts,
            latency: score.latency_secs,
            alpha: score.weights.alpha,
            beta: score.weights.beta,
            gamma: score.weights.gamma,
            delta: score.weights.delta,
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Appends a CSV record; the header is written only when the file is new.
pub fn append_csv(path: &Path, row: &CrtsLogRow) -> Result<()> {
    ensure_parent(path)?;
    let file_exists = path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    writer.serialize(row)?;
    writer.flush()?;
    Ok(())
}

/// Appends one JSON object per line, with `extra` fields merged in.
pub fn append_jsonl(
    path: &Path,
    row: &CrtsLogRow,
    extra: Option<&serde_json::Map<String, serde_json::Value>>,
) -> Result<()> {
    ensure_parent(path)?;
    let mut value = serde_json::to_value(row)?;
    if let (Some(extra), Some(obj)) = (extra, value.as_object_mut()) {
        for (k, v) in extra {
            obj.insert(k.clone(), v.clone());
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut line = serde_json::to_string(&value)?;
    line.push('\n');
    file.write_all(line.as_bytes())?;
    Ok(())
}

pub fn log_both(
    csv_path: &Path,
    jsonl_path: &Path,
    row: &CrtsLogRow,
    extra: Option<&serde_json::Map<String, serde_json::Value>>,
) -> Result<()> {
    append_csv(csv_path, row)?;
    append_jsonl(jsonl_path, row, extra)?;
    tracing::debug!(
        "CRTS logged to {} and {}",
        csv_path.display(),
        jsonl_path.display()
    );
    Ok(())
}
