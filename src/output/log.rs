//! Append-only visit log
//!
//! One record per terminal URL, either as JSON Lines (the full record) or as
//! TSV (`url`, `depth`, `status|failure`, `addresses`, `timestamp`). Files
//! are opened in append mode so a resumed crawl continues the same log.

use crate::config::{LogFormat, OutputConfig};
use crate::output::traits::{OutputError, OutputResult, OutputSink};
use crate::state::{FailureKind, VisitResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const TSV_COLUMNS: [&str; 5] = ["url", "depth", "outcome", "addresses", "timestamp"];

/// One TSV log row, columns in `TSV_COLUMNS` order
#[derive(Debug, Serialize, Deserialize)]
struct TsvRow {
    url: String,
    depth: u32,
    outcome: String,
    addresses: String,
    timestamp: DateTime<Utc>,
}

impl TsvRow {
    fn from_result(result: &VisitResult) -> Self {
        let addresses: Vec<&str> = result.addresses.iter().map(String::as_str).collect();
        Self {
            url: result.url.clone(),
            depth: result.depth,
            outcome: result.outcome_label(),
            addresses: addresses.join(","),
            timestamp: result.timestamp,
        }
    }

    fn into_result(self) -> Option<VisitResult> {
        let (http_status, failure) = match self.outcome.parse::<u16>() {
            Ok(status) => (Some(status), None),
            Err(_) => (None, Some(FailureKind::parse(&self.outcome)?)),
        };

        Some(VisitResult {
            url: self.url,
            depth: self.depth,
            discovered_from: None,
            http_status,
            failure,
            addresses: self
                .addresses
                .split(',')
                .filter(|a| !a.is_empty())
                .map(String::from)
                .collect(),
            links_found: 0,
            title: None,
            timestamp: self.timestamp,
            retry_count: 0,
            elapsed_ms: 0,
        })
    }
}

fn open_append(path: &Path) -> OutputResult<(File, bool)> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_empty = file.metadata()?.len() == 0;
    Ok((file, is_empty))
}

/// JSON Lines visit log
pub struct JsonlSink {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl JsonlSink {
    pub fn open(path: &Path) -> OutputResult<Self> {
        let (file, _) = open_append(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
        })
    }
}

impl OutputSink for JsonlSink {
    fn write(&mut self, result: &VisitResult) -> OutputResult<()> {
        serde_json::to_writer(&mut self.writer, result)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Tab-separated visit log with a header row
///
/// Fields holding a tab, a quote or a newline are quoted rather than
/// rewritten.
pub struct TsvSink {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl TsvSink {
    pub fn open(path: &Path) -> OutputResult<Self> {
        let (file, is_empty) = open_append(path)?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(file);
        if is_empty {
            writer.write_record(TSV_COLUMNS)?;
            writer.flush()?;
        }

        Ok(Self {
            writer,
            path: path.to_path_buf(),
        })
    }
}

impl OutputSink for TsvSink {
    fn write(&mut self, result: &VisitResult) -> OutputResult<()> {
        self.writer.serialize(TsvRow::from_result(result))?;
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Keeps results in memory, for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    results: Arc<Mutex<Vec<VisitResult>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far
    pub fn results(&self) -> Vec<VisitResult> {
        self.results
            .lock()
            .map(|results| results.clone())
            .unwrap_or_default()
    }
}

impl OutputSink for MemorySink {
    fn write(&mut self, result: &VisitResult) -> OutputResult<()> {
        self.results
            .lock()
            .map_err(|e| OutputError::Write(e.to_string()))?
            .push(result.clone());
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        Ok(())
    }
}

/// Opens the sink configured by the `[output]` section
///
/// Creates the output directory if needed.
pub fn open_sink(config: &OutputConfig) -> OutputResult<Box<dyn OutputSink>> {
    std::fs::create_dir_all(&config.directory)?;
    let path = config.log_path();

    let sink: Box<dyn OutputSink> = match config.format {
        LogFormat::Jsonl => Box::new(JsonlSink::open(&path)?),
        LogFormat::Tsv => Box::new(TsvSink::open(&path)?),
    };

    tracing::info!("Writing visit log to {}", path.display());
    Ok(sink)
}

/// Reads a visit log back, in either format
///
/// The format follows the file extension (`.tsv`, anything else is JSON
/// Lines). Malformed lines, such as a record cut short by a crash, are
/// skipped with a warning. TSV logs carry fewer fields, so titles, parents
/// and link counts come back empty.
pub fn read_visit_log(path: &Path) -> OutputResult<Vec<VisitResult>> {
    if path.extension().is_some_and(|ext| ext == "tsv") {
        return read_tsv_log(path);
    }

    let reader = BufReader::new(File::open(path)?);
    let mut results = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str(&line) {
            Ok(result) => results.push(result),
            Err(_) => tracing::warn!(
                "Skipping malformed line {} in {}",
                index + 1,
                path.display()
            ),
        }
    }

    Ok(results)
}

fn read_tsv_log(path: &Path) -> OutputResult<Vec<VisitResult>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)?;
    let mut results = Vec::new();

    for (index, row) in reader.deserialize::<TsvRow>().enumerate() {
        let parsed = match row {
            Ok(row) => row.into_result(),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(_) => None,
        };

        match parsed {
            Some(result) => results.push(result),
            None => tracing::warn!(
                "Skipping malformed record {} in {}",
                index + 1,
                path.display()
            ),
        }
    }

    Ok(results)
}
