//! Fault-tolerant corpus recovery.
//!
//! Turns raw corpus bytes into [`Record`]s plus a [`FailedChunk`] for every
//! record-shaped span that could not be recovered. Nothing is dropped
//! silently: `records.len() + failures.len()` always equals the number of
//! spans the splitter detected.
pub mod export;
pub mod repair;
pub mod split;

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::RecoveryConfig;
use split::{CorpusLayout, RawChunk, Span};

/// Fields every record must carry.
pub const REQUIRED_FIELDS: [&str; 2] = ["code_snippet", "vulnerability_type"];

/// Errors that prevent recovery from running at all, plus the dataset-level
/// fatal raised when a recovery produced nothing usable.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("failed to read corpus {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corpus is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },

    #[error("no valid records recovered from corpus ({failures} chunks failed to parse)")]
    EmptyDataset { failures: usize },
}

/// A schema-valid corpus entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub code_snippet: String,
    pub vulnerability_type: String,
    pub vulnerable_code: Option<String>,
    pub fixed_code: Option<String>,
    /// Raw `vul` value, validated when training.
    pub indicator: Option<Value>,
    /// 1-indexed position of the chunk this record came from.
    pub source_row_index: usize,
}

/// A chunk that could not be turned into a [`Record`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedChunk {
    /// 1-indexed chunk position.
    pub position: usize,
    /// Original chunk text, truncated for diagnostics.
    pub raw_content: String,
    pub error_message: String,
}

/// Outcome of a corpus recovery.
#[derive(Debug, Clone)]
pub struct Recovery {
    pub layout: CorpusLayout,
    pub records: Vec<Record>,
    pub failures: Vec<FailedChunk>,
}

impl Recovery {
    /// Number of record-shaped spans detected (recovered or not).
    #[must_use]
    pub fn spans(&self) -> usize {
        self.records.len() + self.failures.len()
    }

    /// True when no record was recovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The first `n` failures.
    #[must_use]
    pub fn failure_sample(&self, n: usize) -> &[FailedChunk] {
        &self.failures[..n.min(self.failures.len())]
    }

    /// Log counts and a bounded sample of diagnostics.
    pub fn log_summary(&self, sample: usize) {
        info!(
            "Recovered {} valid records, {} invalid chunks ({:?} layout)",
            self.records.len(),
            self.failures.len(),
            self.layout
        );
        for f in self.failure_sample(sample) {
            warn!("chunk {}: {}", f.position, f.error_message);
        }
        if self.failures.len() > sample {
            warn!("... and {} more invalid chunks", self.failures.len() - sample);
        }
    }

    /// Take the records, failing if there are none.
    pub fn into_records(self) -> Result<Vec<Record>, CorpusError> {
        if self.records.is_empty() {
            return Err(CorpusError::EmptyDataset {
                failures: self.failures.len(),
            });
        }
        Ok(self.records)
    }
}

/// Read and recover a corpus file.
pub fn load_corpus(path: &Path, config: &RecoveryConfig) -> Result<Recovery, CorpusError> {
    info!("Loading corpus: {}", path.display());
    let bytes = std::fs::read(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    recover_with(&bytes, config)
}

/// Recover records from raw corpus bytes with default settings.
pub fn recover(corpus: &[u8]) -> Result<Recovery, CorpusError> {
    recover_with(corpus, &RecoveryConfig::default())
}

/// Recover records from raw corpus bytes.
pub fn recover_with(corpus: &[u8], config: &RecoveryConfig) -> Result<Recovery, CorpusError> {
    let text = std::str::from_utf8(corpus).map_err(|e| CorpusError::InvalidUtf8 {
        valid_up_to: e.valid_up_to(),
    })?;

    let (layout, spans) = split::split_corpus(text);
    debug!("Detected {:?} layout with {} spans", layout, spans.len());

    let outcomes: Vec<Result<Record, FailedChunk>> = spans
        .into_par_iter()
        .map(|span| recover_span(span, config.max_diagnostic_chars))
        .collect();

    let mut records = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(record) => records.push(record),
            Err(failed) => failures.push(failed),
        }
    }

    Ok(Recovery {
        layout,
        records,
        failures,
    })
}

fn recover_span(span: Span, max_chars: usize) -> Result<Record, FailedChunk> {
    match span {
        Span::Parsed { position, value } => {
            record_from_value(position, &value).map_err(|error_message| FailedChunk {
                position,
                raw_content: truncate(&value.to_string(), max_chars),
                error_message,
            })
        }
        Span::Raw(chunk) => recover_chunk(&chunk, max_chars),
    }
}

fn recover_chunk(chunk: &RawChunk, max_chars: usize) -> Result<Record, FailedChunk> {
    let fail = |error_message: String| FailedChunk {
        position: chunk.position,
        raw_content: truncate(&chunk.content, max_chars),
        error_message,
    };

    let value = match serde_json::from_str::<Value>(&chunk.content) {
        Ok(value) => value,
        Err(first) => {
            let repaired = repair::repair(&chunk.content);
            match serde_json::from_str::<Value>(&repaired) {
                Ok(value) => {
                    debug!("chunk {} recovered after repair ({first})", chunk.position);
                    value
                }
                Err(second) => {
                    return Err(fail(format!("{first}; after repair: {second}")));
                }
            }
        }
    };

    record_from_value(chunk.position, &value).map_err(fail)
}

/// Build a record from a parsed JSON value, enforcing required fields.
fn record_from_value(position: usize, value: &Value) -> Result<Record, String> {
    let Value::Object(obj) = value else {
        return Err(format!(
            "expected a JSON object, found {}",
            json_type_name(value)
        ));
    };

    let code_snippet = required_string(obj, REQUIRED_FIELDS[0])?;
    let vulnerability_type = required_string(obj, REQUIRED_FIELDS[1])?;
    let vulnerable_code = optional_string(obj, "vulnerable_code")?;
    let fixed_code = optional_string(obj, "fixed_code")?;
    let indicator = obj.get("vul").filter(|v| !v.is_null()).cloned();

    Ok(Record {
        code_snippet,
        vulnerability_type,
        vulnerable_code,
        fixed_code,
        indicator,
        source_row_index: position,
    })
}

fn required_string(obj: &Map<String, Value>, field: &str) -> Result<String, String> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(format!("missing required field `{field}`")),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(format!(
            "field `{field}` must be a string, found {}",
            json_type_name(other)
        )),
    }
}

fn optional_string(obj: &Map<String, Value>, field: &str) -> Result<Option<String>, String> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(format!(
            "field `{field}` must be a string, found {}",
            json_type_name(other)
        )),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Truncate to at most `max_chars` characters.
fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
