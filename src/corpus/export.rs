/// Tabular export of recovered records and failures for inspection tooling.
use std::io::Write;

use serde_json::Value;

use super::{FailedChunk, Record};
use crate::features::{FEATURE_COLUMNS, categorize, extract, normalize};

/// Write one CSV row per record with derived feature and category columns.
pub fn write_records_csv<W: Write>(records: &[Record], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![
        "source_row_index",
        "code_snippet",
        "vulnerability_type",
        "vulnerable_code",
        "fixed_code",
        "clean_code",
    ];
    header.extend(FEATURE_COLUMNS);
    header.extend(["vuln_category", "vul"]);
    wtr.write_record(&header)?;

    for r in records {
        let features = extract(Some(&r.code_snippet)).unwrap_or_default();
        let mut row = vec![
            r.source_row_index.to_string(),
            r.code_snippet.clone(),
            r.vulnerability_type.clone(),
            r.vulnerable_code.clone().unwrap_or_default(),
            r.fixed_code.clone().unwrap_or_default(),
            normalize(Some(&r.code_snippet)),
        ];
        row.extend(features.values().iter().map(|v| v.to_string()));
        row.push(categorize(&r.vulnerability_type).to_string());
        row.push(indicator_text(r.indicator.as_ref()));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write `position, raw_content, error_message` rows.
pub fn write_failures_csv<W: Write>(failures: &[FailedChunk], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["position", "raw_content", "error_message"])?;
    for f in failures {
        wtr.write_record([
            f.position.to_string().as_str(),
            f.raw_content.as_str(),
            f.error_message.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn indicator_text(indicator: Option<&Value>) -> String {
    match indicator {
        None => "1".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
