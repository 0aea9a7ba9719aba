//! Post-processing of collected CSV files: drop exact duplicate rows and sort
//! by (Volume, Issue).
//!
//! Rows are compared field by field with no normalisation, so two rows that
//! differ only in whitespace or case are both kept.

use crate::error::{Result, TocError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Suffix appended to the input file stem
const UNIQUE_SUFFIX: &str = "_unique";

/// Counts reported after a deduplication pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupReport {
    /// Data rows read from the input
    pub original: usize,
    /// Data rows written to the output
    pub kept: usize,
    pub removed: usize,
    pub output: PathBuf,
}

/// Sibling path with `_unique` before the extension: `a/b.csv` -> `a/b_unique.csv`.
pub fn unique_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, UNIQUE_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, UNIQUE_SUFFIX),
    };
    input.with_file_name(name)
}

/// Deduplicate `input` into its `_unique` sibling.
///
/// The input file is never modified. Errors are logged before being returned.
pub fn dedupe_file(input: &Path) -> Result<DedupReport> {
    let output = unique_output_path(input);
    info!(input = %input.display(), "Reading collected articles");

    match dedupe_to(input, &output) {
        Ok(report) => {
            info!(
                original = report.original,
                kept = report.kept,
                removed = report.removed,
                output = %report.output.display(),
                "Deduplication complete"
            );
            Ok(report)
        }
        Err(e) => {
            error!(input = %input.display(), error = %e, "Deduplication failed");
            Err(e)
        }
    }
}

/// Deduplicate `input` into an explicit `output` path.
pub fn dedupe_to(input: &Path, output: &Path) -> Result<DedupReport> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_path(input)?;
    let headers = rdr.headers()?.clone();

    let volume_idx = column_index(&headers, "Volume")?;
    let issue_idx = column_index(&headers, "Issue")?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    let original = rows.len();

    let mut unique = drop_duplicates(rows);
    let kept = unique.len();

    sort_by_volume_issue(&mut unique, volume_idx, issue_idx)?;

    let mut wtr = csv::Writer::from_path(output)?;
    wtr.write_record(&headers)?;
    for row in &unique {
        wtr.write_record(row)?;
    }
    wtr.flush()?;

    Ok(DedupReport {
        original,
        kept,
        removed: original - kept,
        output: output.to_path_buf(),
    })
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}') == name)
        .ok_or_else(|| TocError::Validation(format!("Missing '{}' column", name)))
}

/// Keep the first occurrence of every distinct row, preserving order.
pub fn drop_duplicates(rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let mut seen: HashSet<Vec<String>> = HashSet::with_capacity(rows.len());
    rows.into_iter().filter(|row| seen.insert(row.clone())).collect()
}

/// Stable ascending sort on the integer Volume and Issue columns.
pub fn sort_by_volume_issue(rows: &mut [Vec<String>], volume_idx: usize, issue_idx: usize) -> Result<()> {
    let mut keyed = Vec::with_capacity(rows.len());
    for (line, row) in rows.iter().enumerate() {
        let volume = integer_field(row, volume_idx, "Volume", line)?;
        let issue = integer_field(row, issue_idx, "Issue", line)?;
        keyed.push((volume, issue));
    }

    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by_key(|&i| keyed[i]);

    let sorted: Vec<Vec<String>> = order.iter().map(|&i| std::mem::take(&mut rows[i])).collect();
    for (slot, row) in rows.iter_mut().zip(sorted) {
        *slot = row;
    }
    Ok(())
}

fn integer_field(row: &[String], idx: usize, name: &str, line: usize) -> Result<i64> {
    let raw = row.get(idx).map(|s| s.trim()).unwrap_or("");
    raw.parse::<i64>().map_err(|_| {
        TocError::Validation(format!("Row {}: {} '{}' is not an integer", line + 1, name, raw))
    })
}
