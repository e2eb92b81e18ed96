//! Comma-separated dataset ingestion.

use super::{DataIngestion, LoadedData};
use crate::core::{parse_number, Table};
use crate::errors::CollaboratorError;
use crate::utils::parse_date;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, info};

const COLLABORATOR: &str = "csv_ingestion";

/// Loads CSV files with a header row.
///
/// Input is decoded as UTF-8, falling back to Latin-1 for legacy exports.
/// Quoted fields may contain commas, doubled quotes and line breaks.
/// Leading spaces after a delimiter are skipped and header names are trimmed.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvIngestion;

impl CsvIngestion {
    /// Creates the ingestion collaborator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Parses CSV text into a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the text has no header row.
    pub fn parse(text: &str) -> Result<Table, CollaboratorError> {
        let mut records = parse_records(text.trim_start_matches('\u{feff}')).into_iter();
        let header = records
            .next()
            .ok_or_else(|| CollaboratorError::invalid_input(COLLABORATOR, "dataset has no header row"))?;

        let mut table = Table::new(header.into_iter().map(|h| h.trim().to_string()).collect());
        for record in records {
            table.push_row(record);
        }
        Ok(table)
    }
}

impl DataIngestion for CsvIngestion {
    fn load(&self, path: &Path) -> Result<LoadedData, CollaboratorError> {
        let bytes = std::fs::read(path).map_err(|e| {
            CollaboratorError::failed(COLLABORATOR, format!("cannot read {}: {e}", path.display()))
        })?;
        let table = Self::parse(&decode(bytes))?;
        info!(path = %path.display(), rows = table.len(), columns = table.columns.len(), "Dataset loaded");
        let profile = profile(&table);
        Ok(LoadedData { table, profile })
    }

    fn clean(&self, table: &Table) -> Table {
        let mut working = table.clone();

        for fragments in [&["price", "cost"][..], &["quantity", "units"][..]] {
            if let Some(index) = working.find_column(fragments) {
                let fill = if fragments[0] == "price" { Fill::Mean } else { Fill::Median };
                coerce_and_fill(&mut working, index, fill);
            }
        }
        if let Some(index) = super::date_column(&working) {
            for row in &mut working.rows {
                if parse_date(&row[index]).is_none() {
                    row[index].clear();
                }
            }
        }

        let mut seen = HashSet::new();
        let mut cleaned = Table::new(working.columns.clone());
        for row in working.rows {
            if row.iter().any(|cell| cell.trim().is_empty()) {
                continue;
            }
            if seen.insert(row.clone()) {
                cleaned.push_row(row);
            }
        }

        debug!(original_rows = table.len(), cleaned_rows = cleaned.len(), "Dataset cleaned");
        cleaned
    }
}

#[derive(Debug, Clone, Copy)]
enum Fill {
    Mean,
    Median,
}

/// Coerces a column to numbers and fills the gaps. Cells that do not parse
/// count as gaps.
fn coerce_and_fill(table: &mut Table, index: usize, fill: Fill) {
    let mut values: Vec<f64> = table.numeric_column(index).into_iter().flatten().collect();
    if values.is_empty() {
        return;
    }
    let replacement = match fill {
        Fill::Mean => mean(&values),
        Fill::Median => {
            values.sort_by(f64::total_cmp);
            let mid = values.len() / 2;
            if values.len() % 2 == 0 {
                (values[mid - 1] + values[mid]) / 2.0
            } else {
                values[mid]
            }
        }
    };
    for row in &mut table.rows {
        if parse_number(&row[index]).is_none() {
            row[index] = format_number(replacement);
        }
    }
}

fn decode(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| e.into_bytes().iter().map(|&b| char::from(b)).collect())
}

fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_started = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if !field_started => {
                in_quotes = true;
                field_started = true;
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                field_started = false;
            }
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                field_started = false;
                if record.iter().any(|f| !f.is_empty()) {
                    records.push(std::mem::take(&mut record));
                } else {
                    record.clear();
                }
            }
            ' ' | '\t' if !field_started => {}
            _ => {
                field.push(c);
                field_started = true;
            }
        }
    }
    record.push(field);
    if record.iter().any(|f| !f.is_empty()) {
        records.push(record);
    }
    records
}

/// Renders a text profile of the table: shape, per-column types and
/// non-empty counts, and summary statistics.
fn profile(table: &Table) -> String {
    let mut out = String::from("### Data Profile Report ###\n\n");
    let _ = writeln!(out, "1. Shape: {} rows x {} columns\n", table.len(), table.columns.len());
    let _ = writeln!(out, "| Column | Type | Non-empty | Summary |");
    let _ = writeln!(out, "|---|---|---|---|");

    for (index, name) in table.columns.iter().enumerate() {
        let non_empty = table.column(index).filter(|c| !c.trim().is_empty()).count();
        let (kind, summary) = if table.is_numeric_column(index) {
            let values: Vec<f64> = table.numeric_column(index).into_iter().flatten().collect();
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (
                "numeric",
                format!(
                    "min {}, max {}, mean {}",
                    format_number(min),
                    format_number(max),
                    format_number(mean(&values))
                ),
            )
        } else {
            let unique: HashSet<&str> = table.column(index).filter(|c| !c.trim().is_empty()).collect();
            let mut sample: Vec<&str> = unique.iter().copied().collect();
            sample.sort_unstable();
            sample.truncate(5);
            ("text", format!("{} unique (e.g. {})", unique.len(), sample.join(", ")))
        };
        let _ = writeln!(out, "| {name} | {kind} | {non_empty} | {summary} |");
    }
    out
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}
