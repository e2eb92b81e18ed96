//! In-memory tabular data passed between agents.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// A rectangular table of string cells with named columns.
///
/// Cells are kept as text; numeric views are derived on demand so that the
/// same table can feed profiling, cleaning and modeling collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Column names, in order.
    pub columns: Vec<String>,
    /// Rows; every row has `columns.len()` cells.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates an empty table with the given columns.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row, padding or truncating it to the column count.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the index of the column with exactly this name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns the index of the first column whose lowercase name contains
    /// any of the given fragments.
    #[must_use]
    pub fn find_column(&self, fragments: &[&str]) -> Option<usize> {
        self.columns.iter().position(|c| {
            let lower = c.to_lowercase();
            fragments.iter().any(|f| lower.contains(f))
        })
    }

    /// Iterates over the cells of one column.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).map_or("", String::as_str))
    }

    /// Parses one column as numbers; unparseable cells are `None`.
    #[must_use]
    pub fn numeric_column(&self, index: usize) -> Vec<Option<f64>> {
        self.column(index).map(parse_number).collect()
    }

    /// Returns true if every non-empty cell of the column parses as a number.
    #[must_use]
    pub fn is_numeric_column(&self, index: usize) -> bool {
        let (parsed, non_empty) = self.numeric_counts(index);
        non_empty > 0 && parsed == non_empty
    }

    /// Returns true if at least half of the non-empty cells parse as numbers.
    #[must_use]
    pub fn is_mostly_numeric_column(&self, index: usize) -> bool {
        let (parsed, non_empty) = self.numeric_counts(index);
        parsed > 0 && parsed * 2 >= non_empty
    }

    fn numeric_counts(&self, index: usize) -> (usize, usize) {
        self.column(index)
            .filter(|cell| !cell.trim().is_empty())
            .fold((0, 0), |(parsed, non_empty), cell| {
                (parsed + usize::from(parse_number(cell).is_some()), non_empty + 1)
            })
    }

    /// Renders the first `n` rows as a Markdown table.
    #[must_use]
    pub fn head_markdown(&self, n: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "| {} |", self.columns.join(" | "));
        let _ = writeln!(
            out,
            "|{}|",
            self.columns.iter().map(|_| "---").collect::<Vec<_>>().join("|")
        );
        for row in self.rows.iter().take(n) {
            let _ = writeln!(out, "| {} |", row.join(" | "));
        }
        out
    }
}

/// Parses a cell as a finite number. `NaN` and infinities are rejected.
#[must_use]
pub fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}
