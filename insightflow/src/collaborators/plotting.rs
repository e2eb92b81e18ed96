//! Chart production.

use super::columns::{daily_totals, group_totals};
use super::{sales_measure, Plotter};
use crate::core::{ArtifactRef, Table};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::{debug, warn};

const TOP_PRODUCTS: usize = 5;

/// The charts the visualization agent asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlotKind {
    /// Sales summed per day. Columns: the date column.
    SalesOverTime,
    /// The best-selling products. Columns: the product column.
    TopProducts,
}

impl PlotKind {
    /// Returns the artifact file stem for this kind.
    #[must_use]
    pub const fn file_stem(self) -> &'static str {
        match self {
            Self::SalesOverTime => "sales_trend",
            Self::TopProducts => "top_products",
        }
    }
}

/// What a plotter produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlotOutcome {
    /// Files were written.
    Artifacts(Vec<ArtifactRef>),
    /// The chart does not apply to this table.
    NotApplicable(String),
}

/// Plotter that never draws.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPlotter;

impl Plotter for NullPlotter {
    fn plot(&self, _table: &Table, _columns: &[String], _kind: PlotKind) -> PlotOutcome {
        PlotOutcome::NotApplicable("plot rendering is not configured".to_string())
    }
}

/// Writes the aggregated series behind each chart as CSV under its output
/// directory, ready for any charting front end to draw.
#[derive(Debug, Clone)]
pub struct DataSeriesPlotter {
    output_dir: PathBuf,
}

impl DataSeriesPlotter {
    /// Creates a plotter writing into `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn series(table: &Table, columns: &[String], kind: PlotKind) -> Result<String, String> {
        let column = columns
            .first()
            .and_then(|name| table.column_index(name))
            .ok_or_else(|| format!("no {} column given", kind.file_stem()))?;
        let measure = sales_measure(table).ok_or("no numeric sales column")?;
        let label = measure.label(table);

        let mut csv = String::new();
        match kind {
            PlotKind::SalesOverTime => {
                let totals = daily_totals(table, column, measure);
                if totals.is_empty() {
                    return Err(format!("column '{}' has no parseable dates", table.columns[column]));
                }
                let _ = writeln!(csv, "date,{label}");
                for (day, total) in totals {
                    let _ = writeln!(csv, "{day},{total:.2}");
                }
            }
            PlotKind::TopProducts => {
                let _ = writeln!(csv, "{},{label}", table.columns[column]);
                for (product, total) in group_totals(table, column, measure).into_iter().take(TOP_PRODUCTS) {
                    let _ = writeln!(csv, "\"{}\",{total:.2}", product.replace('"', "\"\""));
                }
            }
        }
        Ok(csv)
    }
}

impl Plotter for DataSeriesPlotter {
    fn plot(&self, table: &Table, columns: &[String], kind: PlotKind) -> PlotOutcome {
        let csv = match Self::series(table, columns, kind) {
            Ok(csv) => csv,
            Err(reason) => return PlotOutcome::NotApplicable(reason),
        };

        let path = self.output_dir.join(format!("{}.csv", kind.file_stem()));
        let written = std::fs::create_dir_all(&self.output_dir).and_then(|()| std::fs::write(&path, csv));
        match written {
            Ok(()) => {
                debug!(path = %path.display(), ?kind, "Chart series written");
                PlotOutcome::Artifacts(vec![ArtifactRef::new("plot", path)])
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not write chart series");
                PlotOutcome::NotApplicable(format!("could not write {}: {e}", path.display()))
            }
        }
    }
}
