//! Predictive analysis.

use super::columns::{category_column, daily_totals, quantity_column};
use super::{date_column, sales_measure, Modeler};
use crate::core::{ArtifactRef, Table};
use crate::errors::CollaboratorError;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Default forecast horizon in days.
pub const DEFAULT_FORECAST_STEPS: usize = 14;

const TRAILING_WINDOW: usize = 7;
const ANOMALY_Z_SCORE: f64 = 2.0;

/// One analysis result: a written artifact, or why there is none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelArtifact {
    /// The analysis ran and wrote its output.
    Written(ArtifactRef),
    /// The analysis does not apply or failed.
    NotAvailable(String),
}

impl ModelArtifact {
    /// Returns the artifact, if one was written.
    #[must_use]
    pub fn artifact(&self) -> Option<&ArtifactRef> {
        match self {
            Self::Written(artifact) => Some(artifact),
            Self::NotAvailable(_) => None,
        }
    }
}

/// Outputs of one modeling pass, stored in the context as a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReport {
    /// Daily sales forecast.
    pub sales_forecast: ModelArtifact,
    /// Transactions flagged as outliers.
    pub anomalies: ModelArtifact,
    /// Next-period demand per category.
    pub demand_predictions: ModelArtifact,
}

impl ModelReport {
    /// Returns the written artifacts.
    #[must_use]
    pub fn artifacts(&self) -> Vec<ArtifactRef> {
        [&self.sales_forecast, &self.anomalies, &self.demand_predictions]
            .into_iter()
            .filter_map(ModelArtifact::artifact)
            .cloned()
            .collect()
    }
}

/// Simple statistical baselines.
///
/// - Forecast: daily totals with missing days as zero, projected forward
///   as the mean of the trailing seven days.
/// - Anomalies: transactions whose amount lies more than two standard
///   deviations from the mean.
/// - Demand: a least-squares trend of quantity over row order per category,
///   evaluated at the next row.
///
/// Results are written as JSON into the output directory.
#[derive(Debug, Clone)]
pub struct BaselineModeler {
    output_dir: PathBuf,
    forecast_steps: usize,
}

impl BaselineModeler {
    /// Creates a modeler writing into `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            forecast_steps: DEFAULT_FORECAST_STEPS,
        }
    }

    /// Sets the forecast horizon in days.
    #[must_use]
    pub fn with_forecast_steps(mut self, steps: usize) -> Self {
        self.forecast_steps = steps.max(1);
        self
    }

    fn write(&self, kind: &str, file: &str, value: &serde_json::Value) -> ModelArtifact {
        let path = self.output_dir.join(file);
        let result = std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| e.to_string())
            .and_then(|()| serde_json::to_string_pretty(value).map_err(|e| e.to_string()))
            .and_then(|content| std::fs::write(&path, content).map_err(|e| e.to_string()));
        match result {
            Ok(()) => {
                debug!(path = %path.display(), kind, "Model artifact written");
                ModelArtifact::Written(ArtifactRef::new(kind, path))
            }
            Err(e) => ModelArtifact::NotAvailable(format!("could not write {}: {e}", path.display())),
        }
    }

    fn forecast(&self, table: &Table) -> ModelArtifact {
        let Some(date) = date_column(table) else {
            return ModelArtifact::NotAvailable("no date column for time series analysis".into());
        };
        let Some(measure) = sales_measure(table) else {
            return ModelArtifact::NotAvailable("no numeric sales data".into());
        };
        let daily = fill_missing_days(&daily_totals(table, date, measure));
        let Some(&(last_day, _)) = daily.last() else {
            return ModelArtifact::NotAvailable("time series data preparation failed".into());
        };

        let window: Vec<f64> = daily.iter().rev().take(TRAILING_WINDOW).map(|(_, v)| *v).collect();
        let level = round2(mean(&window));
        let rows: Vec<serde_json::Value> = (1..=self.forecast_steps)
            .filter_map(|step| last_day.checked_add_days(Days::new(step as u64)))
            .map(|day| json!({ "date": day.to_string(), "forecasted_sales": level }))
            .collect();

        self.write("forecast", "sales_forecast.json", &json!(rows))
    }

    fn anomalies(&self, table: &Table) -> ModelArtifact {
        let Some(measure) = sales_measure(table) else {
            return ModelArtifact::NotAvailable("sales column not found for anomaly detection".into());
        };
        let amounts: Vec<(usize, f64)> = measure
            .values(table)
            .into_iter()
            .enumerate()
            .filter_map(|(i, v)| Some((i, v?)))
            .collect();
        let values: Vec<f64> = amounts.iter().map(|(_, v)| *v).collect();
        let (mean, std) = (mean(&values), std_dev(&values));

        let flagged: Vec<serde_json::Value> = amounts
            .into_iter()
            .filter_map(|(row, amount)| {
                let z = if std > 0.0 { (amount - mean) / std } else { 0.0 };
                (z.abs() > ANOMALY_Z_SCORE).then(|| {
                    let record: BTreeMap<&str, &str> = table
                        .columns
                        .iter()
                        .map(String::as_str)
                        .zip(table.rows[row].iter().map(String::as_str))
                        .collect();
                    json!({ "row": row, "amount": round2(amount), "z_score": round2(z), "record": record })
                })
            })
            .collect();

        self.write("anomalies", "transaction_anomalies.json", &json!(flagged))
    }

    fn demand(&self, table: &Table) -> ModelArtifact {
        let Some(category) = category_column(table) else {
            return ModelArtifact::NotAvailable("category column not found for demand prediction".into());
        };
        let Some(quantity) = quantity_column(table) else {
            return ModelArtifact::NotAvailable("quantity/units column not found for demand prediction".into());
        };

        let mut series: BTreeMap<&str, Vec<(f64, f64)>> = BTreeMap::new();
        for (row, (name, qty)) in table.column(category).zip(table.numeric_column(quantity)).enumerate() {
            if let Some(qty) = qty {
                series.entry(name).or_default().push((as_f64(row), qty));
            }
        }

        let next = as_f64(table.len());
        let rows: Vec<serde_json::Value> = series
            .into_iter()
            .map(|(name, points)| {
                let (slope, intercept) = least_squares(&points);
                json!({
                    "category": name,
                    "trend_coefficient": (slope * 10_000.0).round() / 10_000.0,
                    "predicted_next_demand": round2(slope.mul_add(next, intercept)),
                })
            })
            .collect();

        self.write("demand", "category_demand_predictions.json", &json!(rows))
    }
}

impl Modeler for BaselineModeler {
    fn analyze(&self, table: &Table) -> Result<ModelReport, CollaboratorError> {
        if table.is_empty() {
            return Err(CollaboratorError::invalid_input("baseline_modeler", "no rows to model"));
        }
        let report = ModelReport {
            sales_forecast: self.forecast(table),
            anomalies: self.anomalies(table),
            demand_predictions: self.demand(table),
        };
        info!(artifacts = report.artifacts().len(), "Modeling complete");
        Ok(report)
    }
}

fn fill_missing_days(totals: &BTreeMap<NaiveDate, f64>) -> Vec<(NaiveDate, f64)> {
    let (Some((&first, _)), Some((&last, _))) = (totals.first_key_value(), totals.last_key_value()) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|day| *day <= last)
        .map(|day| (day, totals.get(&day).copied().unwrap_or(0.0)))
        .collect()
}

fn least_squares(points: &[(f64, f64)]) -> (f64, f64) {
    let n = as_f64(points.len());
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let var_x: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    if var_x == 0.0 {
        return (0.0, mean_y);
    }
    let cov: f64 = points.iter().map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();
    let slope = cov / var_x;
    (slope, slope.mul_add(-mean_x, mean_y))
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / as_f64(values.len())
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / as_f64(values.len())).sqrt()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(n: usize) -> f64 {
    n as f64
}
