//! Column detection shared by the built-in collaborators.

use crate::core::Table;
use crate::utils::parse_date;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// How a per-row sales amount is derived from a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalesMeasure {
    /// Price column times quantity column.
    Product {
        /// Index of the price column.
        price: usize,
        /// Index of the quantity column.
        quantity: usize,
    },
    /// A single numeric column used as the amount.
    Column(usize),
}

impl SalesMeasure {
    /// Computes the amount of every row. Rows with unparseable cells are `None`.
    #[must_use]
    pub fn values(&self, table: &Table) -> Vec<Option<f64>> {
        match *self {
            Self::Product { price, quantity } => table
                .numeric_column(price)
                .into_iter()
                .zip(table.numeric_column(quantity))
                .map(|(p, q)| Some(p? * q?))
                .collect(),
            Self::Column(index) => table.numeric_column(index),
        }
    }

    /// Returns a label naming the measure.
    #[must_use]
    pub fn label(&self, table: &Table) -> String {
        match *self {
            Self::Product { price, quantity } => {
                format!("{} * {}", table.columns[price], table.columns[quantity])
            }
            Self::Column(index) => table.columns[index].clone(),
        }
    }
}

/// Returns the first column whose name contains "date".
#[must_use]
pub fn date_column(table: &Table) -> Option<usize> {
    table.find_column(&["date"])
}

/// Picks the sales measure of a table.
///
/// A `TotalSale` column wins; otherwise price times quantity when both are
/// mostly numeric; otherwise the numeric column holding the largest value.
/// Cells that do not parse drop out row by row in [`SalesMeasure::values`].
#[must_use]
pub fn sales_measure(table: &Table) -> Option<SalesMeasure> {
    if let Some(total) = table.find_column(&["totalsale"]) {
        if table.is_numeric_column(total) {
            return Some(SalesMeasure::Column(total));
        }
    }

    let price = numeric_column_named(table, &["price", "cost"]);
    let quantity = quantity_column(table);
    if let (Some(price), Some(quantity)) = (price, quantity) {
        return Some(SalesMeasure::Product { price, quantity });
    }

    (0..table.columns.len())
        .filter(|&i| table.is_numeric_column(i))
        .map(|i| {
            let max = table
                .numeric_column(i)
                .into_iter()
                .flatten()
                .fold(f64::NEG_INFINITY, f64::max);
            (i, max)
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| SalesMeasure::Column(i))
}

/// Returns the numeric quantity column, if any.
pub(crate) fn quantity_column(table: &Table) -> Option<usize> {
    numeric_column_named(table, &["quantity", "units"])
}

/// Returns the category column, if any.
pub(crate) fn category_column(table: &Table) -> Option<usize> {
    table.find_column(&["category"])
}

/// Sums the measure per calendar day, in date order. Rows whose date or
/// amount does not parse are skipped.
pub(crate) fn daily_totals(table: &Table, date: usize, measure: SalesMeasure) -> BTreeMap<NaiveDate, f64> {
    let mut totals = BTreeMap::new();
    for (cell, amount) in table.column(date).zip(measure.values(table)) {
        if let (Some(day), Some(amount)) = (parse_date(cell), amount) {
            *totals.entry(day).or_insert(0.0) += amount;
        }
    }
    totals
}

/// Sums the measure per distinct value of `group`, largest first.
pub(crate) fn group_totals(table: &Table, group: usize, measure: SalesMeasure) -> Vec<(String, f64)> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for (key, amount) in table.column(group).zip(measure.values(table)) {
        if let Some(amount) = amount {
            *totals.entry(key).or_insert(0.0) += amount;
        }
    }
    let mut totals: Vec<(String, f64)> = totals.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    totals.sort_by(|a, b| b.1.total_cmp(&a.1));
    totals
}

fn numeric_column_named(table: &Table, fragments: &[&str]) -> Option<usize> {
    table.columns.iter().enumerate().find_map(|(i, name)| {
        let lower = name.to_lowercase();
        (fragments.iter().any(|f| lower.contains(f)) && table.is_mostly_numeric_column(i)).then_some(i)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        let mut table = Table::new(columns.iter().map(|c| (*c).to_string()).collect());
        for row in rows {
            table.push_row(row.iter().map(|c| (*c).to_string()).collect());
        }
        table
    }

    #[test]
    fn test_price_times_quantity() {
        let t = table(
            &["OrderDate", "Price", "Quantity"],
            &[&["2025-01-01", "2.5", "4"], &["2025-01-02", "x", "1"]],
        );
        let measure = sales_measure(&t).unwrap();
        assert_eq!(measure, SalesMeasure::Product { price: 1, quantity: 2 });
        assert_eq!(measure.values(&t), vec![Some(10.0), None]);
        assert_eq!(measure.label(&t), "Price * Quantity");
        assert_eq!(date_column(&t), Some(0));
    }

    #[test]
    fn test_mostly_text_price_is_not_a_measure() {
        let t = table(
            &["Price", "Quantity"],
            &[&["n/a", "4"], &["call", "1"], &["9", "2"]],
        );
        assert_eq!(sales_measure(&t), Some(SalesMeasure::Column(1)));
    }

    #[test]
    fn test_largest_numeric_fallback() {
        let t = table(&["Store", "Visits", "Revenue"], &[&["a", "3", "900"], &["b", "7", "40"]]);
        assert_eq!(sales_measure(&t), Some(SalesMeasure::Column(2)));
    }

    #[test]
    fn test_total_sale_column_wins() {
        let t = table(&["Price", "Quantity", "TotalSale"], &[&["1", "2", "2"]]);
        assert_eq!(sales_measure(&t), Some(SalesMeasure::Column(2)));
    }

    #[test]
    fn test_daily_and_group_totals() {
        let t = table(
            &["OrderDate", "Product", "Price", "Quantity"],
            &[
                &["2025-01-01", "Desk", "10", "1"],
                &["2025-01-01", "Lamp", "5", "3"],
                &["2025-01-03", "Desk", "10", "2"],
                &["bad", "Lamp", "1", "1"],
            ],
        );
        let measure = sales_measure(&t).unwrap();

        let daily: Vec<(String, f64)> = daily_totals(&t, 0, measure)
            .into_iter()
            .map(|(d, v)| (d.to_string(), v))
            .collect();
        assert_eq!(daily, vec![("2025-01-01".to_string(), 25.0), ("2025-01-03".to_string(), 20.0)]);

        assert_eq!(
            group_totals(&t, 1, measure),
            vec![("Desk".to_string(), 30.0), ("Lamp".to_string(), 16.0)]
        );
    }

    #[test]
    fn test_no_numeric_columns() {
        let t = table(&["Name"], &[&["a"]]);
        assert_eq!(sales_measure(&t), None);
        assert_eq!(date_column(&t), None);
    }
}
