use serde::Serialize;
use std::fmt;

use crate::constants::{CUSTOMER_ID_COLUMN, QUANTITY_COLUMN, REVENUE_COLUMN, UNIT_PRICE_COLUMN};
use crate::types::RecordCollection;

/// Quantile `q` of `values` by linear interpolation between order statistics.
///
/// Position `h = (n - 1) * q` in the sorted values; the result is
/// `x[floor(h)] + (h - floor(h)) * (x[floor(h) + 1] - x[floor(h)])`.
/// NaN values are ignored. Returns `None` when nothing is left.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    Some(quantile_sorted(&sorted, q))
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let q = q.clamp(0.0, 1.0);
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let fraction = h - lo as f64;
    if fraction == 0.0 || lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + fraction * (sorted[hi] - sorted[lo])
    }
}

/// Descriptive statistics for one numeric column
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnSummary {
    pub fn from_values(column: &str, values: &[f64]) -> Self {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(f64::total_cmp);
        let count = sorted.len();

        if count == 0 {
            return Self {
                column: column.to_string(),
                count,
                mean: None,
                std: None,
                min: None,
                p25: None,
                p50: None,
                p75: None,
                max: None,
            };
        }

        let mean = sorted.iter().sum::<f64>() / count as f64;
        // Sample standard deviation; undefined for a single value
        let std = (count > 1).then(|| {
            let variance =
                sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            variance.sqrt()
        });

        Self {
            column: column.to_string(),
            count,
            mean: Some(mean),
            std,
            min: sorted.first().copied(),
            p25: Some(quantile_sorted(&sorted, 0.25)),
            p50: Some(quantile_sorted(&sorted, 0.50)),
            p75: Some(quantile_sorted(&sorted, 0.75)),
            max: sorted.last().copied(),
        }
    }
}

/// Descriptive statistics for the numeric columns of a collection
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Summary {
    pub rows: usize,
    pub columns: Vec<ColumnSummary>,
}

impl Summary {
    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.column == name)
    }
}

/// Summarise `Quantity`, `UnitPrice`, `CustomerID` (when present) and
/// `Revenue` (once derived)
pub fn describe(collection: &RecordCollection) -> Summary {
    let records = collection.records();
    let mut columns = Vec::with_capacity(4);

    let quantities: Vec<f64> = records
        .iter()
        .filter_map(|r| r.quantity.map(f64::from))
        .collect();
    columns.push(ColumnSummary::from_values(QUANTITY_COLUMN, &quantities));

    let prices: Vec<f64> = records
        .iter()
        .filter_map(|r| r.unit_price.map(f64::from))
        .collect();
    columns.push(ColumnSummary::from_values(UNIT_PRICE_COLUMN, &prices));

    if collection.schema().has_customer_id() {
        let ids: Vec<f64> = records.iter().filter_map(|r| r.customer_id).collect();
        columns.push(ColumnSummary::from_values(CUSTOMER_ID_COLUMN, &ids));
    }

    if collection.has_revenue() {
        let revenue: Vec<f64> = records.iter().filter_map(|r| r.revenue).collect();
        columns.push(ColumnSummary::from_values(REVENUE_COLUMN, &revenue));
    }

    Summary {
        rows: records.len(),
        columns,
    }
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "NaN".to_string(), |v| format!("{v:.6}"))
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
        let table: Vec<Vec<String>> = self
            .columns
            .iter()
            .map(|c| {
                vec![
                    format!("{:.6}", c.count as f64),
                    cell(c.mean),
                    cell(c.std),
                    cell(c.min),
                    cell(c.p25),
                    cell(c.p50),
                    cell(c.p75),
                    cell(c.max),
                ]
            })
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .zip(&table)
            .map(|(c, values)| {
                values
                    .iter()
                    .map(String::len)
                    .chain(std::iter::once(c.column.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:<6}", "")?;
        for (c, width) in self.columns.iter().zip(&widths) {
            write!(f, "  {:>width$}", c.column, width = *width)?;
        }
        writeln!(f)?;

        for (i, label) in labels.iter().enumerate() {
            write!(f, "{label:<6}")?;
            for (values, width) in table.iter().zip(&widths) {
                write!(f, "  {:>width$}", values[i], width = *width)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Schema, Transaction};

    #[test]
    fn test_quantile_interpolates_linearly() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.0), Some(1.0));
        assert_eq!(quantile(&values, 1.0), Some(4.0));
        assert_eq!(quantile(&values, 0.5), Some(2.5));
        // h = 3 * 0.99 = 2.97 -> 3 + 0.97 * (4 - 3)
        let q99 = quantile(&values, 0.99).unwrap();
        assert!((q99 - 3.97).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_ignores_order_and_nan() {
        let values = [10.0, f64::NAN, 1000.0];
        // sorted [10, 1000], h = 0.99 -> 10 + 0.99 * 990
        let q = quantile(&values, 0.99).unwrap();
        assert!((q - 990.1).abs() < 1e-9);
    }

    #[test]
    fn test_quantile_empty_and_single() {
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&[f64::NAN], 0.5), None);
        assert_eq!(quantile(&[7.0], 0.99), Some(7.0));
    }

    #[test]
    fn test_column_summary_matches_hand_computed() {
        let summary = ColumnSummary::from_values("x", &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(summary.count, 8);
        assert_eq!(summary.mean, Some(5.0));
        let std = summary.std.unwrap();
        assert!((std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(summary.min, Some(2.0));
        assert_eq!(summary.p50, Some(4.5));
        assert_eq!(summary.max, Some(9.0));
    }

    #[test]
    fn test_single_value_has_no_std() {
        let summary = ColumnSummary::from_values("x", &[3.0]);
        assert_eq!(summary.count, 1);
        assert_eq!(summary.std, None);
    }

    #[test]
    fn test_describe_skips_customer_id_when_absent() {
        let schema = Schema::from_header(&["Quantity", "UnitPrice"]).unwrap();
        let collection = RecordCollection::new(
            schema,
            vec![
                Transaction::new(Some(1), Some(2.0)),
                Transaction::new(Some(3), None),
            ],
        );

        let summary = describe(&collection);
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.columns.len(), 2);
        assert_eq!(summary.column("Quantity").map(|c| c.count), Some(2));
        assert_eq!(summary.column("UnitPrice").map(|c| c.count), Some(1));
        assert!(summary.column("CustomerID").is_none());

        let rendered = summary.to_string();
        assert!(rendered.contains("Quantity"));
        assert!(rendered.contains("75%"));
    }
}
