use std::collections::HashSet;
use tracing::{info, instrument};

use crate::config::CleanOptions;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::stats::quantile;
use crate::types::RecordCollection;

/// Drop rows equal to an earlier row, keeping the first occurrence.
/// Returns the new snapshot and the number of rows removed.
pub fn deduplicate(records: RecordCollection) -> (RecordCollection, usize) {
    let before = records.len();
    let deduped = records.map_records(|rows| {
        // Keys borrow the rows, so decide what to keep before moving any
        let keep: Vec<bool> = {
            let mut seen = HashSet::with_capacity(rows.len());
            rows.iter().map(|row| seen.insert(row.row_key())).collect()
        };
        rows.into_iter()
            .zip(keep)
            .filter_map(|(row, keep)| keep.then_some(row))
            .collect()
    });
    let removed = before - deduped.len();
    (deduped, removed)
}

/// Clip every unit price above the `q`-quantile of the current prices to
/// exactly that quantile. Returns the snapshot, the cap and the clip count;
/// the cap is `None` when no price is present.
pub fn cap_unit_price(records: RecordCollection, q: f64) -> (RecordCollection, Option<f32>, usize) {
    let prices: Vec<f64> = records
        .records()
        .iter()
        .filter_map(|r| r.unit_price.map(f64::from))
        .collect();

    let Some(cap) = quantile(&prices, q).map(|v| v as f32) else {
        return (records, None, 0);
    };

    let mut clipped = 0;
    let capped = records.map_records(|rows| {
        rows.into_iter()
            .map(|mut row| {
                if let Some(price) = row.unit_price {
                    if price > cap {
                        row.unit_price = Some(cap);
                        clipped += 1;
                    }
                }
                row
            })
            .collect()
    });
    (capped, Some(cap), clipped)
}

/// Remove duplicate and invalid rows, then cap unit-price outliers.
///
/// Steps run in a fixed order, each on the output of the one before:
/// deduplicate, keep `quantity >= 1` and `unit_price >= 0`, drop rows
/// missing either value, optionally drop zero prices, then cap prices at
/// the `outlier_cap` quantile of what is left.
#[instrument(skip_all, fields(rows = records.len()))]
pub fn clean(
    records: RecordCollection,
    options: &CleanOptions,
    diagnostics: &mut Diagnostics,
) -> RecordCollection {
    info!("Starting data cleaning process");
    let initial_rows = records.len();
    let mut records = records;

    if options.deduplicate {
        let (deduped, removed) = deduplicate(records);
        diagnostics.record(Diagnostic::DuplicatesRemoved { count: removed });
        records = deduped;
    }

    // Range check; missing values are dealt with in the next step
    let records = records.filter(|r| {
        r.quantity.map_or(true, |q| q >= 1) && r.unit_price.map_or(true, |p| p >= 0.0)
    });

    let records = records.filter(|r| r.quantity.is_some() && r.unit_price.is_some());

    let records = if options.remove_zero_price {
        let before = records.len();
        let positive = records.filter(|r| r.unit_price.map_or(false, |p| p > 0.0));
        diagnostics.record(Diagnostic::ZeroPriceRemoved {
            count: before - positive.len(),
        });
        positive
    } else {
        records
    };

    let (records, cap, clipped) = cap_unit_price(records, options.outlier_cap);
    if let Some(cap) = cap {
        diagnostics.record(Diagnostic::UnitPriceCapped {
            quantile: options.outlier_cap,
            cap,
            clipped,
        });
    }

    let invalid = records.records().iter().filter(|r| !r.is_valid(false)).count();
    if invalid > 0 {
        diagnostics.record(Diagnostic::InvalidAfterCleaning { count: invalid });
    }

    diagnostics.record(Diagnostic::RowsRemoved {
        count: initial_rows - records.len(),
    });
    let (rows, columns) = records.shape();
    info!("Cleaned data shape: ({}, {})", rows, columns);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Schema, Transaction};

    fn collection(rows: &[(Option<i32>, Option<f32>)]) -> RecordCollection {
        let schema = Schema::from_header(&["Quantity", "UnitPrice"]).unwrap();
        RecordCollection::new(
            schema,
            rows.iter().map(|(q, p)| Transaction::new(*q, *p)).collect(),
        )
    }

    fn pairs(records: &RecordCollection) -> Vec<(Option<i32>, Option<f32>)> {
        records
            .records()
            .iter()
            .map(|r| (r.quantity, r.unit_price))
            .collect()
    }

    #[test]
    fn test_deduplicate_keeps_first_occurrence() {
        let schema = Schema::from_header(&["Quantity", "UnitPrice", "InvoiceNo"]).unwrap();
        let rows = vec![
            Transaction::new(Some(1), Some(2.0)).with_fields(vec!["a".into()]),
            Transaction::new(Some(3), Some(4.0)).with_fields(vec!["b".into()]),
            Transaction::new(Some(1), Some(2.0)).with_fields(vec!["a".into()]),
        ];
        let (deduped, removed) = deduplicate(RecordCollection::new(schema, rows));
        assert_eq!(removed, 1);
        assert_eq!(deduped.records()[0].fields, vec!["a".to_string()]);
        assert_eq!(deduped.records()[1].fields, vec!["b".to_string()]);
    }

    #[test]
    fn test_filters_invalid_and_missing_rows() {
        let options = CleanOptions {
            remove_zero_price: false,
            deduplicate: false,
            outlier_cap: 0.99,
        };
        let input = collection(&[
            (Some(1), Some(0.0)),
            (Some(0), Some(5.0)),
            (Some(2), Some(-1.0)),
            (None, Some(5.0)),
            (Some(4), None),
            (Some(-3), None),
        ]);

        let cleaned = clean(input, &options, &mut Diagnostics::new());
        assert_eq!(pairs(&cleaned), vec![(Some(1), Some(0.0))]);
    }

    #[test]
    fn test_zero_price_removal_tightens_boundary() {
        let options = CleanOptions {
            remove_zero_price: true,
            deduplicate: false,
            outlier_cap: 0.99,
        };
        let mut diagnostics = Diagnostics::new();
        let cleaned = clean(
            collection(&[(Some(1), Some(0.0)), (Some(2), Some(3.0))]),
            &options,
            &mut diagnostics,
        );
        assert_eq!(pairs(&cleaned), vec![(Some(2), Some(3.0))]);
        assert!(diagnostics
            .events()
            .contains(&Diagnostic::ZeroPriceRemoved { count: 1 }));
    }

    #[test]
    fn test_caps_on_filtered_prices() {
        // The invalid row's huge price must not influence the cap
        let input = collection(&[
            (Some(1), Some(1.0)),
            (Some(1), Some(2.0)),
            (Some(1), Some(3.0)),
            (Some(1), Some(4.0)),
            (Some(0), Some(1_000_000.0)),
        ]);
        let mut diagnostics = Diagnostics::new();
        let cleaned = clean(input, &CleanOptions::default(), &mut diagnostics);

        let prices: Vec<f32> = cleaned.records().iter().filter_map(|r| r.unit_price).collect();
        let expected_cap = 3.97f64 as f32;
        assert_eq!(prices, vec![1.0, 2.0, 3.0, expected_cap]);
        assert!(diagnostics.events().contains(&Diagnostic::UnitPriceCapped {
            quantile: 0.99,
            cap: expected_cap,
            clipped: 1,
        }));
    }

    #[test]
    fn test_counts_removed_rows() {
        let mut diagnostics = Diagnostics::new();
        clean(
            collection(&[
                (Some(5), Some(10.0)),
                (Some(5), Some(10.0)),
                (Some(0), Some(5.0)),
                (Some(2), Some(-1.0)),
                (Some(3), Some(1000.0)),
            ]),
            &CleanOptions::default(),
            &mut diagnostics,
        );
        let events = diagnostics.events();
        assert!(events.contains(&Diagnostic::DuplicatesRemoved { count: 1 }));
        assert!(events.contains(&Diagnostic::RowsRemoved { count: 3 }));
        assert!(!diagnostics.has_warnings());
    }

    #[test]
    fn test_empty_after_filtering_skips_cap() {
        let mut diagnostics = Diagnostics::new();
        let cleaned = clean(
            collection(&[(Some(0), Some(1.0))]),
            &CleanOptions::default(),
            &mut diagnostics,
        );
        assert!(cleaned.is_empty());
        assert!(!diagnostics
            .events()
            .iter()
            .any(|d| matches!(d, Diagnostic::UnitPriceCapped { .. })));
    }
}
