use tracing::{info, instrument};

use crate::constants::REVENUE_CAP_QUANTILE;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::stats::quantile;
use crate::types::RecordCollection;

/// Derive `revenue = quantity * unit_price` and cap it at its 99th percentile.
///
/// Revenue is computed in `f64`; rows missing either input get no revenue.
#[instrument(skip_all, fields(rows = records.len()))]
pub fn add_revenue(records: RecordCollection, diagnostics: &mut Diagnostics) -> RecordCollection {
    info!("Calculating revenue");

    let records = records
        .map_records(|rows| {
            rows.into_iter()
                .map(|mut row| {
                    row.revenue = match (row.quantity, row.unit_price) {
                        (Some(q), Some(p)) => Some(f64::from(q) * f64::from(p)),
                        _ => None,
                    };
                    row
                })
                .collect()
        })
        .with_revenue_column();

    let revenues: Vec<f64> = records.records().iter().filter_map(|r| r.revenue).collect();
    let records = match quantile(&revenues, REVENUE_CAP_QUANTILE) {
        Some(cap) => {
            let mut clipped = 0;
            let capped = records.map_records(|rows| {
                rows.into_iter()
                    .map(|mut row| {
                        if let Some(revenue) = row.revenue {
                            if revenue > cap {
                                row.revenue = Some(cap);
                                clipped += 1;
                            }
                        }
                        row
                    })
                    .collect()
            });
            diagnostics.record(Diagnostic::RevenueCapped { cap, clipped });
            capped
        }
        None => records,
    };

    let negative = records
        .records()
        .iter()
        .filter(|r| r.revenue.is_some_and(|v| v < 0.0))
        .count();
    if negative > 0 {
        diagnostics.record(Diagnostic::NegativeRevenue { count: negative });
    }

    records
}
