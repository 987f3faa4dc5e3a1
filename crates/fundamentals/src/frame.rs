//! Wide DataFrame export of stored metric series.

use chrono::NaiveDate;
use fundamentals_core::{DataError, MetricSeries, Result};
use polars::prelude::*;
use std::collections::{BTreeSet, HashMap};

/// Name of the date column in [`series_frame`] output.
pub const PERIOD_END_COLUMN: &str = "period_end";

/// Builds a wide DataFrame: one `period_end` row per reported period and one
/// nullable `f64` column per metric key.
///
/// Rows are sorted ascending by period end; columns follow the order of
/// `series`.
///
/// # Errors
/// Returns `Other` if the frame cannot be assembled.
pub fn series_frame(series: &[MetricSeries]) -> Result<DataFrame> {
    let periods: BTreeSet<NaiveDate> = series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.period_end))
        .collect();

    // NaiveDate::default() is 1970-01-01.
    let epoch = NaiveDate::default();
    let days: Vec<i32> = periods
        .iter()
        .map(|d| (*d - epoch).num_days() as i32)
        .collect();

    let mut columns = Vec::with_capacity(series.len() + 1);
    columns.push(
        Column::new(PERIOD_END_COLUMN.into(), days)
            .cast(&DataType::Date)
            .map_err(|e| DataError::Other(e.to_string()))?,
    );

    for s in series {
        let by_period: HashMap<NaiveDate, f64> =
            s.points.iter().map(|p| (p.period_end, p.value)).collect();
        let values: Vec<Option<f64>> = periods.iter().map(|d| by_period.get(d).copied()).collect();
        columns.push(Column::new(s.metric.key.as_str().into(), values));
    }

    DataFrame::new(columns).map_err(|e| DataError::Other(e.to_string()))
}
