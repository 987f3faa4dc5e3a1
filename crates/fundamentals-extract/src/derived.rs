//! Derived metrics computed by joining two primitive series on period end.
//!
//! Each input is first collapsed to one value per period end, the most
//! recently filed one, which is the value the store ends up holding for that
//! period. Only periods present in both inputs produce an output; nothing is
//! carried forward or extrapolated.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::{normalize::Observation, series::Series};

/// Gross margin = gross profit / revenue.
///
/// Periods with a revenue of exactly zero are skipped.
#[must_use]
pub fn gross_margin(revenue: &Series, gross_profit: &Series) -> Series {
    join(revenue, gross_profit, |revenue, gross_profit| {
        (revenue != 0.0).then(|| gross_profit / revenue)
    })
}

/// Free cash flow = operating cash flow + capital expenditure.
///
/// Capital expenditure is used with the sign it was reported with.
#[must_use]
pub fn free_cash_flow(operating_cash_flow: &Series, capital_expenditure: &Series) -> Series {
    join(operating_cash_flow, capital_expenditure, |cfo, capex| {
        Some(cfo + capex)
    })
}

/// Inner join of two series on period end.
///
/// The output observation takes the later of the two filed dates and keeps
/// the accession only when both inputs came from the same filing.
fn join<F>(left: &Series, right: &Series, combine: F) -> Series
where
    F: Fn(f64, f64) -> Option<f64>,
{
    let right = latest_by_period(right);

    let observations = latest_by_period(left)
        .into_iter()
        .filter_map(|(period_end, l)| {
            let r = right.get(&period_end)?;
            let value = combine(l.value, r.value)?;
            Some(Observation {
                period_end,
                filed: l.filed.max(r.filed),
                accession: l.accession.clone().filter(|_| l.accession == r.accession),
                form: l.form.clone(),
                value,
            })
        })
        .collect();

    Series::from_observations(observations)
}

/// Collapses a series to its last observation per period end.
fn latest_by_period(series: &Series) -> BTreeMap<NaiveDate, &Observation> {
    series
        .observations
        .iter()
        .map(|obs| (obs.period_end, obs))
        .collect()
}
