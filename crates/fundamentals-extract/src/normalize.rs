//! Observation normalization.
//!
//! Turns a unit's raw observation list into a canonical, ordered sequence
//! with one value per (period end, accession).

use chrono::NaiveDate;
use fundamentals_core::RawObservation;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A validated observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// End of the reporting period.
    pub period_end: NaiveDate,
    /// Filing date, if the source carried a parseable one.
    pub filed: Option<NaiveDate>,
    /// Accession number of the reporting filing.
    pub accession: Option<String>,
    /// Form type of the reporting filing.
    pub form: Option<String>,
    /// Raw value, unscaled.
    pub value: f64,
}

/// Parses a `YYYY-MM-DD` date; anything else is treated as no date.
#[must_use]
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
}

/// Normalizes raw observations.
///
/// 1. When `form` is set, observations of any other form type are dropped.
/// 2. Observations without a numeric value or a parseable period end are dropped.
/// 3. The rest are ordered by (period end, filed date), a missing filed date
///    sorting first.
/// 4. For each (period end, accession) only the last observation in that
///    order survives, i.e. the most recently filed one.
///
/// Different accessions for the same period end are kept as separate
/// entries.
#[must_use]
pub fn normalize_observations(values: &[RawObservation], form: Option<&str>) -> Vec<Observation> {
    let mut observations: Vec<Observation> = values
        .iter()
        .filter(|raw| form.is_none_or(|wanted| raw.form.as_deref() == Some(wanted)))
        .filter_map(|raw| {
            Some(Observation {
                period_end: parse_date(raw.end.as_deref())?,
                filed: parse_date(raw.filed.as_deref()),
                accession: raw.accn.clone(),
                form: raw.form.clone(),
                value: raw.val?,
            })
        })
        .collect();

    // Stable, so equal keys keep source order and the later one wins below.
    observations.sort_by_key(|obs| (obs.period_end, obs.filed.unwrap_or(NaiveDate::MIN)));

    let mut seen = HashSet::new();
    let mut deduped: Vec<Observation> = observations
        .into_iter()
        .rev()
        .filter(|obs| seen.insert((obs.period_end, obs.accession.clone())))
        .collect();
    deduped.reverse();
    deduped
}
