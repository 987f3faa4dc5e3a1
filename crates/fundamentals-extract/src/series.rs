//! Series extraction: tag resolution, unit selection and normalization
//! composed per concept.

use fundamentals_core::{ANNUAL_REPORT_FORM, CompanyFacts, MetricKey, US_GAAP};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    catalog::{ConceptSpec, PRIMITIVE_CONCEPTS},
    derived,
    normalize::{Observation, normalize_observations},
    tags::candidate_tags,
    units::select_units,
};

/// Options controlling extraction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Taxonomy the concepts are looked up in.
    pub taxonomy: String,
    /// Primary reporting currency, used for unit fallback.
    pub currency: String,
    /// Only observations from this form type are kept.
    pub form: Option<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            taxonomy: US_GAAP.to_string(),
            currency: "USD".to_string(),
            form: Some(ANNUAL_REPORT_FORM.to_string()),
        }
    }
}

/// A normalized series for one metric.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Tag the series was read from; `None` for derived or absent series.
    pub tag: Option<String>,
    /// Unit code the series was read from.
    pub unit: Option<String>,
    /// Observations ordered by (period end, filed date).
    pub observations: Vec<Observation>,
}

impl Series {
    /// Creates a series with no source tag, e.g. a derived one.
    #[must_use]
    pub const fn from_observations(observations: Vec<Observation>) -> Self {
        Self {
            tag: None,
            unit: None,
            observations,
        }
    }

    /// Returns true if the series has no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Returns the number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }
}

/// Extracts the series for one concept.
///
/// Candidate tags are tried in priority order. A present tag is skipped when
/// it has no units or its selected unit lists no facts; the first tag with
/// facts is used even if none of them survive normalization. Returns an empty
/// series when no candidate qualifies; an absent concept is not an error.
#[must_use]
pub fn extract_series(facts: &CompanyFacts, spec: &ConceptSpec, options: &ExtractOptions) -> Series {
    let Some(taxonomy) = facts.taxonomy(&options.taxonomy) else {
        debug!(taxonomy = %options.taxonomy, "Taxonomy absent from document");
        return Series::default();
    };

    let resolved = candidate_tags(taxonomy, spec.tags).find_map(|(tag, units)| {
        match select_units(units, spec.units, &options.currency) {
            Some((unit, values)) if !values.is_empty() => Some((tag, unit, values)),
            _ => {
                debug!(metric = %spec.key, tag, "Tag has no facts, trying next candidate");
                None
            }
        }
    });

    let Some((tag, unit, values)) = resolved else {
        debug!(metric = %spec.key, "No candidate tag with facts");
        return Series::default();
    };

    let observations = normalize_observations(values, options.form.as_deref());
    debug!(
        metric = %spec.key,
        tag,
        unit,
        raw = values.len(),
        kept = observations.len(),
        "Extracted series"
    );

    Series {
        tag: Some(tag.to_string()),
        unit: Some(unit.to_string()),
        observations,
    }
}

/// Extracts every primitive series, then derives the composite ones.
///
/// The result is in reconciliation order: primitives as listed in
/// [`PRIMITIVE_CONCEPTS`], then gross margin and free cash flow.
#[must_use]
pub fn extract_metrics(facts: &CompanyFacts, options: &ExtractOptions) -> Vec<(MetricKey, Series)> {
    let mut out: Vec<(MetricKey, Series)> = PRIMITIVE_CONCEPTS
        .iter()
        .map(|spec| (spec.key, extract_series(facts, spec, options)))
        .collect();

    let find = |key: MetricKey| {
        out.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, series)| series)
    };
    let empty = Series::default();
    let revenue = find(MetricKey::Revenue).unwrap_or(&empty);
    let gross_profit = find(MetricKey::GrossProfit).unwrap_or(&empty);
    let cfo = find(MetricKey::OperatingCashFlow).unwrap_or(&empty);
    let capex = find(MetricKey::CapitalExpenditure).unwrap_or(&empty);

    let gm = derived::gross_margin(revenue, gross_profit);
    let fcf = derived::free_cash_flow(cfo, capex);

    out.push((MetricKey::GrossMargin, gm));
    out.push((MetricKey::FreeCashFlow, fcf));
    out
}
