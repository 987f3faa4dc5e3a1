//! Typed representation of an XBRL company-facts document.
//!
//! The registry publishes `facts.<taxonomy>.<tag>.units.<unit> -> [observation]`.
//! The document is decoded once at the ingestion boundary into
//! [`CompanyFacts`]; extraction then works on this shape only.
//!
//! Decoding is lenient at the observation level: a non-numeric `val` or a
//! missing date is kept as `None` so the extractor can drop the observation,
//! instead of failing the whole document.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::{DataError, Result};

/// Name of the US GAAP taxonomy.
pub const US_GAAP: &str = "us-gaap";

/// Form type of the annual report; the only form metrics are extracted from.
pub const ANNUAL_REPORT_FORM: &str = "10-K";

/// Observations of one tag, keyed by unit code (e.g. "USD", "USD/shares").
///
/// Ordered by unit code so fallback selection is deterministic.
pub type UnitMap = BTreeMap<String, Vec<RawObservation>>;

/// Tags of one taxonomy, keyed by tag name.
pub type TagMap = HashMap<String, TagFacts>;

/// A decoded company-facts document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyFacts {
    /// Registered entity name.
    #[serde(default)]
    pub entity_name: Option<String>,
    /// Facts organized by taxonomy and tag.
    #[serde(default, deserialize_with = "null_as_default")]
    pub facts: HashMap<String, TagMap>,
}

impl CompanyFacts {
    /// Decodes a document from raw JSON bytes.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidResponse`] if the payload is not a
    /// company-facts document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| DataError::InvalidResponse(format!("Failed to parse company facts: {e}")))
    }

    /// Decodes a document from an already parsed JSON value.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidResponse`] if the value is not a
    /// company-facts document.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| DataError::InvalidResponse(format!("Failed to parse company facts: {e}")))
    }

    /// Returns the tags of a taxonomy, if present.
    #[must_use]
    pub fn taxonomy(&self, name: &str) -> Option<&TagMap> {
        self.facts.get(name)
    }
}

/// Facts for a specific XBRL tag.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TagFacts {
    /// Label.
    #[serde(default)]
    pub label: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Observations keyed by unit code.
    #[serde(default, deserialize_with = "null_as_default")]
    pub units: UnitMap,
}

/// A single reported value with its filing metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    /// End date of the period, `YYYY-MM-DD`.
    #[serde(default)]
    pub end: Option<String>,
    /// Value; `None` when the source value is not numeric.
    #[serde(default, deserialize_with = "lenient_number")]
    pub val: Option<f64>,
    /// Accession number of the reporting filing.
    #[serde(default)]
    pub accn: Option<String>,
    /// Form type of the reporting filing.
    #[serde(default)]
    pub form: Option<String>,
    /// Filing date, `YYYY-MM-DD`.
    #[serde(default)]
    pub filed: Option<String>,
}

fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()).filter(|v| v.is_finite()))
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_nested_fact_graph() {
        let facts = CompanyFacts::from_value(json!({
            "cik": 320193,
            "entityName": "Apple Inc.",
            "facts": {
                "us-gaap": {
                    "Revenues": {
                        "label": "Revenues",
                        "units": {
                            "USD": [
                                {"end": "2023-09-30", "val": 383285000000u64, "accn": "0000320193-23-000106",
                                 "fy": 2023, "fp": "FY", "form": "10-K", "filed": "2023-11-03"}
                            ]
                        }
                    }
                }
            }
        }))
        .unwrap();

        assert_eq!(facts.entity_name.as_deref(), Some("Apple Inc."));
        let revenues = &facts.taxonomy(US_GAAP).unwrap()["Revenues"];
        let obs = &revenues.units["USD"][0];
        assert_eq!(obs.val, Some(383_285_000_000.0));
        assert_eq!(obs.form.as_deref(), Some("10-K"));
    }

    #[test]
    fn non_numeric_values_decode_as_none() {
        let obs: RawObservation =
            serde_json::from_value(json!({"end": "2023-09-30", "val": "n/a"})).unwrap();
        assert_eq!(obs.val, None);

        let obs: RawObservation = serde_json::from_value(json!({"end": "2023-09-30"})).unwrap();
        assert_eq!(obs.val, None);
    }

    #[test]
    fn null_units_decode_as_empty() {
        let tag: TagFacts = serde_json::from_value(json!({"label": "x", "units": null})).unwrap();
        assert!(tag.units.is_empty());
    }

    #[test]
    fn malformed_document_is_invalid_response() {
        let err = CompanyFacts::from_slice(b"{\"facts\": []}").unwrap_err();
        assert!(matches!(err, DataError::InvalidResponse(_)));
    }
}
