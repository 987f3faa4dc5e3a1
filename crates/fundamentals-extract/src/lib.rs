#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fundamentals/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Metric extraction from XBRL company facts.
//!
//! Pure, synchronous functions; safe to run in parallel across companies.
//!
//! - [`candidate_tags`] - candidate tags present in the document, in priority order
//! - [`select_units`] - preferred unit, then currency match, then anything
//! - [`normalize_observations`] - form filter, validation, restatement dedup
//! - [`extract_series`] / [`extract_metrics`] - the above composed per concept
//! - [`derived`] - gross margin and free cash flow joined on period end
//!
//! # Example
//!
//! ```
//! use fundamentals_core::CompanyFacts;
//! use fundamentals_extract::{ExtractOptions, extract_metrics};
//!
//! let facts = CompanyFacts::from_slice(br#"{"facts": {"us-gaap": {}}}"#).unwrap();
//! for (key, series) in extract_metrics(&facts, &ExtractOptions::default()) {
//!     println!("{key}: {} observations", series.len());
//! }
//! ```

/// Concept catalog: tags, units and scaling per metric.
pub mod catalog;
/// Derived metrics.
pub mod derived;
/// Observation normalization.
pub mod normalize;
/// Per-concept series extraction.
pub mod series;
/// Tag resolution.
pub mod tags;
/// Unit selection.
pub mod units;

pub use catalog::{ConceptSpec, PRIMITIVE_CONCEPTS, Scale, concept, scale, unit_label};
pub use normalize::{Observation, normalize_observations, parse_date};
pub use series::{ExtractOptions, Series, extract_metrics, extract_series};
pub use tags::candidate_tags;
pub use units::select_units;
