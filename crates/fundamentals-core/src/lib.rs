#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fundamentals/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for XBRL fundamentals reconciliation.
//!
//! This crate provides the foundational abstractions:
//!
//! - [`CompanyFacts`](facts::CompanyFacts) - Typed company-facts document
//! - [`FactsProvider`](provider::FactsProvider) - Upstream source of facts and filings
//! - [`MetricStore`](store::MetricStore) - Transactional persistence of metrics
//! - [`DataError`](error::DataError) - Error type shared by every crate

/// Error types for fundamentals operations.
pub mod error;
/// Typed company-facts document.
pub mod facts;
/// Provider trait for fetching registry data.
pub mod provider;
/// Persistence traits.
pub mod store;
/// Core domain types (Symbol, Cik, Company, Metric, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use error::{DataError, Result};
pub use facts::{
    ANNUAL_REPORT_FORM, CompanyFacts, RawObservation, TagFacts, TagMap, US_GAAP, UnitMap,
};
pub use provider::FactsProvider;
pub use store::{MetricStore, MetricTransaction};
pub use types::{
    Cik, Company, CompanyId, Filing, FilingId, FilingRecord, Metric, MetricId, MetricKey,
    MetricPoint, MetricSeries, RecentFilings, Symbol,
};
