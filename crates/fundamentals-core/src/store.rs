//! Persistence traits for companies, filings and metrics.
//!
//! All writes go through a [`MetricTransaction`] obtained from
//! [`MetricStore::transaction`]. The store commits only if the unit of work
//! returns `Ok`; any error rolls back every write made inside it, so a
//! reconciliation run is all-or-nothing.
//!
//! Upserts are keyed by unique constraints rather than read-then-write:
//! one [`Metric`] per (company, key) and one [`MetricPoint`] per
//! (metric, period end).

use chrono::NaiveDate;
use std::fmt::Debug;

use crate::{
    error::Result,
    types::{
        Cik, Company, CompanyId, Filing, FilingRecord, Metric, MetricKey, MetricPoint,
        MetricSeries, Symbol,
    },
};

/// Write operations available inside one store transaction.
pub trait MetricTransaction {
    /// Returns the company with this symbol, creating it if absent.
    ///
    /// An existing company keeps its registry identifier and name; either is
    /// filled in only if it was previously unset.
    fn find_or_create_company(
        &mut self,
        symbol: &Symbol,
        cik: Option<&Cik>,
        name: Option<&str>,
    ) -> Result<Company>;

    /// Looks up a filing by accession number.
    fn find_filing_by_accession(&mut self, accession: &str) -> Result<Option<Filing>>;

    /// Looks up a company's filing by form type and period end.
    fn find_filing_by_company_form_period(
        &mut self,
        company_id: CompanyId,
        form_type: &str,
        period_end: NaiveDate,
    ) -> Result<Option<Filing>>;

    /// Inserts a filing unless its accession number is already stored.
    ///
    /// Returns `true` if a row was inserted.
    fn insert_filing(
        &mut self,
        company_id: CompanyId,
        filing: &FilingRecord,
        parse_status: &str,
    ) -> Result<bool>;

    /// Returns the metric for (company, key), creating it if absent.
    ///
    /// The unit is written only when the stored unit is unset.
    fn upsert_metric(
        &mut self,
        company_id: CompanyId,
        key: MetricKey,
        unit: &str,
    ) -> Result<Metric>;

    /// Inserts or overwrites the point for (metric, period end).
    ///
    /// On conflict the value and filing date are overwritten; the source
    /// filing is overwritten only when the new point carries one.
    fn upsert_metric_point(&mut self, point: &MetricPoint) -> Result<()>;
}

/// A transactional store of companies, filings and metrics.
pub trait MetricStore: Send + Sync + Debug {
    /// Runs `work` inside a single transaction.
    ///
    /// Commits if `work` returns `Ok`, rolls back otherwise.
    fn transaction(
        &self,
        work: &mut dyn FnMut(&mut dyn MetricTransaction) -> Result<()>,
    ) -> Result<()>;

    /// Looks up a company by symbol.
    fn company(&self, symbol: &Symbol) -> Result<Option<Company>>;

    /// Lists a company's filings, most recently filed first.
    fn filings(&self, company_id: CompanyId) -> Result<Vec<Filing>>;

    /// Lists a company's metrics with their points ascending by period end.
    fn metric_series(&self, company_id: CompanyId) -> Result<Vec<MetricSeries>>;
}
