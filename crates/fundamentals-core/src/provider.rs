//! Provider trait for fetching registry data.
//!
//! [`FactsProvider`] is the upstream collaborator of the reconciliation
//! engine. It performs no retries itself; transient failures surface as
//! [`DataError::Transient`](crate::DataError::Transient) and the caller
//! decides what to do.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::{DataError, Result},
    facts::CompanyFacts,
    types::{Cik, RecentFilings, Symbol},
};

/// Source of company facts and filing metadata.
#[async_trait]
pub trait FactsProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "SEC EDGAR").
    fn name(&self) -> &str;

    /// Fetches the company-facts document for a registry identifier.
    ///
    /// Fails with `NotFound` when the registry has no record, `Transient` on
    /// network errors and 5xx responses, and `InvalidResponse` on a malformed
    /// payload.
    async fn company_facts(&self, cik: &Cik) -> Result<CompanyFacts>;

    /// Fetches the company's recent filings.
    async fn recent_filings(&self, cik: &Cik) -> Result<RecentFilings> {
        Err(DataError::NotSupported(format!(
            "{} does not list filings (CIK {cik})",
            self.name()
        )))
    }

    /// Resolves a ticker symbol to a registry identifier.
    async fn lookup_cik(&self, symbol: &Symbol) -> Result<Cik> {
        Err(DataError::SymbolNotFound(symbol.to_string()))
    }
}
