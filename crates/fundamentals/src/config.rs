//! Reconciler configuration.

use fundamentals_core::{ANNUAL_REPORT_FORM, Cik, DataError, Result, Symbol, US_GAAP};
use fundamentals_extract::ExtractOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Default number of companies reconciled at once by
/// [`Reconciler::reconcile_many`](crate::Reconciler::reconcile_many).
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Ticker symbol to registry identifier mapping.
///
/// Serialized as a flat JSON object, e.g. `{"AAPL": "320193"}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CikDirectory(HashMap<Symbol, Cik>);

impl CikDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a directory from JSON.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if the JSON is not an object of
    /// symbol → CIK strings.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, Cik> = serde_json::from_str(json)
            .map_err(|e| DataError::InvalidParameter(format!("Invalid CIK map: {e}")))?;
        Ok(raw.into_iter().map(|(symbol, cik)| (Symbol::new(symbol), cik)).collect())
    }

    /// Load a directory from a JSON file.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            DataError::InvalidParameter(format!("Cannot read CIK map {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Add or replace an entry.
    #[must_use]
    pub fn with(mut self, symbol: impl Into<Symbol>, cik: Cik) -> Self {
        self.0.insert(symbol.into(), cik);
        self
    }

    /// Look up the CIK for a symbol.
    #[must_use]
    pub fn get(&self, symbol: &Symbol) -> Option<&Cik> {
        self.0.get(symbol)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the directory has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Symbol, Cik)> for CikDirectory {
    fn from_iter<I: IntoIterator<Item = (Symbol, Cik)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Settings for a [`Reconciler`](crate::Reconciler).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Known symbol → CIK entries, consulted before the provider.
    pub ciks: CikDirectory,
    /// Primary reporting currency.
    pub currency: String,
    /// Annual report form type; restricts extraction and filing import.
    pub annual_form: String,
    /// Maximum number of companies reconciled concurrently.
    pub concurrency: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            ciks: CikDirectory::default(),
            currency: "USD".to_string(),
            annual_form: ANNUAL_REPORT_FORM.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ReconcilerConfig {
    /// Set the CIK directory.
    #[must_use]
    pub fn with_ciks(mut self, ciks: CikDirectory) -> Self {
        self.ciks = ciks;
        self
    }

    /// Set the concurrency limit for batch runs. Zero is treated as one.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Extraction options derived from this configuration.
    #[must_use]
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            taxonomy: US_GAAP.to_string(),
            currency: self.currency.clone(),
            form: Some(self.annual_form.clone()),
        }
    }
}
