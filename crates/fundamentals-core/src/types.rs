//! Core domain types.
//!
//! This module defines the persisted data model:
//!
//! - [`Symbol`] - Ticker symbol
//! - [`Cik`] - SEC Central Index Key
//! - [`Company`] - A company known to the store
//! - [`Filing`] / [`FilingRecord`] - A registry filing used for provenance
//! - [`MetricKey`] - The fixed metric vocabulary
//! - [`Metric`] / [`MetricPoint`] / [`MetricSeries`] - Persisted metric state

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{DataError, Result};

/// Store identifier of a [`Company`].
pub type CompanyId = i64;
/// Store identifier of a [`Filing`].
pub type FilingId = i64;
/// Store identifier of a [`Metric`].
pub type MetricId = i64;

/// A trading symbol/ticker.
///
/// Symbols are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// SEC Central Index Key, stored zero-padded to 10 digits.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cik(String);

impl Cik {
    /// Parses a CIK from digits, with or without leading zeros or a `CIK` prefix.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidParameter`] if the input is empty, contains
    /// non-digits, or is longer than 10 digits.
    pub fn new(raw: &str) -> Result<Self> {
        let digits = raw.trim();
        let digits = digits.strip_prefix("CIK").unwrap_or(digits);
        if digits.is_empty() || digits.len() > 10 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DataError::InvalidParameter(format!("Invalid CIK: {raw:?}")));
        }
        Ok(Self(format!("{:0>10}", digits)))
    }

    /// Returns the zero-padded CIK.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for Cik {
    fn from(value: u64) -> Self {
        Self(format!("{:0>10}", value))
    }
}

impl TryFrom<String> for Cik {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<Cik> for String {
    fn from(value: Cik) -> Self {
        value.0
    }
}

impl FromStr for Cik {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for Cik {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A company known to the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    /// Store identifier.
    pub id: CompanyId,
    /// Ticker symbol (unique).
    pub symbol: Symbol,
    /// Registry identifier.
    pub cik: Option<Cik>,
    /// Display name.
    pub name: Option<String>,
}

/// A filing as reported by the registry, before it is stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingRecord {
    /// Accession number (globally unique).
    pub accession: String,
    /// Form type (e.g. "10-K").
    pub form_type: String,
    /// End of the reported period.
    pub period_end: Option<NaiveDate>,
    /// Date the filing was accepted by the registry.
    pub filed_at: Option<NaiveDate>,
}

/// Company-level metadata and filing list from the registry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentFilings {
    /// Registered entity name.
    pub entity_name: Option<String>,
    /// Filings, most recent first.
    pub filings: Vec<FilingRecord>,
}

/// A stored filing, owned by one company.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filing {
    /// Store identifier.
    pub id: FilingId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Accession number (globally unique).
    pub accession: String,
    /// Form type (e.g. "10-K").
    pub form_type: String,
    /// End of the reported period.
    pub period_end: Option<NaiveDate>,
    /// Date the filing was accepted by the registry.
    pub filed_at: Option<NaiveDate>,
    /// Import status tag (e.g. "imported").
    pub parse_status: Option<String>,
}

/// The fixed metric vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    /// Total revenue.
    Revenue,
    /// Gross profit.
    GrossProfit,
    /// Gross margin (gross profit / revenue).
    #[serde(rename = "gm")]
    GrossMargin,
    /// Diluted earnings per share.
    EpsDiluted,
    /// Total assets.
    Assets,
    /// Total liabilities.
    Liabilities,
    /// Operating income.
    OperatingIncome,
    /// Net income.
    NetIncome,
    /// Stockholders' equity.
    Equity,
    /// Cash flow from operations.
    #[serde(rename = "cfo")]
    OperatingCashFlow,
    /// Capital expenditure.
    #[serde(rename = "capex")]
    CapitalExpenditure,
    /// Free cash flow (cfo + capex).
    #[serde(rename = "fcf")]
    FreeCashFlow,
}

impl MetricKey {
    /// Every metric key, primitives before derived.
    pub const ALL: [Self; 12] = [
        Self::Revenue,
        Self::GrossProfit,
        Self::EpsDiluted,
        Self::Assets,
        Self::Liabilities,
        Self::OperatingIncome,
        Self::NetIncome,
        Self::Equity,
        Self::OperatingCashFlow,
        Self::CapitalExpenditure,
        Self::GrossMargin,
        Self::FreeCashFlow,
    ];

    /// Returns the storage key.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::GrossProfit => "gross_profit",
            Self::GrossMargin => "gm",
            Self::EpsDiluted => "eps_diluted",
            Self::Assets => "assets",
            Self::Liabilities => "liabilities",
            Self::OperatingIncome => "operating_income",
            Self::NetIncome => "net_income",
            Self::Equity => "equity",
            Self::OperatingCashFlow => "cfo",
            Self::CapitalExpenditure => "capex",
            Self::FreeCashFlow => "fcf",
        }
    }

    /// Returns true if the metric is computed from other metrics.
    #[must_use]
    pub const fn is_derived(&self) -> bool {
        matches!(self, Self::GrossMargin | Self::FreeCashFlow)
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKey {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| DataError::InvalidParameter(format!("Unknown metric key: {s}")))
    }
}

/// A stored metric, unique per (company, key).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    /// Store identifier.
    pub id: MetricId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Metric key.
    pub key: MetricKey,
    /// Display unit, set once.
    pub unit: Option<String>,
}

/// One value of a metric, unique per (metric, period end).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Owning metric.
    pub metric_id: MetricId,
    /// End of the reporting period; the point's identity within its metric.
    pub period_end: NaiveDate,
    /// Filing date of the observation the value came from.
    pub filed_at: Option<NaiveDate>,
    /// Stored value, already scaled to the metric's unit.
    pub value: f64,
    /// Filing the value was sourced from.
    pub source_filing_id: Option<FilingId>,
}

/// A metric together with its points, ordered by period end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    /// The metric record.
    pub metric: Metric,
    /// Points ascending by period end.
    pub points: Vec<MetricPoint>,
}
