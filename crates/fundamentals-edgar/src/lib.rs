#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fundamentals/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! SEC EDGAR provider for company facts and filing metadata.
//!
//! This crate provides access to:
//!
//! - CIK (Central Index Key) lookup from ticker symbols
//! - Company facts (XBRL) from the EDGAR API
//! - Recent filings from the submissions API
//!
//! Requests are rate limited to the SEC's 10 requests per second. Nothing is
//! retried here; transient failures are reported as
//! [`DataError::Transient`] for the caller to handle.
//!
//! # Example
//!
//! ```no_run
//! use fundamentals_core::{FactsProvider, Symbol};
//! use fundamentals_edgar::EdgarProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = EdgarProvider::new("MyApp/1.0 (contact@example.com)")?;
//!
//!     let cik = provider.lookup_cik(&Symbol::new("AAPL")).await?;
//!     let facts = provider.company_facts(&cik).await?;
//!     println!("{:?}: {} taxonomies", facts.entity_name, facts.facts.len());
//!
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use fundamentals_core::{
    Cik, CompanyFacts, DataError, FactsProvider, FilingRecord, RecentFilings, Result, Symbol,
};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// SEC EDGAR API base URL
const EDGAR_BASE_URL: &str = "https://data.sec.gov";

/// SEC company tickers URL
const COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// Default rate limit: 10 requests per second (SEC requirement)
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(100);

/// Rate limiter to ensure we don't exceed SEC's rate limits
#[derive(Debug)]
struct RateLimiter {
    last_request: Instant,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Instant::now() - min_interval,
            min_interval,
        }
    }

    async fn wait(&mut self) {
        let elapsed = self.last_request.elapsed();
        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }
        self.last_request = Instant::now();
    }
}

/// SEC EDGAR provider.
///
/// Fetches company facts, submissions and the ticker directory.
/// Implements rate limiting per SEC requirements (max 10 requests/second).
#[derive(Debug)]
pub struct EdgarProvider {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    base_url: String,
    tickers_url: String,
    tickers: Mutex<Option<HashMap<String, Cik>>>,
}

impl EdgarProvider {
    /// Create a new EDGAR provider with the specified user agent.
    ///
    /// The SEC requires identifying user agent headers. Format should be:
    /// "AppName/Version (contact@email.com)"
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(user_agent: &str) -> Result<Self> {
        if user_agent.trim().is_empty() {
            return Err(DataError::InvalidParameter(
                "SEC requires a non-empty user agent".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DataError::Other(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client))
    }

    /// Create a new EDGAR provider with a pre-configured HTTP client.
    ///
    /// The client must already carry an identifying user agent.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(DEFAULT_RATE_LIMIT))),
            base_url: EDGAR_BASE_URL.to_string(),
            tickers_url: COMPANY_TICKERS_URL.to_string(),
            tickers: Mutex::new(None),
        }
    }

    /// Point the provider at a different API host, e.g. a mirror.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Point the provider at a different ticker directory.
    #[must_use]
    pub fn with_tickers_url(mut self, tickers_url: impl Into<String>) -> Self {
        self.tickers_url = tickers_url.into();
        self
    }

    /// Fetch a URL and return the response body.
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.rate_limiter.lock().await.wait().await;

        debug!("Fetching {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DataError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, url));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DataError::Transient(e.to_string()))?;
        Ok(body.to_vec())
    }

    /// Look a ticker up in the SEC ticker directory, fetching and caching
    /// the directory on first use.
    async fn ticker_cik(&self, ticker: &str) -> Result<Option<Cik>> {
        let mut cached = self.tickers.lock().await;
        if let Some(directory) = cached.as_ref() {
            return Ok(directory.get(ticker).cloned());
        }

        debug!("Fetching company tickers from SEC");
        let body = self.get_bytes(&self.tickers_url).await?;
        let directory = parse_ticker_directory(&body)?;
        debug!("Loaded {} tickers", directory.len());

        Ok(cached.insert(directory).get(ticker).cloned())
    }
}

#[async_trait]
impl FactsProvider for EdgarProvider {
    fn name(&self) -> &str {
        "SEC EDGAR"
    }

    async fn company_facts(&self, cik: &Cik) -> Result<CompanyFacts> {
        let url = format!("{}/api/xbrl/companyfacts/CIK{}.json", self.base_url, cik);
        let body = self.get_bytes(&url).await?;
        CompanyFacts::from_slice(&body)
    }

    async fn recent_filings(&self, cik: &Cik) -> Result<RecentFilings> {
        let url = format!("{}/submissions/CIK{}.json", self.base_url, cik);
        let body = self.get_bytes(&url).await?;
        parse_submissions(&body)
    }

    async fn lookup_cik(&self, symbol: &Symbol) -> Result<Cik> {
        if symbol.as_str().is_empty() {
            return Err(DataError::InvalidParameter("Empty ticker".to_string()));
        }

        let cik = self
            .ticker_cik(symbol.as_str())
            .await?
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))?;
        debug!("Found CIK {} for ticker {}", cik, symbol);
        Ok(cik)
    }
}

/// Map a non-success HTTP status to the error taxonomy.
fn status_error(status: StatusCode, url: &str) -> DataError {
    if status == StatusCode::NOT_FOUND {
        DataError::NotFound(url.to_string())
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        DataError::Transient(format!("HTTP {status} from {url}"))
    } else {
        DataError::Other(format!("HTTP {status} from {url}"))
    }
}

fn parse_ticker_directory(body: &[u8]) -> Result<HashMap<String, Cik>> {
    let data: HashMap<String, CompanyTickerInfo> = serde_json::from_slice(body).map_err(|e| {
        DataError::InvalidResponse(format!("Failed to parse company tickers: {e}"))
    })?;

    Ok(data
        .into_values()
        .map(|company| (company.ticker.to_uppercase(), Cik::from(company.cik_str)))
        .collect())
}

fn parse_submissions(body: &[u8]) -> Result<RecentFilings> {
    let submissions: CompanySubmissions = serde_json::from_slice(body)
        .map_err(|e| DataError::InvalidResponse(format!("Failed to parse submissions: {e}")))?;

    let recent = submissions.filings.recent;
    let filings = recent
        .accession_number
        .iter()
        .enumerate()
        .filter_map(|(i, accession)| {
            let form_type = recent.form.get(i)?.clone();
            Some(FilingRecord {
                accession: accession.clone(),
                form_type,
                period_end: recent.report_date.get(i).and_then(|d| parse_date(d)),
                filed_at: recent.filing_date.get(i).and_then(|d| parse_date(d)),
            })
        })
        .collect();

    Ok(RecentFilings {
        entity_name: submissions.name,
        filings,
    })
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

// =============================================================================
// SEC API Response Types
// =============================================================================

/// Company ticker information from SEC JSON.
#[derive(Debug, Deserialize)]
struct CompanyTickerInfo {
    /// CIK as a number (SEC returns this as an integer)
    cik_str: u64,
    /// Ticker symbol
    ticker: String,
}

/// Company submissions/filings metadata.
#[derive(Debug, Deserialize)]
struct CompanySubmissions {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    filings: SubmissionFilings,
}

#[derive(Debug, Default, Deserialize)]
struct SubmissionFilings {
    #[serde(default)]
    recent: RecentColumns,
}

/// The submissions API reports recent filings column-wise.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentColumns {
    #[serde(default)]
    accession_number: Vec<String>,
    #[serde(default)]
    form: Vec<String>,
    #[serde(default)]
    filing_date: Vec<String>,
    #[serde(default)]
    report_date: Vec<String>,
}

// =============================================================================
// Tests
// =============================================================================
