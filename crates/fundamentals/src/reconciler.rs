//! The reconciliation engine: fetch, extract, then upsert in one transaction.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use polars::prelude::DataFrame;
use tracing::{debug, info, instrument, warn};

use fundamentals_core::{
    Cik, Company, CompanyId, DataError, FactsProvider, Filing, FilingId, FilingRecord,
    MetricPoint, MetricSeries, MetricStore, MetricTransaction, Result, Symbol,
};
use fundamentals_extract::{Observation, extract_metrics, scale, unit_label};

use crate::{
    config::ReconcilerConfig,
    frame::series_frame,
    summary::{ImportSummary, ReconcileStatus, ReconcileSummary},
};

/// Parse status recorded on filings stored by [`Reconciler::import_filings`].
pub const IMPORTED_STATUS: &str = "imported";

/// Reconciles a provider's company facts into a metric store.
///
/// Holds its collaborators explicitly; there is no process-wide state. Runs
/// for different companies are independent and may proceed concurrently.
/// Runs for the same company are serialized by the store's transaction.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use fundamentals::{EdgarProvider, Reconciler, SqliteStore, Symbol};
///
/// let provider = EdgarProvider::new("MyApp/1.0 (contact@example.com)")?;
/// let store = SqliteStore::new("fundamentals.db")?;
/// let reconciler = Reconciler::new(Arc::new(provider), Arc::new(store));
///
/// let summary = reconciler.reconcile(&Symbol::new("AAPL")).await?;
/// println!("{:?}", summary.metrics_updated);
/// ```
pub struct Reconciler {
    provider: Arc<dyn FactsProvider>,
    store: Arc<dyn MetricStore>,
    config: ReconcilerConfig,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("provider", &self.provider.name())
            .field("store", &self.store)
            .field("config", &self.config)
            .finish()
    }
}

impl Reconciler {
    /// Create a reconciler with the default configuration.
    #[must_use]
    pub fn new(provider: Arc<dyn FactsProvider>, store: Arc<dyn MetricStore>) -> Self {
        Self {
            provider,
            store,
            config: ReconcilerConfig::default(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Resolves a symbol to its CIK: configured directory first, then the
    /// provider's lookup.
    ///
    /// # Errors
    /// Returns `SymbolNotFound` when neither knows the symbol.
    pub async fn resolve_cik(&self, symbol: &Symbol) -> Result<Cik> {
        if let Some(cik) = self.config.ciks.get(symbol) {
            return Ok(cik.clone());
        }
        debug!(%symbol, provider = self.provider.name(), "Symbol not in directory, asking provider");
        self.provider.lookup_cik(symbol).await
    }

    /// Reconciles every known metric for one company.
    ///
    /// The facts are fetched before anything is written, so a fetch failure
    /// leaves the store untouched. All writes then happen in one store
    /// transaction: either every point is stored or none is.
    ///
    /// # Errors
    /// Returns the provider's error if the CIK or facts cannot be fetched,
    /// and `Storage` if any write fails.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn reconcile(&self, symbol: &Symbol) -> Result<ReconcileSummary> {
        let cik = self.resolve_cik(symbol).await?;
        info!(%cik, provider = self.provider.name(), "Fetching company facts");
        let facts = self.provider.company_facts(&cik).await?;

        let extracted = extract_metrics(&facts, &self.config.extract_options());
        let annual_form = self.config.annual_form.as_str();
        let mut summary = ReconcileSummary::new(symbol.clone());

        self.store.transaction(&mut |tx| {
            summary = ReconcileSummary::new(symbol.clone());
            let company = tx.find_or_create_company(symbol, Some(&cik), facts.entity_name.as_deref())?;

            for (key, series) in &extracted {
                if series.is_empty() {
                    debug!(metric = %key, "No observations, skipping");
                    continue;
                }

                let metric = tx.upsert_metric(company.id, *key, unit_label(*key))?;
                let scaling = scale(*key);

                for obs in &series.observations {
                    let source_filing_id = resolve_source(tx, company.id, annual_form, obs)?;
                    if source_filing_id.is_none() {
                        debug!(metric = %key, period_end = %obs.period_end, "No source filing");
                        summary.points_unlinked += 1;
                    }

                    tx.upsert_metric_point(&MetricPoint {
                        metric_id: metric.id,
                        period_end: obs.period_end,
                        filed_at: obs.filed,
                        value: scaling.apply(obs.value),
                        source_filing_id,
                    })?;
                    summary.points_written += 1;
                }

                summary.metrics_updated.push(*key);
            }
            Ok(())
        })?;

        if !summary.metrics_updated.is_empty() {
            summary.status = ReconcileStatus::Ok;
        }
        info!(
            metrics = summary.metrics_updated.len(),
            points = summary.points_written,
            unlinked = summary.points_unlinked,
            "Reconciliation committed"
        );
        Ok(summary)
    }

    /// Reconciles several companies concurrently.
    ///
    /// Results are returned in input order; one company's failure does not
    /// affect the others. Duplicate symbols are reconciled once.
    pub async fn reconcile_many(
        &self,
        symbols: &[Symbol],
    ) -> Vec<(Symbol, Result<ReconcileSummary>)> {
        let mut unique: Vec<&Symbol> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            if !unique.contains(&symbol) {
                unique.push(symbol);
            }
        }

        stream::iter(unique)
            .map(|symbol| async move {
                let result = self.reconcile(symbol).await;
                if let Err(e) = &result {
                    warn!(%symbol, error = %e, "Reconciliation failed");
                }
                (symbol.clone(), result)
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await
    }

    /// Lists the company's most recent annual-report filings as the registry
    /// reports them, without storing anything.
    ///
    /// # Errors
    /// Returns the provider's error, or `NotSupported` if it does not list
    /// filings.
    pub async fn recent_filings(&self, symbol: &Symbol, limit: usize) -> Result<Vec<FilingRecord>> {
        let cik = self.resolve_cik(symbol).await?;
        let recent = self.provider.recent_filings(&cik).await?;
        Ok(recent
            .filings
            .into_iter()
            .filter(|f| f.form_type == self.config.annual_form)
            .take(limit)
            .collect())
    }

    /// Stores the company's annual-report filings that are not yet known.
    ///
    /// Stored filings become provenance targets for later reconciliation runs.
    ///
    /// # Errors
    /// Returns the provider's error if the filings cannot be fetched, and
    /// `Storage` if any write fails.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn import_filings(&self, symbol: &Symbol) -> Result<ImportSummary> {
        let cik = self.resolve_cik(symbol).await?;
        info!(%cik, provider = self.provider.name(), "Fetching recent filings");
        let recent = self.provider.recent_filings(&cik).await?;
        let annual_form = self.config.annual_form.as_str();

        let mut summary = ImportSummary {
            symbol: symbol.clone(),
            inserted: 0,
            skipped: 0,
        };

        self.store.transaction(&mut |tx| {
            summary.inserted = 0;
            summary.skipped = 0;
            let company =
                tx.find_or_create_company(symbol, Some(&cik), recent.entity_name.as_deref())?;

            for filing in recent.filings.iter().filter(|f| f.form_type == annual_form) {
                if tx.insert_filing(company.id, filing, IMPORTED_STATUS)? {
                    summary.inserted += 1;
                } else {
                    summary.skipped += 1;
                }
            }
            Ok(())
        })?;

        info!(
            inserted = summary.inserted,
            skipped = summary.skipped,
            "Filing import committed"
        );
        Ok(summary)
    }

    /// Looks up a stored company.
    ///
    /// # Errors
    /// Returns `NotFound` if the company has never been reconciled or imported.
    pub fn company(&self, symbol: &Symbol) -> Result<Company> {
        self.store
            .company(symbol)?
            .ok_or_else(|| DataError::NotFound(format!("No stored company for {symbol}")))
    }

    /// Lists a company's stored filings, most recently filed first.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown company and `Storage` on read failure.
    pub fn filings(&self, symbol: &Symbol) -> Result<Vec<Filing>> {
        let company = self.company(symbol)?;
        self.store.filings(company.id)
    }

    /// Lists a company's stored metric series, points ascending by period end.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown company and `Storage` on read failure.
    pub fn metrics(&self, symbol: &Symbol) -> Result<Vec<MetricSeries>> {
        let company = self.company(symbol)?;
        self.store.metric_series(company.id)
    }

    /// Exports a company's stored metrics as a wide DataFrame.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown company, `Storage` on read failure,
    /// and `Other` if the frame cannot be built.
    pub fn metrics_frame(&self, symbol: &Symbol) -> Result<DataFrame> {
        series_frame(&self.metrics(symbol)?)
    }
}

/// Finds the filing an observation came from: by accession number first,
/// then by (company, annual form, period end).
fn resolve_source(
    tx: &mut dyn MetricTransaction,
    company_id: CompanyId,
    annual_form: &str,
    obs: &Observation,
) -> Result<Option<FilingId>> {
    if let Some(accession) = obs.accession.as_deref() {
        if let Some(filing) = tx.find_filing_by_accession(accession)? {
            return Ok(Some(filing.id));
        }
    }

    Ok(tx
        .find_filing_by_company_form_period(company_id, annual_form, obs.period_end)?
        .map(|filing| filing.id))
}
