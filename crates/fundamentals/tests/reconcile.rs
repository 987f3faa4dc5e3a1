//! End-to-end reconciliation against both store implementations.

use std::sync::Arc;

use approx::assert_relative_eq;
use async_trait::async_trait;
use chrono::NaiveDate;
use rstest::rstest;
use serde_json::{Value, json};

use fundamentals::{
    Cik, CikDirectory, CompanyFacts, DataError, FactsProvider, FilingRecord, InMemoryStore,
    MetricKey, MetricSeries, MetricStore, MetricTransaction, Reconciler, ReconcileStatus,
    ReconcilerConfig, RecentFilings, Result, SqliteStore, Symbol,
};

const FY22_ACCN: &str = "0000320193-22-000108";
const FY23_ACCN: &str = "0000320193-23-000106";

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn fact(end: &str, val: f64, accn: &str, form: &str, filed: &str) -> Value {
    json!({"end": end, "val": val, "accn": accn, "form": form, "filed": filed})
}

fn apple_facts() -> Value {
    json!({
        "cik": 320193,
        "entityName": "Apple Inc.",
        "facts": {
            "us-gaap": {
                "Revenues": {"units": {"USD": [
                    fact("2022-09-24", 394_328_000_000.0, FY22_ACCN, "10-K", "2022-10-28"),
                    fact("2023-07-01", 81_797_000_000.0, "0000320193-23-000077", "10-Q", "2023-08-04"),
                    fact("2023-09-30", 383_285_000_000.0, FY23_ACCN, "10-K", "2023-11-03"),
                ]}},
                "GrossProfit": {"units": {"USD": [
                    fact("2023-09-30", 169_148_000_000.0, FY23_ACCN, "10-K", "2023-11-03"),
                ]}},
                "EarningsPerShareDiluted": {"units": {"USD/shares": [
                    fact("2023-09-30", 6.13, FY23_ACCN, "10-K", "2023-11-03"),
                ]}},
                "NetCashProvidedByUsedInOperatingActivities": {"units": {"USD": [
                    fact("2023-09-30", 110_543_000_000.0, FY23_ACCN, "10-K", "2023-11-03"),
                ]}},
                "PaymentsToAcquirePropertyPlantAndEquipment": {"units": {"USD": [
                    fact("2023-09-30", -10_959_000_000.0, FY23_ACCN, "10-K", "2023-11-03"),
                ]}}
            }
        }
    })
}

fn apple_filings() -> RecentFilings {
    let record = |accession: &str, form_type: &str, period_end: &str, filed_at: &str| FilingRecord {
        accession: accession.to_string(),
        form_type: form_type.to_string(),
        period_end: Some(date(period_end)),
        filed_at: Some(date(filed_at)),
    };

    RecentFilings {
        entity_name: Some("Apple Inc.".to_string()),
        filings: vec![
            record(FY23_ACCN, "10-K", "2023-09-30", "2023-11-03"),
            record("0000320193-23-000077", "10-Q", "2023-07-01", "2023-08-04"),
            // Same period as the FY22 facts, different accession.
            record("0000320193-22-000999", "10-K", "2022-09-24", "2022-10-28"),
        ],
    }
}

/// Serves one canned document for any CIK and knows only AAPL by ticker.
#[derive(Debug)]
struct CannedProvider {
    facts: Option<Value>,
    filings: RecentFilings,
}

impl CannedProvider {
    fn new(facts: Value) -> Self {
        Self {
            facts: Some(facts),
            filings: apple_filings(),
        }
    }

    fn unreachable() -> Self {
        Self {
            facts: None,
            filings: RecentFilings::default(),
        }
    }
}

#[async_trait]
impl FactsProvider for CannedProvider {
    fn name(&self) -> &str {
        "canned"
    }

    async fn company_facts(&self, cik: &Cik) -> Result<CompanyFacts> {
        match &self.facts {
            Some(facts) => CompanyFacts::from_value(facts.clone()),
            None => Err(DataError::Transient(format!("connection reset fetching {cik}"))),
        }
    }

    async fn recent_filings(&self, _cik: &Cik) -> Result<RecentFilings> {
        Ok(self.filings.clone())
    }

    async fn lookup_cik(&self, symbol: &Symbol) -> Result<Cik> {
        match symbol.as_str() {
            "AAPL" => Ok(Cik::from(320_193)),
            _ => Err(DataError::SymbolNotFound(symbol.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Backend {
    Memory,
    Sqlite,
}

impl Backend {
    fn open(self) -> Arc<dyn MetricStore> {
        match self {
            Self::Memory => Arc::new(InMemoryStore::new()),
            Self::Sqlite => Arc::new(SqliteStore::in_memory().unwrap()),
        }
    }
}

fn reconciler(backend: Backend, facts: Value) -> Reconciler {
    Reconciler::new(Arc::new(CannedProvider::new(facts)), backend.open())
}

fn series<'a>(all: &'a [MetricSeries], key: MetricKey) -> &'a MetricSeries {
    all.iter()
        .find(|s| s.metric.key == key)
        .unwrap_or_else(|| panic!("no {key} series"))
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn reconcile_stores_scaled_metrics(#[case] backend: Backend) {
    let reconciler = reconciler(backend, apple_facts());
    let symbol = Symbol::new("aapl");

    let summary = reconciler.reconcile(&symbol).await.unwrap();

    assert_eq!(summary.status, ReconcileStatus::Ok);
    assert_eq!(
        summary.metrics_updated,
        vec![
            MetricKey::Revenue,
            MetricKey::GrossProfit,
            MetricKey::EpsDiluted,
            MetricKey::OperatingCashFlow,
            MetricKey::CapitalExpenditure,
            MetricKey::GrossMargin,
            MetricKey::FreeCashFlow,
        ]
    );
    assert_eq!(summary.points_written, 8);
    assert_eq!(summary.points_unlinked, 8);

    let company = reconciler.company(&symbol).unwrap();
    assert_eq!(company.name.as_deref(), Some("Apple Inc."));
    assert_eq!(company.cik.as_ref().map(Cik::as_str), Some("0000320193"));

    let stored = reconciler.metrics(&symbol).unwrap();
    assert_eq!(stored.len(), 7);

    let revenue = series(&stored, MetricKey::Revenue);
    assert_eq!(revenue.metric.unit.as_deref(), Some("USDm"));
    let periods: Vec<_> = revenue.points.iter().map(|p| p.period_end).collect();
    assert_eq!(periods, vec![date("2022-09-24"), date("2023-09-30")]);
    assert_relative_eq!(revenue.points[0].value, 394_328.0);
    assert_relative_eq!(revenue.points[1].value, 383_285.0);
    assert_eq!(revenue.points[1].filed_at, Some(date("2023-11-03")));

    let eps = series(&stored, MetricKey::EpsDiluted);
    assert_eq!(eps.metric.unit.as_deref(), Some("USD/sh"));
    assert_relative_eq!(eps.points[0].value, 6.13);

    let gm = series(&stored, MetricKey::GrossMargin);
    assert_eq!(gm.metric.unit.as_deref(), Some("ratio"));
    assert_eq!(gm.points.len(), 1);
    assert_relative_eq!(gm.points[0].value, 169_148.0 / 383_285.0, epsilon = 1e-12);

    let fcf = series(&stored, MetricKey::FreeCashFlow);
    assert_relative_eq!(fcf.points[0].value, 99_584.0, epsilon = 1e-6);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn reconcile_is_idempotent(#[case] backend: Backend) {
    let reconciler = reconciler(backend, apple_facts());
    let symbol = Symbol::new("AAPL");

    let first = reconciler.reconcile(&symbol).await.unwrap();
    let after_first = reconciler.metrics(&symbol).unwrap();
    let second = reconciler.reconcile(&symbol).await.unwrap();
    let after_second = reconciler.metrics(&symbol).unwrap();

    assert_eq!(first, second);
    assert_eq!(after_first, after_second);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn imported_filings_become_provenance(#[case] backend: Backend) {
    let reconciler = reconciler(backend, apple_facts());
    let symbol = Symbol::new("AAPL");

    let import = reconciler.import_filings(&symbol).await.unwrap();
    assert_eq!((import.inserted, import.skipped), (2, 0));
    let again = reconciler.import_filings(&symbol).await.unwrap();
    assert_eq!((again.inserted, again.skipped), (0, 2));

    let filings = reconciler.filings(&symbol).unwrap();
    assert_eq!(filings.len(), 2);
    assert_eq!(filings[0].accession, FY23_ACCN);
    assert!(filings.iter().all(|f| f.parse_status.as_deref() == Some("imported")));
    let fy22_filing = &filings[1];

    let summary = reconciler.reconcile(&symbol).await.unwrap();
    assert_eq!(summary.points_unlinked, 0);

    let stored = reconciler.metrics(&symbol).unwrap();
    let revenue = series(&stored, MetricKey::Revenue);
    // FY22 accession is unknown; the period lookup finds the 10-K instead.
    assert_eq!(revenue.points[0].source_filing_id, Some(fy22_filing.id));
    assert_eq!(revenue.points[1].source_filing_id, Some(filings[0].id));

    let gm = series(&stored, MetricKey::GrossMargin);
    assert_eq!(gm.points[0].source_filing_id, Some(filings[0].id));
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn later_amendment_replaces_point(#[case] backend: Backend) {
    let facts = json!({"facts": {"us-gaap": {"Assets": {"units": {"USD": [
        fact("2023-09-30", 352_583_000_000.0, FY23_ACCN, "10-K", "2023-11-03"),
        fact("2023-09-30", 352_000_000_000.0, FY23_ACCN, "10-K", "2023-10-01"),
        fact("2023-09-30", 352_755_000_000.0, "0000320193-24-000001", "10-K", "2024-01-10"),
    ]}}}}});
    let reconciler = reconciler(backend, facts);
    let symbol = Symbol::new("AAPL");

    let summary = reconciler.reconcile(&symbol).await.unwrap();
    assert_eq!(summary.metrics_updated, vec![MetricKey::Assets]);

    let stored = reconciler.metrics(&symbol).unwrap();
    let assets = series(&stored, MetricKey::Assets);
    assert_eq!(assets.points.len(), 1);
    assert_relative_eq!(assets.points[0].value, 352_755.0);
    assert_eq!(assets.points[0].filed_at, Some(date("2024-01-10")));
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn tag_and_unit_fallback(#[case] backend: Backend) {
    let facts = json!({"facts": {"us-gaap": {
        "ProfitLoss": {"units": {
            "USD-GAAP-variant": [fact("2023-09-30", 1.0, "A", "10-K", "2023-11-03")],
            "USD": [fact("2023-09-30", 96_995_000_000.0, "A", "10-K", "2023-11-03")]
        }}
    }}});
    let reconciler = reconciler(backend, facts);
    let symbol = Symbol::new("AAPL");

    reconciler.reconcile(&symbol).await.unwrap();

    let stored = reconciler.metrics(&symbol).unwrap();
    let net_income = series(&stored, MetricKey::NetIncome);
    assert_relative_eq!(net_income.points[0].value, 96_995.0);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn zero_revenue_has_no_margin(#[case] backend: Backend) {
    let facts = json!({"facts": {"us-gaap": {
        "Revenues": {"units": {"USD": [fact("2023-09-30", 0.0, "A", "10-K", "2023-11-03")]}},
        "GrossProfit": {"units": {"USD": [fact("2023-09-30", 5.0, "A", "10-K", "2023-11-03")]}}
    }}});
    let reconciler = reconciler(backend, facts);
    let symbol = Symbol::new("AAPL");

    let summary = reconciler.reconcile(&symbol).await.unwrap();
    assert!(!summary.metrics_updated.contains(&MetricKey::GrossMargin));

    let stored = reconciler.metrics(&symbol).unwrap();
    assert!(stored.iter().all(|s| s.metric.key != MetricKey::GrossMargin));
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn document_without_concepts_reports_no_data(#[case] backend: Backend) {
    let reconciler = reconciler(backend, json!({"entityName": "Shell Co", "facts": {}}));
    let symbol = Symbol::new("AAPL");

    let summary = reconciler.reconcile(&symbol).await.unwrap();
    assert_eq!(summary.status, ReconcileStatus::NoData);
    assert!(summary.metrics_updated.is_empty());
    assert!(reconciler.metrics(&symbol).unwrap().is_empty());
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn fetch_failure_writes_nothing(#[case] backend: Backend) {
    let reconciler = Reconciler::new(Arc::new(CannedProvider::unreachable()), backend.open());
    let symbol = Symbol::new("AAPL");

    let err = reconciler.reconcile(&symbol).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(reconciler.company(&symbol), Err(DataError::NotFound(_))));
}

#[tokio::test]
async fn unknown_symbol_is_reported() {
    let reconciler = reconciler(Backend::Memory, apple_facts());
    let err = reconciler.reconcile(&Symbol::new("ZZZZ")).await.unwrap_err();
    assert!(matches!(err, DataError::SymbolNotFound(_)));
}

#[tokio::test]
async fn configured_directory_takes_precedence() {
    let config = ReconcilerConfig::default()
        .with_ciks(CikDirectory::new().with("APPLE", Cik::new("320193").unwrap()));
    let reconciler = reconciler(Backend::Memory, apple_facts()).with_config(config);

    let summary = reconciler.reconcile(&Symbol::new("APPLE")).await.unwrap();
    assert_eq!(summary.status, ReconcileStatus::Ok);
}

#[tokio::test]
async fn reconcile_many_keeps_input_order() {
    let reconciler = reconciler(Backend::Sqlite, apple_facts());
    let symbols = [Symbol::new("ZZZZ"), Symbol::new("AAPL"), Symbol::new("aapl")];

    let results = reconciler.reconcile_many(&symbols).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0.as_str(), "ZZZZ");
    assert!(results[0].1.is_err());
    assert_eq!(results[1].0.as_str(), "AAPL");
    assert!(results[1].1.is_ok());
}

#[tokio::test]
async fn metrics_frame_is_wide() {
    let reconciler = reconciler(Backend::Memory, apple_facts());
    let symbol = Symbol::new("AAPL");
    reconciler.reconcile(&symbol).await.unwrap();

    let df = reconciler.metrics_frame(&symbol).unwrap();
    assert_eq!(df.height(), 2);
    assert_eq!(df.width(), 8);
    let revenue = df.column("revenue").unwrap().f64().unwrap();
    assert_relative_eq!(revenue.get(1).unwrap(), 383_285.0);
}

/// Store whose transactions fail after a fixed number of point writes.
#[derive(Debug)]
struct FailingStore {
    inner: InMemoryStore,
    allowed_points: usize,
}

struct FailingWriter<'a> {
    inner: &'a mut dyn MetricTransaction,
    remaining: usize,
}

impl MetricTransaction for FailingWriter<'_> {
    fn find_or_create_company(
        &mut self,
        symbol: &Symbol,
        cik: Option<&Cik>,
        name: Option<&str>,
    ) -> Result<fundamentals::Company> {
        self.inner.find_or_create_company(symbol, cik, name)
    }

    fn find_filing_by_accession(&mut self, accession: &str) -> Result<Option<fundamentals::Filing>> {
        self.inner.find_filing_by_accession(accession)
    }

    fn find_filing_by_company_form_period(
        &mut self,
        company_id: fundamentals::CompanyId,
        form_type: &str,
        period_end: NaiveDate,
    ) -> Result<Option<fundamentals::Filing>> {
        self.inner
            .find_filing_by_company_form_period(company_id, form_type, period_end)
    }

    fn insert_filing(
        &mut self,
        company_id: fundamentals::CompanyId,
        filing: &FilingRecord,
        parse_status: &str,
    ) -> Result<bool> {
        self.inner.insert_filing(company_id, filing, parse_status)
    }

    fn upsert_metric(
        &mut self,
        company_id: fundamentals::CompanyId,
        key: MetricKey,
        unit: &str,
    ) -> Result<fundamentals::Metric> {
        self.inner.upsert_metric(company_id, key, unit)
    }

    fn upsert_metric_point(&mut self, point: &fundamentals::MetricPoint) -> Result<()> {
        if self.remaining == 0 {
            return Err(DataError::Storage("disk full".to_string()));
        }
        self.remaining -= 1;
        self.inner.upsert_metric_point(point)
    }
}

impl MetricStore for FailingStore {
    fn transaction(
        &self,
        work: &mut dyn FnMut(&mut dyn MetricTransaction) -> Result<()>,
    ) -> Result<()> {
        let allowed = self.allowed_points;
        self.inner.transaction(&mut |tx| {
            work(&mut FailingWriter {
                inner: tx,
                remaining: allowed,
            })
        })
    }

    fn company(&self, symbol: &Symbol) -> Result<Option<fundamentals::Company>> {
        self.inner.company(symbol)
    }

    fn filings(&self, company_id: fundamentals::CompanyId) -> Result<Vec<fundamentals::Filing>> {
        self.inner.filings(company_id)
    }

    fn metric_series(&self, company_id: fundamentals::CompanyId) -> Result<Vec<MetricSeries>> {
        self.inner.metric_series(company_id)
    }
}

#[tokio::test]
async fn storage_failure_rolls_back_whole_run() {
    let store = Arc::new(FailingStore {
        inner: InMemoryStore::new(),
        allowed_points: 3,
    });
    let reconciler = Reconciler::new(Arc::new(CannedProvider::new(apple_facts())), store);
    let symbol = Symbol::new("AAPL");

    let err = reconciler.reconcile(&symbol).await.unwrap_err();
    assert!(matches!(err, DataError::Storage(_)));
    assert!(matches!(reconciler.company(&symbol), Err(DataError::NotFound(_))));
}
