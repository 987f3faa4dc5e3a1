//! In-memory store implementation.

use chrono::NaiveDate;
use fundamentals_core::{
    Cik, Company, CompanyId, DataError, Filing, FilingRecord, Metric, MetricId, MetricKey,
    MetricPoint, MetricSeries, MetricStore, MetricTransaction, Result, Symbol,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use tracing::{debug, instrument};

/// Tables of the in-memory store.
#[derive(Debug, Clone, Default)]
struct State {
    companies: HashMap<Symbol, Company>,
    filings: Vec<Filing>,
    metrics: HashMap<(CompanyId, MetricKey), Metric>,
    points: BTreeMap<(MetricId, NaiveDate), MetricPoint>,
    next_id: i64,
}

impl State {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Simple in-memory store for testing and development.
///
/// A transaction works on a copy of the tables, which replaces the live copy
/// only when the unit of work succeeds. Data is lost when the store is
/// dropped.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricStore for InMemoryStore {
    #[instrument(skip(self, work))]
    fn transaction(
        &self,
        work: &mut dyn FnMut(&mut dyn MetricTransaction) -> Result<()>,
    ) -> Result<()> {
        let mut live = self.state.write().map_err(|e| DataError::Storage(e.to_string()))?;
        let mut staged = live.clone();

        work(&mut MemoryWriter { state: &mut staged })?;

        *live = staged;
        debug!("Transaction committed");
        Ok(())
    }

    fn company(&self, symbol: &Symbol) -> Result<Option<Company>> {
        let state = self.state.read().map_err(|e| DataError::Storage(e.to_string()))?;
        Ok(state.companies.get(symbol).cloned())
    }

    fn filings(&self, company_id: CompanyId) -> Result<Vec<Filing>> {
        let state = self.state.read().map_err(|e| DataError::Storage(e.to_string()))?;
        let mut filings: Vec<Filing> = state
            .filings
            .iter()
            .filter(|f| f.company_id == company_id)
            .cloned()
            .collect();
        filings.sort_by(|a, b| (b.filed_at, b.id).cmp(&(a.filed_at, a.id)));
        Ok(filings)
    }

    fn metric_series(&self, company_id: CompanyId) -> Result<Vec<MetricSeries>> {
        let state = self.state.read().map_err(|e| DataError::Storage(e.to_string()))?;
        let mut metrics: Vec<&Metric> = state
            .metrics
            .values()
            .filter(|m| m.company_id == company_id)
            .collect();
        metrics.sort_by_key(|m| m.id);

        Ok(metrics
            .into_iter()
            .map(|metric| MetricSeries {
                metric: metric.clone(),
                points: state
                    .points
                    .range((metric.id, NaiveDate::MIN)..=(metric.id, NaiveDate::MAX))
                    .map(|(_, point)| point.clone())
                    .collect(),
            })
            .collect())
    }
}

/// Writer over the staged copy of the tables.
#[derive(Debug)]
struct MemoryWriter<'a> {
    state: &'a mut State,
}

impl MetricTransaction for MemoryWriter<'_> {
    fn find_or_create_company(
        &mut self,
        symbol: &Symbol,
        cik: Option<&Cik>,
        name: Option<&str>,
    ) -> Result<Company> {
        if !self.state.companies.contains_key(symbol) {
            let id = self.state.allocate_id();
            self.state.companies.insert(
                symbol.clone(),
                Company {
                    id,
                    symbol: symbol.clone(),
                    cik: None,
                    name: None,
                },
            );
        }

        let company = self
            .state
            .companies
            .get_mut(symbol)
            .ok_or_else(|| DataError::Storage(format!("Company {symbol} vanished after insert")))?;
        if company.cik.is_none() {
            company.cik = cik.cloned();
        }
        if company.name.is_none() {
            company.name = name.map(str::to_string);
        }
        Ok(company.clone())
    }

    fn find_filing_by_accession(&mut self, accession: &str) -> Result<Option<Filing>> {
        Ok(self
            .state
            .filings
            .iter()
            .find(|f| f.accession == accession)
            .cloned())
    }

    fn find_filing_by_company_form_period(
        &mut self,
        company_id: CompanyId,
        form_type: &str,
        period_end: NaiveDate,
    ) -> Result<Option<Filing>> {
        Ok(self
            .state
            .filings
            .iter()
            .filter(|f| {
                f.company_id == company_id
                    && f.form_type == form_type
                    && f.period_end == Some(period_end)
            })
            .max_by_key(|f| (f.filed_at, f.id))
            .cloned())
    }

    fn insert_filing(
        &mut self,
        company_id: CompanyId,
        filing: &FilingRecord,
        parse_status: &str,
    ) -> Result<bool> {
        if self
            .state
            .filings
            .iter()
            .any(|f| f.accession == filing.accession)
        {
            return Ok(false);
        }

        let id = self.state.allocate_id();
        self.state.filings.push(Filing {
            id,
            company_id,
            accession: filing.accession.clone(),
            form_type: filing.form_type.clone(),
            period_end: filing.period_end,
            filed_at: filing.filed_at,
            parse_status: Some(parse_status.to_string()),
        });
        Ok(true)
    }

    fn upsert_metric(
        &mut self,
        company_id: CompanyId,
        key: MetricKey,
        unit: &str,
    ) -> Result<Metric> {
        if let Some(metric) = self.state.metrics.get_mut(&(company_id, key)) {
            if metric.unit.is_none() {
                metric.unit = Some(unit.to_string());
            }
            return Ok(metric.clone());
        }

        let metric = Metric {
            id: self.state.allocate_id(),
            company_id,
            key,
            unit: Some(unit.to_string()),
        };
        self.state.metrics.insert((company_id, key), metric.clone());
        Ok(metric)
    }

    fn upsert_metric_point(&mut self, point: &MetricPoint) -> Result<()> {
        let key = (point.metric_id, point.period_end);
        match self.state.points.get_mut(&key) {
            Some(existing) => {
                existing.value = point.value;
                existing.filed_at = point.filed_at.or(existing.filed_at);
                existing.source_filing_id = point.source_filing_id.or(existing.source_filing_id);
            }
            None => {
                self.state.points.insert(key, point.clone());
            }
        }
        Ok(())
    }
}
