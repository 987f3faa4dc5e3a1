//! SQLite-based metric store.

use chrono::NaiveDate;
use fundamentals_core::{
    Cik, Company, CompanyId, DataError, Filing, FilingRecord, Metric, MetricKey, MetricPoint,
    MetricSeries, MetricStore, MetricTransaction, Result, Symbol,
};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use std::fmt::Display;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, instrument};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS companies (
        id INTEGER PRIMARY KEY,
        symbol TEXT NOT NULL UNIQUE,
        cik TEXT,
        name TEXT
    );

    CREATE TABLE IF NOT EXISTS filings (
        id INTEGER PRIMARY KEY,
        company_id INTEGER NOT NULL REFERENCES companies(id),
        accession TEXT NOT NULL UNIQUE,
        form_type TEXT NOT NULL,
        period_end TEXT,
        filed_at TEXT,
        parse_status TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_filings_company_form_period
        ON filings(company_id, form_type, period_end);

    CREATE TABLE IF NOT EXISTS metrics (
        id INTEGER PRIMARY KEY,
        company_id INTEGER NOT NULL REFERENCES companies(id),
        metric_key TEXT NOT NULL,
        unit TEXT,
        UNIQUE (company_id, metric_key)
    );

    CREATE TABLE IF NOT EXISTS metric_points (
        id INTEGER PRIMARY KEY,
        metric_id INTEGER NOT NULL REFERENCES metrics(id),
        period_end TEXT NOT NULL,
        filed_at TEXT,
        value REAL NOT NULL,
        source_filing_id INTEGER REFERENCES filings(id),
        UNIQUE (metric_id, period_end)
    );
";

const FILING_COLUMNS: &str =
    "id, company_id, accession, form_type, period_end, filed_at, parse_status";

/// SQLite-backed [`MetricStore`].
///
/// Stores companies, filings, metrics and metric points in a single database
/// file. Uniqueness of (company, metric key) and (metric, period end) is
/// enforced by constraints, and upserts resolve conflicts against them.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(storage_err)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory SQLite store.
    ///
    /// Useful for testing; data is lost when the store is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(storage_err)?;
        debug!("SQLite store schema initialized");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl MetricStore for SqliteStore {
    #[instrument(skip(self, work))]
    fn transaction(
        &self,
        work: &mut dyn FnMut(&mut dyn MetricTransaction) -> Result<()>,
    ) -> Result<()> {
        let mut conn = self.conn.lock().map_err(storage_err)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(storage_err)?;

        // Dropping `tx` on the error path rolls back.
        work(&mut SqliteWriter { conn: &tx })?;

        tx.commit().map_err(storage_err)?;
        debug!("Transaction committed");
        Ok(())
    }

    #[instrument(skip(self), fields(symbol = %symbol))]
    fn company(&self, symbol: &Symbol) -> Result<Option<Company>> {
        let conn = self.conn.lock().map_err(storage_err)?;
        company_by_symbol(&conn, symbol)
    }

    #[instrument(skip(self))]
    fn filings(&self, company_id: CompanyId) -> Result<Vec<Filing>> {
        let conn = self.conn.lock().map_err(storage_err)?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {FILING_COLUMNS} FROM filings
                 WHERE company_id = ?1
                 ORDER BY filed_at DESC, id DESC"
            ))
            .map_err(storage_err)?;

        let rows = stmt
            .query_map(params![company_id], filing_row)
            .map_err(storage_err)?;

        let mut filings = Vec::new();
        for row in rows {
            filings.push(into_filing(row.map_err(storage_err)?)?);
        }
        debug!("Found {} filings", filings.len());
        Ok(filings)
    }

    #[instrument(skip(self))]
    fn metric_series(&self, company_id: CompanyId) -> Result<Vec<MetricSeries>> {
        let conn = self.conn.lock().map_err(storage_err)?;

        let mut stmt = conn
            .prepare(
                "SELECT id, company_id, metric_key, unit FROM metrics
                 WHERE company_id = ?1
                 ORDER BY id ASC",
            )
            .map_err(storage_err)?;
        let rows = stmt
            .query_map(params![company_id], metric_row)
            .map_err(storage_err)?;
        let mut metrics = Vec::new();
        for row in rows {
            metrics.push(into_metric(row.map_err(storage_err)?)?);
        }

        let mut stmt = conn
            .prepare(
                "SELECT metric_id, period_end, filed_at, value, source_filing_id
                 FROM metric_points
                 WHERE metric_id = ?1
                 ORDER BY period_end ASC",
            )
            .map_err(storage_err)?;

        let mut series = Vec::with_capacity(metrics.len());
        for metric in metrics {
            let rows = stmt
                .query_map(params![metric.id], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                    ))
                })
                .map_err(storage_err)?;

            let mut points = Vec::new();
            for row in rows {
                let (metric_id, period_end, filed_at, value, source_filing_id) =
                    row.map_err(storage_err)?;
                points.push(MetricPoint {
                    metric_id,
                    period_end: parse_date(&period_end)?,
                    filed_at: parse_optional_date(filed_at)?,
                    value,
                    source_filing_id,
                });
            }
            series.push(MetricSeries { metric, points });
        }

        debug!("Found {} metric series", series.len());
        Ok(series)
    }
}

/// Writer bound to an open SQLite transaction.
#[derive(Debug)]
struct SqliteWriter<'a> {
    conn: &'a Connection,
}

impl MetricTransaction for SqliteWriter<'_> {
    fn find_or_create_company(
        &mut self,
        symbol: &Symbol,
        cik: Option<&Cik>,
        name: Option<&str>,
    ) -> Result<Company> {
        self.conn
            .execute(
                "INSERT INTO companies (symbol, cik, name) VALUES (?1, ?2, ?3)
                 ON CONFLICT(symbol) DO UPDATE SET
                     cik = COALESCE(companies.cik, excluded.cik),
                     name = COALESCE(companies.name, excluded.name)",
                params![symbol.as_str(), cik.map(Cik::as_str), name],
            )
            .map_err(storage_err)?;

        company_by_symbol(self.conn, symbol)?
            .ok_or_else(|| DataError::Storage(format!("Company {symbol} vanished after upsert")))
    }

    fn find_filing_by_accession(&mut self, accession: &str) -> Result<Option<Filing>> {
        self.conn
            .query_row(
                &format!("SELECT {FILING_COLUMNS} FROM filings WHERE accession = ?1"),
                params![accession],
                filing_row,
            )
            .optional()
            .map_err(storage_err)?
            .map(into_filing)
            .transpose()
    }

    fn find_filing_by_company_form_period(
        &mut self,
        company_id: CompanyId,
        form_type: &str,
        period_end: NaiveDate,
    ) -> Result<Option<Filing>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {FILING_COLUMNS} FROM filings
                     WHERE company_id = ?1 AND form_type = ?2 AND period_end = ?3
                     ORDER BY filed_at DESC, id DESC
                     LIMIT 1"
                ),
                params![company_id, form_type, period_end.to_string()],
                filing_row,
            )
            .optional()
            .map_err(storage_err)?
            .map(into_filing)
            .transpose()
    }

    fn insert_filing(
        &mut self,
        company_id: CompanyId,
        filing: &FilingRecord,
        parse_status: &str,
    ) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT INTO filings
                 (company_id, accession, form_type, period_end, filed_at, parse_status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(accession) DO NOTHING",
                params![
                    company_id,
                    filing.accession,
                    filing.form_type,
                    filing.period_end.map(|d| d.to_string()),
                    filing.filed_at.map(|d| d.to_string()),
                    parse_status
                ],
            )
            .map_err(storage_err)?;
        Ok(inserted == 1)
    }

    fn upsert_metric(
        &mut self,
        company_id: CompanyId,
        key: MetricKey,
        unit: &str,
    ) -> Result<Metric> {
        self.conn
            .execute(
                "INSERT INTO metrics (company_id, metric_key, unit) VALUES (?1, ?2, ?3)
                 ON CONFLICT(company_id, metric_key) DO UPDATE SET
                     unit = COALESCE(metrics.unit, excluded.unit)",
                params![company_id, key.as_str(), unit],
            )
            .map_err(storage_err)?;

        let row = self
            .conn
            .query_row(
                "SELECT id, company_id, metric_key, unit FROM metrics
                 WHERE company_id = ?1 AND metric_key = ?2",
                params![company_id, key.as_str()],
                metric_row,
            )
            .map_err(storage_err)?;
        into_metric(row)
    }

    fn upsert_metric_point(&mut self, point: &MetricPoint) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO metric_points
                 (metric_id, period_end, filed_at, value, source_filing_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(metric_id, period_end) DO UPDATE SET
                     value = excluded.value,
                     filed_at = COALESCE(excluded.filed_at, metric_points.filed_at),
                     source_filing_id = COALESCE(excluded.source_filing_id, metric_points.source_filing_id)",
                params![
                    point.metric_id,
                    point.period_end.to_string(),
                    point.filed_at.map(|d| d.to_string()),
                    point.value,
                    point.source_filing_id
                ],
            )
            .map_err(storage_err)?;
        Ok(())
    }
}

type FilingRow = (
    i64,
    i64,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn filing_row(row: &Row<'_>) -> rusqlite::Result<FilingRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn into_filing(row: FilingRow) -> Result<Filing> {
    let (id, company_id, accession, form_type, period_end, filed_at, parse_status) = row;
    Ok(Filing {
        id,
        company_id,
        accession,
        form_type,
        period_end: parse_optional_date(period_end)?,
        filed_at: parse_optional_date(filed_at)?,
        parse_status,
    })
}

type MetricRow = (i64, i64, String, Option<String>);

fn metric_row(row: &Row<'_>) -> rusqlite::Result<MetricRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_metric(row: MetricRow) -> Result<Metric> {
    let (id, company_id, key, unit) = row;
    Ok(Metric {
        id,
        company_id,
        key: key
            .parse()
            .map_err(|e| DataError::Storage(format!("Corrupt metric row {id}: {e}")))?,
        unit,
    })
}

fn company_by_symbol(conn: &Connection, symbol: &Symbol) -> Result<Option<Company>> {
    let row = conn
        .query_row(
            "SELECT id, symbol, cik, name FROM companies WHERE symbol = ?1",
            params![symbol.as_str()],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        )
        .optional()
        .map_err(storage_err)?;

    row.map(|(id, symbol, cik, name)| {
        Ok(Company {
            id,
            symbol: Symbol::new(symbol),
            cik: cik
                .map(|raw| Cik::new(&raw))
                .transpose()
                .map_err(|e| DataError::Storage(format!("Corrupt company row {id}: {e}")))?,
            name,
        })
    })
    .transpose()
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| DataError::Storage(format!("Invalid stored date {raw:?}: {e}")))
}

fn parse_optional_date(raw: Option<String>) -> Result<Option<NaiveDate>> {
    raw.as_deref().map(parse_date).transpose()
}

fn storage_err(e: impl Display) -> DataError {
    DataError::Storage(e.to_string())
}
