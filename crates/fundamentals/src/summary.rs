//! Run summaries returned to callers.

use fundamentals_core::{MetricKey, Symbol};
use serde::{Deserialize, Serialize};

/// Outcome of a successful reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStatus {
    /// At least one metric received points.
    Ok,
    /// The document carried none of the known concepts; nothing was written
    /// besides the company record.
    NoData,
}

/// Summary of one reconciliation run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    /// Symbol that was reconciled.
    pub symbol: Symbol,
    /// Metrics that had at least one point written, in reconciliation order.
    pub metrics_updated: Vec<MetricKey>,
    /// Run outcome.
    pub status: ReconcileStatus,
    /// Points inserted or overwritten.
    pub points_written: usize,
    /// Points stored without a source filing.
    pub points_unlinked: usize,
}

impl ReconcileSummary {
    pub(crate) const fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            metrics_updated: Vec::new(),
            status: ReconcileStatus::NoData,
            points_written: 0,
            points_unlinked: 0,
        }
    }
}

/// Summary of a filing import.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// Symbol whose filings were imported.
    pub symbol: Symbol,
    /// Filings newly stored.
    pub inserted: usize,
    /// Filings already present, matched by accession number.
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = ReconcileSummary {
            symbol: Symbol::new("AAPL"),
            metrics_updated: vec![MetricKey::Revenue, MetricKey::GrossMargin],
            status: ReconcileStatus::Ok,
            points_written: 3,
            points_unlinked: 1,
        };

        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            json!({
                "symbol": "AAPL",
                "metricsUpdated": ["revenue", "gm"],
                "status": "ok",
                "pointsWritten": 3,
                "pointsUnlinked": 1
            })
        );
    }

    #[test]
    fn test_empty_summary_reports_no_data() {
        let summary = ReconcileSummary::new(Symbol::new("XYZ"));
        assert_eq!(summary.status, ReconcileStatus::NoData);
        assert_eq!(serde_json::to_value(summary.status).unwrap(), json!("no_data"));
    }
}
