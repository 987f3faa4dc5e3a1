//! Concept catalog: which XBRL tags and units feed each metric.
//!
//! Different filers, and the same filer in different years, use different but
//! equivalent tags for one concept. Candidate tags are listed most preferred
//! first; the first one present in a document wins.

use fundamentals_core::MetricKey;
use serde::{Deserialize, Serialize};

/// Unit label for amounts stored in millions of the reporting currency.
pub const UNIT_MILLIONS: &str = "USDm";
/// Unit label for per-share amounts.
pub const UNIT_PER_SHARE: &str = "USD/sh";
/// Unit label for dimensionless ratios.
pub const UNIT_RATIO: &str = "ratio";

const MONETARY_UNITS: &[&str] = &["USD"];
const PER_SHARE_UNITS: &[&str] = &["USD/shares", "USD/share"];

/// How raw values are scaled before they are stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scale {
    /// Raw currency amounts are divided by one million.
    Millions,
    /// Values are stored as computed.
    Unscaled,
}

impl Scale {
    /// Applies the scale to a raw value.
    #[must_use]
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Self::Millions => value / 1_000_000.0,
            Self::Unscaled => value,
        }
    }
}

/// Extraction rules for one primitive metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConceptSpec {
    /// Metric the concept feeds.
    pub key: MetricKey,
    /// Candidate tags, most preferred first.
    pub tags: &'static [&'static str],
    /// Preferred unit codes, most preferred first.
    pub units: &'static [&'static str],
}

/// Every primitive concept, in reconciliation order.
pub const PRIMITIVE_CONCEPTS: [ConceptSpec; 10] = [
    ConceptSpec {
        key: MetricKey::Revenue,
        tags: &[
            "RevenueFromContractWithCustomerExcludingAssessedTax",
            "SalesRevenueNet",
            "Revenues",
        ],
        units: MONETARY_UNITS,
    },
    ConceptSpec {
        key: MetricKey::GrossProfit,
        tags: &["GrossProfit"],
        units: MONETARY_UNITS,
    },
    ConceptSpec {
        key: MetricKey::EpsDiluted,
        tags: &["EarningsPerShareDiluted"],
        units: PER_SHARE_UNITS,
    },
    ConceptSpec {
        key: MetricKey::Assets,
        tags: &["Assets"],
        units: MONETARY_UNITS,
    },
    ConceptSpec {
        key: MetricKey::Liabilities,
        tags: &["Liabilities"],
        units: MONETARY_UNITS,
    },
    ConceptSpec {
        key: MetricKey::OperatingIncome,
        tags: &["OperatingIncomeLoss"],
        units: MONETARY_UNITS,
    },
    ConceptSpec {
        key: MetricKey::NetIncome,
        tags: &["NetIncomeLoss", "ProfitLoss"],
        units: MONETARY_UNITS,
    },
    ConceptSpec {
        key: MetricKey::Equity,
        tags: &[
            "StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
            "StockholdersEquity",
        ],
        units: MONETARY_UNITS,
    },
    ConceptSpec {
        key: MetricKey::OperatingCashFlow,
        tags: &["NetCashProvidedByUsedInOperatingActivities"],
        units: MONETARY_UNITS,
    },
    ConceptSpec {
        key: MetricKey::CapitalExpenditure,
        tags: &[
            "PaymentsToAcquirePropertyPlantAndEquipment",
            "PaymentsForProceedsFromProductiveAssets",
        ],
        units: MONETARY_UNITS,
    },
];

/// Returns the extraction rules for a primitive metric.
///
/// Derived metrics have no concept and return `None`.
#[must_use]
pub fn concept(key: MetricKey) -> Option<&'static ConceptSpec> {
    PRIMITIVE_CONCEPTS.iter().find(|spec| spec.key == key)
}

/// Returns the display unit a metric is stored in.
#[must_use]
pub const fn unit_label(key: MetricKey) -> &'static str {
    match key {
        MetricKey::EpsDiluted => UNIT_PER_SHARE,
        MetricKey::GrossMargin => UNIT_RATIO,
        _ => UNIT_MILLIONS,
    }
}

/// Returns how a metric's raw values are scaled before storage.
#[must_use]
pub const fn scale(key: MetricKey) -> Scale {
    match key {
        MetricKey::EpsDiluted | MetricKey::GrossMargin => Scale::Unscaled,
        _ => Scale::Millions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn every_primitive_key_has_a_concept() {
        for key in MetricKey::ALL {
            assert_eq!(concept(key).is_some(), !key.is_derived(), "{key}");
        }
    }

    #[test]
    fn revenue_prefers_asc_606_tag() {
        let spec = concept(MetricKey::Revenue).unwrap();
        assert_eq!(
            spec.tags.first(),
            Some(&"RevenueFromContractWithCustomerExcludingAssessedTax")
        );
    }

    #[test]
    fn ratios_and_per_share_values_are_unscaled() {
        assert_eq!(scale(MetricKey::GrossMargin), Scale::Unscaled);
        assert_eq!(scale(MetricKey::EpsDiluted), Scale::Unscaled);
        assert_eq!(unit_label(MetricKey::EpsDiluted), "USD/sh");
        assert_eq!(unit_label(MetricKey::FreeCashFlow), "USDm");
    }

    #[test]
    fn millions_divides_by_one_million() {
        assert_relative_eq!(Scale::Millions.apply(383_285_000_000.0), 383_285.0);
        assert_relative_eq!(Scale::Unscaled.apply(6.13), 6.13);
    }
}
