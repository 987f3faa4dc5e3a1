//! Unit selection.

use fundamentals_core::{RawObservation, UnitMap};
use tracing::debug;

/// Picks the observation list to use from a tag's units.
///
/// Resolution order:
/// 1. the first preferred unit code present;
/// 2. the first unit code containing `currency`;
/// 3. the first remaining unit code.
///
/// Unit codes are visited in sorted order, so steps 2 and 3 are
/// deterministic. Returns `None` only when `units` is empty.
#[must_use]
pub fn select_units<'a>(
    units: &'a UnitMap,
    preferred: &[&str],
    currency: &str,
) -> Option<(&'a str, &'a [RawObservation])> {
    if let Some(found) = preferred
        .iter()
        .find_map(|unit| units.get_key_value(*unit))
    {
        return Some((found.0.as_str(), found.1.as_slice()));
    }

    let fallback = units
        .iter()
        .find(|(code, _)| code.contains(currency))
        .or_else(|| units.iter().next());

    if let Some((code, _)) = fallback {
        debug!(unit = %code, ?preferred, "No preferred unit present, falling back");
    }

    fallback.map(|(code, values)| (code.as_str(), values.as_slice()))
}
