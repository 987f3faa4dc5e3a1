//! Tag resolution.

use fundamentals_core::{TagMap, UnitMap};

/// Yields the candidate tags present in the taxonomy, with their units, in
/// candidate order.
///
/// Matching is by exact tag name only. Callers take the first entry that
/// carries usable observations.
pub fn candidate_tags<'a, 'c>(
    taxonomy: &'a TagMap,
    candidates: &'c [&'c str],
) -> impl Iterator<Item = (&'a str, &'a UnitMap)> {
    candidates.iter().filter_map(move |candidate| {
        taxonomy
            .get_key_value(*candidate)
            .map(|(tag, facts)| (tag.as_str(), &facts.units))
    })
}
