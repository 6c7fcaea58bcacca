// src/dedup.rs
//
// Merge of the two independently paginated result sets (leg-0 filter and
// leg-1 filter) into the authoritative result for a window: unique by swap
// id, ascending by timestamp.

use crate::types::Swap;
use indexmap::IndexMap;

/// Merges two normalized result sets into one sequence that is unique by
/// swap id and sorted ascending by timestamp.
///
/// Later-seen entries overwrite earlier ones. Both sets come out of the same
/// normalizer, so an overwrite replaces an identical value and the merge is
/// idempotent. The stable sort keeps insertion order for equal timestamps.
pub fn merge_filtered_sets(leg0: Vec<Swap>, leg1: Vec<Swap>) -> Vec<Swap> {
    let mut unique: IndexMap<String, Swap> = IndexMap::with_capacity(leg0.len() + leg1.len());
    for swap in leg0.into_iter().chain(leg1) {
        unique.insert(swap.id.clone(), swap);
    }
    let mut merged: Vec<Swap> = unique.into_values().collect();
    merged.sort_by_key(|swap| swap.timestamp);
    merged
}
