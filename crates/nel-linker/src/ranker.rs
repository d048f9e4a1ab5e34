//! Suggestion ranking

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::Suggestion;

/// Order suggestions, drop duplicate entities and keep at most `max`.
///
/// Exact matches come first, then higher scores; ties keep the backend
/// order. The first (best) suggestion of an entity wins.
pub fn rank(mut suggestions: Vec<Suggestion>, max: usize) -> Vec<Suggestion> {
    suggestions.sort_by(compare);

    let mut seen = HashSet::new();
    suggestions.retain(|s| seen.insert(s.entity.id.clone()));
    suggestions.truncate(max);
    suggestions
}

fn compare(a: &Suggestion, b: &Suggestion) -> Ordering {
    b.is_exact()
        .cmp(&a.is_exact())
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| a.backend_rank.cmp(&b.backend_rank))
}
