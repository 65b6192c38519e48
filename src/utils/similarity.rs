//! Name similarity for catalog reconciliation
//!
//! Deterministic score in [0, 1] used to rank catalog names against a free-text
//! name from an imported report. Tiers (highest first):
//!   1. identical after normalization               → 1.0
//!   2. one name is a prefix of the other           → 0.90 .. 1.0
//!   3. one name contains the other                 → 0.75 .. 0.85
//!   4. otherwise: max(edit similarity, word overlap) capped below 0.75
//!
//! So any prefix/substring match always outranks an unrelated name.

use std::cmp::Ordering;
use strsim::normalized_levenshtein;

/// Below this score a catalog name is not offered as a candidate
pub const MIN_CANDIDATE_SCORE: f64 = 0.3;

/// Default number of candidates offered for manual resolution
pub const DEFAULT_CANDIDATE_LIMIT: usize = 5;

/// Lowercase, trim, collapse internal whitespace
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Similarity between a query and a catalog name (see module docs for tiers)
pub fn similarity(query: &str, candidate: &str) -> f64 {
    let q = normalize_name(query);
    let c = normalize_name(candidate);

    if q.is_empty() || c.is_empty() {
        return 0.0;
    }
    if q == c {
        return 1.0;
    }

    let q_len = q.chars().count() as f64;
    let c_len = c.chars().count() as f64;
    let length_ratio = q_len.min(c_len) / q_len.max(c_len);

    if c.starts_with(&q) || q.starts_with(&c) {
        // Strictly below 1.0 so an exact match always wins
        return 0.9 + 0.099 * length_ratio;
    }
    if c.contains(&q) || q.contains(&c) {
        return 0.75 + 0.1 * length_ratio;
    }

    let edit = normalized_levenshtein(&q, &c);
    let overlap = word_overlap(&q, &c);

    (0.7 * edit).max(0.7 * overlap)
}

/// Jaccard overlap of whitespace-separated words
fn word_overlap(a: &str, b: &str) -> f64 {
    let a_words: Vec<&str> = a.split(' ').collect();
    let b_words: Vec<&str> = b.split(' ').collect();

    let shared = a_words.iter().filter(|w| b_words.contains(w)).count();
    if shared == 0 {
        return 0.0;
    }
    let union = a_words.len() + b_words.len() - shared;
    shared as f64 / union as f64
}

/// Catalog name offered for manual resolution
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub score: f64,
}

/// Rank catalog names by similarity to `query`.
///
/// Sorted by score descending, ties broken by name ascending, so the result is
/// stable regardless of catalog iteration order.
pub fn rank_candidates<'a, I>(query: &str, names: I, limit: usize) -> Vec<Candidate>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut ranked: Vec<Candidate> = names
        .into_iter()
        .map(|name| Candidate {
            name: name.to_string(),
            score: similarity(query, name),
        })
        .filter(|c| c.score >= MIN_CANDIDATE_SCORE)
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(limit);
    ranked
}
