//! Matching one imported name against the catalog
//!
//! Strategy, first hit wins:
//!   1. exact name
//!   2. normalized name (lowercase, trimmed, collapsed whitespace), if unique
//!   3. Unresolved, with ranked candidates for the user to choose from
//!
//! Several catalog entries sharing a normalized name are never guessed
//! between; they come back as equal-score candidates.

use crate::catalog::Catalog;
use crate::import::ImportEntry;
use crate::utils::similarity::{rank_candidates, Candidate, DEFAULT_CANDIDATE_LIMIT};
use serde::Serialize;

/// How a Matched outcome was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    Normalized,
    /// Chosen by the user from the candidates ("Map to existing")
    Manual,
}

/// Reconciliation state of one imported entry
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched { catalog_name: String, method: MatchMethod },
    /// User chose to leave the entry out ("Skip")
    Skipped,
    /// Needs a decision; candidates are best first
    Unresolved { candidates: Vec<Candidate> },
}

impl MatchOutcome {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved { .. })
    }

    pub fn catalog_name(&self) -> Option<&str> {
        match self {
            Self::Matched { catalog_name, .. } => Some(catalog_name),
            _ => None,
        }
    }
}

pub fn reconcile_import_entry(entry: &ImportEntry, catalog: &Catalog) -> MatchOutcome {
    let name = entry.name.as_str();

    if catalog.contains(entry.kind, name) {
        return MatchOutcome::Matched {
            catalog_name: name.to_string(),
            method: MatchMethod::Exact,
        };
    }

    let mut normalized = catalog.normalized_matches(entry.kind, name);
    match normalized.len() {
        0 => {}
        1 => {
            tracing::debug!("'{}' matched '{}' after normalization", name, normalized[0]);
            return MatchOutcome::Matched {
                catalog_name: normalized[0].to_string(),
                method: MatchMethod::Normalized,
            };
        }
        _ => {
            tracing::warn!("'{}' matches {} catalog names after normalization", name, normalized.len());
            normalized.sort_unstable();
            return MatchOutcome::Unresolved {
                candidates: normalized
                    .into_iter()
                    .map(|n| Candidate {
                        name: n.to_string(),
                        score: 1.0,
                    })
                    .collect(),
            };
        }
    }

    let candidates = rank_candidates(name, catalog.names(entry.kind), DEFAULT_CANDIDATE_LIMIT);
    tracing::debug!("'{}' unresolved, {} candidates", name, candidates.len());
    MatchOutcome::Unresolved { candidates }
}
