//! Field Impact Scorer
//!
//! Soil Tillage Intensity Rating (STIR) for tillage seasons and Field EIQ for
//! pesticide scenarios, with season/scenario aggregation, band classification
//! and reconciliation of imported records against a catalog.
//!
//! Layout:
//! - `utils/`: unit conversion, classification bands, name similarity
//! - `metrics/`: STIR, multi-tool machines, EIQ
//! - `aggregation`: totals, per-group subtotals, band
//! - `data` / `catalog`: CSV catalogs loaded with Polars
//! - `import/`: matching imported names, user decisions
//! - `codec`: JSON and flattened-CSV encodings
//! - `scorer`: season and scenario scoring, scenario comparison
//!
//! Everything is synchronous and recomputed from scratch on each call.

pub mod utils;
pub mod diagnostics;
pub mod types;
pub mod metrics;
pub mod aggregation;
pub mod schema;
pub mod data;
pub mod catalog;
pub mod codec;
pub mod import;
pub mod scorer;

// Re-export commonly used types
pub use aggregation::{aggregate, Aggregate, Aggregator, GroupSubtotal};
pub use catalog::{Catalog, CatalogError, EntryKind};
pub use diagnostics::{Diagnostic, DiagnosticKind, Scored};
pub use import::{reconcile_import_entry, ImportEntry, ImportSession, MatchOutcome, ReconcileError};
pub use metrics::{compute_application_eiq, compute_operation_stir, propagate_tool_edit, ToolField};
pub use scorer::{ImpactScorer, ScenarioComparison, ScenarioScore, SeasonScore};
pub use types::*;
pub use utils::{Band, BandSet};
