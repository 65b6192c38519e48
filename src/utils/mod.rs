//! Shared helpers
//!
//! - Units: cm/inch, km/h/mph, application-rate factors
//! - Bands: score classification, loadable from JSON
//! - Similarity: deterministic name ranking for reconciliation

pub mod units;
pub mod bands;
pub mod similarity;

pub use bands::{Band, BandConfigError, BandSet};
pub use similarity::{normalize_name, rank_candidates, Candidate};
pub use units::{normalize_depth, normalize_speed, unit_conversion_factor, DepthUnit, RateUnit, SpeedUnit};
