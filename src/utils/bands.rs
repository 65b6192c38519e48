//! Classification bands
//!
//! Converts a total score into a labelled, colored band. Band sets are
//! configuration: STIR ships with a built-in default, EIQ bands are normally
//! loaded from a JSON file supplied by the deployment.
//!
//! Boundary convention: bands are lower-inclusive / upper-exclusive. A total
//! falls into the first band whose `upper_bound` is strictly greater than the
//! total; a total equal to a boundary belongs to the next band up. The last
//! band may be open-ended (`upper_bound: null`).
//!
//! JSON format:
//! ```json
//! { "bands": [
//!     { "upper_bound": 20.0, "label": "Low", "color": "#E6F5E6" },
//!     { "upper_bound": null, "label": "High", "color": "#F5E6E6" }
//! ] }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// A single classification band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Exclusive upper bound; `None` = open-ended
    pub upper_bound: Option<f64>,
    pub label: String,
    pub color: String,
}

impl Band {
    pub fn new(upper_bound: Option<f64>, label: &str, color: &str) -> Self {
        Self {
            upper_bound,
            label: label.to_string(),
            color: color.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BandConfigError {
    #[error("band set must contain at least one band")]
    Empty,

    #[error("band {index} upper bound {bound} is not greater than the previous bound")]
    NotAscending { index: usize, bound: f64 },

    #[error("band {index} is open-ended but is not the last band")]
    OpenBandNotLast { index: usize },

    #[error("band {index} has a non-finite upper bound")]
    NonFinite { index: usize },
}

/// Ordered, validated list of bands
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandSet {
    bands: Vec<Band>,
}

#[derive(Debug, Deserialize)]
struct BandFile {
    bands: Vec<Band>,
}

impl BandSet {
    pub fn new(bands: Vec<Band>) -> std::result::Result<Self, BandConfigError> {
        if bands.is_empty() {
            return Err(BandConfigError::Empty);
        }

        let mut previous: Option<f64> = None;
        for (index, band) in bands.iter().enumerate() {
            match band.upper_bound {
                None if index + 1 != bands.len() => {
                    return Err(BandConfigError::OpenBandNotLast { index });
                }
                None => {}
                Some(bound) if !bound.is_finite() => {
                    return Err(BandConfigError::NonFinite { index });
                }
                Some(bound) => {
                    if previous.is_some_and(|p| bound <= p) {
                        return Err(BandConfigError::NotAscending { index, bound });
                    }
                    previous = Some(bound);
                }
            }
        }

        Ok(Self { bands })
    }

    /// Light [0,100), Medium [100,300), Intense [300,600), Very Intense [600,∞)
    pub fn stir_default() -> Self {
        Self {
            bands: vec![
                Band::new(Some(100.0), "Light", "#4CAF50"),
                Band::new(Some(300.0), "Medium", "#FFC107"),
                Band::new(Some(600.0), "Intense", "#FF9800"),
                Band::new(None, "Very Intense", "#F44336"),
            ],
        }
    }

    /// Low < 20, Moderate < 40, High ≥ 40 (Field EIQ per hectare-season)
    pub fn eiq_default() -> Self {
        Self {
            bands: vec![
                Band::new(Some(20.0), "Low Environmental Impact", "#E6F5E6"),
                Band::new(Some(40.0), "Moderate Environmental Impact", "#FFF5E6"),
                Band::new(None, "High Environmental Impact", "#F5E6E6"),
            ],
        }
    }

    /// Load a band set from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read band configuration: {:?}", path))?;

        Self::from_json(&contents)
            .with_context(|| format!("Invalid band configuration: {:?}", path))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: BandFile = serde_json::from_str(json)
            .with_context(|| "Failed to parse band configuration JSON")?;

        let set = Self::new(file.bands)?;
        tracing::debug!("Loaded {} bands", set.bands.len());
        Ok(set)
    }

    /// First band whose upper bound exceeds `total`, else the last band
    pub fn classify(&self, total: f64) -> &Band {
        self.bands
            .iter()
            .find(|band| band.upper_bound.map_or(true, |bound| total < bound))
            .unwrap_or_else(|| self.highest())
    }

    pub fn lowest(&self) -> &Band {
        &self.bands[0]
    }

    pub fn highest(&self) -> &Band {
        &self.bands[self.bands.len() - 1]
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }
}
