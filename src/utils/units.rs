//! Unit Conversion
//!
//! Depth, speed and application-rate conversions. Everything downstream works
//! in metric (cm, km/h) for tillage and pounds-per-acre equivalents for rates.
//!
//! Rate units are looked up leniently: an unrecognized unit key converts with a
//! multiplier of 1.0 instead of failing, so a typo in an imported unit never
//! aborts a calculation. Callers that need to surface this use
//! [`lookup_rate_factor`], which returns `None` for unknown keys.

use serde::{Deserialize, Serialize};

/// 1 cm = 0.393701 inch
pub const INCH_PER_CM: f64 = 0.393701;

/// 1 km/h = 0.621371 mph
pub const MPH_PER_KMH: f64 = 0.621371;

pub fn cm_to_inch(cm: f64) -> f64 {
    cm * INCH_PER_CM
}

pub fn inch_to_cm(inch: f64) -> f64 {
    inch / INCH_PER_CM
}

pub fn kmh_to_mph(kmh: f64) -> f64 {
    kmh * MPH_PER_KMH
}

pub fn mph_to_kmh(mph: f64) -> f64 {
    mph / MPH_PER_KMH
}

/// Unit a depth value is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthUnit {
    #[default]
    Cm,
    Inch,
}

impl DepthUnit {
    /// Parse "cm" / "in" / "inch" / "inches" (case-insensitive)
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "cm" | "centimeter" | "centimeters" => Some(Self::Cm),
            "in" | "inch" | "inches" | "\"" => Some(Self::Inch),
            _ => None,
        }
    }

    pub fn to_cm(self, value: f64) -> f64 {
        match self {
            Self::Cm => value,
            Self::Inch => inch_to_cm(value),
        }
    }

    pub fn from_cm(self, cm: f64) -> f64 {
        match self {
            Self::Cm => cm,
            Self::Inch => cm_to_inch(cm),
        }
    }
}

/// Unit a speed value is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    #[default]
    Kmh,
    Mph,
}

impl SpeedUnit {
    /// Parse "km/h" / "kmh" / "mph" (case-insensitive)
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "km/h" | "kmh" | "kph" => Some(Self::Kmh),
            "mph" | "mi/h" => Some(Self::Mph),
            _ => None,
        }
    }

    pub fn to_kmh(self, value: f64) -> f64 {
        match self {
            Self::Kmh => value,
            Self::Mph => mph_to_kmh(value),
        }
    }

    pub fn from_kmh(self, kmh: f64) -> f64 {
        match self {
            Self::Kmh => kmh,
            Self::Mph => kmh_to_mph(kmh),
        }
    }
}

/// Normalize a depth in any supported unit to centimeters.
///
/// An unrecognized unit label is treated as centimeters.
pub fn normalize_depth(value: f64, unit: &str) -> f64 {
    match DepthUnit::parse(unit) {
        Some(u) => u.to_cm(value),
        None => {
            tracing::warn!("Unknown depth unit '{}', assuming cm", unit);
            value
        }
    }
}

/// Normalize a speed in any supported unit to km/h.
///
/// An unrecognized unit label is treated as km/h.
pub fn normalize_speed(value: f64, unit: &str) -> f64 {
    match SpeedUnit::parse(unit) {
        Some(u) => u.to_kmh(value),
        None => {
            tracing::warn!("Unknown speed unit '{}', assuming km/h", unit);
            value
        }
    }
}

/// Application-rate units with a fixed pounds-per-acre equivalent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    QuartsPerAcre,
    PintsPerAcre,
    FlOzPerAcre,
    OzPerAcre,
    LbsPerAcre,
    KgPerHa,
}

impl RateUnit {
    pub const ALL: [RateUnit; 6] = [
        RateUnit::QuartsPerAcre,
        RateUnit::PintsPerAcre,
        RateUnit::FlOzPerAcre,
        RateUnit::OzPerAcre,
        RateUnit::LbsPerAcre,
        RateUnit::KgPerHa,
    ];

    /// Canonical key as stored on applications and catalog rows
    pub fn key(self) -> &'static str {
        match self {
            Self::QuartsPerAcre => "quarts/acre",
            Self::PintsPerAcre => "pints/acre",
            Self::FlOzPerAcre => "fl oz/acre",
            Self::OzPerAcre => "oz/acre",
            Self::LbsPerAcre => "lbs/acre",
            Self::KgPerHa => "kg/ha",
        }
    }

    /// Multiplier to pounds-per-acre equivalent.
    ///
    /// Volume units assume a product density of water-like liquids:
    /// 1 quart ≈ 2 lb, 1 pint ≈ 1 lb, 16 fl oz ≈ 1 lb.
    pub fn lbs_per_acre_factor(self) -> f64 {
        match self {
            Self::QuartsPerAcre => 2.0,
            Self::PintsPerAcre => 1.0,
            Self::FlOzPerAcre => 1.0 / 16.0,
            Self::OzPerAcre => 1.0 / 16.0,
            Self::LbsPerAcre => 1.0,
            Self::KgPerHa => 0.892,
        }
    }

    /// Parse a rate unit key, accepting common abbreviations
    pub fn parse(raw: &str) -> Option<Self> {
        let key = collapse_whitespace(&raw.trim().to_lowercase());
        let unit = match key.as_str() {
            "quarts/acre" | "quart/acre" | "qt/acre" | "qt/ac" | "qts/acre" => Self::QuartsPerAcre,
            "pints/acre" | "pint/acre" | "pt/acre" | "pt/ac" | "pts/acre" => Self::PintsPerAcre,
            "fl oz/acre" | "fl oz/ac" | "floz/acre" | "fl. oz/acre" => Self::FlOzPerAcre,
            "oz/acre" | "oz/ac" => Self::OzPerAcre,
            "lbs/acre" | "lb/acre" | "lbs/ac" | "lb/ac" => Self::LbsPerAcre,
            "kg/ha" => Self::KgPerHa,
            _ => return None,
        };
        Some(unit)
    }
}

/// Pounds-per-acre multiplier for a unit key, `None` if the key is unknown
pub fn lookup_rate_factor(unit_key: &str) -> Option<f64> {
    RateUnit::parse(unit_key).map(RateUnit::lbs_per_acre_factor)
}

/// Pounds-per-acre multiplier for a unit key; unknown keys convert as 1.0
pub fn unit_conversion_factor(unit_key: &str) -> f64 {
    lookup_rate_factor(unit_key).unwrap_or_else(|| {
        tracing::warn!("Unrecognized rate unit '{}', using factor 1.0", unit_key);
        1.0
    })
}

/// Map long-form unit labels found in external reports ("Pint per Acre") to
/// rate unit keys. Short keys pass through `RateUnit::parse`.
pub fn rate_unit_from_label(label: &str) -> Option<RateUnit> {
    if let Some(unit) = RateUnit::parse(label) {
        return Some(unit);
    }
    let unit = match collapse_whitespace(&label.trim().to_lowercase()).as_str() {
        "pounds per acre" | "pound per acre" => RateUnit::LbsPerAcre,
        "ounce per acre" | "ounces per acre" => RateUnit::OzPerAcre,
        "fluid ounce per acre" | "fluid ounces per acre" => RateUnit::FlOzPerAcre,
        "pint per acre" | "pints per acre" => RateUnit::PintsPerAcre,
        "liquid quart per acre" | "quart per acre" | "quarts per acre" => RateUnit::QuartsPerAcre,
        "kilograms per hectare" | "kilograms per hectares" | "kilogram per hectare" => RateUnit::KgPerHa,
        _ => return None,
    };
    Some(unit)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
