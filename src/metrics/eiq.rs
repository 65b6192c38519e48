//! Field EIQ: Environmental Impact Quotient of a pesticide application
//!
//!   Field EIQ = base_eiq × (ai_percent / 100) × rate × unit_factor × count
//!
//! `unit_factor` converts the application rate to a pounds-per-acre
//! equivalent (see `utils::units`). An unknown unit key converts as 1.0 and is
//! reported; every other failure scores 0 with a diagnostic.
//!
//! Adjuvants and biologicals carry no EIQ: they score 0 with an Excluded note.

use crate::diagnostics::{Diagnostic, Scored};
use crate::types::{Application, Product};
use crate::utils::units::lookup_rate_factor;

/// Inputs to one EIQ evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EiqInputs {
    pub base_eiq: f64,
    pub ai_percent: f64,
    pub rate: f64,
    pub unit_factor: f64,
    pub application_count: u32,
}

/// Bare formula, no validation
pub fn field_eiq(inputs: &EiqInputs) -> f64 {
    inputs.base_eiq
        * (inputs.ai_percent / 100.0)
        * inputs.rate
        * inputs.unit_factor
        * inputs.application_count as f64
}

/// Validated EIQ evaluation; any invalid input scores 0
pub fn evaluate_eiq(inputs: EiqInputs) -> Scored {
    let numeric = [
        ("base_eiq", inputs.base_eiq),
        ("ai_percent", inputs.ai_percent),
        ("rate", inputs.rate),
        ("unit_factor", inputs.unit_factor),
    ];
    for (field, value) in numeric {
        if !value.is_finite() {
            return Scored::failed(Diagnostic::invalid_input(
                field,
                format!("value is not a finite number ({value})"),
            ));
        }
    }

    if inputs.base_eiq < 0.0 {
        return Scored::failed(Diagnostic::invalid_input(
            "base_eiq",
            format!("must not be negative, got {}", inputs.base_eiq),
        ));
    }
    if !(0.0..=100.0).contains(&inputs.ai_percent) {
        return Scored::failed(Diagnostic::invalid_input(
            "ai_percent",
            format!("must be within 0-100, got {}", inputs.ai_percent),
        ));
    }
    if inputs.rate < 0.0 {
        return Scored::failed(Diagnostic::invalid_input(
            "rate",
            format!("must not be negative, got {}", inputs.rate),
        ));
    }
    if inputs.application_count < 1 {
        return Scored::failed(Diagnostic::invalid_input(
            "application_count",
            "must be at least 1",
        ));
    }

    Scored::clean(field_eiq(&inputs))
}

/// Product types that never contribute to Field EIQ (compared lowercase)
pub const NON_CONTRIBUTING_TYPES: [&str; 2] = ["adjuvant", "biological"];

/// Adjuvant or biological, by product type or application method
pub fn is_non_contributing(product: &Product) -> bool {
    let matches = |value: &Option<String>, names: &[&str]| {
        value
            .as_deref()
            .map(|v| names.contains(&v.trim().to_lowercase().as_str()))
            .unwrap_or(false)
    };
    matches(&product.product_type, &NON_CONTRIBUTING_TYPES) || matches(&product.application_method, &["adjuvant"])
}

/// Field EIQ of one application against its catalog product.
///
/// `product` is `None` when the application's product name did not resolve;
/// that scores 0 with an UnresolvedReference diagnostic.
pub fn compute_application_eiq(application: &Application, product: Option<&Product>) -> Scored {
    let Some(product) = product else {
        tracing::warn!("Product '{}' not found in catalog, EIQ scored as 0", application.product_name);
        return Scored::failed(Diagnostic::unresolved(
            "product_name",
            format!("product '{}' is not in the catalog", application.product_name),
        ));
    };

    if is_non_contributing(product) {
        tracing::debug!("'{}' is an adjuvant or biological, EIQ not counted", product.display_name);
        return Scored {
            value: 0.0,
            diagnostics: vec![Diagnostic::excluded(
                "product_type",
                format!("'{}' is an adjuvant or biological product, excluded from EIQ", product.display_name),
            )],
        };
    }

    let mut unit_diagnostic = None;
    let unit_factor = match lookup_rate_factor(&application.rate_unit) {
        Some(factor) => factor,
        None => {
            tracing::warn!(
                "Unrecognized rate unit '{}' on '{}', using factor 1.0",
                application.rate_unit,
                application.product_name
            );
            unit_diagnostic = Some(Diagnostic::unresolved(
                "rate_unit",
                format!("unknown unit '{}', converted with factor 1.0", application.rate_unit),
            ));
            1.0
        }
    };

    let mut scored = evaluate_eiq(EiqInputs {
        base_eiq: product.base_eiq,
        ai_percent: product.ai_percent,
        rate: application.rate,
        unit_factor,
        application_count: application.application_count,
    });

    if !scored.is_clean() {
        tracing::debug!(
            "EIQ for '{}' degraded: {:?}",
            application.product_name,
            scored.diagnostics
        );
    }
    scored.diagnostics.extend(unit_diagnostic);
    scored
}
