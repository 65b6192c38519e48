//! STIR: Soil Tillage Intensity Rating
//!
//! Scores the soil disturbance of a single tool pass:
//!
//!   non-rotating: (tf × 3.25) × (speed × 0.5)        × depth × sf × ff
//!   rotating/PTO: (tf × 3.25) × ((11 − speed) × 0.5) × depth × sf × ff
//!
//! with speed in km/h and depth in cm. Depth is clamped to ≥ 0 (a tool lifted
//! out of the ground disturbs nothing).
//!
//! Rotating implements driven above 11 km/h produce a NEGATIVE contribution.
//! This is kept literally and not clamped; callers see it in the total.

use crate::diagnostics::{Diagnostic, Scored};
use crate::metrics::multi_tool::{custom_machine_stir, ToolContribution};
use crate::types::{MachineRef, Operation};

/// Multiplier applied to the tillage type factor
pub const TILLAGE_FACTOR_SCALE: f64 = 3.25;

/// Multiplier applied to the speed term
pub const SPEED_SCALE: f64 = 0.5;

/// Reference speed (km/h) for PTO-driven implements
pub const PTO_REFERENCE_SPEED_KMH: f64 = 11.0;

/// Inputs to one STIR evaluation (metric units)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StirInputs {
    pub tillage_factor: f64,
    pub speed_kmh: f64,
    pub depth_cm: f64,
    pub surface_fraction: f64,
    pub field_fraction: f64,
    pub rotates: bool,
}

/// Speed term: speed × 0.5, or (11 − speed) × 0.5 for rotating implements
pub fn speed_term(speed_kmh: f64, rotates: bool) -> f64 {
    if rotates {
        (PTO_REFERENCE_SPEED_KMH - speed_kmh) * SPEED_SCALE
    } else {
        speed_kmh * SPEED_SCALE
    }
}

/// Bare formula; only depth is clamped
pub fn stir_formula(inputs: &StirInputs) -> f64 {
    let depth = inputs.depth_cm.max(0.0);
    (inputs.tillage_factor * TILLAGE_FACTOR_SCALE)
        * speed_term(inputs.speed_kmh, inputs.rotates)
        * depth
        * inputs.surface_fraction
        * inputs.field_fraction
}

/// Validated STIR evaluation.
///
/// Non-finite inputs score 0 with an InvalidInput diagnostic. Negative depth
/// or speed clamps to 0; tillage factor and fractions clamp into [0, 1]. Each
/// clamp is reported.
pub fn evaluate_stir(inputs: StirInputs, field_prefix: &str) -> Scored {
    let fields = [
        ("tillage_factor", inputs.tillage_factor),
        ("speed", inputs.speed_kmh),
        ("depth", inputs.depth_cm),
        ("surface_fraction", inputs.surface_fraction),
        ("field_fraction", inputs.field_fraction),
    ];
    for (name, value) in fields {
        if !value.is_finite() {
            tracing::warn!("STIR input {}{} is not finite: {}", field_prefix, name, value);
            return Scored::failed(Diagnostic::invalid_input(
                format!("{field_prefix}{name}"),
                format!("value is not a finite number ({value})"),
            ));
        }
    }

    let mut diagnostics = Vec::new();
    let mut clamp = |name: &str, value: f64, lo: f64, hi: f64| -> f64 {
        let clamped = value.clamp(lo, hi);
        if clamped != value {
            diagnostics.push(Diagnostic::invalid_input(
                format!("{field_prefix}{name}"),
                format!("{value} is out of range, clamped to {clamped}"),
            ));
        }
        clamped
    };

    let clamped = StirInputs {
        tillage_factor: clamp("tillage_factor", inputs.tillage_factor, 0.0, 1.0),
        speed_kmh: clamp("speed", inputs.speed_kmh, 0.0, f64::MAX),
        depth_cm: clamp("depth", inputs.depth_cm, 0.0, f64::MAX),
        surface_fraction: clamp("surface_fraction", inputs.surface_fraction, 0.0, 1.0),
        field_fraction: clamp("field_fraction", inputs.field_fraction, 0.0, 1.0),
        rotates: inputs.rotates,
    };

    let value = stir_formula(&clamped);
    if value < 0.0 {
        tracing::debug!(
            "Rotating implement above {} km/h scores negative STIR ({:.3})",
            PTO_REFERENCE_SPEED_KMH,
            value
        );
    }

    Scored { value, diagnostics }
}

/// STIR contribution of one operation (all passes).
///
/// Standard machines use the operation's own parameters; custom machines sum
/// their tools at the operation's speed and field fraction.
pub fn compute_operation_stir(operation: &Operation) -> Scored {
    operation_stir_breakdown(operation).0
}

/// Operation STIR plus per-tool shares (custom machines only), both
/// multiplied by the number of passes
pub fn operation_stir_breakdown(operation: &Operation) -> (Scored, Vec<ToolContribution>) {
    let (mut scored, mut tools) = match &operation.machine {
        MachineRef::Standard { .. } => {
            let scored = evaluate_stir(
                StirInputs {
                    tillage_factor: operation.tillage_factor,
                    speed_kmh: operation.speed,
                    depth_cm: operation.depth,
                    surface_fraction: operation.surface_fraction,
                    field_fraction: operation.field_fraction,
                    rotates: operation.rotates,
                },
                "",
            );
            (scored, Vec::new())
        }
        MachineRef::Custom { machine } => {
            let breakdown = custom_machine_stir(machine, operation.speed, operation.field_fraction);
            let scored = Scored {
                value: breakdown.total,
                diagnostics: breakdown.diagnostics,
            };
            (scored, breakdown.tools)
        }
    };

    if operation.passes == 0 {
        scored.diagnostics.push(Diagnostic::invalid_input(
            "passes",
            "an operation needs at least one pass, scored as 0",
        ));
    }
    let passes = operation.passes as f64;
    scored.value *= passes;
    for tool in &mut tools {
        tool.stir *= passes;
    }
    (scored, tools)
}
