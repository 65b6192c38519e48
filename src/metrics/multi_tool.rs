//! Multi-tool machine allocation
//!
//! A custom machine's STIR is the sum over its tools, each run through the
//! single-tool formula with the machine-level speed and field fraction and
//! the tool's own tillage factor, depth, surface fraction and rotation.
//!
//! Edits made on the machine's displayed (aggregate) value are propagated as a
//! DELTA to every tool, then clamped per tool. Tools at different depths keep
//! their absolute offsets until one hits the ground surface; nothing is
//! scaled proportionally.
//!
//!   depths [10, 3] with displayed depth edited 10 → 5 (delta −5) → [5, 0]

use crate::diagnostics::Diagnostic;
use crate::metrics::stir::{evaluate_stir, StirInputs};
use crate::types::CustomMachine;
use serde::{Deserialize, Serialize};

/// Per-tool share of a custom machine's STIR
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolContribution {
    /// Position in the machine's tool list (empty slots keep their index)
    pub tool_index: usize,
    pub name: String,
    pub stir: f64,
}

/// Breakdown of a custom machine's STIR
#[derive(Debug, Clone, PartialEq)]
pub struct MachineStir {
    pub total: f64,
    pub tools: Vec<ToolContribution>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Tool field edited through the machine's aggregate display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolField {
    Depth,
    SurfaceFraction,
    TillageFactor,
}

/// Sum per-tool STIR for a custom machine
pub fn custom_machine_stir(machine: &CustomMachine, speed_kmh: f64, field_fraction: f64) -> MachineStir {
    let mut total = 0.0;
    let mut tools = Vec::with_capacity(machine.tools.len());
    let mut diagnostics = Vec::new();

    for (tool_index, tool) in machine.tools.iter().enumerate() {
        if tool.is_empty() {
            continue;
        }

        let prefix = format!("tool{}.", tool_index + 1);
        let scored = evaluate_stir(
            StirInputs {
                tillage_factor: tool.tillage_factor,
                speed_kmh,
                depth_cm: tool.depth,
                surface_fraction: tool.surface_fraction,
                field_fraction,
                rotates: tool.rotates,
            },
            &prefix,
        );

        total += scored.value;
        diagnostics.extend(scored.diagnostics);
        tools.push(ToolContribution {
            tool_index,
            name: tool.name.clone(),
            stir: scored.value,
        });
    }

    MachineStir {
        total,
        tools,
        diagnostics,
    }
}

/// Apply the same `delta` to `field` on every active tool, clamping each result.
///
/// Depth clamps to ≥ 0; surface fraction and tillage factor clamp into [0, 1].
/// Returns the edited machine; the input is left untouched.
pub fn propagate_tool_edit(machine: &CustomMachine, field: ToolField, delta: f64) -> CustomMachine {
    let mut edited = machine.clone();
    if !delta.is_finite() {
        tracing::warn!("Ignoring non-finite {:?} delta on '{}'", field, machine.name);
        return edited;
    }

    for tool in edited.tools.iter_mut().filter(|t| !t.is_empty()) {
        match field {
            ToolField::Depth => {
                let depth = tool.depth + delta;
                if depth < 0.0 {
                    tracing::debug!("Tool '{}' lifted out of the ground ({:.2} cm → 0)", tool.name, depth);
                }
                tool.depth = depth.max(0.0);
            }
            ToolField::SurfaceFraction => {
                tool.surface_fraction = (tool.surface_fraction + delta).clamp(0.0, 1.0);
            }
            ToolField::TillageFactor => {
                tool.tillage_factor = (tool.tillage_factor + delta).clamp(0.0, 1.0);
            }
        }
    }

    edited
}

/// Set the machine's displayed depth (max tool depth) by propagating the delta
pub fn set_displayed_depth(machine: &CustomMachine, new_depth: f64) -> CustomMachine {
    let delta = new_depth - machine.displayed_depth();
    propagate_tool_edit(machine, ToolField::Depth, delta)
}

/// Set the machine's displayed surface fraction (max over tools) by delta
pub fn set_displayed_surface_fraction(machine: &CustomMachine, new_fraction: f64) -> CustomMachine {
    let delta = new_fraction - machine.displayed_surface_fraction();
    propagate_tool_edit(machine, ToolField::SurfaceFraction, delta)
}
