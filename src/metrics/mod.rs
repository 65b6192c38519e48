//! Scoring formulas
//!
//! - `stir`: single-pass tillage intensity and per-operation STIR
//! - `multi_tool`: custom machines (per-tool sum, delta-based edits)
//! - `eiq`: Field EIQ of a pesticide application

pub mod stir;
pub mod multi_tool;
pub mod eiq;

pub use stir::{compute_operation_stir, evaluate_stir, operation_stir_breakdown, stir_formula, StirInputs};
pub use multi_tool::{
    custom_machine_stir, propagate_tool_edit, set_displayed_depth, set_displayed_surface_fraction,
    MachineStir, ToolContribution, ToolField,
};
pub use eiq::{compute_application_eiq, evaluate_eiq, field_eiq, is_non_contributing, EiqInputs};
