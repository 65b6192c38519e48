//! Domain types: machines, operations, seasons, products, applications, scenarios
//!
//! Canonical storage units: depth in cm, speed in km/h, fractions in 0–1.
//! Aggregates own their children (a Season owns its Operations, a Scenario its
//! Applications, a CustomMachine its tools). Catalog entries are referenced by
//! name only.

use crate::metrics::multi_tool::{set_displayed_depth, set_displayed_surface_fraction};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;

/// Maximum number of tools on a custom machine
pub const MAX_TOOLS: usize = 10;

/// Tool list stored inline (never more than `MAX_TOOLS`)
pub type ToolList = SmallVec<[CustomMachineTool; MAX_TOOLS]>;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("custom machine '{0}' must have at least one tool")]
    NoTools(String),

    #[error("custom machine '{name}' has {count} tools, maximum is {max}", max = MAX_TOOLS)]
    TooManyTools { name: String, count: usize },

    #[error("tool index {index} out of range (machine has {len} tools)")]
    ToolIndexOutOfRange { index: usize, len: usize },
}

// ============================================================================
// Machines
// ============================================================================

/// Timing group of a tillage operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationGroup {
    #[serde(rename = "pre-plant")]
    PrePlant,
    #[serde(rename = "in-season")]
    InSeason,
    #[serde(rename = "harvest")]
    Harvest,
}

impl OperationGroup {
    pub const ALL: [OperationGroup; 3] = [
        OperationGroup::PrePlant,
        OperationGroup::InSeason,
        OperationGroup::Harvest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PrePlant => "pre-plant",
            Self::InSeason => "in-season",
            Self::Harvest => "harvest",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().replace([' ', '_'], "-").as_str() {
            "pre-plant" | "preplant" => Some(Self::PrePlant),
            "in-season" | "inseason" => Some(Self::InSeason),
            "harvest" => Some(Self::Harvest),
            _ => None,
        }
    }
}

impl fmt::Display for OperationGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog machine with default operating parameters (read-only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardMachine {
    pub name: String,
    pub depth: f64,
    pub speed: f64,
    pub surface_fraction: f64,
    pub tillage_factor: f64,
    pub rotates: bool,
    #[serde(default)]
    pub picture: String,
}

/// One tool on a custom machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomMachineTool {
    pub name: String,
    pub depth: f64,
    pub surface_fraction: f64,
    pub tillage_factor: f64,
    pub rotates: bool,
}

impl CustomMachineTool {
    pub fn new(name: &str, depth: f64, surface_fraction: f64, tillage_factor: f64, rotates: bool) -> Self {
        Self {
            name: name.to_string(),
            depth,
            surface_fraction,
            tillage_factor,
            rotates,
        }
    }

    /// A placeholder slot with no meaningful data; ignored for scoring and edits
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty()
            && self.depth == 0.0
            && self.surface_fraction == 1.0
            && self.tillage_factor == 0.0
    }
}

/// User-built machine with 1–10 tools sharing one travel speed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomMachine {
    pub name: String,
    pub speed: f64,
    pub tools: ToolList,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub picture: String,
}

impl CustomMachine {
    pub fn new(name: &str, speed: f64, tools: Vec<CustomMachineTool>) -> Result<Self, ModelError> {
        if tools.is_empty() {
            return Err(ModelError::NoTools(name.to_string()));
        }
        if tools.len() > MAX_TOOLS {
            return Err(ModelError::TooManyTools {
                name: name.to_string(),
                count: tools.len(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            speed,
            tools: tools.into_iter().collect(),
            notes: String::new(),
            picture: String::new(),
        })
    }

    pub fn add_tool(&mut self, tool: CustomMachineTool) -> Result<(), ModelError> {
        if self.tools.len() >= MAX_TOOLS {
            return Err(ModelError::TooManyTools {
                name: self.name.clone(),
                count: self.tools.len() + 1,
            });
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn remove_tool(&mut self, index: usize) -> Result<CustomMachineTool, ModelError> {
        if index >= self.tools.len() {
            return Err(ModelError::ToolIndexOutOfRange {
                index,
                len: self.tools.len(),
            });
        }
        if self.tools.len() == 1 {
            return Err(ModelError::NoTools(self.name.clone()));
        }
        Ok(self.tools.remove(index))
    }

    /// Tools carrying data (empty placeholder slots skipped)
    pub fn active_tools(&self) -> impl Iterator<Item = &CustomMachineTool> {
        self.tools.iter().filter(|t| !t.is_empty())
    }

    /// max(tool.depth) over active tools
    pub fn displayed_depth(&self) -> f64 {
        self.active_tools().map(|t| t.depth).fold(0.0, f64::max)
    }

    /// max(tool.surface_fraction) over active tools (1.0 if none)
    pub fn displayed_surface_fraction(&self) -> f64 {
        self.active_tools()
            .map(|t| t.surface_fraction)
            .reduce(f64::max)
            .unwrap_or(1.0)
    }

    /// First active tool's tillage factor
    pub fn displayed_tillage_factor(&self) -> f64 {
        self.active_tools().next().map_or(0.0, |t| t.tillage_factor)
    }

    pub fn displayed_rotates(&self) -> bool {
        self.active_tools().any(|t| t.rotates)
    }
}

/// What an operation was created from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MachineRef {
    /// Catalog machine, by name
    Standard { name: String },
    /// Embedded snapshot; later catalog edits do not affect this operation
    Custom { machine: CustomMachine },
}

impl MachineRef {
    pub fn name(&self) -> &str {
        match self {
            Self::Standard { name } => name,
            Self::Custom { machine } => &machine.name,
        }
    }

    pub fn custom(&self) -> Option<&CustomMachine> {
        match self {
            Self::Custom { machine } => Some(machine),
            Self::Standard { .. } => None,
        }
    }
}

fn default_fraction() -> f64 {
    1.0
}

fn default_passes() -> u32 {
    1
}

/// One tillage pass in a season
///
/// For custom machines the scalar parameters hold the *displayed* aggregate
/// values; scoring uses the embedded tools plus `speed` and `field_fraction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub group: OperationGroup,
    pub machine: MachineRef,
    pub tillage_factor: f64,
    pub depth: f64,
    pub speed: f64,
    pub surface_fraction: f64,
    #[serde(default = "default_fraction")]
    pub field_fraction: f64,
    pub rotates: bool,
    #[serde(default = "default_passes")]
    pub passes: u32,
}

impl Operation {
    /// Operation initialised from a catalog machine's defaults
    pub fn from_standard(group: OperationGroup, machine: &StandardMachine) -> Self {
        Self {
            group,
            machine: MachineRef::Standard {
                name: machine.name.clone(),
            },
            tillage_factor: machine.tillage_factor,
            depth: machine.depth,
            speed: machine.speed,
            surface_fraction: machine.surface_fraction,
            field_fraction: 1.0,
            rotates: machine.rotates,
            passes: 1,
        }
    }

    /// Operation embedding a snapshot of a custom machine
    pub fn from_custom(group: OperationGroup, machine: CustomMachine) -> Self {
        Self {
            group,
            tillage_factor: machine.displayed_tillage_factor(),
            depth: machine.displayed_depth(),
            speed: machine.speed,
            surface_fraction: machine.displayed_surface_fraction(),
            field_fraction: 1.0,
            rotates: machine.displayed_rotates(),
            passes: 1,
            machine: MachineRef::Custom { machine },
        }
    }

    pub fn machine_name(&self) -> &str {
        self.machine.name()
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.machine, MachineRef::Custom { .. })
    }

    /// Edit the operation's depth (cm).
    ///
    /// A custom machine snapshot takes the change as a delta on every tool,
    /// then the displayed depth is read back from the tools.
    pub fn set_depth(&mut self, depth: f64) {
        match &mut self.machine {
            MachineRef::Standard { .. } => self.depth = depth,
            MachineRef::Custom { machine } => {
                *machine = set_displayed_depth(machine, depth);
                self.depth = machine.displayed_depth();
            }
        }
    }

    /// Edit the operation's surface fraction, same delta rule as `set_depth`
    pub fn set_surface_fraction(&mut self, surface_fraction: f64) {
        match &mut self.machine {
            MachineRef::Standard { .. } => self.surface_fraction = surface_fraction,
            MachineRef::Custom { machine } => {
                *machine = set_displayed_surface_fraction(machine, surface_fraction);
                self.surface_fraction = machine.displayed_surface_fraction();
            }
        }
    }
}

/// Ordered tillage operations for one season
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Season {
    pub name: String,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl Season {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            operations: Vec::new(),
        }
    }
}

// ============================================================================
// Pesticides
// ============================================================================

/// Catalog pesticide product (read-only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub display_name: String,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub application_method: Option<String>,
    pub base_eiq: f64,
    pub ai_percent: f64,
    pub default_rate: f64,
    pub default_rate_unit: String,
}

/// One product application within a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub product_name: String,
    #[serde(default)]
    pub product_type: Option<String>,
    pub rate: f64,
    /// Rate unit key (see `utils::units::RateUnit`); unknown keys convert as 1.0
    pub rate_unit: String,
    #[serde(default = "default_passes")]
    pub application_count: u32,
    /// Kept for record completeness but left out of totals
    #[serde(default)]
    pub excluded: bool,
}

impl Application {
    /// Application at the product's label default rate, applied once
    pub fn from_product(product: &Product) -> Self {
        Self {
            product_name: product.display_name.clone(),
            product_type: product.product_type.clone(),
            rate: product.default_rate,
            rate_unit: product.default_rate_unit.clone(),
            application_count: 1,
            excluded: false,
        }
    }
}

/// Ordered pesticide applications, optionally paired with a tillage season
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default)]
    pub season: Option<Season>,
}

impl Scenario {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            applications: Vec::new(),
            season: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tool(name: &str, depth: f64, sf: f64) -> CustomMachineTool {
        CustomMachineTool::new(name, depth, sf, 0.7, false)
    }

    #[test]
    fn test_tool_count_limits() {
        assert_eq!(
            CustomMachine::new("empty", 8.0, vec![]),
            Err(ModelError::NoTools("empty".to_string()))
        );

        let eleven: Vec<_> = (0..11).map(|i| tool(&format!("t{i}"), 5.0, 0.5)).collect();
        assert!(matches!(
            CustomMachine::new("big", 8.0, eleven),
            Err(ModelError::TooManyTools { count: 11, .. })
        ));

        let ten: Vec<_> = (0..10).map(|i| tool(&format!("t{i}"), 5.0, 0.5)).collect();
        let mut machine = CustomMachine::new("full", 8.0, ten).unwrap();
        assert!(machine.add_tool(tool("extra", 1.0, 0.1)).is_err());
        assert_eq!(machine.tools.len(), 10);
    }

    #[test]
    fn test_remove_last_tool_rejected() {
        let mut machine = CustomMachine::new("m", 8.0, vec![tool("a", 5.0, 0.5), tool("b", 3.0, 0.2)]).unwrap();
        assert_eq!(machine.remove_tool(0).unwrap().name, "a");
        assert!(matches!(machine.remove_tool(0), Err(ModelError::NoTools(_))));
        assert!(matches!(
            machine.remove_tool(4),
            Err(ModelError::ToolIndexOutOfRange { index: 4, len: 1 })
        ));
    }

    #[test]
    fn test_displayed_values() {
        let machine = CustomMachine::new(
            "combo",
            9.0,
            vec![
                CustomMachineTool::new("disc", 10.0, 0.4, 0.8, false),
                CustomMachineTool::new("tine", 3.0, 0.9, 0.4, true),
            ],
        )
        .unwrap();

        assert_eq!(machine.displayed_depth(), 10.0);
        assert_eq!(machine.displayed_surface_fraction(), 0.9);
        assert_eq!(machine.displayed_tillage_factor(), 0.8);
        assert!(machine.displayed_rotates());
    }

    #[test]
    fn test_empty_tool_slots_ignored() {
        let placeholder = CustomMachineTool::new("", 0.0, 1.0, 0.0, false);
        assert!(placeholder.is_empty());

        let machine = CustomMachine::new("m", 8.0, vec![placeholder, tool("real", 4.0, 0.3)]).unwrap();
        assert_eq!(machine.active_tools().count(), 1);
        assert_eq!(machine.displayed_surface_fraction(), 0.3);
    }

    #[test]
    fn test_operation_from_custom_uses_displayed_values() {
        let machine = CustomMachine::new("m", 7.5, vec![tool("a", 12.0, 0.6), tool("b", 4.0, 0.8)]).unwrap();
        let op = Operation::from_custom(OperationGroup::PrePlant, machine);

        assert!(op.is_custom());
        assert_eq!(op.depth, 12.0);
        assert_eq!(op.surface_fraction, 0.8);
        assert_eq!(op.speed, 7.5);
        assert_eq!(op.machine_name(), "m");
    }

    #[test]
    fn test_custom_operation_edits_propagate_to_tools() {
        let machine = CustomMachine::new("m", 8.0, vec![tool("a", 10.0, 0.5), tool("b", 3.0, 0.8)]).unwrap();
        let mut op = Operation::from_custom(OperationGroup::PrePlant, machine);

        op.set_depth(5.0);
        assert_eq!(op.depth, 5.0);
        let snapshot = op.machine.custom().unwrap();
        let depths: Vec<f64> = snapshot.tools.iter().map(|t| t.depth).collect();
        assert_eq!(depths, vec![5.0, 0.0]);

        op.set_surface_fraction(0.6);
        assert_relative_eq!(op.surface_fraction, 0.6, epsilon = 1e-12);
        let snapshot = op.machine.custom().unwrap();
        assert_relative_eq!(snapshot.tools[0].surface_fraction, 0.3, epsilon = 1e-12);
        assert_relative_eq!(snapshot.tools[1].surface_fraction, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_standard_operation_edits_set_value() {
        let chisel = StandardMachine {
            name: "Chisel Plow".to_string(),
            depth: 10.0,
            speed: 8.0,
            surface_fraction: 1.0,
            tillage_factor: 0.7,
            rotates: false,
            picture: String::new(),
        };
        let mut op = Operation::from_standard(OperationGroup::PrePlant, &chisel);
        op.set_depth(15.0);
        op.set_surface_fraction(0.5);

        assert_eq!(op.depth, 15.0);
        assert_eq!(op.surface_fraction, 0.5);
        assert_eq!(op.machine, MachineRef::Standard { name: "Chisel Plow".to_string() });
    }

    #[test]
    fn test_operation_group_parse() {
        assert_eq!(OperationGroup::parse("Pre-Plant"), Some(OperationGroup::PrePlant));
        assert_eq!(OperationGroup::parse("in season"), Some(OperationGroup::InSeason));
        assert_eq!(OperationGroup::parse("HARVEST"), Some(OperationGroup::Harvest));
        assert_eq!(OperationGroup::parse("winter"), None);
    }
}
