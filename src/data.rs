//! Catalog CSV loading
//!
//! Machine, custom-machine and product catalogs are read with Polars, every
//! column as a string, then converted row by row into domain types in canonical
//! units (cm, km/h, fractions). A row that cannot be converted is skipped with
//! a warning; a file missing a required column fails as a whole.

use crate::schema::{custom_machines, header_key, machines, products};
use crate::types::{CustomMachine, CustomMachineTool, ModelError, Product, StandardMachine, MAX_TOOLS};
use crate::utils::units::{normalize_depth, normalize_speed, rate_unit_from_label};
use anyhow::{bail, Context, Result};
use polars::prelude::*;
use rustc_hash::FxHashMap;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

/// Why a single catalog row was rejected
#[derive(Debug, Error, PartialEq)]
pub enum RowError {
    #[error("row {row}: missing value for '{column}'")]
    Missing { row: usize, column: String },

    #[error("row {row}: '{value}' in '{column}' is not a number")]
    NotANumber { row: usize, column: String, value: String },

    #[error("row {row}: {source}")]
    Model {
        row: usize,
        #[source]
        source: ModelError,
    },
}

/// CSV file read as strings, with normalized header lookup
pub struct CsvTable {
    frame: DataFrame,
    /// header_key → column name as read
    headers: FxHashMap<String, String>,
}

impl CsvTable {
    pub fn from_path(path: &Path) -> Result<Self> {
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0)) // all columns as String
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .with_context(|| format!("Failed to create CSV reader: {:?}", path))?
            .finish()
            .with_context(|| format!("Failed to load CSV: {:?}", path))?;

        Ok(Self::from_frame(frame))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .with_context(|| "Failed to parse CSV data")?;

        Ok(Self::from_frame(frame))
    }

    fn from_frame(frame: DataFrame) -> Self {
        let headers = frame
            .get_column_names()
            .into_iter()
            .map(|s| (header_key(s.as_str()), s.to_string()))
            .collect();
        Self { frame, headers }
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.contains_key(&header_key(name))
    }

    pub fn require_columns(&self, required: &[&str]) -> Result<()> {
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|name| !self.has_column(name))
            .collect();

        if !missing.is_empty() {
            let mut available: Vec<&String> = self.headers.values().collect();
            available.sort();
            bail!("Missing required columns {:?}. Available columns: {:?}", missing, available);
        }
        Ok(())
    }

    fn column(&self, name: &str) -> Option<&StringChunked> {
        let actual = self.headers.get(&header_key(name))?;
        self.frame.column(actual).ok()?.str().ok()
    }

    pub fn rows(&self) -> impl Iterator<Item = CsvRow<'_>> {
        (0..self.height()).map(move |index| CsvRow { table: self, index })
    }
}

/// One row of a `CsvTable`
#[derive(Clone, Copy)]
pub struct CsvRow<'a> {
    table: &'a CsvTable,
    index: usize,
}

impl<'a> CsvRow<'a> {
    /// 1-based data row number, for messages
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// Trimmed cell value; blank cells and absent columns are `None`
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.table
            .column(column)?
            .get(self.index)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn text(&self, column: &str) -> String {
        self.get(column).unwrap_or_default().to_string()
    }

    pub fn required(&self, column: &str) -> Result<&'a str, RowError> {
        self.get(column).ok_or_else(|| RowError::Missing {
            row: self.number(),
            column: column.to_string(),
        })
    }

    pub fn number_opt(&self, column: &str) -> Result<Option<f64>, RowError> {
        match self.get(column) {
            None => Ok(None),
            Some(raw) => parse_number(raw).map(Some).ok_or_else(|| RowError::NotANumber {
                row: self.number(),
                column: column.to_string(),
                value: raw.to_string(),
            }),
        }
    }

    pub fn number_required(&self, column: &str) -> Result<f64, RowError> {
        self.number_opt(column)?.ok_or_else(|| RowError::Missing {
            row: self.number(),
            column: column.to_string(),
        })
    }

    pub fn flag(&self, column: &str) -> bool {
        self.get(column).is_some_and(parse_flag)
    }
}

/// Accepts a trailing `%` and thousands separators
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim_end_matches('%').chars().filter(|c| *c != ',').collect();
    cleaned.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.to_lowercase().as_str(), "true" | "1" | "yes" | "y")
}

// ============================================================================
// Row conversions
// ============================================================================

pub fn parse_machine_row(row: &CsvRow<'_>) -> Result<StandardMachine, RowError> {
    let name = row.required(machines::NAME)?.to_string();
    let depth = row.number_required(machines::DEPTH)?;
    let speed = row.number_required(machines::SPEED)?;
    let surface_pct = row.number_required(machines::SURFACE_AREA_DISTURBED)?;
    let tillage_factor = row.number_required(machines::TILLAGE_TYPE_FACTOR)?;

    Ok(StandardMachine {
        name,
        depth: normalize_depth(depth, row.get(machines::DEPTH_UOM).unwrap_or("cm")),
        speed: normalize_speed(speed, row.get(machines::SPEED_UOM).unwrap_or("km/h")),
        surface_fraction: surface_pct / 100.0,
        tillage_factor,
        rotates: row.flag(machines::ROTATES),
        picture: row.text(machines::PICTURE),
    })
}

pub fn parse_custom_machine_row(row: &CsvRow<'_>) -> Result<CustomMachine, RowError> {
    use custom_machines::*;

    let name = row.required(NAME)?.to_string();
    let speed = normalize_speed(
        row.number_required(SPEED)?,
        row.get(SPEED_UOM).unwrap_or("km/h"),
    );

    let mut tools = Vec::new();
    for slot in 1..=MAX_TOOLS {
        let column = |field: &str| tool_column(slot, field);

        // Absent slot: every field blank
        if TOOL_FIELDS.iter().all(|field| row.get(&column(*field)).is_none()) {
            continue;
        }

        let depth = row.number_opt(&column(TOOL_DEPTH))?.unwrap_or(0.0);
        let depth_uom = column(TOOL_DEPTH_UOM);
        let surface_pct = row
            .number_opt(&column(TOOL_SURFACE_AREA_DISTURBED))?
            .unwrap_or(100.0);

        tools.push(CustomMachineTool {
            name: row.text(&column(TOOL_NAME)),
            depth: normalize_depth(depth, row.get(&depth_uom).unwrap_or("cm")),
            surface_fraction: surface_pct / 100.0,
            tillage_factor: row.number_opt(&column(TOOL_TILLAGE_TYPE_FACTOR))?.unwrap_or(0.0),
            rotates: row.flag(&column(TOOL_ROTATES)),
        });
    }

    let mut machine = CustomMachine::new(&name, speed, tools).map_err(|source| RowError::Model {
        row: row.number(),
        source,
    })?;
    machine.notes = row.text(NOTES);
    machine.picture = row.text(PICTURE);
    Ok(machine)
}

pub fn parse_product_row(row: &CsvRow<'_>) -> Result<Product, RowError> {
    let display_name = row.required(products::PRODUCT_NAME)?.to_string();
    let base_eiq = row.number_required(products::AI_EIQ)?;
    let ai_percent = row.number_required(products::AI_CONCENTRATION)?;

    let default_rate = match row.number_opt(products::SUGGESTED_RATE)? {
        Some(rate) => rate,
        None => row.number_opt(products::MINIMUM_RATE)?.unwrap_or(0.0),
    };

    let raw_unit = row.required(products::RATE_UOM)?;
    let default_rate_unit = match rate_unit_from_label(raw_unit) {
        Some(unit) => unit.key().to_string(),
        None => {
            tracing::debug!("Product '{}' has unrecognized rate unit '{}'", display_name, raw_unit);
            raw_unit.to_string()
        }
    };

    Ok(Product {
        display_name,
        product_type: row.get(products::PRODUCT_TYPE).map(str::to_string),
        application_method: row.get(products::APPLICATION_METHOD).map(str::to_string),
        base_eiq,
        ai_percent,
        default_rate,
        default_rate_unit,
    })
}

/// Convert every row, skipping (and logging) rows that fail
fn collect_rows<T>(
    table: &CsvTable,
    required: &[&str],
    what: &str,
    parse: impl Fn(&CsvRow<'_>) -> Result<T, RowError>,
) -> Result<Vec<T>> {
    table
        .require_columns(required)
        .with_context(|| format!("Invalid {} catalog", what))?;

    let mut items = Vec::with_capacity(table.height());
    let mut skipped = 0usize;
    for row in table.rows() {
        match parse(&row) {
            Ok(item) => items.push(item),
            Err(e) => {
                skipped += 1;
                tracing::warn!("Skipping {} {}", what, e);
            }
        }
    }

    tracing::info!("Loaded {} {} rows ({} skipped)", items.len(), what, skipped);
    Ok(items)
}

pub fn load_standard_machines(table: &CsvTable) -> Result<Vec<StandardMachine>> {
    collect_rows(table, machines::REQUIRED, "machine", parse_machine_row)
}

pub fn load_custom_machines(table: &CsvTable) -> Result<Vec<CustomMachine>> {
    collect_rows(table, custom_machines::REQUIRED, "custom machine", parse_custom_machine_row)
}

pub fn load_products(table: &CsvTable) -> Result<Vec<Product>> {
    collect_rows(table, products::REQUIRED, "product", parse_product_row)
}

/// Header row for a flattened custom-machine file
pub fn custom_machine_headers() -> Vec<String> {
    use custom_machines::*;

    let mut headers: Vec<String> = [NAME, SPEED, SPEED_UOM, PICTURE, NOTES]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for slot in 1..=MAX_TOOLS {
        headers.extend(TOOL_FIELDS.iter().map(|field| tool_column(slot, field)));
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table(csv: &str) -> CsvTable {
        CsvTable::from_bytes(csv.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_machine_rows_normalized() {
        let csv = "\u{feff}name,rotates,depth,depth_uom,speed,speed_uom,surface_area_disturbed,tillage_type_factor,picture\n\
                   Chisel Plow,FALSE,4,in,5,mph,100,0.7,chisel.png\n\
                   Rotary Tiller,TRUE,10,cm,6,km/h,80,0.7,\n";
        let machines = load_standard_machines(&table(csv)).unwrap();

        assert_eq!(machines.len(), 2);
        assert_eq!(machines[0].name, "Chisel Plow");
        assert_relative_eq!(machines[0].depth, 4.0 / 0.393701, epsilon = 1e-9);
        assert_relative_eq!(machines[0].speed, 5.0 / 0.621371, epsilon = 1e-9);
        assert_eq!(machines[0].picture, "chisel.png");
        assert!(!machines[0].rotates);

        assert!(machines[1].rotates);
        assert_relative_eq!(machines[1].surface_fraction, 0.8, epsilon = 1e-12);
        assert_eq!(machines[1].picture, "");
    }

    #[test]
    fn test_bad_rows_skipped() {
        let csv = "name,depth,speed,surface_area_disturbed,tillage_type_factor\n\
                   Good,10,8,100,0.7\n\
                   ,10,8,100,0.7\n\
                   Bad depth,deep,8,100,0.7\n";
        let machines = load_standard_machines(&table(csv)).unwrap();
        assert_eq!(machines.len(), 1);
        assert_eq!(machines[0].name, "Good");
    }

    #[test]
    fn test_missing_required_column_fails() {
        let csv = "name,depth,speed\nDisk,10,8\n";
        let err = load_standard_machines(&table(csv)).unwrap_err();
        assert!(format!("{:#}", err).contains("surface_area_disturbed"));
    }

    #[test]
    fn test_row_errors() {
        let csv = "name,depth,speed,surface_area_disturbed,tillage_type_factor\n\
                   Disk,ten,8,100,0.7\n";
        let t = table(csv);
        let row = t.rows().next().unwrap();
        assert_eq!(
            parse_machine_row(&row),
            Err(RowError::NotANumber {
                row: 1,
                column: "depth".to_string(),
                value: "ten".to_string()
            })
        );
    }

    #[test]
    fn test_product_rows() {
        let csv = "product type,product name,application method,label minimum rate,label suggested rate,rate UOM,AI1,AI1 eiq,AI1concentration\n\
                   Herbicide,Atrazine 4L,Broadcast,1.0,2.0,Pint per Acre,atrazine,22.85,42.6\n\
                   Fungicide,Headline,,0.4,,fl oz/acre,pyraclostrobin,28.6,23.6%\n";
        let products = load_products(&table(csv)).unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].default_rate_unit, "pints/acre");
        assert_eq!(products[0].default_rate, 2.0);
        assert_eq!(products[0].product_type.as_deref(), Some("Herbicide"));
        assert_eq!(products[0].application_method.as_deref(), Some("Broadcast"));

        // Suggested rate blank: falls back to the label minimum
        assert_eq!(products[1].default_rate, 0.4);
        assert_eq!(products[1].ai_percent, 23.6);
        assert_eq!(products[1].application_method, None);
    }

    #[test]
    fn test_custom_machine_rows() {
        let csv = "name,speed,speed_uom,picture,notes,\
                   tool1_name,tool1_rotates,tool1_depth,tool1_depth_uom,tool1_surface_area_disturbed,tool1_tillage_type_factor,\
                   tool2_name,tool2_rotates,tool2_depth,tool2_depth_uom,tool2_surface_area_disturbed,tool2_tillage_type_factor\n\
                   Combo,8,km/h,,two tools,Ripper,FALSE,10,cm,50,0.4,Disc,TRUE,3,cm,100,0.7\n\
                   Single,5,mph,,,Sweep,,2,in,60,0.3,,,,,,\n\
                   Empty,8,km/h,,,,,,,,,,,,,,\n";
        let machines = load_custom_machines(&table(csv)).unwrap();

        // A machine with no tools is rejected
        assert_eq!(machines.len(), 2);

        let combo = &machines[0];
        assert_eq!(combo.tools.len(), 2);
        assert_eq!(combo.notes, "two tools");
        assert_eq!(combo.tools[0].surface_fraction, 0.5);
        assert!(combo.tools[1].rotates);

        let single = &machines[1];
        assert_eq!(single.tools.len(), 1);
        assert_relative_eq!(single.tools[0].depth, 2.0 / 0.393701, epsilon = 1e-9);
        assert_relative_eq!(single.speed, 5.0 / 0.621371, epsilon = 1e-9);
    }

    #[test]
    fn test_custom_machine_headers() {
        let headers = custom_machine_headers();
        assert_eq!(headers.len(), 5 + 6 * MAX_TOOLS);
        assert_eq!(headers[5], "tool1_name");
        assert_eq!(headers.last().map(String::as_str), Some("tool10_tillage_type_factor"));
    }
}
