//! Typed encode/decode of seasons, scenarios and custom machines
//!
//! JSON goes through serde into the domain types, then through structural
//! validation. Any failure comes back as an InvalidInput diagnostic naming the
//! offending field. Custom machines can also be flattened into the catalog's
//! `tool1_*` … `tool10_*` CSV layout.

use crate::data::custom_machine_headers;
use crate::diagnostics::Diagnostic;
use crate::schema::custom_machines::{self as cols, tool_column};
use crate::types::{Application, CustomMachine, MachineRef, Operation, Scenario, Season, MAX_TOOLS};
use anyhow::Context;
use polars::prelude::{Column, CsvWriter, DataFrame, NamedFrom, PolarsError, PolarsResult, SerWriter, Series};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Invalid(#[from] Diagnostic),

    #[error("failed to write CSV: {0}")]
    Csv(#[from] PolarsError),
}

impl CodecError {
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Invalid(d) => Some(d),
            Self::Encode { .. } | Self::Csv(_) => None,
        }
    }
}

fn encode<T: Serialize>(value: &T, what: &'static str) -> Result<String, CodecError> {
    serde_json::to_string_pretty(value).map_err(|source| CodecError::Encode { what, source })
}

fn decode<T: DeserializeOwned>(json: &str, what: &'static str) -> Result<T, CodecError> {
    serde_json::from_str(json).map_err(|e| {
        let message = e.to_string();
        let field = backticked(&message).unwrap_or(what).to_string();
        tracing::debug!("Rejected {} JSON: {}", what, message);
        CodecError::Invalid(Diagnostic::invalid_input(field, message))
    })
}

/// serde_json names missing/unknown fields in backticks
fn backticked(message: &str) -> Option<&str> {
    let start = message.find('`')? + 1;
    let len = message[start..].find('`')?;
    Some(&message[start..start + len])
}

pub fn encode_season(season: &Season) -> Result<String, CodecError> {
    encode(season, "season")
}

pub fn decode_season(json: &str) -> Result<Season, CodecError> {
    let season: Season = decode(json, "season")?;
    validate_season(&season, "")?;
    Ok(season)
}

pub fn encode_scenario(scenario: &Scenario) -> Result<String, CodecError> {
    encode(scenario, "scenario")
}

pub fn decode_scenario(json: &str) -> Result<Scenario, CodecError> {
    let scenario: Scenario = decode(json, "scenario")?;
    for (i, application) in scenario.applications.iter().enumerate() {
        validate_application(application, &format!("applications[{i}]."))?;
    }
    if let Some(season) = &scenario.season {
        validate_season(season, "season.")?;
    }
    Ok(scenario)
}

pub fn encode_custom_machine(machine: &CustomMachine) -> Result<String, CodecError> {
    encode(machine, "custom machine")
}

pub fn decode_custom_machine(json: &str) -> Result<CustomMachine, CodecError> {
    let machine: CustomMachine = decode(json, "custom machine")?;
    validate_custom_machine(&machine, "")?;
    Ok(machine)
}

// ============================================================================
// Validation
// ============================================================================

fn finite(value: f64, field: impl FnOnce() -> String) -> Result<(), Diagnostic> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Diagnostic::invalid_input(field(), format!("value is not a finite number ({value})")))
    }
}

fn validate_custom_machine(machine: &CustomMachine, prefix: &str) -> Result<(), Diagnostic> {
    if machine.name.trim().is_empty() {
        return Err(Diagnostic::invalid_input(format!("{prefix}name"), "machine name is empty"));
    }
    if machine.tools.is_empty() || machine.tools.len() > MAX_TOOLS {
        return Err(Diagnostic::invalid_input(
            format!("{prefix}tools"),
            format!("a custom machine needs 1-{} tools, got {}", MAX_TOOLS, machine.tools.len()),
        ));
    }
    finite(machine.speed, || format!("{prefix}speed"))?;
    for (i, tool) in machine.tools.iter().enumerate() {
        let slot = i + 1;
        finite(tool.depth, || format!("{prefix}tool{slot}.depth"))?;
        finite(tool.surface_fraction, || format!("{prefix}tool{slot}.surface_fraction"))?;
        finite(tool.tillage_factor, || format!("{prefix}tool{slot}.tillage_factor"))?;
    }
    Ok(())
}

fn validate_operation(operation: &Operation, prefix: &str) -> Result<(), Diagnostic> {
    let fields = [
        ("tillage_factor", operation.tillage_factor),
        ("depth", operation.depth),
        ("speed", operation.speed),
        ("surface_fraction", operation.surface_fraction),
        ("field_fraction", operation.field_fraction),
    ];
    for (name, value) in fields {
        finite(value, || format!("{prefix}{name}"))?;
    }
    if operation.passes == 0 {
        return Err(Diagnostic::invalid_input(format!("{prefix}passes"), "must be at least 1"));
    }
    if let MachineRef::Custom { machine } = &operation.machine {
        validate_custom_machine(machine, &format!("{prefix}machine."))?;
    }
    Ok(())
}

fn validate_season(season: &Season, prefix: &str) -> Result<(), Diagnostic> {
    for (i, operation) in season.operations.iter().enumerate() {
        validate_operation(operation, &format!("{prefix}operations[{i}]."))?;
    }
    Ok(())
}

fn validate_application(application: &Application, prefix: &str) -> Result<(), Diagnostic> {
    finite(application.rate, || format!("{prefix}rate"))?;
    if application.application_count == 0 {
        return Err(Diagnostic::invalid_input(
            format!("{prefix}application_count"),
            "must be at least 1",
        ));
    }
    Ok(())
}

// ============================================================================
// Flattened CSV layout
// ============================================================================

/// One custom machine as (column, value) pairs in catalog column order.
///
/// Depth is written in cm, speed in km/h, surface area as a percent; unused
/// tool slots are empty strings.
pub fn flatten_custom_machine(machine: &CustomMachine) -> Vec<(String, String)> {
    let mut row = vec![
        (cols::NAME.to_string(), machine.name.clone()),
        (cols::SPEED.to_string(), machine.speed.to_string()),
        (cols::SPEED_UOM.to_string(), "km/h".to_string()),
        (cols::PICTURE.to_string(), machine.picture.clone()),
        (cols::NOTES.to_string(), machine.notes.clone()),
    ];

    for slot in 1..=MAX_TOOLS {
        let values: [String; 6] = match machine.tools.get(slot - 1) {
            Some(tool) => [
                tool.name.clone(),
                if tool.rotates { "TRUE" } else { "FALSE" }.to_string(),
                tool.depth.to_string(),
                "cm".to_string(),
                (tool.surface_fraction * 100.0).to_string(),
                tool.tillage_factor.to_string(),
            ],
            None => Default::default(),
        };
        for (field, value) in cols::TOOL_FIELDS.iter().zip(values) {
            row.push((tool_column(slot, field), value));
        }
    }
    row
}

/// Custom machines as an all-string DataFrame in catalog column order
pub fn custom_machines_frame(machines: &[CustomMachine]) -> PolarsResult<DataFrame> {
    let rows: Vec<Vec<(String, String)>> = machines.iter().map(flatten_custom_machine).collect();
    let columns: Vec<Column> = custom_machine_headers()
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let values: Vec<&str> = rows.iter().map(|row| row[i].1.as_str()).collect();
            Series::new(header.as_str().into(), values).into()
        })
        .collect();
    DataFrame::new(columns)
}

/// Custom-machine catalog file contents (header + one row per machine)
pub fn custom_machines_to_csv(machines: &[CustomMachine]) -> Result<String, CodecError> {
    let mut df = custom_machines_frame(machines)?;
    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer).include_header(true).finish(&mut df)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Write the custom-machine catalog file
pub fn write_custom_machines_csv(path: &Path, machines: &[CustomMachine]) -> anyhow::Result<()> {
    let mut df = custom_machines_frame(machines)?;
    let mut file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)
        .with_context(|| format!("Failed to write custom machines to {:?}", path))?;

    tracing::info!("Wrote {} custom machines to {:?}", machines.len(), path);
    Ok(())
}
