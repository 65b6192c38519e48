//! Import reconciliation
//!
//! Records coming from an external report carry free-text product and machine
//! names. Each one is matched against the catalog (`reconcile`); whatever is
//! left Unresolved waits for a user decision ("Map to existing" or "Skip")
//! inside an `ImportSession`. Decisions are final for the session. Once
//! nothing is Unresolved the session materializes a `Scenario`.

pub mod reconcile;

pub use reconcile::{reconcile_import_entry, MatchMethod, MatchOutcome};

use crate::catalog::{Catalog, EntryKind, MachineEntry};
use crate::diagnostics::Diagnostic;
use crate::types::{Application, Operation, OperationGroup, Scenario, Season};
use crate::utils::units::rate_unit_from_label;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ReconcileError {
    #[error("no import entry at index {index} (session has {len})")]
    UnknownEntry { index: usize, len: usize },

    #[error("entry '{name}' is already resolved")]
    AlreadyResolved { name: String },

    #[error("'{name}' is not in the catalog")]
    NotInCatalog { name: String },

    #[error("{unresolved} entries still need a decision")]
    NotReady { unresolved: usize },
}

/// One free-text record from an external report
#[derive(Debug, Clone, PartialEq)]
pub struct ImportEntry {
    pub kind: EntryKind,
    /// Source row number, for messages
    pub row: usize,
    pub name: String,
    pub rate: Option<f64>,
    /// Unit as written in the report ("Pounds per Acre", "qt/acre")
    pub unit_label: Option<String>,
    pub count: u32,
    /// Tillage timing for machine entries
    pub group: OperationGroup,
}

impl ImportEntry {
    pub fn product(row: usize, name: &str) -> Self {
        Self {
            kind: EntryKind::Product,
            row,
            name: name.to_string(),
            rate: None,
            unit_label: None,
            count: 1,
            group: OperationGroup::InSeason,
        }
    }

    pub fn machine(row: usize, name: &str) -> Self {
        Self {
            kind: EntryKind::Machine,
            group: OperationGroup::PrePlant,
            ..Self::product(row, name)
        }
    }

    pub fn with_rate(mut self, rate: f64, unit_label: &str) -> Self {
        self.rate = Some(rate);
        self.unit_label = Some(unit_label.to_string());
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_group(mut self, group: OperationGroup) -> Self {
        self.group = group;
        self
    }
}

/// An entry plus its current outcome
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRecord {
    pub entry: ImportEntry,
    pub outcome: MatchOutcome,
}

/// Reconciliation of one imported report against a catalog
pub struct ImportSession<'a> {
    catalog: &'a Catalog,
    records: Vec<ImportRecord>,
}

impl<'a> ImportSession<'a> {
    /// Match every entry; exact and normalized hits resolve immediately
    pub fn start(catalog: &'a Catalog, entries: Vec<ImportEntry>) -> Self {
        let records: Vec<ImportRecord> = entries
            .into_iter()
            .map(|entry| {
                let outcome = reconcile_import_entry(&entry, catalog);
                ImportRecord { entry, outcome }
            })
            .collect();

        let unresolved = records.iter().filter(|r| r.outcome.is_unresolved()).count();
        tracing::info!("Import started: {} entries, {} need a decision", records.len(), unresolved);

        Self { catalog, records }
    }

    pub fn records(&self) -> &[ImportRecord] {
        &self.records
    }

    fn unresolved_mut(&mut self, index: usize) -> Result<&mut ImportRecord, ReconcileError> {
        let len = self.records.len();
        let record = self
            .records
            .get_mut(index)
            .ok_or(ReconcileError::UnknownEntry { index, len })?;
        if !record.outcome.is_unresolved() {
            return Err(ReconcileError::AlreadyResolved {
                name: record.entry.name.clone(),
            });
        }
        Ok(record)
    }

    /// "Map to existing": resolve an Unresolved entry to a catalog name
    pub fn map_to(&mut self, index: usize, catalog_name: &str) -> Result<(), ReconcileError> {
        let catalog = self.catalog;
        let record = self.unresolved_mut(index)?;
        if !catalog.contains(record.entry.kind, catalog_name) {
            return Err(ReconcileError::NotInCatalog {
                name: catalog_name.to_string(),
            });
        }

        tracing::debug!("Mapped '{}' → '{}'", record.entry.name, catalog_name);
        record.outcome = MatchOutcome::Matched {
            catalog_name: catalog_name.to_string(),
            method: MatchMethod::Manual,
        };
        Ok(())
    }

    /// "Skip": keep the entry out of totals
    pub fn skip(&mut self, index: usize) -> Result<(), ReconcileError> {
        let record = self.unresolved_mut(index)?;
        tracing::debug!("Skipped '{}'", record.entry.name);
        record.outcome = MatchOutcome::Skipped;
        Ok(())
    }

    pub fn unresolved_count(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_unresolved()).count()
    }

    pub fn is_ready(&self) -> bool {
        self.unresolved_count() == 0
    }

    /// One ImportAmbiguity diagnostic per entry still waiting for a decision
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.records
            .iter()
            .filter_map(|record| match &record.outcome {
                MatchOutcome::Unresolved { candidates } => {
                    let suggestions: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
                    let message = if suggestions.is_empty() {
                        format!("'{}' has no close catalog match", record.entry.name)
                    } else {
                        format!("'{}' did you mean: {}", record.entry.name, suggestions.join(", "))
                    };
                    Some(Diagnostic::ambiguity(format!("row {}", record.entry.row), message))
                }
                _ => None,
            })
            .collect()
    }

    /// Build the scenario once every entry is decided.
    ///
    /// Matched products become applications (rate/unit from the report, else
    /// the label defaults). Skipped products are kept with `excluded = true`.
    /// Matched machines become operations of the scenario's season; skipped
    /// machines are dropped.
    pub fn into_scenario(self, name: &str) -> Result<Scenario, ReconcileError> {
        let unresolved = self.unresolved_count();
        if unresolved > 0 {
            return Err(ReconcileError::NotReady { unresolved });
        }

        let Self { catalog, records } = self;
        let mut scenario = Scenario::new(name);
        let mut season = Season::new(name);

        for ImportRecord { entry, outcome } in records {
            match (entry.kind, outcome) {
                (EntryKind::Product, MatchOutcome::Matched { catalog_name, .. }) => {
                    scenario.applications.push(application_for(catalog, &entry, &catalog_name)?);
                }
                (EntryKind::Product, _) => {
                    scenario.applications.push(Application {
                        product_name: entry.name.clone(),
                        product_type: None,
                        rate: entry.rate.unwrap_or(0.0),
                        rate_unit: unit_key(entry.unit_label.as_deref()).unwrap_or_default(),
                        application_count: entry.count,
                        excluded: true,
                    });
                }
                (EntryKind::Machine, MatchOutcome::Matched { catalog_name, .. }) => {
                    let operation = match catalog.machine(&catalog_name) {
                        Some(MachineEntry::Standard(m)) => Operation::from_standard(entry.group, m),
                        Some(MachineEntry::Custom(m)) => Operation::from_custom(entry.group, m.clone()),
                        None => return Err(ReconcileError::NotInCatalog { name: catalog_name }),
                    };
                    season.operations.push(operation);
                }
                (EntryKind::Machine, _) => {
                    tracing::debug!("Dropping skipped machine '{}'", entry.name);
                }
            }
        }

        if !season.operations.is_empty() {
            scenario.season = Some(season);
        }
        tracing::info!(
            "Import complete: {} applications, {} operations",
            scenario.applications.len(),
            scenario.season.as_ref().map_or(0, |s| s.operations.len())
        );
        Ok(scenario)
    }
}

fn application_for(catalog: &Catalog, entry: &ImportEntry, catalog_name: &str) -> Result<Application, ReconcileError> {
    let product = catalog
        .product(catalog_name)
        .ok_or_else(|| ReconcileError::NotInCatalog {
            name: catalog_name.to_string(),
        })?;

    let mut application = Application::from_product(product);
    application.application_count = entry.count;
    if let Some(rate) = entry.rate {
        application.rate = rate;
        if let Some(key) = unit_key(entry.unit_label.as_deref()) {
            application.rate_unit = key;
        }
    }
    Ok(application)
}

/// Canonical key for a report's unit label; unknown labels pass through as written
fn unit_key(label: Option<&str>) -> Option<String> {
    let label = label?.trim();
    if label.is_empty() {
        return None;
    }
    Some(match rate_unit_from_label(label) {
        Some(unit) => unit.key().to_string(),
        None => {
            tracing::warn!("Unrecognized unit label '{}' in import", label);
            label.to_string()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::types::{Product, StandardMachine};

    fn catalog() -> Catalog {
        let product = |name: &str, kind: &str| Product {
            display_name: name.to_string(),
            product_type: Some(kind.to_string()),
            application_method: None,
            base_eiq: 20.0,
            ai_percent: 50.0,
            default_rate: 1.5,
            default_rate_unit: "pints/acre".to_string(),
        };
        let chisel = StandardMachine {
            name: "Chisel Plow".to_string(),
            depth: 10.0,
            speed: 8.0,
            surface_fraction: 1.0,
            tillage_factor: 0.7,
            rotates: false,
            picture: String::new(),
        };
        Catalog::new(
            vec![chisel],
            vec![],
            vec![product("Atrazine 4L", "Herbicide"), product("Headline", "Fungicide")],
        )
        .unwrap()
    }

    fn entries() -> Vec<ImportEntry> {
        vec![
            ImportEntry::product(1, "atrazine 4l").with_rate(2.0, "Pounds per Acre"),
            ImportEntry::product(2, "Headlin").with_rate(6.0, "Fluid ounce per acre").with_count(2),
            ImportEntry::product(3, "Mystery Mix").with_rate(1.0, "Pint per Acre"),
            ImportEntry::machine(4, "Chisel Plow"),
        ]
    }

    #[test]
    fn test_start_resolves_easy_entries() {
        let catalog = catalog();
        let session = ImportSession::start(&catalog, entries());

        assert_eq!(session.unresolved_count(), 2);
        assert!(!session.is_ready());

        let diagnostics = session.diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.kind == DiagnosticKind::ImportAmbiguity));
        assert_eq!(diagnostics[0].field, "row 2");
        assert!(diagnostics[0].message.contains("Headline"));
    }

    #[test]
    fn test_not_ready_until_decided() {
        let catalog = catalog();
        let session = ImportSession::start(&catalog, entries());
        assert_eq!(session.into_scenario("x").unwrap_err(), ReconcileError::NotReady { unresolved: 2 });
    }

    #[test]
    fn test_transitions_are_final() {
        let catalog = catalog();
        let mut session = ImportSession::start(&catalog, entries());

        // Matched entries cannot be re-decided
        assert!(matches!(session.skip(0), Err(ReconcileError::AlreadyResolved { .. })));

        assert_eq!(
            session.map_to(1, "Nope"),
            Err(ReconcileError::NotInCatalog { name: "Nope".to_string() })
        );
        session.map_to(1, "Headline").unwrap();
        assert!(matches!(session.map_to(1, "Atrazine 4L"), Err(ReconcileError::AlreadyResolved { .. })));

        session.skip(2).unwrap();
        assert!(matches!(session.skip(2), Err(ReconcileError::AlreadyResolved { .. })));
        assert_eq!(session.skip(9), Err(ReconcileError::UnknownEntry { index: 9, len: 4 }));
        assert!(session.is_ready());
    }

    #[test]
    fn test_into_scenario() {
        let catalog = catalog();
        let mut session = ImportSession::start(&catalog, entries());
        session.map_to(1, "Headline").unwrap();
        session.skip(2).unwrap();

        let scenario = session.into_scenario("Imported 2025").unwrap();
        assert_eq!(scenario.applications.len(), 3);

        let atrazine = &scenario.applications[0];
        assert_eq!(atrazine.product_name, "Atrazine 4L");
        assert_eq!(atrazine.rate_unit, "lbs/acre");
        assert_eq!(atrazine.rate, 2.0);
        assert_eq!(atrazine.product_type.as_deref(), Some("Herbicide"));

        let headline = &scenario.applications[1];
        assert_eq!(headline.rate_unit, "fl oz/acre");
        assert_eq!(headline.application_count, 2);

        let skipped = &scenario.applications[2];
        assert!(skipped.excluded);
        assert_eq!(skipped.product_name, "Mystery Mix");
        assert_eq!(skipped.rate_unit, "pints/acre");

        let season = scenario.season.unwrap();
        assert_eq!(season.operations.len(), 1);
        assert_eq!(season.operations[0].machine_name(), "Chisel Plow");
        assert_eq!(season.operations[0].group, OperationGroup::PrePlant);
    }

    #[test]
    fn test_label_defaults_without_rate() {
        let catalog = catalog();
        let session = ImportSession::start(&catalog, vec![ImportEntry::product(1, "Headline")]);
        let scenario = session.into_scenario("s").unwrap();

        assert_eq!(scenario.applications[0].rate, 1.5);
        assert_eq!(scenario.applications[0].rate_unit, "pints/acre");
        assert!(scenario.season.is_none());
    }
}
