//! Impact Scorer - scores seasons and scenarios against a catalog
//!
//! Ties the formula engines to the aggregator: every operation / application
//! is scored on its own (with diagnostics), then folded into totals, group
//! subtotals and bands. Scoring is a pure recomputation; nothing is cached
//! between calls.

use crate::aggregation::{Aggregate, Aggregator};
use crate::catalog::Catalog;
use crate::diagnostics::{Diagnostic, Scored};
use crate::metrics::{compute_application_eiq, operation_stir_breakdown, ToolContribution};
use crate::types::{Application, MachineRef, Operation, OperationGroup, Scenario, Season};
use crate::utils::bands::{Band, BandSet};
use serde::Serialize;
use thiserror::Error;

/// Grouping key for applications without a product type
pub const UNCLASSIFIED: &str = "Unclassified";

#[derive(Debug, Error, PartialEq)]
pub enum ScoreError {
    #[error("baseline scenario '{0}' is not among the compared scenarios")]
    UnknownBaseline(String),
}

/// STIR of one operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationScore {
    pub machine_name: String,
    pub group: OperationGroup,
    pub stir: f64,
    /// Per-tool shares (custom machines only), all passes included
    pub tools: Vec<ToolContribution>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Season STIR: total, per-group subtotals (pre-plant, in-season, harvest), band
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonScore {
    pub name: String,
    pub operations: Vec<OperationScore>,
    pub summary: Aggregate<OperationGroup>,
}

impl SeasonScore {
    pub fn total(&self) -> f64 {
        self.summary.total
    }

    pub fn band(&self) -> &Band {
        &self.summary.band
    }
}

/// Field EIQ of one application
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationScore {
    pub product_name: String,
    pub product_type: String,
    pub eiq: f64,
    /// Excluded applications are scored for display but left out of totals
    pub excluded: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Scenario EIQ (grouped by product type) plus its season's STIR, if any
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioScore {
    pub name: String,
    pub applications: Vec<ApplicationScore>,
    pub eiq: Aggregate<String>,
    pub season: Option<SeasonScore>,
}

impl ScenarioScore {
    pub fn total_eiq(&self) -> f64 {
        self.eiq.total
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        let season = self
            .season
            .iter()
            .flat_map(|s| s.operations.iter())
            .flat_map(|o| o.diagnostics.iter());
        self.applications
            .iter()
            .flat_map(|a| a.diagnostics.iter())
            .chain(season)
    }
}

/// One row of a scenario comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioComparison {
    pub name: String,
    pub eiq_total: f64,
    pub eiq_band: Band,
    /// Difference from the baseline's EIQ (0 for the baseline itself)
    pub eiq_delta: f64,
    pub stir_total: Option<f64>,
    pub stir_band: Option<Band>,
    /// Present when both this scenario and the baseline have a season
    pub stir_delta: Option<f64>,
    pub is_baseline: bool,
}

/// Main scorer
pub struct ImpactScorer<'a> {
    catalog: &'a Catalog,
    stir_bands: BandSet,
    eiq_bands: BandSet,
}

impl<'a> ImpactScorer<'a> {
    pub fn new(catalog: &'a Catalog, stir_bands: BandSet, eiq_bands: BandSet) -> Self {
        Self {
            catalog,
            stir_bands,
            eiq_bands,
        }
    }

    /// Built-in STIR and EIQ bands
    pub fn with_default_bands(catalog: &'a Catalog) -> Self {
        Self::new(catalog, BandSet::stir_default(), BandSet::eiq_default())
    }

    pub fn stir_bands(&self) -> &BandSet {
        &self.stir_bands
    }

    pub fn eiq_bands(&self) -> &BandSet {
        &self.eiq_bands
    }

    /// Score one operation.
    ///
    /// A standard machine missing from the catalog is still scored from the
    /// operation's own parameters, with an UnresolvedReference diagnostic.
    pub fn score_operation(&self, operation: &Operation) -> OperationScore {
        let (mut scored, tools) = operation_stir_breakdown(operation);

        if let MachineRef::Standard { name } = &operation.machine {
            if self.catalog.standard_machine(name).is_none() {
                tracing::warn!("Machine '{}' not found in catalog", name);
                scored.diagnostics.push(Diagnostic::unresolved(
                    "machine",
                    format!("machine '{name}' is not in the catalog, scored from the operation's parameters"),
                ));
            }
        }

        OperationScore {
            machine_name: operation.machine_name().to_string(),
            group: operation.group,
            stir: scored.value,
            tools,
            diagnostics: scored.diagnostics,
        }
    }

    pub fn score_season(&self, season: &Season) -> SeasonScore {
        let operations: Vec<OperationScore> = season
            .operations
            .iter()
            .map(|op| self.score_operation(op))
            .collect();

        let mut aggregator = Aggregator::with_groups(OperationGroup::ALL);
        for op in &operations {
            aggregator.add(op.group, op.stir);
        }
        let summary = aggregator.finish(&self.stir_bands);

        tracing::debug!(
            "Season '{}': {} operations, STIR {:.1} ({})",
            season.name,
            operations.len(),
            summary.total,
            summary.band.label
        );

        SeasonScore {
            name: season.name.clone(),
            operations,
            summary,
        }
    }

    /// Score one application.
    ///
    /// An excluded application whose product is not in the catalog was skipped
    /// on import; it scores 0 without being reported as unresolved.
    pub fn score_application(&self, application: &Application) -> ApplicationScore {
        let product = self.catalog.product(&application.product_name);
        let scored = match product {
            None if application.excluded => {
                tracing::debug!("Skipped application '{}' not scored", application.product_name);
                Scored::default()
            }
            _ => compute_application_eiq(application, product),
        };

        let product_type = application
            .product_type
            .clone()
            .or_else(|| product.and_then(|p| p.product_type.clone()))
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| UNCLASSIFIED.to_string());

        ApplicationScore {
            product_name: application.product_name.clone(),
            product_type,
            eiq: scored.value,
            excluded: application.excluded,
            diagnostics: scored.diagnostics,
        }
    }

    pub fn score_scenario(&self, scenario: &Scenario) -> ScenarioScore {
        let applications: Vec<ApplicationScore> = scenario
            .applications
            .iter()
            .map(|a| self.score_application(a))
            .collect();

        let mut aggregator = Aggregator::new();
        for app in applications.iter().filter(|a| !a.excluded) {
            aggregator.add(app.product_type.clone(), app.eiq);
        }
        let eiq = aggregator.finish(&self.eiq_bands);

        tracing::debug!(
            "Scenario '{}': {} applications, Field EIQ {:.2} ({})",
            scenario.name,
            applications.len(),
            eiq.total,
            eiq.band.label
        );

        ScenarioScore {
            name: scenario.name.clone(),
            applications,
            eiq,
            season: scenario.season.as_ref().map(|s| self.score_season(s)),
        }
    }

    /// Score several scenarios side by side, with deltas against `baseline`
    pub fn compare_scenarios(
        &self,
        scenarios: &[Scenario],
        baseline: &str,
    ) -> Result<Vec<ScenarioComparison>, ScoreError> {
        let scores: Vec<ScenarioScore> = scenarios.iter().map(|s| self.score_scenario(s)).collect();

        let base = scores
            .iter()
            .find(|s| s.name == baseline)
            .ok_or_else(|| ScoreError::UnknownBaseline(baseline.to_string()))?;
        let base_eiq = base.eiq.total;
        let base_stir = base.season.as_ref().map(SeasonScore::total);

        Ok(scores
            .iter()
            .map(|score| {
                let stir_total = score.season.as_ref().map(SeasonScore::total);
                ScenarioComparison {
                    name: score.name.clone(),
                    eiq_total: score.eiq.total,
                    eiq_band: score.eiq.band.clone(),
                    eiq_delta: score.eiq.total - base_eiq,
                    stir_total,
                    stir_band: score.season.as_ref().map(|s| s.band().clone()),
                    stir_delta: stir_total.zip(base_stir).map(|(s, b)| s - b),
                    is_baseline: score.name == baseline,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::types::{CustomMachine, CustomMachineTool, Product, StandardMachine};
    use approx::assert_relative_eq;

    fn catalog() -> Catalog {
        let chisel = StandardMachine {
            name: "Chisel Plow".to_string(),
            depth: 10.0,
            speed: 8.0,
            surface_fraction: 1.0,
            tillage_factor: 0.7,
            rotates: false,
            picture: String::new(),
        };
        let atrazine = Product {
            display_name: "Atrazine 4L".to_string(),
            product_type: Some("Herbicide".to_string()),
            application_method: None,
            base_eiq: 30.0,
            ai_percent: 40.0,
            default_rate: 2.0,
            default_rate_unit: "lbs/acre".to_string(),
        };
        let headline = Product {
            display_name: "Headline".to_string(),
            product_type: Some("Fungicide".to_string()),
            application_method: None,
            base_eiq: 25.0,
            ai_percent: 20.0,
            default_rate: 1.0,
            default_rate_unit: "pints/acre".to_string(),
        };
        Catalog::new(vec![chisel], vec![], vec![atrazine, headline]).unwrap()
    }

    fn app(name: &str, rate: f64, count: u32) -> Application {
        Application {
            product_name: name.to_string(),
            product_type: None,
            rate,
            rate_unit: "lbs/acre".to_string(),
            application_count: count,
            excluded: false,
        }
    }

    #[test]
    fn test_season_groups_and_band() {
        let catalog = catalog();
        let scorer = ImpactScorer::with_default_bands(&catalog);
        let chisel = catalog.standard_machine("Chisel Plow").unwrap();

        let mut season = Season::new("2025");
        season.operations.push(Operation::from_standard(OperationGroup::PrePlant, chisel));
        season.operations.push(Operation::from_standard(OperationGroup::PrePlant, chisel));
        season.operations.push(Operation::from_standard(OperationGroup::Harvest, chisel));

        let score = scorer.score_season(&season);
        assert_relative_eq!(score.total(), 273.0, epsilon = 1e-9);
        assert_eq!(score.band().label, "Medium");

        let groups: Vec<OperationGroup> = score.summary.groups.iter().map(|g| g.key).collect();
        assert_eq!(groups, OperationGroup::ALL.to_vec());
        assert_relative_eq!(score.summary.subtotal(&OperationGroup::PrePlant).unwrap(), 182.0, epsilon = 1e-9);
        assert_eq!(score.summary.subtotal(&OperationGroup::InSeason), Some(0.0));
    }

    #[test]
    fn test_empty_season() {
        let catalog = catalog();
        let scorer = ImpactScorer::with_default_bands(&catalog);
        let score = scorer.score_season(&Season::new("empty"));
        assert_eq!(score.total(), 0.0);
        assert_eq!(score.band().label, "Light");
    }

    #[test]
    fn test_unknown_standard_machine_flagged() {
        let catalog = catalog();
        let scorer = ImpactScorer::with_default_bands(&catalog);
        let ghost = StandardMachine {
            name: "Ghost Disk".to_string(),
            depth: 10.0,
            speed: 8.0,
            surface_fraction: 1.0,
            tillage_factor: 0.7,
            rotates: false,
            picture: String::new(),
        };
        let score = scorer.score_operation(&Operation::from_standard(OperationGroup::PrePlant, &ghost));
        assert_relative_eq!(score.stir, 91.0, epsilon = 1e-9);
        assert_eq!(score.diagnostics[0].kind, DiagnosticKind::UnresolvedReference);
    }

    #[test]
    fn test_custom_operation_breakdown() {
        let catalog = catalog();
        let scorer = ImpactScorer::with_default_bands(&catalog);
        let machine = CustomMachine::new(
            "Combo",
            8.0,
            vec![
                CustomMachineTool::new("Ripper", 10.0, 0.5, 0.4, false),
                CustomMachineTool::new("Disc", 3.0, 1.0, 0.7, false),
            ],
        )
        .unwrap();
        let mut op = Operation::from_custom(OperationGroup::PrePlant, machine);
        op.passes = 2;

        let score = scorer.score_operation(&op);
        let sum: f64 = score.tools.iter().map(|t| t.stir).sum();
        assert_relative_eq!(score.stir, sum, epsilon = 1e-9);
        assert!(score.diagnostics.is_empty());
    }

    #[test]
    fn test_scenario_grouped_by_product_type() {
        let catalog = catalog();
        let scorer = ImpactScorer::with_default_bands(&catalog);

        let mut scenario = Scenario::new("Base");
        scenario.applications.push(app("Atrazine 4L", 2.0, 3)); // 72
        scenario.applications.push(app("Headline", 1.0, 1)); // 5
        let mut excluded = app("Atrazine 4L", 5.0, 1);
        excluded.excluded = true;
        scenario.applications.push(excluded);
        scenario.applications.push(app("Unknown", 1.0, 1));

        let score = scorer.score_scenario(&scenario);
        assert_relative_eq!(score.total_eiq(), 77.0, epsilon = 1e-9);
        assert_eq!(score.eiq.band.label, "High Environmental Impact");

        let keys: Vec<&str> = score.eiq.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["Herbicide", "Fungicide", UNCLASSIFIED]);
        assert_relative_eq!(score.eiq.subtotal(&"Herbicide".to_string()).unwrap(), 72.0, epsilon = 1e-9);

        // Excluded application is still scored for display
        assert_relative_eq!(score.applications[2].eiq, 60.0, epsilon = 1e-9);

        let unresolved: Vec<&Diagnostic> = score.diagnostics().collect();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].field, "product_name");
    }

    #[test]
    fn test_skipped_unknown_application_not_reported() {
        let catalog = catalog();
        let scorer = ImpactScorer::with_default_bands(&catalog);
        let mut skipped = app("Homemade brew", 4.0, 1);
        skipped.excluded = true;

        let score = scorer.score_application(&skipped);
        assert_eq!(score.eiq, 0.0);
        assert!(score.excluded);
        assert!(score.diagnostics.is_empty());
        assert_eq!(score.product_type, UNCLASSIFIED);
    }

    #[test]
    fn test_compare_scenarios() {
        let catalog = catalog();
        let scorer = ImpactScorer::with_default_bands(&catalog);
        let chisel = catalog.standard_machine("Chisel Plow").unwrap();

        let mut base = Scenario::new("Base");
        base.applications.push(app("Atrazine 4L", 2.0, 1)); // 24
        let mut season = Season::new("Base tillage");
        season.operations.push(Operation::from_standard(OperationGroup::PrePlant, chisel));
        base.season = Some(season);

        let mut reduced = Scenario::new("Reduced");
        reduced.applications.push(app("Atrazine 4L", 1.0, 1)); // 12

        let rows = scorer.compare_scenarios(&[base, reduced], "Base").unwrap();
        assert!(rows[0].is_baseline);
        assert_eq!(rows[0].eiq_delta, 0.0);
        assert_relative_eq!(rows[1].eiq_delta, -12.0, epsilon = 1e-9);
        assert_eq!(rows[1].eiq_band.label, "Low Environmental Impact");
        assert_relative_eq!(rows[0].stir_total.unwrap(), 91.0, epsilon = 1e-9);
        assert_eq!(rows[1].stir_delta, None);

        assert_eq!(
            scorer.compare_scenarios(&[], "Base"),
            Err(ScoreError::UnknownBaseline("Base".to_string()))
        );
    }
}
