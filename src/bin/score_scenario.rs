//! Score a scenario file against CSV catalogs
//!
//! Usage:
//!   cargo run --bin score_scenario -- machines.csv products.csv scenario.json [eiq_bands.json]
//!
//! Optional environment:
//!   CUSTOM_MACHINES  path to a flattened custom-machine CSV
//!   RUST_LOG         log filter (default: field_impact_scorer=info,warn)

use anyhow::{bail, Context, Result};
use field_impact_scorer::codec::decode_scenario;
use field_impact_scorer::{BandSet, Catalog, ImpactScorer};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "field_impact_scorer=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        bail!("usage: score_scenario <machines.csv> <products.csv> <scenario.json> [eiq_bands.json]");
    }

    let custom_machines = std::env::var("CUSTOM_MACHINES").ok().map(PathBuf::from);
    let catalog = Catalog::from_csv_files(
        Path::new(&args[0]),
        Path::new(&args[1]),
        custom_machines.as_deref(),
    )?;

    let scenario_path = Path::new(&args[2]);
    let json = std::fs::read_to_string(scenario_path)
        .with_context(|| format!("Failed to read scenario: {:?}", scenario_path))?;
    let scenario = decode_scenario(&json)
        .with_context(|| format!("Invalid scenario: {:?}", scenario_path))?;

    let eiq_bands = match args.get(3) {
        Some(path) => BandSet::load(Path::new(path))?,
        None => BandSet::eiq_default(),
    };

    let scorer = ImpactScorer::new(&catalog, BandSet::stir_default(), eiq_bands);
    let score = scorer.score_scenario(&scenario);

    println!("\n{}", "=".repeat(60));
    println!("Scenario: {}", score.name);
    println!("{}", "=".repeat(60));

    println!("\nPesticide applications:");
    for app in &score.applications {
        let marker = if app.excluded { " (excluded)" } else { "" };
        println!("  {:<32} {:<14} {:>8.2}{}", app.product_name, app.product_type, app.eiq, marker);
    }
    for group in &score.eiq.groups {
        println!("  subtotal {:<23} {:>8.2}", group.key, group.subtotal);
    }
    println!("  Field EIQ: {:.2} ({})", score.eiq.total, score.eiq.band.label);

    if let Some(season) = &score.season {
        println!("\nTillage season: {}", season.name);
        for op in &season.operations {
            println!("  {:<10} {:<30} {:>8.1}", op.group.as_str(), op.machine_name, op.stir);
        }
        for group in &season.summary.groups {
            println!("  subtotal {:<21} {:>8.1}", group.key.as_str(), group.subtotal);
        }
        println!("  STIR: {:.1} ({})", season.total(), season.band().label);
    }

    let diagnostics: Vec<_> = score.diagnostics().collect();
    if !diagnostics.is_empty() {
        println!("\nDiagnostics:");
        for d in diagnostics {
            println!("  {}", d);
        }
    }

    Ok(())
}
