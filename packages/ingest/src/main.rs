#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the urban tree inventory pipeline.

use std::path::PathBuf;

use canopy_cli_utils::{init_logger, stage_bars};
use canopy_ingest::{PipelineConfig, References, all_sources, enabled_sources};
use canopy_source::DbhUnit;
use canopy_taxonomy::strategy_for_city;
use canopy_tree_models::NameKind;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "canopy_ingest", about = "Urban tree inventory diversity pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean every source and write the diversity, nativity and structure tables
    Run {
        /// Path to the run config (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Comma-separated list of source IDs to process (overrides `CANOPY_SOURCES` env var)
        #[arg(long)]
        sources: Option<String>,
    },
    /// Print the canonical name, species and genus of botanical names
    Canonicalize {
        /// Raw botanical names
        #[arg(required = true)]
        names: Vec<String>,
        /// City whose name-parsing rule applies
        #[arg(long, default_value = "Toronto")]
        city: String,
        /// Path to the run config, for its correction rules
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List all registered city sources
    Sources,
    /// Load every reference table and report its size
    Validate {
        /// Path to the run config
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig, canopy_ingest::IngestError> {
    path.map_or_else(|| Ok(PipelineConfig::default()), |p| PipelineConfig::from_path(p))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, sources } => {
            let config = load_config(config.as_ref())?;
            let sources = enabled_sources(sources);
            log::info!(
                "Running {} source(s): {}",
                sources.len(),
                sources
                    .iter()
                    .map(|s| s.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );

            let output = canopy_ingest::run(&config, &sources, &stage_bars(&multi))?;

            let national = &output.diagnostics.national;
            println!(
                "{} records: {} species, {} genera, {} families",
                national.records,
                national.distinct_species,
                national.distinct_genera,
                national.distinct_families
            );
            if let Some(native) = national.native_proportion {
                println!("Native proportion: {:.2}%", native * 100.0);
            }
        }
        Commands::Canonicalize {
            names,
            city,
            config,
        } => {
            let refs = match config {
                Some(path) => References::load(&PipelineConfig::from_path(&path)?.references)?,
                None => References::builtin(),
            };
            let strategy = strategy_for_city(&city);

            println!("{:<32} {:<32} {:<28} GENUS", "RAW", "CANONICAL", "SPECIES");
            println!("{}", "-".repeat(100));
            for name in &names {
                let canonical = refs.canonicalizer.canonicalize(Some(name.as_str()));
                let taxon = (canonical.kind == NameKind::Taxon)
                    .then(|| strategy.resolve(&canonical.name))
                    .flatten();
                let (species, genus) = taxon.map_or_else(
                    || (format!("({})", canonical.kind), String::new()),
                    |t| (t.species, t.genus),
                );
                println!("{name:<32} {:<32} {species:<28} {genus}", canonical.name);
            }
        }
        Commands::Sources => {
            let sources = all_sources();
            println!("{:<20} {:<20} {:<24} DBH", "ID", "CITY", "FILE");
            println!("{}", "-".repeat(70));
            for source in &sources {
                let unit = match source.dbh_unit {
                    DbhUnit::Centimeters => "cm",
                    DbhUnit::Inches => "in",
                };
                println!(
                    "{:<20} {:<20} {:<24} {unit}",
                    source.id, source.city, source.file
                );
            }
        }
        Commands::Validate { config } => {
            let config = load_config(config.as_ref())?;
            let refs = References::load(&config.references)?;
            println!("Correction rules: {}", refs.canonicalizer.rules().len());
            println!("Genera with a family: {}", refs.families.len());
            println!("Species with nativity data: {}", refs.nativity.len());
            println!("Cities: {}", refs.geography.len());
            println!("Area overrides: {}", refs.overrides.len());
            println!("Downtown flags: {}", refs.downtown.len());

            let unstable = refs.canonicalizer.rules().unstable_rules();
            if !unstable.is_empty() {
                println!("Rules whose output another rule rewrites: {}", unstable.len());
            }
        }
    }

    Ok(())
}
