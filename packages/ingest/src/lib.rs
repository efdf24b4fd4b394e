#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Urban tree inventory pipeline: loads every city's inventory, cleans it
//! into one national record table, and writes diversity, nativity and
//! structure tables.

pub mod config;
pub mod output;
pub mod pipeline;

use std::time::Instant;

use canopy_analytics_models::Diagnostics;
use canopy_geography::GeographyError;
use canopy_source::{SourceDefinition, SourceError, StageProgress, TableError};
use canopy_taxonomy::TaxonomyError;
use canopy_tree_models::TreeRecord;

pub use config::PipelineConfig;
pub use pipeline::{Cleaned, References, Report, analyze, clean};

/// Errors that can abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// A source could not be loaded, or none could.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A reference table could not be read or lacks a key column.
    #[error(transparent)]
    Table(#[from] TableError),

    /// A taxonomy reference table is unusable.
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),

    /// A geography reference table is unusable.
    #[error(transparent)]
    Geography(#[from] GeographyError),

    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        /// Config file path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid.
    #[error("invalid config {path}: {source}")]
    ConfigParse {
        /// Config file path.
        path: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// Nothing was left after schema normalization and cleaning.
    #[error("no usable tree records after schema normalization")]
    NoUsableRecords,

    /// An output file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Output path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An output table could not be serialized.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// The diagnostics report could not be serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Returns all registered city sources.
#[must_use]
pub fn all_sources() -> Vec<SourceDefinition> {
    canopy_source::registry::all_sources()
}

/// Returns the sources to process, filtered by the `--sources` CLI flag or
/// the `CANOPY_SOURCES` environment variable. If neither is set, all
/// sources are returned.
#[must_use]
pub fn enabled_sources(cli_filter: Option<String>) -> Vec<SourceDefinition> {
    let filter = cli_filter.or_else(|| std::env::var("CANOPY_SOURCES").ok());

    let all = all_sources();

    let Some(filter_str) = filter else {
        return all;
    };

    filter_sources(all, &filter_str)
}

fn filter_sources(all: Vec<SourceDefinition>, filter: &str) -> Vec<SourceDefinition> {
    let ids: Vec<&str> = filter.split(',').map(str::trim).collect();

    let filtered: Vec<SourceDefinition> = all
        .iter()
        .filter(|s| ids.contains(&s.id.as_str()))
        .cloned()
        .collect();

    if filtered.is_empty() {
        log::warn!(
            "No matching sources found for filter {:?}. Available: {}",
            ids,
            all.iter().map(|s| s.id.as_str()).collect::<Vec<_>>().join(", ")
        );
    }

    filtered
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Cleaned records.
    pub records: Vec<TreeRecord>,
    /// Analysis tables.
    pub report: Report,
    /// Cleaning counts and national figures.
    pub diagnostics: Diagnostics,
}

/// Loads references and sources, cleans, and analyzes, without writing
/// anything.
///
/// # Errors
///
/// Returns an error if a configured reference table is unusable, if no
/// source file can be read, or if no record survives cleaning.
pub fn process(
    config: &PipelineConfig,
    sources: &[SourceDefinition],
    progress: &StageProgress,
) -> Result<RunOutput, IngestError> {
    let refs = References::load(&config.references)?;

    let loaded = canopy_source::load_sources(sources, &config.input_dir, &progress.load)?;
    if loaded.rows.is_empty() {
        return Err(IngestError::NoUsableRecords);
    }
    let stats = loaded.stats;

    let cleaned = clean(
        loaded.rows,
        sources,
        &refs,
        config.nativity.unresolved,
        &progress.clean,
    )?;

    let mut diagnostics = Diagnostics {
        sources_loaded: loaded.loaded,
        sources_skipped: loaded.skipped,
        unparseable_dbh: stats.unparseable_dbh,
        lossy_decoded_rows: stats.lossy_rows,
        ..cleaned.diagnostics
    };
    let report = analyze(&cleaned.records, config, &mut diagnostics, &progress.analyze);

    Ok(RunOutput {
        records: cleaned.records,
        report,
        diagnostics,
    })
}

/// Runs the whole pipeline and writes every output table to
/// `config.output_dir`.
///
/// # Errors
///
/// Returns an error if processing fails or an output cannot be written.
pub fn run(
    config: &PipelineConfig,
    sources: &[SourceDefinition],
    progress: &StageProgress,
) -> Result<RunOutput, IngestError> {
    let start = Instant::now();
    log::info!(
        "Processing {} source(s) from {}",
        sources.len(),
        config.input_dir.display()
    );

    let output = process(config, sources, progress)?;
    let written = output::write_all(&config.output_dir, &output)?;

    log::info!(
        "Wrote {} files to {} in {:.1}s",
        written.len(),
        config.output_dir.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_sources_by_id() {
        let sources = filter_sources(all_sources(), "calgary, moncton");
        let ids: Vec<&str> = sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["calgary", "moncton"]);
    }

    #[test]
    fn unknown_filter_yields_nothing() {
        assert!(filter_sources(all_sources(), "boston").is_empty());
    }

    #[test]
    fn cli_filter_wins() {
        let sources = enabled_sources(Some("toronto".to_string()));
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].city, "Toronto");
    }
}
