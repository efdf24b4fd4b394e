#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! City inventory sources and CSV table loading.
//!
//! Every city's inventory is described by a [`SourceDefinition`] in the
//! embedded registry. [`load_sources`] reads each city's CSV from an input
//! directory and maps it onto the fixed [`SourceRow`] schema.

pub mod parsing;
pub mod progress;
pub mod registry;
pub mod source_def;
pub mod table;

use std::path::Path;
use std::sync::Arc;

use canopy_tree_models::SourceRow;

pub use progress::{NullProgress, ProgressCallback, StageProgress, null_progress};
pub use registry::all_sources;
pub use source_def::{DbhUnit, FieldMapping, SourceDefinition, SourceStats};
pub use table::{Row, Table, TableError};

/// Errors that can occur while loading city sources.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Reading or parsing a CSV table failed.
    #[error(transparent)]
    Table(#[from] TableError),

    /// A city file has no column for a required field.
    #[error("source '{source_id}' has no column for {field}")]
    MissingField {
        /// Source whose file is incomplete.
        source_id: String,
        /// Field that could not be mapped.
        field: String,
    },

    /// None of the requested sources produced any rows.
    #[error("no usable source files found in {dir}")]
    NoSourcesLoaded {
        /// Input directory that was searched.
        dir: String,
    },
}

/// Rows from every source that loaded, in registry order.
#[derive(Debug, Clone, Default)]
pub struct LoadedSources {
    /// All normalized rows.
    pub rows: Vec<SourceRow>,
    /// Merged data-quality counts.
    pub stats: SourceStats,
    /// Ids of sources whose file was read.
    pub loaded: Vec<String>,
    /// Ids of sources skipped because their file was absent or unusable.
    pub skipped: Vec<String>,
}

/// Reads and normalizes every source's file from `input_dir`.
///
/// A source whose file does not exist, or whose file cannot be mapped, is
/// logged and skipped. The remaining sources still load.
///
/// # Errors
///
/// Returns [`SourceError::NoSourcesLoaded`] if no source file could be
/// read.
pub fn load_sources(
    sources: &[SourceDefinition],
    input_dir: &Path,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<LoadedSources, SourceError> {
    let mut out = LoadedSources::default();
    progress.set_total(sources.len() as u64);

    for source in sources {
        progress.set_message(source.city.clone());
        let path = input_dir.join(&source.file);

        if !path.exists() {
            log::warn!("{}: {} does not exist, skipping", source.id, path.display());
            out.skipped.push(source.id.clone());
            progress.inc(1);
            continue;
        }

        match Table::from_path(&source.id, &path)
            .map_err(SourceError::from)
            .and_then(|table| source.normalize_table(&table))
        {
            Ok(normalized) => {
                log::info!("{}: {} rows", source.id, normalized.stats.rows_read);
                progress.set_message(format!(
                    "{} ({} rows)",
                    source.city, normalized.stats.rows_read
                ));
                out.stats.merge(normalized.stats);
                out.rows.extend(normalized.rows);
                out.loaded.push(source.id.clone());
            }
            Err(e) => {
                log::error!("{}: {e}", source.id);
                out.skipped.push(source.id.clone());
            }
        }
        progress.inc(1);
    }

    if out.loaded.is_empty() {
        return Err(SourceError::NoSourcesLoaded {
            dir: input_dir.display().to_string(),
        });
    }

    progress.finish(format!(
        "{} cities, {} rows, {} skipped",
        out.loaded.len(),
        out.rows.len(),
        out.skipped.len()
    ));

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("canopy_source_{name}_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn source(id: &str, file: &str) -> SourceDefinition {
        source_def::parse_source_toml(&format!(
            "id = \"{id}\"\ncity = \"{id}\"\nfile = \"{file}\"\n"
        ))
        .unwrap()
    }

    #[test]
    fn skips_missing_files_and_loads_the_rest() {
        let dir = temp_dir("skips");
        std::fs::write(
            dir.join("a.csv"),
            "Botanical Name,DBH,DAUID,CTUID,City\nacer,10,1,2,A\nulmus,20,1,2,A\n",
        )
        .unwrap();

        let loaded = load_sources(
            &[source("a", "a.csv"), source("b", "b.csv")],
            &dir,
            &null_progress(),
        )
        .unwrap();

        assert_eq!(loaded.loaded, ["a"]);
        assert_eq!(loaded.skipped, ["b"]);
        assert_eq!(loaded.rows.len(), 2);
        assert_eq!(loaded.stats.rows_read, 2);
    }

    #[test]
    fn one_undecodable_row_keeps_the_city() {
        let dir = temp_dir("latin1");
        std::fs::write(
            dir.join("montreal.csv"),
            b"Botanical Name,DBH,DAUID\nAcer saccharinum,30,24660001\n\xC9rable,12,24660001\nTilia cordata,8,24660002\n",
        )
        .unwrap();

        let loaded =
            load_sources(&[source("montreal", "montreal.csv")], &dir, &null_progress()).unwrap();

        assert_eq!(loaded.loaded, ["montreal"]);
        assert_eq!(loaded.rows.len(), 3);
        assert_eq!(loaded.stats.lossy_rows, 1);
        assert_eq!(loaded.rows[2].botanical_name.as_deref(), Some("Tilia cordata"));
    }

    #[test]
    fn unusable_file_is_skipped() {
        let dir = temp_dir("unusable");
        std::fs::write(dir.join("a.csv"), "Name,Size\nacer,1\n").unwrap();

        let err = load_sources(&[source("a", "a.csv")], &dir, &null_progress()).unwrap_err();
        assert!(matches!(err, SourceError::NoSourcesLoaded { .. }));
    }
}
