//! Output table writers.
//!
//! Layout under the output directory:
//!
//! ```text
//! trees.csv
//! diversity/<metric>_by_<level>.csv
//! nativity_by_city.csv
//! downtown_comparison.csv
//! top_taxa.csv
//! dbh_summary.csv
//! diameter_distribution.csv
//! diagnostics.json
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::{IngestError, RunOutput};

/// Writes every table of a run. Returns the paths written.
///
/// # Errors
///
/// Returns an error if a directory or file cannot be created or a row
/// cannot be serialized.
pub fn write_all(dir: &Path, output: &RunOutput) -> Result<Vec<PathBuf>, IngestError> {
    let diversity_dir = dir.join("diversity");
    create_dir(&diversity_dir)?;

    let report = &output.report;
    let mut written = Vec::new();

    write_table(&mut written, dir.join("trees.csv"), &output.records)?;
    for table in &report.diversity {
        let path = diversity_dir.join(format!("{}.csv", table.file_stem()));
        write_table(&mut written, path, &table.rows)?;
    }
    write_table(&mut written, dir.join("nativity_by_city.csv"), &report.nativity)?;
    write_table(&mut written, dir.join("downtown_comparison.csv"), &report.comparison)?;
    write_table(&mut written, dir.join("top_taxa.csv"), &report.top_taxa)?;
    write_table(&mut written, dir.join("dbh_summary.csv"), &report.dbh_summary)?;
    write_table(&mut written, dir.join("diameter_distribution.csv"), &report.distribution)?;

    let diagnostics = dir.join("diagnostics.json");
    write_json(&diagnostics, &output.diagnostics)?;
    written.push(diagnostics);

    Ok(written)
}

fn write_table<T: Serialize>(
    written: &mut Vec<PathBuf>,
    path: PathBuf,
    rows: &[T],
) -> Result<(), IngestError> {
    write_csv(&path, rows)?;
    log::debug!("Wrote {} rows to {}", rows.len(), path.display());
    written.push(path);
    Ok(())
}

fn create_dir(dir: &Path) -> Result<(), IngestError> {
    std::fs::create_dir_all(dir).map_err(|source| IngestError::Write {
        path: dir.display().to_string(),
        source,
    })
}

fn create_file(path: &Path) -> Result<BufWriter<File>, IngestError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| IngestError::Write {
            path: path.display().to_string(),
            source,
        })
}

/// Writes `rows` as CSV with a header taken from the row type's fields.
/// Empty values are written as empty cells.
///
/// # Errors
///
/// Returns an error if the file cannot be created or a row cannot be
/// serialized.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), IngestError> {
    let mut writer = csv::Writer::from_writer(create_file(path)?);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|source| IngestError::Write {
        path: path.display().to_string(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), IngestError> {
    serde_json::to_writer_pretty(create_file(path)?, value)?;
    Ok(())
}
