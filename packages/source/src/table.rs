//! In-memory CSV tables.
//!
//! City inventories and reference tables are both plain CSV with a header
//! row. A [`Table`] keeps the headers and every row as a
//! [`csv::StringRecord`], and resolves columns by header name so callers
//! never depend on column order.
//!
//! Municipal exports are not always UTF-8. Cells that are not valid UTF-8
//! (Latin-1 accents in Quebec inventories, for instance) are decoded
//! lossily instead of failing the table, and the affected rows are counted.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

/// Errors that can occur while reading a table.
#[derive(Debug, Error)]
pub enum TableError {
    /// I/O error (file open/read).
    #[error("I/O error reading table '{table}': {source}")]
    Io {
        /// Name of the table being read.
        table: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// CSV parsing failed.
    #[error("CSV error in table '{table}': {source}")]
    Csv {
        /// Name of the table being read.
        table: String,
        /// Underlying error.
        #[source]
        source: csv::Error,
    },

    /// A required key column is absent from the header row.
    #[error("table '{table}' is missing required column '{column}'")]
    MissingColumn {
        /// Name of the table being read.
        table: String,
        /// Column that was expected.
        column: String,
    },
}

/// Strings that spreadsheet exports use for an empty cell.
const NULL_TOKENS: &[&str] = &["", "nan", "na", "n/a", "#n/a", "null", "none"];

/// A parsed CSV table.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    headers: Vec<String>,
    rows: Vec<csv::StringRecord>,
    lossy_rows: u64,
}

impl Table {
    /// Reads a table from any reader.
    ///
    /// Rows may have fewer fields than the header (missing trailing cells
    /// read as empty). Invalid UTF-8 is replaced with `U+FFFD`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Csv`] if the input is not valid CSV.
    pub fn from_reader<R: Read>(name: &str, reader: R) -> Result<Self, TableError> {
        let csv_error = |source| TableError::Csv {
            table: name.to_string(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = reader
            .byte_headers()
            .map_err(csv_error)?
            .iter()
            .map(|h| {
                String::from_utf8_lossy(h)
                    .trim_start_matches('\u{feff}')
                    .trim()
                    .to_string()
            })
            .collect();

        let mut rows = Vec::new();
        let mut lossy_rows = 0_u64;
        for record in reader.byte_records() {
            let record = record.map_err(csv_error)?;
            let decoded = csv::StringRecord::from_byte_record(record).unwrap_or_else(|e| {
                lossy_rows += 1;
                e.into_byte_record()
                    .iter()
                    .map(String::from_utf8_lossy)
                    .collect()
            });
            rows.push(decoded);
        }

        if lossy_rows > 0 {
            log::warn!("{name}: {lossy_rows} rows were not valid UTF-8 and were decoded lossily");
        }
        log::debug!("Read table '{name}': {} rows", rows.len());

        Ok(Self {
            name: name.to_string(),
            headers,
            rows,
            lossy_rows,
        })
    }

    /// Reads a table from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] if the file cannot be opened or parsed.
    pub fn from_path(name: &str, path: &Path) -> Result<Self, TableError> {
        let file = File::open(path).map_err(|source| TableError::Io {
            table: name.to_string(),
            source,
        })?;
        Self::from_reader(name, file)
    }

    /// Table name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Header names in file order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Number of rows that held invalid UTF-8.
    #[must_use]
    pub const fn lossy_rows(&self) -> u64 {
        self.lossy_rows
    }

    /// Returns `true` if the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Finds the first header matching any of `names`, compared
    /// case-insensitively.
    #[must_use]
    pub fn find_column(&self, names: &[String]) -> Option<usize> {
        names.iter().find_map(|name| {
            self.headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name.trim()))
        })
    }

    /// Resolves a required column.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::MissingColumn`] if no header matches.
    pub fn column(&self, name: &str) -> Result<usize, TableError> {
        self.find_column(&[name.to_string()])
            .ok_or_else(|| TableError::MissingColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    /// Iterates over the data rows.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|record| Row { record })
    }
}

/// A borrowed row of a [`Table`].
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    record: &'a csv::StringRecord,
}

impl<'a> Row<'a> {
    /// Returns the trimmed cell at `column`, or `None` if the cell is
    /// absent or holds a null token (`""`, `"NaN"`, `"N/A"`, ...).
    #[must_use]
    pub fn get(&self, column: usize) -> Option<&'a str> {
        let value = self.record.get(column)?.trim();
        if NULL_TOKENS.iter().any(|t| value.eq_ignore_ascii_case(t)) {
            None
        } else {
            Some(value)
        }
    }

    /// Returns the raw cell at `column` without null-token handling.
    #[must_use]
    pub fn raw(&self, column: usize) -> Option<&'a str> {
        self.record.get(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\u{feff}Genus, Family\nacer,Sapindaceae\nquercus,\nulmus,NaN\n";

    #[test]
    fn strips_bom_and_whitespace_from_headers() {
        let table = Table::from_reader("families", CSV.as_bytes()).unwrap();
        assert_eq!(table.headers(), ["Genus", "Family"]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn resolves_columns_case_insensitively() {
        let table = Table::from_reader("families", CSV.as_bytes()).unwrap();
        assert_eq!(table.column("genus").unwrap(), 0);
        assert_eq!(
            table.find_column(&["Fam".to_string(), "FAMILY".to_string()]),
            Some(1)
        );
    }

    #[test]
    fn missing_column_names_table_and_column() {
        let table = Table::from_reader("families", CSV.as_bytes()).unwrap();
        let err = table.column("Order").unwrap_err();
        assert_eq!(
            err.to_string(),
            "table 'families' is missing required column 'Order'"
        );
    }

    #[test]
    fn null_tokens_read_as_none() {
        let table = Table::from_reader("families", CSV.as_bytes()).unwrap();
        let families: Vec<Option<&str>> = table.rows().map(|r| r.get(1)).collect();
        assert_eq!(families, [Some("Sapindaceae"), None, None]);
    }

    #[test]
    fn latin1_cells_are_decoded_lossily() {
        let bytes: &[u8] = b"Botanical Name,DBH\nAcer saccharum,10\n\xC9rable argent\xE9,12\nTilia cordata,8\n";
        let table = Table::from_reader("montreal", bytes).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.lossy_rows(), 1);
        let names: Vec<&str> = table.rows().filter_map(|r| r.get(0)).collect();
        assert_eq!(names[0], "Acer saccharum");
        assert_eq!(names[1], "\u{fffd}rable argent\u{fffd}");
        assert_eq!(names[2], "Tilia cordata");
    }

    #[test]
    fn short_rows_are_accepted() {
        let table = Table::from_reader("t", "a,b\n1\n".as_bytes()).unwrap();
        let row = table.rows().next().unwrap();
        assert_eq!(row.get(0), Some("1"));
        assert_eq!(row.get(1), None);
    }
}
