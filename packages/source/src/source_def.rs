//! Config-driven city inventory source definition.
//!
//! [`SourceDefinition`] captures everything unique about a city's
//! inventory file in a serializable config struct: where the file lives,
//! which columns hold which fields, and what unit the trunk diameter is
//! recorded in. A single generic [`SourceDefinition::normalize_table`]
//! handles every city.

use canopy_tree_models::SourceRow;
use serde::{Deserialize, Serialize};

use crate::SourceError;
use crate::parsing::{parse_decimal, parse_geo_id};
use crate::table::{Row, Table};

// ── Top-level source definition ──────────────────────────────────────────

/// A complete, config-driven city inventory source.
///
/// Loaded from TOML files at compile time.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDefinition {
    /// Unique identifier (e.g., `"st_catharines"`).
    pub id: String,
    /// City name used when a row does not carry its own.
    pub city: String,
    /// File name of the inventory CSV, relative to the input directory.
    pub file: String,
    /// Unit the DBH column is recorded in.
    #[serde(default)]
    pub dbh_unit: DbhUnit,
    /// Column name mappings for normalization.
    #[serde(default)]
    pub fields: FieldMapping,
}

/// Unit of a source's trunk diameter column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DbhUnit {
    /// Centimetres (no conversion).
    #[default]
    Centimeters,
    /// Inches, converted with a factor of 2.54.
    Inches,
}

impl DbhUnit {
    /// Converts a measurement in this unit to centimetres.
    #[must_use]
    pub fn to_cm(self, value: f64) -> f64 {
        match self {
            Self::Centimeters => value,
            Self::Inches => value * 2.54,
        }
    }
}

// ── Field mapping ────────────────────────────────────────────────────────

/// Column names for each normalized field, tried in order (first present
/// header wins).
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMapping {
    /// Botanical name columns.
    #[serde(default = "default_botanical_name")]
    pub botanical_name: Vec<String>,
    /// Trunk diameter columns.
    #[serde(default = "default_dbh")]
    pub dbh: Vec<String>,
    /// Dissemination area id columns.
    #[serde(default = "default_dissemination_area")]
    pub dissemination_area: Vec<String>,
    /// Census tract id columns.
    #[serde(default = "default_census_tract")]
    pub census_tract: Vec<String>,
    /// City name columns.
    #[serde(default = "default_city")]
    pub city: Vec<String>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            botanical_name: default_botanical_name(),
            dbh: default_dbh(),
            dissemination_area: default_dissemination_area(),
            census_tract: default_census_tract(),
            city: default_city(),
        }
    }
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

fn default_botanical_name() -> Vec<String> {
    strings(&["Botanical Name", "BotanicalName", "Botanical_Name"])
}

fn default_dbh() -> Vec<String> {
    strings(&["DBH", "DiameterAtBreastHeight"])
}

fn default_dissemination_area() -> Vec<String> {
    strings(&["DAUID", "DisseminationAreaId"])
}

fn default_census_tract() -> Vec<String> {
    strings(&["CTUID", "CensusTractId"])
}

fn default_city() -> Vec<String> {
    strings(&["City"])
}

// ── Normalization ────────────────────────────────────────────────────────

/// Rows of one source after column mapping, with per-source counts.
#[derive(Debug, Clone, Default)]
pub struct NormalizedSource {
    /// Normalized rows in file order.
    pub rows: Vec<SourceRow>,
    /// Counts collected while normalizing.
    pub stats: SourceStats,
}

/// Data-quality counts for one source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStats {
    /// Data rows read from the file.
    pub rows_read: u64,
    /// Rows whose DBH cell was present but not a number.
    pub unparseable_dbh: u64,
    /// Rows holding bytes that were not valid UTF-8.
    pub lossy_rows: u64,
}

impl SourceStats {
    /// Adds another source's counts to these.
    pub const fn merge(&mut self, other: Self) {
        self.rows_read += other.rows_read;
        self.unparseable_dbh += other.unparseable_dbh;
        self.lossy_rows += other.lossy_rows;
    }
}

/// Resolved column positions for one table.
struct Columns {
    botanical_name: usize,
    dbh: usize,
    dissemination_area: Option<usize>,
    census_tract: Option<usize>,
    city: Option<usize>,
}

impl SourceDefinition {
    /// Maps every row of `table` onto the fixed record schema.
    ///
    /// DBH is unit-converted here so later stages only ever see
    /// centimetres. A DBH cell that is present but not numeric becomes
    /// `None` and is counted.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingField`] if the table has no column for
    /// the botanical name or DBH, or has neither a dissemination area nor a
    /// census tract column.
    pub fn normalize_table(&self, table: &Table) -> Result<NormalizedSource, SourceError> {
        let columns = self.resolve_columns(table)?;
        let mut out = NormalizedSource::default();
        out.stats.lossy_rows = table.lossy_rows();

        for row in table.rows() {
            out.stats.rows_read += 1;
            out.rows.push(self.normalize_row(row, &columns, &mut out.stats));
        }

        log::debug!(
            "{}: normalized {} rows ({} unparseable DBH)",
            self.id,
            out.stats.rows_read,
            out.stats.unparseable_dbh
        );

        Ok(out)
    }

    fn resolve_columns(&self, table: &Table) -> Result<Columns, SourceError> {
        let missing = |field: &str| SourceError::MissingField {
            source_id: self.id.clone(),
            field: field.to_string(),
        };
        let fields = &self.fields;

        let botanical_name = table
            .find_column(&fields.botanical_name)
            .ok_or_else(|| missing("botanical_name"))?;
        let dbh = table.find_column(&fields.dbh).ok_or_else(|| missing("dbh"))?;
        let dissemination_area = table.find_column(&fields.dissemination_area);
        let census_tract = table.find_column(&fields.census_tract);

        if dissemination_area.is_none() && census_tract.is_none() {
            return Err(missing("dissemination_area or census_tract"));
        }

        Ok(Columns {
            botanical_name,
            dbh,
            dissemination_area,
            census_tract,
            city: table.find_column(&fields.city),
        })
    }

    fn normalize_row(&self, row: Row<'_>, columns: &Columns, stats: &mut SourceStats) -> SourceRow {
        let dbh_cell = row.get(columns.dbh);
        let dbh_cm = dbh_cell.and_then(parse_decimal).map(|v| self.dbh_unit.to_cm(v));
        if dbh_cell.is_some() && dbh_cm.is_none() {
            stats.unparseable_dbh += 1;
        }

        SourceRow {
            source_id: self.id.clone(),
            botanical_name: row
                .raw(columns.botanical_name)
                .filter(|s| !s.trim().is_empty())
                .map(String::from),
            dbh_cm,
            dissemination_area_id: columns
                .dissemination_area
                .and_then(|c| row.get(c))
                .and_then(parse_geo_id),
            census_tract_id: columns
                .census_tract
                .and_then(|c| row.get(c))
                .and_then(parse_geo_id),
            city: columns.city.and_then(|c| row.get(c)).map(String::from),
        }
    }
}

/// Parses a [`SourceDefinition`] from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or missing required fields.
pub fn parse_source_toml(toml_str: &str) -> Result<SourceDefinition, String> {
    toml::de::from_str(toml_str).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> Table {
        Table::from_reader("test", csv.as_bytes()).unwrap()
    }

    #[test]
    fn parses_vancouver_toml() {
        let def = parse_source_toml(include_str!("../sources/vancouver.toml")).unwrap();
        assert_eq!(def.id, "vancouver");
        assert_eq!(def.city, "Vancouver");
        assert_eq!(def.dbh_unit, DbhUnit::Inches);
    }

    #[test]
    fn dbh_unit_defaults_to_centimeters() {
        let def = parse_source_toml(include_str!("../sources/calgary.toml")).unwrap();
        assert_eq!(def.dbh_unit, DbhUnit::Centimeters);
        assert_eq!(def.fields.dbh, ["DBH", "DiameterAtBreastHeight"]);
    }

    #[test]
    fn field_overrides_replace_defaults() {
        let def = parse_source_toml(
            r#"
            id = "x"
            city = "X"
            file = "x.csv"
            [fields]
            dbh = ["Diameter"]
            "#,
        )
        .unwrap();
        assert_eq!(def.fields.dbh, ["Diameter"]);
        assert_eq!(def.fields.city, ["City"]);
    }

    #[test]
    fn normalizes_rows_and_converts_inches() {
        let def = parse_source_toml(include_str!("../sources/vancouver.toml")).unwrap();
        let out = def
            .normalize_table(&table(
                "Botanical Name,DBH,DAUID,CTUID,City\n\
                 Acer Saccharum ,10,59150883.0,,Vancouver\n\
                 ,abc,,9330025,\n",
            ))
            .unwrap();

        assert_eq!(out.stats.rows_read, 2);
        assert_eq!(out.stats.unparseable_dbh, 1);

        let first = &out.rows[0];
        assert_eq!(first.botanical_name.as_deref(), Some("Acer Saccharum "));
        assert!((first.dbh_cm.unwrap() - 25.4).abs() < 1e-9);
        assert_eq!(first.dissemination_area_id.as_deref(), Some("59150883"));
        assert_eq!(first.census_tract_id, None);
        assert_eq!(first.city.as_deref(), Some("Vancouver"));

        let second = &out.rows[1];
        assert_eq!(second.botanical_name, None);
        assert_eq!(second.dbh_cm, None);
        assert_eq!(second.census_tract_id.as_deref(), Some("9330025"));
        assert_eq!(second.city, None);
    }

    #[test]
    fn missing_name_column_is_an_error() {
        let def = parse_source_toml(include_str!("../sources/calgary.toml")).unwrap();
        let err = def
            .normalize_table(&table("Species,DBH,DAUID\nacer,1,1\n"))
            .unwrap_err();
        assert!(matches!(
            err,
            SourceError::MissingField { ref field, .. } if field == "botanical_name"
        ));
    }

    #[test]
    fn requires_some_geocode_column() {
        let def = parse_source_toml(include_str!("../sources/calgary.toml")).unwrap();
        assert!(
            def.normalize_table(&table("Botanical Name,DBH,City\nacer,1,Calgary\n"))
                .is_err()
        );
    }
}
