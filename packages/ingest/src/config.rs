//! Run configuration loaded from `canopy.toml`.
//!
//! Every field has a default, so an empty file (or no file) describes a
//! run over `data/` that writes to `output/` with the built-in reference
//! tables.

use std::path::{Path, PathBuf};

use canopy_taxonomy::UnresolvedPolicy;
use serde::{Deserialize, Serialize};

use crate::IngestError;

/// Cities left out of structural analysis by default.
pub const DEFAULT_STRUCTURAL_EXCLUSIONS: [&str; 4] =
    ["Maple Ridge", "New Westminster", "Peterborough", "Halifax"];

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding each source's inventory CSV.
    pub input_dir: PathBuf,
    /// Directory the output tables are written to.
    pub output_dir: PathBuf,
    /// Reference table locations.
    pub references: ReferencePaths,
    /// Downtown comparison settings.
    pub downtown: DowntownConfig,
    /// Structural analysis settings.
    pub structural: StructuralConfig,
    /// Nativity reporting settings.
    pub nativity: NativityConfig,
    /// Taxon ranking settings.
    pub summary: SummaryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            references: ReferencePaths::default(),
            downtown: DowntownConfig::default(),
            structural: StructuralConfig::default(),
            nativity: NativityConfig::default(),
            summary: SummaryConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Reads a config file.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::ConfigRead`] if the file cannot be read and
    /// [`IngestError::ConfigParse`] if it is not a valid config.
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let text = std::fs::read_to_string(path).map_err(|source| IngestError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| IngestError::ConfigParse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or has fields of the
    /// wrong type.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Reference table paths. A `None` table falls back to the built-in copy
/// where one exists, and to an empty table otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferencePaths {
    /// `Find`,`Replace` correction rules.
    pub corrections: Option<PathBuf>,
    /// `Genus`,`Family` index.
    pub families: Option<PathBuf>,
    /// Species by province nativity flags.
    pub nativity: Option<PathBuf>,
    /// `City`,`Province`,`Region`,`Ecozone` index.
    pub locations: Option<PathBuf>,
    /// `DisseminationAreaId`,`CensusTractId`,`City` overrides.
    pub da_overrides: Option<PathBuf>,
    /// `DisseminationAreaId`,`DowntownFlag` table.
    pub downtown: Option<PathBuf>,
}

/// Which cities take part in the downtown comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DowntownConfig {
    /// Cities to compare. When unset, every city with at least one
    /// flagged area is compared.
    pub cities: Option<Vec<String>>,
}

/// Structural analysis settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuralConfig {
    /// Cities whose diameters are left out of structural summaries.
    pub excluded_cities: Vec<String>,
}

impl Default for StructuralConfig {
    fn default() -> Self {
        Self {
            excluded_cities: DEFAULT_STRUCTURAL_EXCLUSIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Nativity reporting settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativityConfig {
    /// Treatment of species missing from the nativity table.
    pub unresolved: UnresolvedPolicy,
}

/// Taxon ranking settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Taxa listed per rank.
    pub top_n: usize,
    /// Trees a city needs of a taxon to count towards its ubiquity.
    pub ubiquity_threshold: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            ubiquity_threshold: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.summary.top_n, 10);
        assert_eq!(config.summary.ubiquity_threshold, 100);
        assert_eq!(config.nativity.unresolved, UnresolvedPolicy::FoldToIntroduced);
        assert_eq!(config.structural.excluded_cities.len(), 4);
        assert_eq!(config.downtown.cities, None);
    }

    #[test]
    fn parses_a_full_config() {
        let config = PipelineConfig::from_toml(
            r#"
input_dir = "raw"
output_dir = "out"

[references]
families = "ref/families.csv"
downtown = "ref/downtown.csv"

[downtown]
cities = ["Toronto", "Calgary"]

[structural]
excluded_cities = []

[nativity]
unresolved = "drop"

[summary]
top_n = 5
"#,
        )
        .unwrap();

        assert_eq!(config.input_dir, PathBuf::from("raw"));
        assert_eq!(config.references.families, Some(PathBuf::from("ref/families.csv")));
        assert_eq!(config.references.corrections, None);
        assert_eq!(
            config.downtown.cities,
            Some(vec!["Toronto".to_string(), "Calgary".to_string()])
        );
        assert!(config.structural.excluded_cities.is_empty());
        assert_eq!(config.nativity.unresolved, UnresolvedPolicy::Drop);
        assert_eq!(config.summary.top_n, 5);
        assert_eq!(config.summary.ubiquity_threshold, 100);
    }

    #[test]
    fn rejects_unknown_policy() {
        assert!(PipelineConfig::from_toml("[nativity]\nunresolved = \"guess\"\n").is_err());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = PipelineConfig::from_path(Path::new("/nonexistent/canopy.toml")).unwrap_err();
        assert!(matches!(err, IngestError::ConfigRead { .. }));
    }
}
