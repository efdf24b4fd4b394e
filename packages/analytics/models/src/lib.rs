#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types produced by the diversity, nativity, and comparison
//! analyses.
//!
//! Row types serialize with `PascalCase` column names so they can be
//! written straight to CSV; [`Diagnostics`] serializes as `camelCase` JSON.

use std::collections::{BTreeMap, BTreeSet};

use canopy_tree_models::DiameterClass;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// What a diversity value is computed over.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DiversityMetric {
    /// Canonical species.
    Species,
    /// Genus.
    Genus,
    /// Botanical family.
    Family,
    /// Diameter class.
    DiameterClass,
}

impl DiversityMetric {
    /// Every metric, taxonomic ranks first.
    pub const ALL: [Self; 4] = [Self::Species, Self::Genus, Self::Family, Self::DiameterClass];

    /// The taxonomic ranks.
    pub const TAXONOMIC: [Self; 3] = [Self::Species, Self::Genus, Self::Family];

    /// Returns `true` for species, genus and family.
    #[must_use]
    pub const fn is_taxonomic(self) -> bool {
        !matches!(self, Self::DiameterClass)
    }
}

/// Grouping level for aggregated results.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GroupLevel {
    /// One group per city.
    City,
    /// One group per analysis region.
    Region,
    /// One group per terrestrial ecozone.
    Ecozone,
    /// A single group holding every record.
    National,
    /// One group per dissemination area.
    DisseminationArea,
}

impl GroupLevel {
    /// Levels reported in the diversity and diameter summaries.
    pub const REPORTED: [Self; 4] = [Self::City, Self::Region, Self::Ecozone, Self::National];

    /// Group key used for [`GroupLevel::National`].
    pub const NATIONAL_KEY: &'static str = "Canada";
}

/// Shannon-Wiener diversity of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiversityRow {
    /// City, region, ecozone, area id or [`GroupLevel::NATIONAL_KEY`].
    pub group_key: String,
    /// `H = -Σ pᵢ ln pᵢ`.
    pub shannon_index: f64,
    /// `ln(k)` for the `k` categories the group is measured over.
    pub max_diversity: f64,
}

/// Diversity of one metric at one grouping level, sorted by group key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiversityTable {
    /// What was counted.
    pub metric: DiversityMetric,
    /// How records were grouped.
    pub level: GroupLevel,
    /// One row per non-empty group.
    pub rows: Vec<DiversityRow>,
}

impl DiversityTable {
    /// File stem the table is written under, e.g. `species_by_city`.
    #[must_use]
    pub fn file_stem(&self) -> String {
        format!("{}_by_{}", self.metric, self.level)
    }
}

/// Share of a city's trees that are native to its province.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NativityRow {
    /// City name.
    pub city: String,
    /// `N / (N + I) × 100`, rounded to two decimals.
    pub native_proportion_percent: f64,
}

/// Downtown versus non-downtown comparison for one city and metric.
///
/// Both values are `None` when either side of the comparison is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComparisonRow {
    /// City name.
    pub city: String,
    /// Metric the per-area diversities were computed over.
    pub diversity_metric_name: DiversityMetric,
    /// Mann-Whitney U of the downtown sample.
    #[serde(rename = "UStatistic")]
    pub u_statistic: Option<f64>,
    /// Two-sided p-value.
    #[serde(rename = "PValue")]
    pub p_value: Option<f64>,
}

/// One of the most common taxa at a rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TopTaxonRow {
    /// Species, genus or family.
    pub rank: DiversityMetric,
    /// 1-based position by tree count.
    pub position: usize,
    /// Taxon name.
    pub taxon: String,
    /// Trees of this taxon.
    pub trees: u64,
    /// Share of all trees with a value at this rank, rounded to two decimals.
    pub share_percent: f64,
    /// Cities holding at least the ubiquity threshold of this taxon.
    pub cities_at_threshold: usize,
}

/// Diameter distribution shape for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DbhSummaryRow {
    /// Grouping level.
    pub level: GroupLevel,
    /// Group key.
    pub group_key: String,
    /// Trees with a usable diameter.
    pub trees: u64,
    /// Median diameter in centimetres.
    pub median_dbh: f64,
    /// Biased sample skewness; `None` when every diameter is equal.
    pub skewness: Option<f64>,
}

/// Share of a city's measured trees in one diameter class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DistributionRow {
    /// City name.
    pub city: String,
    /// 1-based class index.
    pub diameter_class: DiameterClass,
    /// Class interval, e.g. `(10, 20]`.
    pub class_label: String,
    /// Trees in the class.
    pub trees: u64,
    /// Percent of the city's measured trees, rounded to two decimals.
    pub percent: f64,
}

/// National figures reported alongside the cleaning counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NationalSummary {
    /// Records in the cleaned table.
    pub records: u64,
    /// Distinct canonical species.
    pub distinct_species: usize,
    /// Distinct genera.
    pub distinct_genera: usize,
    /// Distinct families.
    pub distinct_families: usize,
    /// National `N / (N + I)`, if any tree has a nativity.
    pub native_proportion: Option<f64>,
}

/// Everything counted while cleaning a run's records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// Source ids whose file was read.
    pub sources_loaded: Vec<String>,
    /// Source ids whose file was missing or unusable.
    pub sources_skipped: Vec<String>,
    /// Rows read across every source.
    pub input_rows: u64,
    /// Rows whose diameter text was not a number.
    pub unparseable_dbh: u64,
    /// Rows with cells that were not valid UTF-8, kept with replacement
    /// characters.
    pub lossy_decoded_rows: u64,
    /// Rows dropped for having neither an area nor a tract id.
    pub ungeocodable_dropped: u64,
    /// Rows with no city from the row, the area override or the source.
    pub cityless_dropped: u64,
    /// Records with a blank census tract before the area override fill.
    pub blank_census_tract_before_fill: u64,
    /// Records with a blank census tract after the fill.
    pub blank_census_tract_after_fill: u64,
    /// Distinct area ids whose tract was blank before the fill.
    pub blank_census_tract_areas: BTreeSet<String>,
    /// Cities missing from the geography index.
    pub unknown_cities: BTreeSet<String>,
    /// Non-living marker records, by canonical marker.
    pub non_living: BTreeMap<String, u64>,
    /// Records whose name canonicalized to `missing`.
    pub missing_names: u64,
    /// Diameters recorded as exactly zero.
    pub dbh_not_measured: u64,
    /// Diameters outside the plausible range.
    pub dbh_out_of_range: u64,
    /// Taxon records whose genus has no family.
    pub unresolved_genus_records: u64,
    /// Genera with no family.
    pub unresolved_genera: BTreeSet<String>,
    /// Taxon records whose species is absent from the distribution data.
    pub unresolved_nativity_records: u64,
    /// Species absent from the distribution data.
    pub unresolved_nativity: BTreeSet<String>,
    /// National figures.
    pub national: NationalSummary,
}
