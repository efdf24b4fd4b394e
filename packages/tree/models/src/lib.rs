#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tree inventory record types.
//!
//! Every city source is normalized into [`SourceRow`]s, which become
//! [`TreeRecord`]s once their botanical name has been canonicalized. Each
//! later pipeline stage consumes a record and returns a new one with its
//! own fields filled in.

use canopy_geography_models::Province;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Canonical name used when a botanical name is blank or unusable.
pub const MISSING_NAME: &str = "missing";

/// Upper edges (cm) of the fixed diameter classes. Class `i` (1-based)
/// covers `(EDGES[i - 1], EDGES[i]]`.
pub const DIAMETER_CLASS_EDGES: [f64; 17] = [
    0.0,
    10.0,
    20.0,
    30.0,
    40.0,
    50.0,
    60.0,
    70.0,
    80.0,
    90.0,
    100.0,
    110.0,
    120.0,
    130.0,
    140.0,
    150.0,
    f64::INFINITY,
];

/// Number of diameter classes defined by [`DIAMETER_CLASS_EDGES`].
pub const DIAMETER_CLASS_COUNT: usize = DIAMETER_CLASS_EDGES.len() - 1;

/// Whether a species is native to the province a tree was recorded in.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Nativity {
    /// Native to the record's province.
    Native,
    /// Recorded in the distribution data, but not as native to the
    /// record's province.
    Introduced,
    /// Species not present in the distribution data.
    #[default]
    Unresolved,
}

/// What a canonical botanical name denotes.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NameKind {
    /// A taxon (binomial or genus with `spp.`).
    Taxon,
    /// A non-living or non-specific marker (stump, vacant, hedge, ...).
    NonLiving,
    /// Blank or unusable input, canonicalized to [`MISSING_NAME`].
    #[default]
    Missing,
}

/// A 1-based diameter class index into [`DIAMETER_CLASS_EDGES`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DiameterClass(u8);

impl DiameterClass {
    /// Creates a class from its 1-based index.
    ///
    /// Returns `None` when the index is outside `1..=DIAMETER_CLASS_COUNT`.
    #[must_use]
    pub fn new(index: usize) -> Option<Self> {
        if (1..=DIAMETER_CLASS_COUNT).contains(&index) {
            u8::try_from(index).ok().map(Self)
        } else {
            None
        }
    }

    /// Returns the 1-based class index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Exclusive lower bound of the class in centimetres.
    #[must_use]
    pub const fn lower_cm(self) -> f64 {
        DIAMETER_CLASS_EDGES[self.0 as usize - 1]
    }

    /// Inclusive upper bound of the class in centimetres (`INFINITY` for
    /// the open top class).
    #[must_use]
    pub const fn upper_cm(self) -> f64 {
        DIAMETER_CLASS_EDGES[self.0 as usize]
    }

    /// Interval label, e.g. `"(10, 20]"` or `"(150, inf)"`.
    #[must_use]
    pub fn label(self) -> String {
        let upper = self.upper_cm();
        if upper.is_finite() {
            format!("({}, {}]", self.lower_cm(), upper)
        } else {
            format!("({}, inf)", self.lower_cm())
        }
    }
}

/// One tree as read from a city source, after column mapping and unit
/// conversion but before any name or geography processing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRow {
    /// Id of the source definition the row came from.
    pub source_id: String,
    /// Botanical name exactly as it appears in the source.
    pub botanical_name: Option<String>,
    /// Diameter at breast height in centimetres, unvalidated.
    pub dbh_cm: Option<f64>,
    /// Dissemination area id.
    pub dissemination_area_id: Option<String>,
    /// Census tract id.
    pub census_tract_id: Option<String>,
    /// City name as recorded in the row.
    pub city: Option<String>,
}

/// A fully processed tree record, written to the cleaned record table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TreeRecord {
    /// Botanical name exactly as it appears in the source.
    pub botanical_name_raw: Option<String>,
    /// Canonical lowercase name; never empty.
    #[serde(rename = "BotanicalNameCanonical")]
    pub botanical_name: String,
    /// What the canonical name denotes.
    pub name_kind: NameKind,
    /// Genus token (e.g. `"acer"`).
    pub genus: Option<String>,
    /// Two-token species (e.g. `"acer saccharum"`).
    pub species: Option<String>,
    /// Family resolved from the genus.
    pub family: Option<String>,
    /// Diameter at breast height in centimetres.
    #[serde(rename = "DiameterAtBreastHeight")]
    pub dbh_cm: Option<f64>,
    /// Basal area in square metres.
    #[serde(rename = "BasalArea")]
    pub basal_area_m2: Option<f64>,
    /// Dissemination area id.
    pub dissemination_area_id: Option<String>,
    /// Census tract id.
    pub census_tract_id: Option<String>,
    /// City name.
    pub city: String,
    /// Province of the city.
    pub province: Option<Province>,
    /// Analysis region of the city.
    pub region: Option<String>,
    /// Ecozone of the city.
    pub ecozone: Option<String>,
    /// Whether the dissemination area is downtown.
    #[serde(rename = "DowntownFlag")]
    pub downtown: Option<bool>,
    /// Nativity of the species in the record's province, after the run's
    /// unresolved policy. `None` for records without a taxon and for
    /// species the policy leaves out.
    pub nativity: Option<Nativity>,
    /// Diameter class of the DBH.
    pub diameter_class: Option<DiameterClass>,
}

impl TreeRecord {
    /// Builds a record from a geocoded source row and its canonical name.
    ///
    /// Taxonomy, geography labels, nativity and structure are left empty
    /// for the later stages.
    #[must_use]
    pub fn new(row: SourceRow, city: String, botanical_name: String, name_kind: NameKind) -> Self {
        Self {
            botanical_name_raw: row.botanical_name,
            botanical_name,
            name_kind,
            genus: None,
            species: None,
            family: None,
            dbh_cm: row.dbh_cm,
            basal_area_m2: None,
            dissemination_area_id: row.dissemination_area_id,
            census_tract_id: row.census_tract_id,
            city,
            province: None,
            region: None,
            ecozone: None,
            downtown: None,
            nativity: None,
            diameter_class: None,
        }
    }

    /// Returns `true` if the record carries a taxon identity.
    #[must_use]
    pub fn is_taxon(&self) -> bool {
        self.name_kind == NameKind::Taxon
    }
}
