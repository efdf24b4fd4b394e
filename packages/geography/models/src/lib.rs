#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Province codes and geographic label types.
//!
//! These types describe where a tree is: which province, which analysis
//! region and ecozone its city belongs to, and the census geography
//! (dissemination area, census tract) it was geocoded to.

pub mod provinces;

use serde::{Deserialize, Serialize};

pub use provinces::Province;

/// Labels attached to every record of a city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityLabels {
    /// Province the city is in.
    pub province: Province,
    /// Analysis region (e.g. "Prairie", "Atlantic").
    pub region: String,
    /// Terrestrial ecozone (e.g. "Mixedwood Plain").
    pub ecozone: String,
}

/// Fallback geocodes for a dissemination area whose census tract or city
/// was left blank by the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaOverride {
    /// Census tract id (e.g. "9330045.01").
    pub census_tract_id: String,
    /// City name.
    pub city: String,
}

/// Census geography of one record after override filling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geocode {
    /// Dissemination area id (e.g. "59150883").
    pub dissemination_area_id: Option<String>,
    /// Census tract id.
    pub census_tract_id: Option<String>,
    /// City name.
    pub city: Option<String>,
}

impl Geocode {
    /// Returns `true` when neither a dissemination area nor a census tract
    /// is known.
    #[must_use]
    pub const fn is_ungeocodable(&self) -> bool {
        self.dissemination_area_id.is_none() && self.census_tract_id.is_none()
    }
}
