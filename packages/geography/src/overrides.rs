//! Dissemination area overrides for blank census tracts and cities.
//!
//! Some inventories geocode a tree to a dissemination area but leave its
//! census tract or city empty. The override table supplies both for those
//! areas; values already present on a record are never replaced.

use std::collections::BTreeMap;

use canopy_geography_models::{DaOverride, Geocode};
use canopy_source::Table;
use canopy_source::parsing::parse_geo_id;

use crate::{GeographyError, coalesce};

/// Override table shipped with the crate.
const BUILTIN_OVERRIDES_CSV: &str = include_str!("../data/da_overrides.csv");

/// Dissemination area id to fallback census tract and city.
#[derive(Debug, Clone, Default)]
pub struct DaOverrides {
    by_area: BTreeMap<String, DaOverride>,
}

impl DaOverrides {
    /// Loads overrides from a table with `DisseminationAreaId`,
    /// `CensusTractId` and `City` columns.
    ///
    /// # Errors
    ///
    /// Returns [`GeographyError::Table`] if a required column is missing.
    pub fn from_table(table: &Table) -> Result<Self, GeographyError> {
        let area_col = table.column("DisseminationAreaId")?;
        let tract_col = table.column("CensusTractId")?;
        let city_col = table.column("City")?;

        let mut by_area = BTreeMap::new();
        for row in table.rows() {
            let (Some(area), Some(tract), Some(city)) = (
                row.get(area_col).and_then(parse_geo_id),
                row.get(tract_col).and_then(parse_geo_id),
                row.get(city_col),
            ) else {
                log::warn!("{}: skipping incomplete override row", table.name());
                continue;
            };
            by_area.insert(
                area,
                DaOverride {
                    census_tract_id: tract,
                    city: city.to_string(),
                },
            );
        }

        log::info!("Loaded {} area overrides from '{}'", by_area.len(), table.name());
        Ok(Self { by_area })
    }

    /// Returns the override table shipped with the crate.
    ///
    /// # Panics
    ///
    /// Panics if the embedded table is malformed (covered by tests).
    #[must_use]
    pub fn builtin() -> Self {
        Table::from_reader("da_overrides", BUILTIN_OVERRIDES_CSV.as_bytes())
            .map_err(GeographyError::from)
            .and_then(|table| Self::from_table(&table))
            .unwrap_or_else(|e| panic!("Failed to parse built-in area overrides: {e}"))
    }

    /// Override for a dissemination area.
    #[must_use]
    pub fn get(&self, area: &str) -> Option<&DaOverride> {
        self.by_area.get(area)
    }

    /// Number of overridden areas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_area.len()
    }

    /// Returns `true` if there are no overrides.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_area.is_empty()
    }

    /// Fills a blank census tract and city from the record's dissemination
    /// area override.
    #[must_use]
    pub fn fill(&self, geocode: Geocode) -> Geocode {
        let Some(fallback) = geocode
            .dissemination_area_id
            .as_deref()
            .and_then(|area| self.get(area))
        else {
            return geocode;
        };

        Geocode {
            census_tract_id: coalesce(
                geocode.census_tract_id,
                Some(fallback.census_tract_id.clone()),
            ),
            city: coalesce(geocode.city, Some(fallback.city.clone())),
            dissemination_area_id: geocode.dissemination_area_id,
        }
    }
}
