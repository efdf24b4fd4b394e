//! City to province, region and ecozone lookup.

use std::collections::BTreeMap;

use canopy_geography_models::{CityLabels, Province};
use canopy_source::Table;

use crate::GeographyError;

/// Location index shipped with the crate, covering every registered city.
const BUILTIN_LOCATIONS_CSV: &str = include_str!("../data/locations.csv");

#[derive(Debug, Clone)]
struct CityEntry {
    name: String,
    labels: CityLabels,
}

/// Maps a city name to its labels.
///
/// Lookups ignore case, surrounding whitespace, and French accents, so
/// `"MONTRÉAL"` finds `"Montreal"`.
#[derive(Debug, Clone, Default)]
pub struct GeographyIndex {
    cities: BTreeMap<String, CityEntry>,
}

impl GeographyIndex {
    /// Loads the index from a table with `City`, `Province`, `Region` and
    /// `Ecozone` columns.
    ///
    /// Rows with a blank city or an unrecognised province are skipped with
    /// a warning.
    ///
    /// # Errors
    ///
    /// Returns [`GeographyError::Table`] if a required column is missing.
    pub fn from_table(table: &Table) -> Result<Self, GeographyError> {
        let city_col = table.column("City")?;
        let province_col = table.column("Province")?;
        let region_col = table.column("Region")?;
        let ecozone_col = table.column("Ecozone")?;

        let mut cities = BTreeMap::new();
        for row in table.rows() {
            let Some(city) = row.get(city_col) else {
                continue;
            };
            let Some(province) = row.get(province_col).and_then(Province::from_label) else {
                log::warn!(
                    "{}: unrecognised province {:?} for {city}, skipping",
                    table.name(),
                    row.get(province_col)
                );
                continue;
            };

            let labels = CityLabels {
                province,
                region: row.get(region_col).unwrap_or_default().to_string(),
                ecozone: row.get(ecozone_col).unwrap_or_default().to_string(),
            };
            cities.insert(
                city_key(city),
                CityEntry {
                    name: city.to_string(),
                    labels,
                },
            );
        }

        log::info!("Loaded {} cities from '{}'", cities.len(), table.name());
        Ok(Self { cities })
    }

    /// Returns the location index shipped with the crate.
    ///
    /// # Panics
    ///
    /// Panics if the embedded table is malformed (covered by tests).
    #[must_use]
    pub fn builtin() -> Self {
        Table::from_reader("locations", BUILTIN_LOCATIONS_CSV.as_bytes())
            .map_err(GeographyError::from)
            .and_then(|table| Self::from_table(&table))
            .unwrap_or_else(|e| panic!("Failed to parse built-in location index: {e}"))
    }

    /// The index's spelling of `city`, if it is indexed.
    #[must_use]
    pub fn canonical_city(&self, city: &str) -> Option<&str> {
        self.cities.get(&city_key(city)).map(|e| e.name.as_str())
    }

    /// Labels of `city`, if it is indexed.
    #[must_use]
    pub fn labels(&self, city: &str) -> Option<&CityLabels> {
        self.cities.get(&city_key(city)).map(|e| &e.labels)
    }

    /// Indexed city names.
    pub fn cities(&self) -> impl Iterator<Item = &str> {
        self.cities.values().map(|e| e.name.as_str())
    }

    /// Number of indexed cities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    /// Returns `true` if no cities are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

fn city_key(city: &str) -> String {
    city.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'à' | 'â' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' => 'o',
            'ù' | 'û' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_every_city() {
        let index = GeographyIndex::builtin();
        assert_eq!(index.len(), 32);

        let halifax = index.labels("Halifax").unwrap();
        assert_eq!(halifax.province, Province::NovaScotia);
        assert_eq!(halifax.region, "Atlantic");
        assert_eq!(halifax.ecozone, "Atlantic Maritime");
    }

    #[test]
    fn kelowna_is_montane_cordillera() {
        let index = GeographyIndex::builtin();
        let kelowna = index.labels("Kelowna").unwrap();
        assert_eq!(kelowna.region, "BC");
        assert_eq!(kelowna.ecozone, "Montane Cordillera");
    }

    #[test]
    fn lookup_ignores_case_and_accents() {
        let index = GeographyIndex::builtin();
        assert_eq!(index.canonical_city("  MONTRÉAL "), Some("Montreal"));
        assert_eq!(index.canonical_city("quebec  city"), Some("Quebec City"));
        assert_eq!(index.canonical_city("Boston"), None);
    }

    #[test]
    fn skips_unknown_provinces() {
        let table = Table::from_reader(
            "locations",
            "City,Province,Region,Ecozone\nA,Ontario,Ontario,Mixedwood Plain\nB,Ohio,X,Y\n".as_bytes(),
        )
        .unwrap();
        let index = GeographyIndex::from_table(&table).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.labels("B").is_none());
    }

    #[test]
    fn missing_ecozone_column_is_fatal() {
        let table = Table::from_reader("locations", "City,Province,Region\n".as_bytes()).unwrap();
        let err = GeographyIndex::from_table(&table).unwrap_err();
        assert_eq!(
            err.to_string(),
            "table 'locations' is missing required column 'Ecozone'"
        );
    }
}
