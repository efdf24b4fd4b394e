//! Per-province nativity classification.
//!
//! The nativity table lists, for each taxon, an "introduced" flag per
//! province (0 native, 1 introduced). Infraspecific taxa are reduced to
//! their species and collapsed with the minimum flag per province, so a
//! species is native wherever any of its rows says so.

use std::collections::{BTreeMap, BTreeSet};

use canopy_geography_models::Province;
use canopy_source::{Table, TableError};
use canopy_source::parsing::parse_flag;
use canopy_tree_models::{NameKind, Nativity};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::TaxonomyError;
use crate::canonicalize::Canonicalizer;
use crate::resolver::ParsingStrategy;

/// What to do with records whose species is not in the nativity table.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UnresolvedPolicy {
    /// Count them as introduced.
    #[default]
    FoldToIntroduced,
    /// Leave them out of nativity proportions.
    Drop,
}

impl UnresolvedPolicy {
    /// Maps a classification to its reported value, or `None` if the
    /// record is left out of nativity reporting.
    #[must_use]
    pub const fn apply(self, nativity: Nativity) -> Option<Nativity> {
        match (self, nativity) {
            (_, Nativity::Native) => Some(Nativity::Native),
            (_, Nativity::Introduced) | (Self::FoldToIntroduced, Nativity::Unresolved) => {
                Some(Nativity::Introduced)
            }
            (Self::Drop, Nativity::Unresolved) => None,
        }
    }
}

/// Species to the set of provinces where it is native.
#[derive(Debug, Clone, Default)]
pub struct NativityIndex {
    native: BTreeMap<String, BTreeSet<Province>>,
}

impl NativityIndex {
    /// Loads the index from a table with a `Species` (or `Botanical Name`)
    /// column and one flag column per province.
    ///
    /// Province columns are recognised by full name, postal code, or TDWG
    /// code. Keys are canonicalized and reduced to species so they join
    /// against canonical record species. Blank flag cells are "not
    /// recorded" and do not affect the collapse.
    ///
    /// # Errors
    ///
    /// Returns [`TaxonomyError::Table`] if there is no species column or no
    /// province column.
    pub fn from_table(table: &Table, canonicalizer: &Canonicalizer) -> Result<Self, TaxonomyError> {
        let species_col = table
            .find_column(&["Species".to_string(), "Botanical Name".to_string()])
            .ok_or_else(|| TableError::MissingColumn {
                table: table.name().to_string(),
                column: "Species".to_string(),
            })?;

        let province_cols: Vec<(usize, Province)> = table
            .headers()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != species_col)
            .filter_map(|(i, header)| Province::from_label(header).map(|p| (i, p)))
            .collect();

        if province_cols.is_empty() {
            return Err(TableError::MissingColumn {
                table: table.name().to_string(),
                column: "<province>".to_string(),
            }
            .into());
        }

        let mut flags = Vec::new();
        let mut skipped = 0_u64;
        for row in table.rows() {
            let canonical = canonicalizer.canonicalize(row.get(species_col));
            let taxon = if canonical.kind == NameKind::Taxon {
                ParsingStrategy::Binomial.resolve(&canonical.name)
            } else {
                None
            };
            let Some(taxon) = taxon else {
                skipped += 1;
                continue;
            };

            for &(col, province) in &province_cols {
                if let Some(introduced) = row.get(col).and_then(parse_flag) {
                    flags.push((taxon.species.clone(), province, introduced));
                }
            }
        }

        if skipped > 0 {
            log::warn!("{}: skipped {skipped} rows without a usable species", table.name());
        }

        let index = Self::from_flags(flags);
        log::info!(
            "Loaded nativity for {} species from '{}' ({} province columns)",
            index.len(),
            table.name(),
            province_cols.len()
        );
        Ok(index)
    }

    /// Builds an index from `(species, province, introduced)` flags,
    /// collapsing with the minimum flag per species and province.
    #[must_use]
    pub fn from_flags(flags: impl IntoIterator<Item = (String, Province, bool)>) -> Self {
        let mut collapsed: BTreeMap<String, BTreeMap<Province, bool>> = BTreeMap::new();
        for (species, province, introduced) in flags {
            collapsed
                .entry(species)
                .or_default()
                .entry(province)
                .and_modify(|flag| *flag = *flag && introduced)
                .or_insert(introduced);
        }

        let native = collapsed
            .into_iter()
            .map(|(species, provinces)| {
                let native_in = provinces
                    .into_iter()
                    .filter(|(_, introduced)| !introduced)
                    .map(|(province, _)| province)
                    .collect();
                (species, native_in)
            })
            .collect();

        Self { native }
    }

    /// Provinces where `species` is native, or `None` if the species is
    /// not in the index.
    #[must_use]
    pub fn native_provinces(&self, species: &str) -> Option<&BTreeSet<Province>> {
        self.native.get(species)
    }

    /// Classifies a species recorded in `province`.
    ///
    /// A species missing from the index is [`Nativity::Unresolved`]. A
    /// known species is native only if `province` is in its native set.
    #[must_use]
    pub fn classify(&self, species: Option<&str>, province: Option<Province>) -> Nativity {
        let Some(native_in) = species.and_then(|s| self.native_provinces(s)) else {
            return Nativity::Unresolved;
        };

        match province {
            Some(p) if native_in.contains(&p) => Nativity::Native,
            _ => Nativity::Introduced,
        }
    }

    /// Number of indexed species.
    #[must_use]
    pub fn len(&self) -> usize {
        self.native.len()
    }

    /// Returns `true` if no species are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.native.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
Botanical Name,British Columbia,Ontario,QUE,Family
Acer saccharum,1,0,0,Sapindaceae
Acer saccharum subsp. nigrum,1,0,1,Sapindaceae
Acer macrophyllum,0,1,,Sapindaceae
Acer platanoides,1,1,1,Sapindaceae
,0,0,0,
";

    fn index() -> NativityIndex {
        let table = Table::from_reader("nativity", TABLE.as_bytes()).unwrap();
        NativityIndex::from_table(&table, &Canonicalizer::default()).unwrap()
    }

    #[test]
    fn collapses_subspecies_with_minimum_flag() {
        let index = index();
        let native: Vec<Province> = index
            .native_provinces("acer saccharum")
            .unwrap()
            .iter()
            .copied()
            .collect();
        assert_eq!(native, [Province::Ontario, Province::Quebec]);
    }

    #[test]
    fn classifies_by_province() {
        let index = index();
        assert_eq!(
            index.classify(Some("acer saccharum"), Some(Province::Ontario)),
            Nativity::Native
        );
        assert_eq!(
            index.classify(Some("acer saccharum"), Some(Province::BritishColumbia)),
            Nativity::Introduced
        );
        assert_eq!(
            index.classify(Some("acer platanoides"), Some(Province::Quebec)),
            Nativity::Introduced
        );
    }

    #[test]
    fn blank_cells_are_not_recorded() {
        let index = index();
        assert_eq!(
            index.classify(Some("acer macrophyllum"), Some(Province::Quebec)),
            Nativity::Introduced
        );
        assert_eq!(
            index.classify(Some("acer macrophyllum"), Some(Province::BritishColumbia)),
            Nativity::Native
        );
    }

    #[test]
    fn unknown_species_is_unresolved() {
        let index = index();
        assert_eq!(
            index.classify(Some("ginkgo biloba"), Some(Province::Ontario)),
            Nativity::Unresolved
        );
        assert_eq!(index.classify(None, Some(Province::Ontario)), Nativity::Unresolved);
    }

    #[test]
    fn ignores_non_province_columns_and_blank_keys() {
        assert_eq!(index().len(), 3);
    }

    #[test]
    fn table_without_province_columns_is_fatal() {
        let table = Table::from_reader("nativity", "Species,Family\nacer,x\n".as_bytes()).unwrap();
        let err = NativityIndex::from_table(&table, &Canonicalizer::default()).unwrap_err();
        assert!(err.to_string().contains("<province>"));
    }

    #[test]
    fn fold_policy() {
        let fold = UnresolvedPolicy::FoldToIntroduced;
        assert_eq!(fold.apply(Nativity::Unresolved), Some(Nativity::Introduced));
        assert_eq!(fold.apply(Nativity::Native), Some(Nativity::Native));

        let drop = UnresolvedPolicy::Drop;
        assert_eq!(drop.apply(Nativity::Unresolved), None);
        assert_eq!(drop.apply(Nativity::Introduced), Some(Nativity::Introduced));
    }

    #[test]
    fn policy_parses_from_snake_case() {
        assert_eq!(
            "drop".parse::<UnresolvedPolicy>().unwrap(),
            UnresolvedPolicy::Drop
        );
        assert_eq!(UnresolvedPolicy::default().to_string(), "fold_to_introduced");
    }
}
