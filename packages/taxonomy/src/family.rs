//! Genus to family lookup.

use std::collections::BTreeMap;

use canopy_source::Table;

use crate::TaxonomyError;

/// Maps a lowercase genus to its family.
#[derive(Debug, Clone, Default)]
pub struct FamilyIndex {
    families: BTreeMap<String, String>,
}

impl FamilyIndex {
    /// Loads the index from a table with `Genus` and `Family` columns.
    ///
    /// Rows missing either value are skipped. If a genus appears more
    /// than once, the first family wins and the conflict is logged.
    ///
    /// # Errors
    ///
    /// Returns [`TaxonomyError::Table`] if either column is missing.
    pub fn from_table(table: &Table) -> Result<Self, TaxonomyError> {
        let genus_col = table.column("Genus")?;
        let family_col = table.column("Family")?;

        let mut families = BTreeMap::new();
        for row in table.rows() {
            let (Some(genus), Some(family)) = (row.get(genus_col), row.get(family_col)) else {
                continue;
            };
            let genus = genus.to_lowercase();
            match families.get(&genus) {
                Some(existing) if existing != family => {
                    log::warn!(
                        "{}: genus '{genus}' maps to both '{existing}' and '{family}', keeping '{existing}'",
                        table.name()
                    );
                }
                Some(_) => {}
                None => {
                    families.insert(genus, family.to_string());
                }
            }
        }

        log::info!("Loaded {} genera from '{}'", families.len(), table.name());
        Ok(Self { families })
    }

    /// Builds an index from `(genus, family)` pairs.
    #[must_use]
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            families: pairs
                .into_iter()
                .map(|(genus, family)| (genus.to_lowercase(), family.to_string()))
                .collect(),
        }
    }

    /// Family of `genus`, or `None` if the genus is not indexed.
    #[must_use]
    pub fn family(&self, genus: &str) -> Option<&str> {
        self.families.get(genus).map(String::as_str)
    }

    /// Number of indexed genera.
    #[must_use]
    pub fn len(&self) -> usize {
        self.families.len()
    }

    /// Returns `true` if no genera are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_lowercased_genus() {
        let table = Table::from_reader(
            "families",
            "Genus,Family\nAcer,Sapindaceae\nQuercus,Fagaceae\nUlmus,\n".as_bytes(),
        )
        .unwrap();
        let index = FamilyIndex::from_table(&table).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.family("acer"), Some("Sapindaceae"));
        assert_eq!(index.family("ulmus"), None);
        assert_eq!(index.family("zelkova"), None);
    }

    #[test]
    fn first_family_wins() {
        let table = Table::from_reader(
            "families",
            "Genus,Family\nacer,Sapindaceae\nacer,Aceraceae\n".as_bytes(),
        )
        .unwrap();
        let index = FamilyIndex::from_table(&table).unwrap();
        assert_eq!(index.family("acer"), Some("Sapindaceae"));
    }

    #[test]
    fn missing_genus_column_is_fatal() {
        let table = Table::from_reader("families", "Name,Family\n".as_bytes()).unwrap();
        assert!(FamilyIndex::from_table(&table).is_err());
    }
}
