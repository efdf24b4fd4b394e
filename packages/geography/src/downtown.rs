//! Downtown dissemination area flags.

use std::collections::BTreeMap;

use canopy_source::Table;
use canopy_source::parsing::{parse_flag, parse_geo_id};

use crate::GeographyError;

/// Dissemination area id to downtown flag.
#[derive(Debug, Clone, Default)]
pub struct DowntownIndex {
    flags: BTreeMap<String, bool>,
}

impl DowntownIndex {
    /// Loads flags from a table with `DisseminationAreaId` and
    /// `DowntownFlag` columns. Rows whose flag cannot be read are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`GeographyError::Table`] if a required column is missing.
    pub fn from_table(table: &Table) -> Result<Self, GeographyError> {
        let area_col = table.column("DisseminationAreaId")?;
        let flag_col = table.column("DowntownFlag")?;

        let mut flags = BTreeMap::new();
        let mut unreadable = 0_u64;
        for row in table.rows() {
            let (Some(area), Some(flag)) = (
                row.get(area_col).and_then(parse_geo_id),
                row.get(flag_col).and_then(parse_flag),
            ) else {
                unreadable += 1;
                continue;
            };
            flags.entry(area).or_insert(flag);
        }

        if unreadable > 0 {
            log::warn!("{}: skipped {unreadable} unreadable rows", table.name());
        }
        log::info!(
            "Loaded {} downtown flags from '{}' ({} downtown)",
            flags.len(),
            table.name(),
            flags.values().filter(|f| **f).count()
        );
        Ok(Self { flags })
    }

    /// Builds an index from `(area, flag)` pairs.
    #[must_use]
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, bool)>) -> Self {
        Self {
            flags: pairs
                .into_iter()
                .map(|(area, flag)| (area.to_string(), flag))
                .collect(),
        }
    }

    /// Downtown flag of a dissemination area, if known.
    #[must_use]
    pub fn flag(&self, area: &str) -> Option<bool> {
        self.flags.get(area).copied()
    }

    /// Number of flagged areas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Returns `true` if no areas are flagged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_flags() {
        let table = Table::from_reader(
            "downtown",
            "DisseminationAreaId,DowntownFlag\n35204675.0,1\n35204821,0\n35205067,maybe\n".as_bytes(),
        )
        .unwrap();
        let index = DowntownIndex::from_table(&table).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.flag("35204675"), Some(true));
        assert_eq!(index.flag("35204821"), Some(false));
        assert_eq!(index.flag("35205067"), None);
    }

    #[test]
    fn missing_flag_column_is_fatal() {
        let table =
            Table::from_reader("downtown", "DisseminationAreaId,Downtown\n1,1\n".as_bytes()).unwrap();
        assert!(DowntownIndex::from_table(&table).is_err());
    }
}
