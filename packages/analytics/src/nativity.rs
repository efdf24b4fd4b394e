//! Native proportion of trees.
//!
//! Records arrive with their nativity already passed through the run's
//! unresolved policy, so only [`Nativity::Native`] and
//! [`Nativity::Introduced`] are counted here. Records without a taxon
//! (non-living markers, missing names) are never counted.

use std::collections::BTreeMap;

use canopy_analytics_models::NativityRow;
use canopy_tree_models::{Nativity, TreeRecord};

use crate::round2;

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    native: u64,
    introduced: u64,
}

impl Tally {
    const fn add(&mut self, nativity: Option<Nativity>) {
        match nativity {
            Some(Nativity::Native) => self.native += 1,
            Some(Nativity::Introduced) => self.introduced += 1,
            Some(Nativity::Unresolved) | None => {}
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn proportion(self) -> Option<f64> {
        let total = self.native + self.introduced;
        (total > 0).then(|| self.native as f64 / total as f64)
    }
}

/// `N / (N + I)` over `records`, or `None` if none is native or
/// introduced.
pub fn native_proportion<'a>(records: impl IntoIterator<Item = &'a TreeRecord>) -> Option<f64> {
    let mut tally = Tally::default();
    for record in records.into_iter().filter(|r| r.is_taxon()) {
        tally.add(record.nativity);
    }
    tally.proportion()
}

/// Native percentage per city, rounded to two decimals, sorted by city.
pub fn nativity_by_city(records: &[TreeRecord]) -> Vec<NativityRow> {
    let mut by_city: BTreeMap<&str, Tally> = BTreeMap::new();
    for record in records.iter().filter(|r| r.is_taxon()) {
        by_city.entry(&record.city).or_default().add(record.nativity);
    }

    by_city
        .into_iter()
        .filter_map(|(city, tally)| {
            Some(NativityRow {
                city: city.to_string(),
                native_proportion_percent: round2(tally.proportion()? * 100.0),
            })
        })
        .collect()
}
