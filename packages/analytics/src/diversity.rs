//! Shannon-Wiener diversity of taxa and diameter classes.

use std::collections::BTreeMap;

use canopy_analytics_models::{DiversityMetric, DiversityRow, DiversityTable, GroupLevel};
use canopy_structure::classify;
use canopy_tree_models::{DIAMETER_CLASS_EDGES, TreeRecord};

use crate::{group_key, map_groups, taxon_label};

/// Diversity of one group of observations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diversity {
    /// `H = -Σ pᵢ ln pᵢ`.
    pub shannon_index: f64,
    /// `ln(k)`, the largest `H` possible over `k` categories.
    pub max_diversity: f64,
}

/// `H = -Σ pᵢ ln pᵢ` over the non-zero counts. Zero when there are no
/// observations.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn shannon_index(counts: &[u64]) -> f64 {
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;

    let h: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            p * p.ln()
        })
        .sum();
    // -0.0 for a single category
    (-h).max(0.0)
}

/// `ln(k)`; zero for no categories.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn max_diversity(categories: usize) -> f64 {
    if categories == 0 {
        0.0
    } else {
        (categories as f64).ln()
    }
}

/// Diversity of categorical labels, measured over the distinct labels
/// observed.
#[must_use]
pub fn taxonomic_diversity<'a>(labels: impl IntoIterator<Item = &'a str>) -> Option<Diversity> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    if counts.is_empty() {
        return None;
    }

    let counts: Vec<u64> = counts.into_values().collect();
    Some(Diversity {
        shannon_index: shannon_index(&counts),
        max_diversity: max_diversity(counts.len()),
    })
}

/// Diversity of diameter classes.
///
/// Diameters are binned with every class edge to find the highest
/// non-empty class, then binned again from scratch with the edges cut at
/// that class. `k` is the number of classes in the cut edge set, empty
/// ones included.
#[must_use]
pub fn structural_diversity(dbhs: &[f64]) -> Option<Diversity> {
    let highest = dbhs
        .iter()
        .filter_map(|&d| classify(d, &DIAMETER_CLASS_EDGES))
        .max()?;

    let edges = &DIAMETER_CLASS_EDGES[..=highest];
    let mut counts = vec![0_u64; highest];
    for &dbh in dbhs {
        if let Some(class) = classify(dbh, edges) {
            counts[class - 1] += 1;
        }
    }

    Some(Diversity {
        shannon_index: shannon_index(&counts),
        max_diversity: max_diversity(edges.len() - 1),
    })
}

/// Diversity of `metric` for every group `key` assigns.
///
/// Records without a key or without a value for the metric are left out;
/// groups left with no values produce no entry.
pub fn diversity_by<'a>(
    records: impl IntoIterator<Item = &'a TreeRecord>,
    metric: DiversityMetric,
    key: impl Fn(&TreeRecord) -> Option<String>,
) -> Vec<(String, Diversity)> {
    if metric.is_taxonomic() {
        let mut groups: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for record in records {
            if let Some(label) = taxon_label(record, metric)
                && let Some(key) = key(record)
            {
                groups.entry(key).or_default().push(label);
            }
        }
        map_groups(groups, |labels| taxonomic_diversity(labels.iter().copied()))
    } else {
        let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for record in records {
            if let Some(dbh) = record.dbh_cm
                && let Some(key) = key(record)
            {
                groups.entry(key).or_default().push(dbh);
            }
        }
        map_groups(groups, |dbhs| structural_diversity(dbhs))
    }
}

/// Diversity of `metric` for every group at `level`.
pub fn diversity_table<'a>(
    records: impl IntoIterator<Item = &'a TreeRecord>,
    metric: DiversityMetric,
    level: GroupLevel,
) -> DiversityTable {
    let rows: Vec<DiversityRow> = diversity_by(records, metric, |r| group_key(r, level))
        .into_iter()
        .map(|(group_key, d)| DiversityRow {
            group_key,
            shannon_index: d.shannon_index,
            max_diversity: d.max_diversity,
        })
        .collect();

    log::debug!("{metric} diversity by {level}: {} groups", rows.len());
    DiversityTable {
        metric,
        level,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::test_support::tree;

    #[test]
    fn shannon_of_four_four_two() {
        assert_relative_eq!(shannon_index(&[4, 4, 2]), 1.054_920_2, epsilon = 1e-6);
        assert_relative_eq!(max_diversity(3), 3.0_f64.ln());
    }

    #[test]
    fn uniform_counts_reach_the_maximum() {
        assert_relative_eq!(shannon_index(&[7, 7, 7, 7]), max_diversity(4), epsilon = 1e-12);
        assert!(shannon_index(&[7, 1, 7, 7]) < max_diversity(4));
    }

    #[test]
    fn single_category_is_zero() {
        assert_eq!(shannon_index(&[9]), 0.0);
        assert_eq!(shannon_index(&[]), 0.0);
        assert_eq!(max_diversity(1), 0.0);
    }

    #[test]
    fn zero_counts_are_ignored() {
        assert_relative_eq!(shannon_index(&[4, 0, 4, 2, 0]), shannon_index(&[4, 4, 2]));
    }

    #[test]
    fn taxonomic_counts_distinct_labels() {
        let labels = ["acer", "acer", "acer", "acer", "tilia", "tilia", "tilia", "tilia", "ulmus", "ulmus"];
        let d = taxonomic_diversity(labels).unwrap();
        assert_relative_eq!(d.shannon_index, 1.054_920_2, epsilon = 1e-6);
        assert_relative_eq!(d.max_diversity, 3.0_f64.ln());
        assert!(taxonomic_diversity([]).is_none());
    }

    #[test]
    fn structural_truncates_at_highest_class() {
        let d = structural_diversity(&[5.0, 15.0, 15.0, 25.0]).unwrap();
        assert_relative_eq!(d.shannon_index, shannon_index(&[1, 2, 1]));
        assert_relative_eq!(d.max_diversity, 3.0_f64.ln());
    }

    #[test]
    fn structural_counts_empty_classes_below_the_highest() {
        let d = structural_diversity(&[5.0, 200.0]).unwrap();
        assert_relative_eq!(d.shannon_index, 2.0_f64.ln());
        assert_relative_eq!(d.max_diversity, 16.0_f64.ln());
    }

    #[test]
    fn structural_needs_a_classifiable_diameter() {
        assert!(structural_diversity(&[]).is_none());
        assert!(structural_diversity(&[0.0, -1.0]).is_none());
    }

    #[test]
    fn table_per_city() {
        let records = vec![
            tree("Calgary", "acer rubrum", Some(12.0)),
            tree("Calgary", "acer saccharum", Some(30.0)),
            tree("Calgary", "tilia cordata", Some(8.0)),
            tree("Calgary", "ulmus americana", None),
            tree("Airdrie", "acer rubrum", None),
        ];

        let species = diversity_table(&records, DiversityMetric::Species, GroupLevel::City);
        assert_eq!(species.rows.len(), 2);
        assert_eq!(species.rows[0].group_key, "Airdrie");
        assert_eq!(species.rows[0].shannon_index, 0.0);
        assert_relative_eq!(species.rows[1].shannon_index, 4.0_f64.ln());

        let genus = diversity_table(&records, DiversityMetric::Genus, GroupLevel::National);
        assert_eq!(genus.rows.len(), 1);
        assert_eq!(genus.rows[0].group_key, "Canada");
        assert_relative_eq!(genus.rows[0].max_diversity, 3.0_f64.ln());

        let family = diversity_table(&records, DiversityMetric::Family, GroupLevel::City);
        assert!(family.rows.is_empty());

        let classes = diversity_table(&records, DiversityMetric::DiameterClass, GroupLevel::City);
        assert_eq!(classes.rows.len(), 1);
        assert_relative_eq!(classes.rows[0].shannon_index, 3.0_f64.ln());
        assert_relative_eq!(classes.rows[0].max_diversity, 3.0_f64.ln());
    }
}
