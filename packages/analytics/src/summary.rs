//! Taxon rankings and diameter distribution summaries.

use std::collections::{BTreeMap, BTreeSet};

use canopy_analytics_models::{
    DbhSummaryRow, DistributionRow, DiversityMetric, GroupLevel, TopTaxonRow,
};
use canopy_tree_models::{DIAMETER_CLASS_COUNT, DiameterClass, TreeRecord};

use crate::{group_key, map_groups, round2, taxon_label};

/// Median of `values`; `None` when empty.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some(f64::midpoint(sorted[mid - 1], sorted[mid]))
    } else {
        Some(sorted[mid])
    }
}

/// Biased sample skewness `g₁ = m₃ / m₂^{3/2}`.
///
/// `None` when `values` is empty or has no spread.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn skewness(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;

    let (m2, m3) = values.iter().fold((0.0, 0.0), |(m2, m3), &v| {
        let d = v - mean;
        (d.mul_add(d, m2), (d * d).mul_add(d, m3))
    });
    let (m2, m3) = (m2 / n, m3 / n);

    (m2 > f64::EPSILON * mean.abs().max(1.0)).then(|| m3 / m2.powf(1.5))
}

/// Number of distinct names at a taxonomic rank.
pub fn distinct_count<'a>(
    records: impl IntoIterator<Item = &'a TreeRecord>,
    rank: DiversityMetric,
) -> usize {
    records
        .into_iter()
        .filter_map(|r| taxon_label(r, rank))
        .collect::<BTreeSet<_>>()
        .len()
}

/// The `n` most common taxa at `rank`.
///
/// Shares are of every record with a name at that rank. Ties in count
/// are broken by name. For each taxon, `cities_at_threshold` counts the
/// cities holding at least `threshold` of its trees.
#[allow(clippy::cast_precision_loss)]
pub fn top_taxa(
    records: &[TreeRecord],
    rank: DiversityMetric,
    n: usize,
    threshold: u64,
) -> Vec<TopTaxonRow> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    let mut per_city: BTreeMap<(&str, &str), u64> = BTreeMap::new();
    for record in records {
        let Some(taxon) = taxon_label(record, rank) else {
            continue;
        };
        *totals.entry(taxon).or_default() += 1;
        *per_city.entry((taxon, record.city.as_str())).or_default() += 1;
    }

    let total: u64 = totals.values().sum();
    let mut ranked: Vec<(&str, u64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(i, (taxon, trees))| TopTaxonRow {
            rank,
            position: i + 1,
            taxon: taxon.to_string(),
            trees,
            share_percent: round2(trees as f64 / total as f64 * 100.0),
            cities_at_threshold: per_city
                .range((taxon, "")..)
                .take_while(|((t, _), _)| *t == taxon)
                .filter(|(_, count)| **count >= threshold)
                .count(),
        })
        .collect()
}

/// Median and skewness of diameters for every group at `level`.
pub fn dbh_summary<'a>(
    records: impl IntoIterator<Item = &'a TreeRecord>,
    level: GroupLevel,
) -> Vec<DbhSummaryRow> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let Some(dbh) = record.dbh_cm
            && let Some(key) = group_key(record, level)
        {
            groups.entry(key).or_default().push(dbh);
        }
    }

    map_groups(groups, |dbhs| {
        Some((dbhs.len() as u64, median(dbhs)?, skewness(dbhs)))
    })
    .into_iter()
    .map(|(group_key, (trees, median_dbh, skewness))| DbhSummaryRow {
        level,
        group_key,
        trees,
        median_dbh,
        skewness,
    })
    .collect()
}

/// Percent of each city's classified trees in every diameter class.
///
/// Every class is listed for every city, empty classes at zero.
#[allow(clippy::cast_precision_loss)]
pub fn diameter_distribution<'a>(
    records: impl IntoIterator<Item = &'a TreeRecord>,
) -> Vec<DistributionRow> {
    let mut by_city: BTreeMap<&str, [u64; DIAMETER_CLASS_COUNT]> = BTreeMap::new();
    for record in records {
        if let Some(class) = record.diameter_class {
            by_city.entry(&record.city).or_insert([0; DIAMETER_CLASS_COUNT])[class.index() - 1] +=
                1;
        }
    }

    let mut rows = Vec::with_capacity(by_city.len() * DIAMETER_CLASS_COUNT);
    for (city, counts) in by_city {
        let total: u64 = counts.iter().sum();
        for (class, trees) in (1..=DIAMETER_CLASS_COUNT).filter_map(DiameterClass::new).zip(counts) {
            rows.push(DistributionRow {
                city: city.to_string(),
                diameter_class: class,
                class_label: class.label(),
                trees,
                percent: round2(trees as f64 / total as f64 * 100.0),
            });
        }
    }
    rows
}
