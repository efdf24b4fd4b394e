//! Downtown versus non-downtown comparison with the Mann-Whitney U test.

use std::collections::BTreeMap;

use canopy_analytics_models::{ComparisonRow, DiversityMetric};
use canopy_tree_models::TreeRecord;

use crate::diversity_by;

/// Largest sample size for which the exact distribution of U is used.
pub const EXACT_MAX_SAMPLE: usize = 8;

/// Result of a two-sided Mann-Whitney U test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MannWhitney {
    /// U of the first sample: the number of pairs in which its value is
    /// larger, ties counting one half.
    pub u: f64,
    /// Two-sided p-value.
    pub p_value: f64,
}

/// Two-sided Mann-Whitney U test of `x` against `y`.
///
/// The p-value comes from the exact distribution of U when both samples
/// have at most [`EXACT_MAX_SAMPLE`] values and there are no ties, and
/// from the normal approximation with tie and continuity correction
/// otherwise. Returns `None` if either sample is empty.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::float_cmp)]
pub fn mann_whitney_u(x: &[f64], y: &[f64]) -> Option<MannWhitney> {
    if x.is_empty() || y.is_empty() {
        return None;
    }

    let (n1, n2) = (x.len(), y.len());
    let ranks = rank(x, y);
    let n1f = n1 as f64;
    let n2f = n2 as f64;

    let u1 = ranks.first_sample_sum - n1f * (n1f + 1.0) / 2.0;
    let u2 = n1f * n2f - u1;

    let p_value = if n1 <= EXACT_MAX_SAMPLE && n2 <= EXACT_MAX_SAMPLE && ranks.tie_term == 0.0 {
        exact_p_value(u1.min(u2), n1, n2)
    } else {
        asymptotic_p_value(u1.max(u2), n1f, n2f, ranks.tie_term)
    };

    Some(MannWhitney { u: u1, p_value })
}

struct Ranks {
    first_sample_sum: f64,
    /// `Σ (t³ - t)` over tie groups of size `t`.
    tie_term: f64,
}

/// Ranks the pooled samples, giving tied values their average rank.
#[allow(clippy::cast_precision_loss, clippy::float_cmp)]
fn rank(x: &[f64], y: &[f64]) -> Ranks {
    let mut pooled: Vec<(f64, bool)> = x
        .iter()
        .map(|&v| (v, true))
        .chain(y.iter().map(|&v| (v, false)))
        .collect();
    pooled.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut first_sample_sum = 0.0;
    let mut tie_term = 0.0;
    let mut start = 0;
    while start < pooled.len() {
        let mut end = start + 1;
        while end < pooled.len() && pooled[end].0 == pooled[start].0 {
            end += 1;
        }

        // 1-based ranks start+1 ..= end
        let average = (start + 1 + end) as f64 / 2.0;
        let in_first = pooled[start..end].iter().filter(|(_, first)| *first).count();
        first_sample_sum += average * in_first as f64;

        let t = (end - start) as f64;
        tie_term += t * t * t - t;
        start = end;
    }

    Ranks {
        first_sample_sum,
        tie_term,
    }
}

/// `P(U <= u) + P(U >= n1·n2 - u)` under the null hypothesis.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn exact_p_value(u_min: f64, n1: usize, n2: usize) -> f64 {
    let frequencies = u_frequencies(n1, n2);
    let total: f64 = frequencies.iter().sum();
    let upto = u_min.round() as usize;
    let tail: f64 = frequencies.iter().take(upto + 1).sum();
    (2.0 * tail / total).min(1.0)
}

/// Number of orderings of `n1` and `n2` values producing each U.
///
/// Built from `f(i, j, u) = f(i - 1, j, u - j) + f(i, j - 1, u)`: the
/// largest value either belongs to the first sample and beats all `j`
/// values of the second, or belongs to the second and beats none.
fn u_frequencies(n1: usize, n2: usize) -> Vec<f64> {
    let mut table: Vec<Vec<Vec<f64>>> = vec![vec![Vec::new(); n2 + 1]; n1 + 1];
    for i in 0..=n1 {
        for j in 0..=n2 {
            let mut freq = vec![0.0; i * j + 1];
            if i == 0 || j == 0 {
                freq[0] = 1.0;
            } else {
                for (u, f) in table[i - 1][j].iter().enumerate() {
                    freq[u + j] += f;
                }
                for (u, f) in table[i][j - 1].iter().enumerate() {
                    freq[u] += f;
                }
            }
            table[i][j] = freq;
        }
    }
    std::mem::take(&mut table[n1][n2])
}

fn asymptotic_p_value(u_max: f64, n1: f64, n2: f64, tie_term: f64) -> f64 {
    let n = n1 + n2;
    let mean = n1 * n2 / 2.0;
    let variance = n1 * n2 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
    if variance <= 0.0 {
        // every value tied
        return 1.0;
    }

    let z = (u_max - mean - 0.5) / variance.sqrt();
    (2.0 * normal_sf(z)).min(1.0)
}

/// Upper tail of the standard normal distribution.
fn normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / std::f64::consts::SQRT_2)
}

/// Complementary error function, Chebyshev approximation with relative
/// error below 1.2e-7.
#[allow(clippy::suboptimal_flops)]
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let r = t * poly.exp();
    if x >= 0.0 { r } else { 2.0 - r }
}

/// Compares per-area diversity inside and outside downtown for each city.
///
/// Areas are dissemination areas; an area's side is the downtown flag of
/// its records, and areas without a flag are left out. A city with no
/// areas on one side gets a row with empty statistics.
pub fn compare_downtown(
    records: &[TreeRecord],
    cities: &[String],
    metrics: &[DiversityMetric],
) -> Vec<ComparisonRow> {
    let mut rows = Vec::with_capacity(cities.len() * metrics.len());

    for city in cities {
        let city_records: Vec<&TreeRecord> = records.iter().filter(|r| &r.city == city).collect();
        let flags: BTreeMap<&str, bool> = city_records
            .iter()
            .filter_map(|r| Some((r.dissemination_area_id.as_deref()?, r.downtown?)))
            .collect();

        for &metric in metrics {
            let mut downtown = Vec::new();
            let mut other = Vec::new();
            let per_area = diversity_by(city_records.iter().copied(), metric, |r| {
                r.dissemination_area_id.clone()
            });
            for (area, diversity) in per_area {
                match flags.get(area.as_str()) {
                    Some(true) => downtown.push(diversity.shannon_index),
                    Some(false) => other.push(diversity.shannon_index),
                    None => {}
                }
            }

            let result = mann_whitney_u(&downtown, &other);
            if result.is_none() {
                log::info!(
                    "{city}: no {metric} comparison ({} downtown areas, {} other areas)",
                    downtown.len(),
                    other.len()
                );
            }
            rows.push(ComparisonRow {
                city: city.clone(),
                diversity_metric_name: metric,
                u_statistic: result.map(|r| r.u),
                p_value: result.map(|r| r.p_value),
            });
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::test_support::tree;

    #[test]
    fn erfc_reference_values() {
        assert_relative_eq!(erfc(0.0), 1.0, epsilon = 1e-7);
        assert_relative_eq!(erfc(1.0), 0.157_299_2, epsilon = 1e-7);
        assert_relative_eq!(erfc(-1.0), 1.842_700_8, epsilon = 1e-7);
        assert_relative_eq!(normal_sf(1.959_964), 0.025, epsilon = 1e-6);
    }

    #[test]
    fn frequencies_count_every_ordering() {
        let freq = u_frequencies(3, 3);
        assert_eq!(freq.len(), 10);
        assert_relative_eq!(freq.iter().sum::<f64>(), 20.0);
        assert_eq!(freq[0], 1.0);
        assert_eq!(freq[9], 1.0);
        assert_eq!(freq[4], 3.0);
    }

    #[test]
    fn exact_separated_samples() {
        let result = mann_whitney_u(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert_relative_eq!(result.u, 0.0);
        assert_relative_eq!(result.p_value, 0.1, epsilon = 1e-12);

        let reversed = mann_whitney_u(&[4.0, 5.0, 6.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_relative_eq!(reversed.u, 9.0);
        assert_relative_eq!(reversed.p_value, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn exact_identical_shift_is_not_significant() {
        let result = mann_whitney_u(&[1.0, 4.0], &[2.0, 3.0]).unwrap();
        assert_relative_eq!(result.u, 2.0);
        assert_relative_eq!(result.p_value, 1.0);
    }

    #[test]
    fn large_samples_use_normal_approximation() {
        let x: Vec<f64> = (1..=10).map(f64::from).collect();
        let y: Vec<f64> = (11..=20).map(f64::from).collect();
        let result = mann_whitney_u(&x, &y).unwrap();
        assert_relative_eq!(result.u, 0.0);
        assert_relative_eq!(result.p_value, 1.826_7e-4, epsilon = 1e-6);
    }

    #[test]
    fn ties_use_average_ranks() {
        let result = mann_whitney_u(&[1.0, 1.0, 2.0], &[2.0, 3.0, 3.0]).unwrap();
        assert_relative_eq!(result.u, 0.5);
        assert!(result.p_value > 0.10 && result.p_value < 0.12);
    }

    #[test]
    fn all_tied_is_one() {
        let result = mann_whitney_u(&[2.0, 2.0], &[2.0, 2.0, 2.0]).unwrap();
        assert_relative_eq!(result.u, 3.0);
        assert_relative_eq!(result.p_value, 1.0);
    }

    #[test]
    fn empty_sample_is_undefined() {
        assert!(mann_whitney_u(&[], &[1.0]).is_none());
        assert!(mann_whitney_u(&[1.0], &[]).is_none());
    }

    fn area_tree(area: &str, downtown: Option<bool>, species: &str) -> TreeRecord {
        let mut record = tree("Toronto", species, Some(20.0));
        record.dissemination_area_id = Some(area.to_string());
        record.downtown = downtown;
        record
    }

    #[test]
    fn compares_flagged_areas() {
        let records = vec![
            area_tree("1", Some(true), "acer rubrum"),
            area_tree("1", Some(true), "acer rubrum"),
            area_tree("2", Some(false), "acer rubrum"),
            area_tree("2", Some(false), "tilia cordata"),
            area_tree("3", None, "ulmus americana"),
        ];

        let rows = compare_downtown(
            &records,
            &["Toronto".to_string()],
            &[DiversityMetric::Species, DiversityMetric::DiameterClass],
        );
        assert_eq!(rows.len(), 2);

        // downtown H = 0, other H = ln 2
        assert_eq!(rows[0].diversity_metric_name, DiversityMetric::Species);
        assert_eq!(rows[0].u_statistic, Some(0.0));
        assert_relative_eq!(rows[0].p_value.unwrap(), 1.0);

        // every area has H = 0
        assert_eq!(rows[1].u_statistic, Some(0.5));
    }

    #[test]
    fn city_without_downtown_areas_is_undefined() {
        let records = vec![area_tree("2", Some(false), "acer rubrum")];
        let rows = compare_downtown(&records, &["Toronto".to_string()], &[DiversityMetric::Genus]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].u_statistic, None);
        assert_eq!(rows[0].p_value, None);
    }
}
