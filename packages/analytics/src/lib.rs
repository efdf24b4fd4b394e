#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Diversity, nativity and structure analyses over cleaned tree records.
//!
//! Every analysis is a pure function of an immutable record slice. Groups
//! are computed independently (in parallel with the default `parallel`
//! feature) and returned sorted by group key.

pub mod comparison;
pub mod diversity;
pub mod nativity;
pub mod summary;

use std::collections::BTreeMap;

use canopy_analytics_models::{DiversityMetric, GroupLevel};
use canopy_tree_models::TreeRecord;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub use comparison::{MannWhitney, compare_downtown, mann_whitney_u};
pub use diversity::{Diversity, diversity_by, diversity_table, shannon_index};

/// Key of the group `record` falls in at `level`, if it has one.
#[must_use]
pub fn group_key(record: &TreeRecord, level: GroupLevel) -> Option<String> {
    match level {
        GroupLevel::City => Some(record.city.clone()),
        GroupLevel::Region => record.region.clone(),
        GroupLevel::Ecozone => record.ecozone.clone(),
        GroupLevel::National => Some(GroupLevel::NATIONAL_KEY.to_string()),
        GroupLevel::DisseminationArea => record.dissemination_area_id.clone(),
    }
}

/// The record's name at a taxonomic rank.
///
/// Only taxon records have one; [`DiversityMetric::DiameterClass`] is not
/// a rank and always yields `None`.
#[must_use]
pub fn taxon_label(record: &TreeRecord, metric: DiversityMetric) -> Option<&str> {
    if !record.is_taxon() {
        return None;
    }
    match metric {
        DiversityMetric::Species => record.species.as_deref(),
        DiversityMetric::Genus => record.genus.as_deref(),
        DiversityMetric::Family => record.family.as_deref(),
        DiversityMetric::DiameterClass => None,
    }
}

/// Rounds to two decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Applies `f` to every group, dropping groups it returns `None` for.
pub(crate) fn map_groups<T, R, F>(groups: BTreeMap<String, T>, f: F) -> Vec<(String, R)>
where
    T: Send,
    R: Send,
    F: Fn(&T) -> Option<R> + Sync + Send,
{
    let groups: Vec<(String, T)> = groups.into_iter().collect();

    #[cfg(feature = "parallel")]
    let iter = groups.into_par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = groups.into_iter();

    let mut results: Vec<(String, R)> = iter
        .filter_map(|(key, group)| f(&group).map(|result| (key, result)))
        .collect();
    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
}
