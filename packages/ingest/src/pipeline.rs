//! Cleaning and analysis stages.
//!
//! [`clean`] turns normalized source rows into [`TreeRecord`]s, one row at
//! a time: override fill, canonicalization, resolution, geography labels,
//! nativity, then diameter binning. Each step after canonicalization takes
//! a record and returns a new one. [`analyze`] runs every analysis over
//! the cleaned records.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use canopy_analytics::{compare_downtown, diversity_table, nativity, summary};
use canopy_analytics_models::{
    ComparisonRow, DbhSummaryRow, Diagnostics, DistributionRow, DiversityMetric, DiversityTable,
    GroupLevel, NativityRow, TopTaxonRow,
};
use canopy_geography::{DaOverrides, DowntownIndex, GeographyIndex, coalesce};
use canopy_geography_models::Geocode;
use canopy_source::{ProgressCallback, SourceDefinition, Table, TableError};
use canopy_structure::DbhStatus;
use canopy_taxonomy::{
    Canonicalizer, CorrectionRules, FamilyIndex, NativityIndex, UnresolvedPolicy,
    strategy_for_city,
};
use canopy_tree_models::{NameKind, Nativity, SourceRow, TreeRecord};

use crate::IngestError;
use crate::config::{PipelineConfig, ReferencePaths};

// ── Reference tables ─────────────────────────────────────────────────────

/// Every lookup table a run joins against.
#[derive(Debug, Clone)]
pub struct References {
    /// Name canonicalizer with its correction rules.
    pub canonicalizer: Canonicalizer,
    /// Genus to family.
    pub families: FamilyIndex,
    /// Species to native provinces.
    pub nativity: NativityIndex,
    /// City to province, region and ecozone.
    pub geography: GeographyIndex,
    /// Fallback tract and city per dissemination area.
    pub overrides: DaOverrides,
    /// Downtown flag per dissemination area.
    pub downtown: DowntownIndex,
}

impl References {
    /// The built-in tables, with empty family, nativity and downtown
    /// indexes.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            canonicalizer: Canonicalizer::new(CorrectionRules::builtin()),
            families: FamilyIndex::default(),
            nativity: NativityIndex::default(),
            geography: GeographyIndex::builtin(),
            overrides: DaOverrides::builtin(),
            downtown: DowntownIndex::default(),
        }
    }

    /// Loads every configured table, falling back to the built-in ones.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured table cannot be read or is missing
    /// a required column.
    pub fn load(paths: &ReferencePaths) -> Result<Self, IngestError> {
        let rules = match &paths.corrections {
            Some(path) => CorrectionRules::from_table(&read_table("corrections", path)?)?,
            None => CorrectionRules::builtin(),
        };
        let canonicalizer = Canonicalizer::new(rules);

        let families = match &paths.families {
            Some(path) => FamilyIndex::from_table(&read_table("families", path)?)?,
            None => {
                log::warn!("No family table configured; every genus will be unresolved");
                FamilyIndex::default()
            }
        };
        let nativity = match &paths.nativity {
            Some(path) => NativityIndex::from_table(&read_table("nativity", path)?, &canonicalizer)?,
            None => {
                log::warn!("No nativity table configured; every species will be unresolved");
                NativityIndex::default()
            }
        };
        let geography = match &paths.locations {
            Some(path) => GeographyIndex::from_table(&read_table("locations", path)?)?,
            None => GeographyIndex::builtin(),
        };
        let overrides = match &paths.da_overrides {
            Some(path) => DaOverrides::from_table(&read_table("da_overrides", path)?)?,
            None => DaOverrides::builtin(),
        };
        let downtown = match &paths.downtown {
            Some(path) => DowntownIndex::from_table(&read_table("downtown", path)?)?,
            None => DowntownIndex::default(),
        };

        log::info!(
            "References: {} correction rules, {} genera, {} species, {} cities, {} overrides, {} downtown flags",
            canonicalizer.rules().len(),
            families.len(),
            nativity.len(),
            geography.len(),
            overrides.len(),
            downtown.len()
        );

        Ok(Self {
            canonicalizer,
            families,
            nativity,
            geography,
            overrides,
            downtown,
        })
    }
}

fn read_table(name: &str, path: &Path) -> Result<Table, TableError> {
    Table::from_path(name, path)
}

// ── Cleaning ─────────────────────────────────────────────────────────────

/// Cleaned records and what was counted while producing them.
#[derive(Debug, Clone, Default)]
pub struct Cleaned {
    /// Records that survived cleaning, in input order.
    pub records: Vec<TreeRecord>,
    /// Counts of everything dropped, filled or unresolved.
    pub diagnostics: Diagnostics,
}

/// Cleans normalized source rows into tree records.
///
/// Rows with neither an area nor a tract id and rows with no city are
/// dropped and counted. Everything else is kept, with unmatched lookups
/// left empty and counted. Non-living markers and missing names stay as
/// records without a taxon, so their diameters still reach the
/// structural tables.
///
/// # Errors
///
/// Returns [`IngestError::NoUsableRecords`] if no row survives.
pub fn clean(
    rows: Vec<SourceRow>,
    sources: &[SourceDefinition],
    refs: &References,
    policy: UnresolvedPolicy,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Cleaned, IngestError> {
    let source_cities: BTreeMap<&str, &str> = sources
        .iter()
        .map(|s| (s.id.as_str(), s.city.as_str()))
        .collect();

    let mut out = Cleaned::default();
    out.diagnostics.input_rows = rows.len() as u64;
    progress.set_total(rows.len() as u64);

    let mut current_source = String::new();
    for row in rows {
        let source_city = source_cities.get(row.source_id.as_str()).copied();
        if current_source != row.source_id {
            progress.set_message(source_city.unwrap_or(&row.source_id).to_string());
            current_source.clone_from(&row.source_id);
        }
        if let Some(record) = clean_row(row, source_city, refs, policy, &mut out.diagnostics) {
            out.records.push(record);
        }
        progress.inc(1);
    }

    let d = &out.diagnostics;
    log::info!(
        "Kept {} of {} rows: {} ungeocodable, {} without a city; {} non-living kept for structure",
        out.records.len(),
        d.input_rows,
        d.ungeocodable_dropped,
        d.cityless_dropped,
        d.non_living.values().sum::<u64>()
    );
    log::info!(
        "Blank census tracts: {} before fill, {} after ({} areas)",
        d.blank_census_tract_before_fill,
        d.blank_census_tract_after_fill,
        d.blank_census_tract_areas.len()
    );
    if !d.unresolved_genera.is_empty() {
        log::warn!(
            "{} genera have no family ({} records)",
            d.unresolved_genera.len(),
            d.unresolved_genus_records
        );
    }
    if !d.unresolved_nativity.is_empty() {
        log::warn!(
            "{} species have no nativity data ({} records, policy {policy})",
            d.unresolved_nativity.len(),
            d.unresolved_nativity_records
        );
    }
    for city in &d.unknown_cities {
        log::warn!("City '{city}' is not in the location index");
    }
    progress.finish(format!(
        "{} of {} rows kept",
        out.records.len(),
        out.diagnostics.input_rows
    ));

    if out.records.is_empty() {
        return Err(IngestError::NoUsableRecords);
    }
    Ok(out)
}

fn clean_row(
    row: SourceRow,
    source_city: Option<&str>,
    refs: &References,
    policy: UnresolvedPolicy,
    diag: &mut Diagnostics,
) -> Option<TreeRecord> {
    let geocode = Geocode {
        dissemination_area_id: row.dissemination_area_id.clone(),
        census_tract_id: row.census_tract_id.clone(),
        city: row.city.clone(),
    };
    if geocode.is_ungeocodable() {
        diag.ungeocodable_dropped += 1;
        return None;
    }

    if geocode.census_tract_id.is_none() {
        diag.blank_census_tract_before_fill += 1;
        if let Some(area) = &geocode.dissemination_area_id {
            diag.blank_census_tract_areas.insert(area.clone());
        }
    }
    let geocode = refs.overrides.fill(geocode);
    if geocode.census_tract_id.is_none() {
        diag.blank_census_tract_after_fill += 1;
    }

    let Some(city) = coalesce(geocode.city, source_city.map(String::from)) else {
        diag.cityless_dropped += 1;
        return None;
    };
    let city = refs.geography.canonical_city(&city).map_or(city, String::from);

    let canonical = refs.canonicalizer.canonicalize(row.botanical_name.as_deref());
    match canonical.kind {
        NameKind::NonLiving => *diag.non_living.entry(canonical.name.clone()).or_default() += 1,
        NameKind::Missing => diag.missing_names += 1,
        NameKind::Taxon => {}
    }

    let record = TreeRecord::new(
        SourceRow {
            dissemination_area_id: geocode.dissemination_area_id,
            census_tract_id: geocode.census_tract_id,
            ..row
        },
        city,
        canonical.name,
        canonical.kind,
    );

    let record = resolve_taxon(record, refs, diag);
    let record = attach_labels(record, refs, diag);
    let record = classify_nativity(record, refs, policy, diag);
    let (record, status) = canopy_structure::apply(record);
    match status {
        DbhStatus::NotMeasured => diag.dbh_not_measured += 1,
        DbhStatus::OutOfRange(_) => diag.dbh_out_of_range += 1,
        DbhStatus::Valid(_) | DbhStatus::Missing => {}
    }

    Some(record)
}

/// Fills genus, species and family. Records without a taxon pass through.
fn resolve_taxon(record: TreeRecord, refs: &References, diag: &mut Diagnostics) -> TreeRecord {
    if !record.is_taxon() {
        return record;
    }
    let Some(taxon) = strategy_for_city(&record.city).resolve(&record.botanical_name) else {
        return record;
    };

    let family = refs.families.family(&taxon.genus).map(String::from);
    if family.is_none() {
        diag.unresolved_genus_records += 1;
        diag.unresolved_genera.insert(taxon.genus.clone());
    }

    TreeRecord {
        genus: Some(taxon.genus),
        species: Some(taxon.species),
        family,
        ..record
    }
}

fn attach_labels(record: TreeRecord, refs: &References, diag: &mut Diagnostics) -> TreeRecord {
    let labels = refs.geography.labels(&record.city);
    if labels.is_none() {
        diag.unknown_cities.insert(record.city.clone());
    }
    let downtown = record
        .dissemination_area_id
        .as_deref()
        .and_then(|area| refs.downtown.flag(area));

    TreeRecord {
        province: labels.map(|l| l.province),
        region: labels.map(|l| l.region.clone()),
        ecozone: labels.map(|l| l.ecozone.clone()),
        downtown,
        ..record
    }
}

/// Classifies a taxon record and applies `policy`. Records without a
/// taxon keep no nativity.
fn classify_nativity(
    record: TreeRecord,
    refs: &References,
    policy: UnresolvedPolicy,
    diag: &mut Diagnostics,
) -> TreeRecord {
    if !record.is_taxon() {
        return record;
    }

    let classified = refs
        .nativity
        .classify(record.species.as_deref(), record.province);
    if classified == Nativity::Unresolved {
        diag.unresolved_nativity_records += 1;
        if let Some(species) = &record.species {
            diag.unresolved_nativity.insert(species.clone());
        }
    }

    TreeRecord {
        nativity: policy.apply(classified),
        ..record
    }
}

// ── Analysis ─────────────────────────────────────────────────────────────

/// Top taxa, diameter summary, downtown comparison, nativity and
/// diameter distribution.
const SUMMARY_TABLES: usize = 5;

/// Every analysis table of a run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    /// Diversity per metric and grouping level.
    pub diversity: Vec<DiversityTable>,
    /// Native percentage per city.
    pub nativity: Vec<NativityRow>,
    /// Downtown comparison per city and metric.
    pub comparison: Vec<ComparisonRow>,
    /// Most common taxa per rank.
    pub top_taxa: Vec<TopTaxonRow>,
    /// Diameter median and skewness per city, region and ecozone.
    pub dbh_summary: Vec<DbhSummaryRow>,
    /// Diameter class shares per city.
    pub distribution: Vec<DistributionRow>,
}

/// Runs every analysis over cleaned records and adds the national
/// figures to `diagnostics`.
///
/// `progress` advances once per diversity table and once per summary
/// table.
pub fn analyze(
    records: &[TreeRecord],
    config: &PipelineConfig,
    diagnostics: &mut Diagnostics,
    progress: &Arc<dyn ProgressCallback>,
) -> Report {
    let tables = GroupLevel::REPORTED.len() * DiversityMetric::ALL.len() + SUMMARY_TABLES;
    progress.set_total(tables as u64);

    let excluded: BTreeSet<&str> = config
        .structural
        .excluded_cities
        .iter()
        .map(String::as_str)
        .collect();
    let structural: Vec<&TreeRecord> = records
        .iter()
        .filter(|r| !excluded.contains(r.city.as_str()))
        .collect();

    let mut diversity = Vec::new();
    for level in GroupLevel::REPORTED {
        progress.set_message(format!("diversity by {level}"));
        for metric in DiversityMetric::TAXONOMIC {
            diversity.push(diversity_table(records, metric, level));
            progress.inc(1);
        }
        diversity.push(diversity_table(
            structural.iter().copied(),
            DiversityMetric::DiameterClass,
            level,
        ));
        progress.inc(1);
    }

    progress.set_message("summaries".to_string());

    let top_taxa = DiversityMetric::TAXONOMIC
        .into_iter()
        .flat_map(|rank| {
            summary::top_taxa(
                records,
                rank,
                config.summary.top_n,
                config.summary.ubiquity_threshold,
            )
        })
        .collect();
    progress.inc(1);

    let dbh_summary = [GroupLevel::City, GroupLevel::Region, GroupLevel::Ecozone]
        .into_iter()
        .flat_map(|level| summary::dbh_summary(structural.iter().copied(), level))
        .collect();
    progress.inc(1);

    let comparison_cities = config
        .downtown
        .cities
        .clone()
        .unwrap_or_else(|| flagged_cities(records));
    progress.set_message(format!("downtown comparison ({} cities)", comparison_cities.len()));
    let comparison = compare_downtown(records, &comparison_cities, &DiversityMetric::ALL);
    progress.inc(1);

    diagnostics.national.records = records.len() as u64;
    diagnostics.national.distinct_species = summary::distinct_count(records, DiversityMetric::Species);
    diagnostics.national.distinct_genera = summary::distinct_count(records, DiversityMetric::Genus);
    diagnostics.national.distinct_families = summary::distinct_count(records, DiversityMetric::Family);
    diagnostics.national.native_proportion = nativity::native_proportion(records);

    log::info!(
        "National: {} species, {} genera, {} families, native proportion {:?}",
        diagnostics.national.distinct_species,
        diagnostics.national.distinct_genera,
        diagnostics.national.distinct_families,
        diagnostics.national.native_proportion
    );

    let nativity = nativity::nativity_by_city(records);
    progress.inc(1);
    let distribution = summary::diameter_distribution(structural.iter().copied());
    progress.inc(1);
    progress.finish(format!("{tables} tables over {} records", records.len()));

    Report {
        diversity,
        nativity,
        comparison,
        top_taxa,
        dbh_summary,
        distribution,
    }
}

/// Cities with at least one record in a flagged dissemination area.
fn flagged_cities(records: &[TreeRecord]) -> Vec<String> {
    records
        .iter()
        .filter(|r| r.downtown.is_some())
        .map(|r| r.city.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
