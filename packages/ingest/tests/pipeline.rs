use std::path::{Path, PathBuf};

use canopy_analytics_models::{DiversityMetric, GroupLevel};
use canopy_ingest::{PipelineConfig, enabled_sources};
use canopy_source::StageProgress;

const CALGARY: &str = "\
Botanical Name,DBH,DAUID,CTUID
Acer Negundo,25,48060001,8250001
acer negundo,30.5,48060001,8250001
Ulmus americana,45,48060002,8250002
Ulmus americana,12,48060002,8250002
Stump,50,48060002,8250002
Tilia cordata,20,,
";

const EDMONTON: &str = "\
Botanical Name,DBH,DAUID,CTUID
Fraxinus pensylvanica,35,48110001,8350001
Fraxinus pennsylvanica,28,48110001,8350001
Acer negundo,18,48110002,8350002
,22,48110002,8350002
";

const FAMILIES: &str = "\
Genus,Family
Acer,Sapindaceae
Ulmus,Ulmaceae
Fraxinus,Oleaceae
";

const NATIVITY: &str = "\
Species,Alberta
Acer negundo,0
Ulmus americana,1
Fraxinus pennsylvanica,0
";

const DOWNTOWN: &str = "\
DisseminationAreaId,DowntownFlag
48060001,1
48060002,0
48110001,1
48110002,0
";

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("canopy_ingest_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write(dir: &Path, file: &str, contents: &str) -> PathBuf {
    let path = dir.join(file);
    std::fs::write(&path, contents).unwrap();
    path
}

fn config(root: &Path) -> PipelineConfig {
    let input = root.join("data");
    let refs = root.join("references");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::create_dir_all(&refs).unwrap();

    write(&input, "Calgary.csv", CALGARY);
    write(&input, "Edmonton.csv", EDMONTON);

    let mut config = PipelineConfig {
        input_dir: input,
        output_dir: root.join("output"),
        ..PipelineConfig::default()
    };
    config.references.families = Some(write(&refs, "families.csv", FAMILIES));
    config.references.nativity = Some(write(&refs, "nativity.csv", NATIVITY));
    config.references.downtown = Some(write(&refs, "downtown.csv", DOWNTOWN));
    config
}

#[test]
fn runs_two_cities_end_to_end() {
    let root = temp_dir("end_to_end");
    let config = config(&root);
    let sources = enabled_sources(Some("calgary,edmonton,victoria".to_string()));
    assert_eq!(sources.len(), 3);

    let output = canopy_ingest::run(&config, &sources, &StageProgress::silent()).unwrap();

    let d = &output.diagnostics;
    assert_eq!(d.sources_loaded, ["calgary", "edmonton"]);
    assert_eq!(d.sources_skipped, ["victoria"]);
    assert_eq!(d.input_rows, 10);
    assert_eq!(d.non_living.get("stump"), Some(&1));
    assert_eq!(d.ungeocodable_dropped, 1);
    assert_eq!(d.missing_names, 1);
    assert!(d.unresolved_genera.is_empty());
    assert_eq!(d.unresolved_nativity_records, 0);

    assert_eq!(output.records.len(), 9);
    assert_eq!(d.national.records, 9);
    assert_eq!(d.national.distinct_species, 3);
    assert_eq!(d.national.distinct_genera, 3);
    assert_eq!(d.national.distinct_families, 3);
    let native = d.national.native_proportion.unwrap();
    assert!((native - 5.0 / 7.0).abs() < 1e-9);

    let corrected = output
        .records
        .iter()
        .filter(|r| r.species.as_deref() == Some("fraxinus pennsylvanica"))
        .count();
    assert_eq!(corrected, 2);

    let species_by_city = output
        .report
        .diversity
        .iter()
        .find(|t| t.metric == DiversityMetric::Species && t.level == GroupLevel::City)
        .unwrap();
    let calgary = species_by_city
        .rows
        .iter()
        .find(|r| r.group_key == "Calgary")
        .unwrap();
    assert!((calgary.shannon_index - std::f64::consts::LN_2).abs() < 1e-9);

    let nativity: Vec<(&str, f64)> = output
        .report
        .nativity
        .iter()
        .map(|r| (r.city.as_str(), r.native_proportion_percent))
        .collect();
    assert_eq!(nativity, [("Calgary", 50.0), ("Edmonton", 100.0)]);

    // The stump counts toward Calgary's size classes but no taxonomic table.
    let calgary_class_5 = output
        .report
        .distribution
        .iter()
        .find(|r| r.city == "Calgary" && r.diameter_class.index() == 5)
        .unwrap();
    assert_eq!(calgary_class_5.trees, 2);
    let calgary_dbh = output
        .report
        .dbh_summary
        .iter()
        .find(|r| r.level == GroupLevel::City && r.group_key == "Calgary")
        .unwrap();
    assert_eq!(calgary_dbh.trees, 5);

    // Both cities have flagged areas, so each gets one row per metric.
    assert_eq!(output.report.comparison.len(), 8);

    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn writes_every_output_table() {
    let root = temp_dir("outputs");
    let config = config(&root);
    let sources = enabled_sources(Some("calgary,edmonton".to_string()));

    canopy_ingest::run(&config, &sources, &StageProgress::silent()).unwrap();

    let out = &config.output_dir;
    for file in [
        "trees.csv",
        "nativity_by_city.csv",
        "downtown_comparison.csv",
        "top_taxa.csv",
        "dbh_summary.csv",
        "diameter_distribution.csv",
        "diagnostics.json",
    ] {
        assert!(out.join(file).is_file(), "missing {file}");
    }
    assert_eq!(std::fs::read_dir(out.join("diversity")).unwrap().count(), 16);

    let trees = std::fs::read_to_string(out.join("trees.csv")).unwrap();
    assert_eq!(trees.lines().count(), 10);
    assert!(trees.lines().next().unwrap().contains("BotanicalNameCanonical"));

    let nativity = std::fs::read_to_string(out.join("nativity_by_city.csv")).unwrap();
    assert_eq!(nativity.lines().nth(1), Some("Calgary,50.0"));

    let diagnostics: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("diagnostics.json")).unwrap())
            .unwrap();
    assert_eq!(diagnostics["inputRows"], 10);
    assert_eq!(diagnostics["national"]["distinctSpecies"], 3);

    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn missing_inputs_fail_the_run() {
    let root = temp_dir("missing");
    let config = PipelineConfig {
        input_dir: root.join("nowhere"),
        output_dir: root.join("output"),
        ..PipelineConfig::default()
    };
    let sources = enabled_sources(Some("calgary".to_string()));

    let err = canopy_ingest::run(&config, &sources, &StageProgress::silent()).unwrap_err();
    assert!(matches!(err, canopy_ingest::IngestError::Source(_)));
    assert!(!config.output_dir.exists());

    std::fs::remove_dir_all(&root).unwrap();
}
