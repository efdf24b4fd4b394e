#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal output for `canopy_ingest run`.
//!
//! A run draws one bar per [`Stage`]: source files loaded, rows cleaned,
//! analysis tables computed. Each bar shows the city being worked on and
//! ends with the stage's counts and duration. [`init_logger`] routes `log`
//! through `indicatif-log-bridge` so log lines print above the bars.

use std::sync::Arc;
use std::time::Duration;

use canopy_source::{ProgressCallback, StageProgress};
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// A step of the pipeline with its own bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading city inventories.
    Load,
    /// Turning rows into records.
    Clean,
    /// Computing output tables.
    Analyze,
}

impl Stage {
    /// Every stage in run order.
    pub const ALL: [Self; 3] = [Self::Load, Self::Clean, Self::Analyze];

    /// Bar prefix.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Clean => "clean",
            Self::Analyze => "analyze",
        }
    }

    const fn template(self) -> &'static str {
        match self {
            Self::Load => {
                "{prefix:>8.bold} {wide_bar:.green/dim} {pos}/{len} cities  {msg}"
            }
            Self::Clean => {
                "{prefix:>8.bold} {wide_bar:.cyan/dim} {human_pos}/{human_len} rows ({per_sec})  {msg}"
            }
            Self::Analyze => {
                "{prefix:>8.bold} {wide_bar:.yellow/dim} {pos}/{len} tables  {msg}"
            }
        }
    }
}

/// The bar for one [`Stage`].
///
/// Shows a spinner until the stage reports its total.
pub struct StageBar {
    bar: ProgressBar,
    bar_style: ProgressStyle,
}

impl StageBar {
    /// Adds a waiting bar for `stage` to `multi`.
    #[must_use]
    pub fn new(multi: &MultiProgress, stage: Stage) -> Self {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{prefix:>8.bold} {spinner:.dim} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix(stage.label());
        bar.set_message("waiting");

        let bar_style = ProgressStyle::with_template(stage.template())
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

        Self { bar, bar_style }
    }
}

impl ProgressCallback for StageBar {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.bar_style.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        let elapsed = self.bar.elapsed().as_secs_f64();
        self.bar.finish_with_message(format!("{msg} in {elapsed:.1}s"));
    }
}

/// Adds a bar for every stage to `multi`, in run order.
#[must_use]
pub fn stage_bars(multi: &MultiProgress) -> StageProgress {
    let [load, clean, analyze] =
        Stage::ALL.map(|stage| Arc::new(StageBar::new(multi, stage)) as Arc<dyn ProgressCallback>);
    StageProgress {
        load,
        clean,
        analyze,
    }
}

/// Installs `pretty_env_logger` at `info`, with `RUST_LOG` filters on top.
///
/// Returns the [`MultiProgress`] that [`stage_bars`] must draw into.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    let logger = builder.build();
    let level = logger.filter();

    // already set when called twice
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}

#[cfg(test)]
mod tests {
    use indicatif::ProgressDrawTarget;

    use super::*;

    fn hidden() -> MultiProgress {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    }

    #[test]
    fn bar_waits_until_the_total_is_known() {
        let stage = StageBar::new(&hidden(), Stage::Clean);
        assert_eq!(stage.bar.prefix(), "clean");
        assert_eq!(stage.bar.message(), "waiting");
        assert_eq!(stage.bar.length(), None);

        stage.set_total(1_200);
        assert_eq!(stage.bar.length(), Some(1_200));
    }

    #[test]
    fn clean_bar_follows_the_city_and_row_count() {
        let stage = StageBar::new(&hidden(), Stage::Clean);
        stage.set_total(5);
        stage.set_message("Calgary".to_string());
        stage.inc(3);
        assert_eq!(stage.bar.message(), "Calgary");
        stage.set_message("Edmonton".to_string());
        stage.inc(2);

        assert_eq!(stage.bar.position(), 5);
        assert_eq!(stage.bar.message(), "Edmonton");
    }

    #[test]
    fn finish_reports_counts_and_duration() {
        let stage = StageBar::new(&hidden(), Stage::Load);
        stage.set_total(2);
        stage.inc(2);
        stage.finish("2 cities, 10 rows, 0 skipped".to_string());

        assert!(stage.bar.is_finished());
        let message = stage.bar.message();
        assert!(message.starts_with("2 cities, 10 rows, 0 skipped in "));
        assert!(message.ends_with('s'));
    }

    #[test]
    fn one_bar_per_stage() {
        let multi = hidden();
        let stages = stage_bars(&multi);
        stages.load.set_total(1);
        stages.clean.set_total(10);
        stages.analyze.set_total(21);
        stages.analyze.finish("21 tables over 9 records".to_string());

        let labels: Vec<&str> = Stage::ALL.iter().map(|s| s.label()).collect();
        assert_eq!(labels, ["load", "clean", "analyze"]);
    }
}
