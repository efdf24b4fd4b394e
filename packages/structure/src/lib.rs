#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Trunk diameter cleaning, basal area, and diameter-class binning.
//!
//! Diameters arrive in centimetres (unit conversion happens when a source
//! is read). A value of exactly zero means "not measured" and anything
//! above [`MAX_DBH_CM`] is a data-entry error; both become `None` and are
//! never clamped.

use canopy_tree_models::{DIAMETER_CLASS_EDGES, DiameterClass, TreeRecord};

/// Largest plausible diameter at breast height, in centimetres.
pub const MAX_DBH_CM: f64 = 350.0;

/// Basal area (m²) per squared centimetre of diameter: π / 40 000.
pub const BASAL_AREA_FACTOR: f64 = 0.000_078_54;

/// Outcome of validating one diameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DbhStatus {
    /// A usable diameter in centimetres.
    Valid(f64),
    /// No diameter was recorded (or it could not be parsed).
    Missing,
    /// Recorded as exactly zero.
    NotMeasured,
    /// Negative or above [`MAX_DBH_CM`].
    OutOfRange(f64),
}

impl DbhStatus {
    /// The usable diameter, if any.
    #[must_use]
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Valid(dbh) => Some(dbh),
            Self::Missing | Self::NotMeasured | Self::OutOfRange(_) => None,
        }
    }
}

/// Validates a diameter in centimetres.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn check_dbh(dbh: Option<f64>) -> DbhStatus {
    match dbh {
        None => DbhStatus::Missing,
        Some(d) if d == 0.0 => DbhStatus::NotMeasured,
        Some(d) if d < 0.0 || d > MAX_DBH_CM || !d.is_finite() => DbhStatus::OutOfRange(d),
        Some(d) => DbhStatus::Valid(d),
    }
}

/// Basal area in square metres for a diameter in centimetres.
#[must_use]
pub fn basal_area(dbh_cm: f64) -> f64 {
    BASAL_AREA_FACTOR * dbh_cm * dbh_cm
}

/// Returns the 1-based right-closed interval of `edges` containing
/// `value`: interval `i` is `(edges[i - 1], edges[i]]`.
///
/// Returns `None` for values at or below the first edge or above the
/// last.
#[must_use]
pub fn classify(value: f64, edges: &[f64]) -> Option<usize> {
    let (&first, rest) = edges.split_first()?;
    if value.is_nan() || value <= first {
        return None;
    }
    rest.iter().position(|&upper| value <= upper).map(|i| i + 1)
}

/// Diameter class of a diameter in centimetres.
#[must_use]
pub fn diameter_class(dbh_cm: f64) -> Option<DiameterClass> {
    classify(dbh_cm, &DIAMETER_CLASS_EDGES).and_then(DiameterClass::new)
}

/// Validates a record's diameter and fills in basal area and diameter
/// class.
///
/// Returns the new record and the validation outcome so callers can count
/// rejected values.
#[must_use]
pub fn apply(record: TreeRecord) -> (TreeRecord, DbhStatus) {
    let status = check_dbh(record.dbh_cm);
    if let DbhStatus::OutOfRange(d) = status {
        log::debug!("{}: discarding DBH {d} cm", record.city);
    }

    let dbh_cm = status.value();
    let record = TreeRecord {
        dbh_cm,
        basal_area_m2: dbh_cm.map(basal_area),
        diameter_class: dbh_cm.and_then(diameter_class),
        ..record
    };
    (record, status)
}
