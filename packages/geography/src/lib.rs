#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! City and census geography reference lookups.
//!
//! Attaches province, region and ecozone labels to a city, fills census
//! tract and city gaps from a per-dissemination-area override table, and
//! flags downtown dissemination areas.

pub mod downtown;
pub mod index;
pub mod overrides;

use canopy_source::TableError;
use thiserror::Error;

pub use downtown::DowntownIndex;
pub use index::GeographyIndex;
pub use overrides::DaOverrides;

/// Errors that can occur while loading geography reference tables.
#[derive(Debug, Error)]
pub enum GeographyError {
    /// A reference table could not be read or lacks a key column.
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Returns `primary` if present, otherwise `fallback`. A present value is
/// never replaced.
#[must_use]
pub fn coalesce<T>(primary: Option<T>, fallback: Option<T>) -> Option<T> {
    primary.or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesce_keeps_primary() {
        assert_eq!(coalesce(Some(1), Some(2)), Some(1));
        assert_eq!(coalesce(Some(1), None), Some(1));
    }

    #[test]
    fn coalesce_falls_back() {
        assert_eq!(coalesce(None, Some(2)), Some(2));
        assert_eq!(coalesce::<u8>(None, None), None);
    }
}
