#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Botanical name canonicalization and taxonomic resolution.
//!
//! Raw inventory names go through the [`Canonicalizer`], are split into
//! species and genus by a city's [`ParsingStrategy`], get a family from
//! the [`FamilyIndex`], and are classified native or introduced per
//! province by the [`NativityIndex`].

pub mod canonicalize;
pub mod corrections;
pub mod family;
pub mod nativity;
pub mod resolver;

use canopy_source::TableError;

pub use canonicalize::{Canonical, Canonicalizer};
pub use corrections::{CorrectionRule, CorrectionRules};
pub use family::FamilyIndex;
pub use nativity::{NativityIndex, UnresolvedPolicy};
pub use resolver::{ParsingStrategy, Taxon, strategy_for_city};

/// Errors that can occur while loading taxonomy reference tables.
#[derive(Debug, thiserror::Error)]
pub enum TaxonomyError {
    /// A reference table could not be read or lacks a key column.
    #[error(transparent)]
    Table(#[from] TableError),

    /// A correction rule cannot be used.
    #[error("invalid correction rule '{find}': {message}")]
    InvalidRule {
        /// The rule's find text.
        find: String,
        /// What is wrong with it.
        message: String,
    },
}
