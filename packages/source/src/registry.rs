//! Source registry: loads all city source definitions from embedded TOML
//! configs.
//!
//! Each `.toml` file in `packages/source/sources/` is baked into the binary
//! at compile time via [`include_str!`]. Adding a city is a matter of
//! creating a new TOML file and adding it to the list below.

use crate::source_def::{SourceDefinition, parse_source_toml};

/// TOML configs embedded at compile time.
const SOURCE_TOMLS: &[(&str, &str)] = &[
    // ── British Columbia ───────────────────────────────────────────────
    ("kelowna", include_str!("../sources/kelowna.toml")),
    ("maple_ridge", include_str!("../sources/maple_ridge.toml")),
    ("new_westminster", include_str!("../sources/new_westminster.toml")),
    ("vancouver", include_str!("../sources/vancouver.toml")),
    ("victoria", include_str!("../sources/victoria.toml")),
    // ── Prairies ───────────────────────────────────────────────────────
    ("calgary", include_str!("../sources/calgary.toml")),
    ("edmonton", include_str!("../sources/edmonton.toml")),
    ("lethbridge", include_str!("../sources/lethbridge.toml")),
    ("strathcona_county", include_str!("../sources/strathcona_county.toml")),
    ("regina", include_str!("../sources/regina.toml")),
    ("winnipeg", include_str!("../sources/winnipeg.toml")),
    // ── Ontario ────────────────────────────────────────────────────────
    ("ajax", include_str!("../sources/ajax.toml")),
    ("burlington", include_str!("../sources/burlington.toml")),
    ("guelph", include_str!("../sources/guelph.toml")),
    ("kingston", include_str!("../sources/kingston.toml")),
    ("kitchener", include_str!("../sources/kitchener.toml")),
    ("mississauga", include_str!("../sources/mississauga.toml")),
    ("niagara_falls", include_str!("../sources/niagara_falls.toml")),
    ("ottawa", include_str!("../sources/ottawa.toml")),
    ("peterborough", include_str!("../sources/peterborough.toml")),
    ("st_catharines", include_str!("../sources/st_catharines.toml")),
    ("toronto", include_str!("../sources/toronto.toml")),
    ("waterloo", include_str!("../sources/waterloo.toml")),
    ("welland", include_str!("../sources/welland.toml")),
    ("whitby", include_str!("../sources/whitby.toml")),
    ("windsor", include_str!("../sources/windsor.toml")),
    // ── Quebec ─────────────────────────────────────────────────────────
    ("longueuil", include_str!("../sources/longueuil.toml")),
    ("montreal", include_str!("../sources/montreal.toml")),
    ("quebec_city", include_str!("../sources/quebec_city.toml")),
    // ── Atlantic ───────────────────────────────────────────────────────
    ("fredericton", include_str!("../sources/fredericton.toml")),
    ("moncton", include_str!("../sources/moncton.toml")),
    ("halifax", include_str!("../sources/halifax.toml")),
];

/// Total number of configured sources (used in tests).
#[cfg(test)]
const EXPECTED_SOURCE_COUNT: usize = 32;

/// Returns all configured source definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (the configs are embedded, so
/// the registry tests catch this before release).
#[must_use]
pub fn all_sources() -> Vec<SourceDefinition> {
    SOURCE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_source_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}
