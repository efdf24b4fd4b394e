//! Botanical name canonicalization.
//!
//! Turns free-text species labels from municipal inventories into one
//! canonical lowercase form so that `"Acer Saccharum "`, `"ACER
//! SACCHARUM"` and `"Acre saccharum"` all count as the same species.
//!
//! Each pass runs, in order:
//! 1. Lowercase and trim
//! 2. Strip quote characters and infix hybrid markers (`x`, `×`)
//! 3. Apply the [`CorrectionRules`] table
//! 4. Structural fixes (mojibake, `..`, known misspelled genera, `sp`
//!    suffix spellings)
//! 5. Append `spp.` to a genus-only name
//! 6. Spot fixes for genus-only names with a single living species
//! 7. Collapse a doubled `spp.` suffix
//!
//! Passes repeat until the name stops changing, so the result is
//! idempotent even when a correction produces text another rule matches.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use canopy_tree_models::{MISSING_NAME, NameKind};

use crate::corrections::CorrectionRules;

/// Upper bound on canonicalization passes.
const MAX_PASSES: usize = 8;

/// Suffix marking a name identified to genus only.
pub const GENUS_SUFFIX: &str = "spp.";

/// Words that mark a planting site or non-tree rather than a taxon. A name
/// holding any of them as a whole word (`"dead tree"`, `"stump
/// (removed)"`) is non-living.
pub const NON_LIVING: &[&str] = &[
    "dead",
    "stump",
    "stumps",
    "shrub",
    "shrubs",
    "vine",
    "vines",
    "hedge",
    "hedges",
    "vacant",
    "private",
    "not known",
];

const QUOTES: &[char] = &['\'', '"', '`', '\u{2018}', '\u{2019}', '\u{201c}', '\u{201d}'];

/// Known misspellings of genus names, applied token by token.
static GENUS_SPELLINGS: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    BTreeMap::from([
        ("accer", "acer"),
        ("fraxinius", "fraxinus"),
        ("gleditisia", "gleditsia"),
        ("gleditzia", "gleditsia"),
        ("quercis", "quercus"),
        ("tila", "tilia"),
    ])
});

/// Whole-name substitutions applied after the genus suffix is added.
static SPOT_FIXES: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    BTreeMap::from([
        ("ginkgo spp.", "ginkgo biloba"),
        ("metasequoia spp.", "metasequoia glyptostroboides"),
        ("other spp.", MISSING_NAME),
        ("unknown spp.", MISSING_NAME),
        ("x spp.", MISSING_NAME),
    ])
});

/// A canonical name and what it denotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonical {
    /// Canonical lowercase name; never empty.
    pub name: String,
    /// Whether the name is a taxon, a non-living marker, or missing.
    pub kind: NameKind,
}

impl Canonical {
    /// The sentinel for blank or unusable input.
    #[must_use]
    pub fn missing() -> Self {
        Self {
            name: MISSING_NAME.to_string(),
            kind: NameKind::Missing,
        }
    }

    fn taxon(name: String) -> Self {
        if name == MISSING_NAME {
            return Self::missing();
        }
        Self {
            name,
            kind: NameKind::Taxon,
        }
    }
}

/// Applies the canonicalization pipeline with a given rule table.
#[derive(Debug, Clone, Default)]
pub struct Canonicalizer {
    rules: CorrectionRules,
}

impl Canonicalizer {
    /// Creates a canonicalizer using `rules` for the correction step.
    #[must_use]
    pub const fn new(rules: CorrectionRules) -> Self {
        Self { rules }
    }

    /// The correction rules in use.
    #[must_use]
    pub const fn rules(&self) -> &CorrectionRules {
        &self.rules
    }

    /// Canonicalizes a raw botanical name.
    ///
    /// `None`, blank, and names without any letters map to
    /// [`MISSING_NAME`].
    #[must_use]
    pub fn canonicalize(&self, raw: Option<&str>) -> Canonical {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Canonical::missing();
        };

        let mut current = raw.to_string();
        for _ in 0..MAX_PASSES {
            let next = self.pass(&current);
            if next.name == current {
                return next;
            }
            current = next.name;
        }

        log::warn!("Name {raw:?} did not settle after {MAX_PASSES} passes");
        self.pass(&current)
    }

    fn pass(&self, input: &str) -> Canonical {
        let lowered = input.trim().to_lowercase();
        let stripped = strip_markers(&lowered);
        let corrected = self.rules.apply(&stripped);
        let fixed = structural_fixes(&corrected);

        if fixed.is_empty() || fixed == MISSING_NAME || !fixed.chars().any(char::is_alphabetic) {
            return Canonical::missing();
        }

        if let Some(marker) = non_living_marker(&fixed) {
            return Canonical {
                name: marker.to_string(),
                kind: NameKind::NonLiving,
            };
        }

        let suffixed = if fixed.split_whitespace().count() == 1 {
            format!("{fixed} {GENUS_SUFFIX}")
        } else {
            fixed
        };

        let spot_fixed = SPOT_FIXES
            .get(suffixed.as_str())
            .map_or(suffixed, |fix| (*fix).to_string());

        Canonical::taxon(collapse_doubled_suffix(&spot_fixed))
    }
}

/// The first [`NON_LIVING`] marker found as a whole word (or run of words)
/// in `name`.
fn non_living_marker(name: &str) -> Option<&'static str> {
    let words: Vec<&str> = name
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();

    NON_LIVING.iter().copied().find(|marker| {
        let marker_words: Vec<&str> = marker.split(' ').collect();
        words.windows(marker_words.len()).any(|w| w == marker_words.as_slice())
    })
}

/// Removes quote characters and hybrid markers after the first token.
///
/// A leading `x` stays: it marks an intergeneric hybrid and the resolver
/// skips it when reading the genus.
fn strip_markers(s: &str) -> String {
    let unquoted: String = s
        .chars()
        .filter(|c| !QUOTES.contains(c))
        .map(|c| if c == '×' { ' ' } else { c })
        .collect();

    unquoted
        .split_whitespace()
        .enumerate()
        .filter(|(i, token)| *i == 0 || *token != "x")
        .map(|(_, token)| token)
        .collect::<Vec<_>>()
        .join(" ")
}

fn structural_fixes(s: &str) -> String {
    let mut fixed = s.replace("ã—", " ").replace('ã', "");
    while fixed.contains("..") {
        fixed = fixed.replace("..", ".");
    }

    fixed
        .split_whitespace()
        .map(|token| match token {
            "sp" | "sp." | "spp" | "ssp" | "ssp." => GENUS_SUFFIX,
            other => GENUS_SPELLINGS.get(other).copied().unwrap_or(other),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapses runs of `spp.` into one. A name made only of `spp.` tokens
/// is missing.
fn collapse_doubled_suffix(s: &str) -> String {
    let mut tokens: Vec<&str> = Vec::new();
    for token in s.split_whitespace() {
        if token == GENUS_SUFFIX && tokens.last() == Some(&GENUS_SUFFIX) {
            continue;
        }
        tokens.push(token);
    }

    if tokens.iter().all(|t| *t == GENUS_SUFFIX) {
        return MISSING_NAME.to_string();
    }
    tokens.join(" ")
}
