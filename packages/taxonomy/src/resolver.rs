//! Species and genus extraction from canonical names.
//!
//! Most cities publish binomial names, so species is the first two words
//! and genus the first. A few publish fixed-length species codes instead
//! (`"acepla"` for *Acer platanoides*); for those the species and genus
//! are character prefixes of the code. Which rule a city uses is decided
//! in exactly one place, [`strategy_for_city`].

use serde::{Deserialize, Serialize};

use crate::canonicalize::GENUS_SUFFIX;

/// How species and genus are read out of a canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParsingStrategy {
    /// Whitespace-separated binomial. A leading hybrid marker `x` is
    /// skipped.
    Binomial,
    /// Species and genus are the first `species_len` and `genus_len`
    /// characters of the first word.
    FixedPrefix {
        /// Characters that identify a species.
        species_len: usize,
        /// Characters that identify a genus.
        genus_len: usize,
    },
}

/// Returns the parsing strategy for a city's names.
#[must_use]
pub fn strategy_for_city(city: &str) -> ParsingStrategy {
    match city {
        "Moncton" => ParsingStrategy::FixedPrefix {
            species_len: 6,
            genus_len: 3,
        },
        "Mississauga" | "Halifax" => ParsingStrategy::FixedPrefix {
            species_len: 4,
            genus_len: 2,
        },
        _ => ParsingStrategy::Binomial,
    }
}

/// Species and genus of one canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxon {
    /// Genus, e.g. `"acer"`.
    pub genus: String,
    /// Species, e.g. `"acer saccharum"` or `"acer spp."`.
    pub species: String,
}

impl ParsingStrategy {
    /// Extracts species and genus from a canonical taxon name.
    ///
    /// Returns `None` if the name has no usable word.
    #[must_use]
    pub fn resolve(self, canonical: &str) -> Option<Taxon> {
        match self {
            Self::Binomial => resolve_binomial(canonical),
            Self::FixedPrefix {
                species_len,
                genus_len,
            } => {
                let code = canonical.split_whitespace().next()?;
                Some(Taxon {
                    genus: code.chars().take(genus_len).collect(),
                    species: code.chars().take(species_len).collect(),
                })
            }
        }
    }
}

fn resolve_binomial(canonical: &str) -> Option<Taxon> {
    let tokens: Vec<&str> = canonical.split_whitespace().collect();
    let start = usize::from(tokens.len() > 1 && tokens[0] == "x");
    let genus = *tokens.get(start)?;
    let epithet = tokens.get(start + 1).copied().unwrap_or(GENUS_SUFFIX);

    Some(Taxon {
        genus: genus.to_string(),
        species: format!("{genus} {epithet}"),
    })
}
