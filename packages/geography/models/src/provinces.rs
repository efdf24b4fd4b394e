//! Canadian province and territory codes.
//!
//! Provides mappings between full names, two-letter postal abbreviations,
//! and the three-letter TDWG level-3 botanical area codes used by plant
//! distribution datasets. Newfoundland and Labrador are separate TDWG
//! areas, so they are separate variants here.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// A Canadian province, territory, or TDWG botanical area within Canada.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
)]
pub enum Province {
    #[serde(rename = "British Columbia")]
    #[strum(serialize = "British Columbia")]
    BritishColumbia,
    #[serde(rename = "Alberta")]
    #[strum(serialize = "Alberta")]
    Alberta,
    #[serde(rename = "Saskatchewan")]
    #[strum(serialize = "Saskatchewan")]
    Saskatchewan,
    #[serde(rename = "Manitoba")]
    #[strum(serialize = "Manitoba")]
    Manitoba,
    #[serde(rename = "Ontario")]
    #[strum(serialize = "Ontario")]
    Ontario,
    #[serde(rename = "Quebec")]
    #[strum(serialize = "Quebec")]
    Quebec,
    #[serde(rename = "New Brunswick")]
    #[strum(serialize = "New Brunswick")]
    NewBrunswick,
    #[serde(rename = "Nova Scotia")]
    #[strum(serialize = "Nova Scotia")]
    NovaScotia,
    #[serde(rename = "Prince Edward Island")]
    #[strum(serialize = "Prince Edward Island")]
    PrinceEdwardIsland,
    #[serde(rename = "Newfoundland")]
    #[strum(serialize = "Newfoundland")]
    Newfoundland,
    #[serde(rename = "Labrador")]
    #[strum(serialize = "Labrador")]
    Labrador,
    #[serde(rename = "Yukon")]
    #[strum(serialize = "Yukon")]
    Yukon,
    #[serde(rename = "Northwest Territories")]
    #[strum(serialize = "Northwest Territories")]
    NorthwestTerritories,
    #[serde(rename = "Nunavut")]
    #[strum(serialize = "Nunavut")]
    Nunavut,
}

impl Province {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::BritishColumbia,
            Self::Alberta,
            Self::Saskatchewan,
            Self::Manitoba,
            Self::Ontario,
            Self::Quebec,
            Self::NewBrunswick,
            Self::NovaScotia,
            Self::PrinceEdwardIsland,
            Self::Newfoundland,
            Self::Labrador,
            Self::Yukon,
            Self::NorthwestTerritories,
            Self::Nunavut,
        ]
    }

    /// Two-letter postal abbreviation.
    ///
    /// Newfoundland and Labrador share `"NL"`.
    #[must_use]
    pub const fn postal_code(self) -> &'static str {
        match self {
            Self::BritishColumbia => "BC",
            Self::Alberta => "AB",
            Self::Saskatchewan => "SK",
            Self::Manitoba => "MB",
            Self::Ontario => "ON",
            Self::Quebec => "QC",
            Self::NewBrunswick => "NB",
            Self::NovaScotia => "NS",
            Self::PrinceEdwardIsland => "PE",
            Self::Newfoundland | Self::Labrador => "NL",
            Self::Yukon => "YT",
            Self::NorthwestTerritories => "NT",
            Self::Nunavut => "NU",
        }
    }

    /// Three-letter TDWG level-3 botanical area code.
    #[must_use]
    pub const fn tdwg_code(self) -> &'static str {
        match self {
            Self::BritishColumbia => "BRC",
            Self::Alberta => "ABT",
            Self::Saskatchewan => "SAS",
            Self::Manitoba => "MAN",
            Self::Ontario => "ONT",
            Self::Quebec => "QUE",
            Self::NewBrunswick => "NBR",
            Self::NovaScotia => "NSC",
            Self::PrinceEdwardIsland => "PEI",
            Self::Newfoundland => "NFL",
            Self::Labrador => "LAB",
            Self::Yukon => "YUK",
            Self::NorthwestTerritories => "NWT",
            Self::Nunavut => "NUN",
        }
    }

    /// Parses a province from a full name, postal abbreviation, or TDWG
    /// code. Matching is case-insensitive and ignores surrounding
    /// whitespace.
    ///
    /// Returns `None` for unrecognized labels.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let upper = label.trim().to_uppercase();
        match upper.as_str() {
            "BRITISH COLUMBIA" | "BC" | "BRC" => Some(Self::BritishColumbia),
            "ALBERTA" | "AB" | "ABT" => Some(Self::Alberta),
            "SASKATCHEWAN" | "SK" | "SAS" => Some(Self::Saskatchewan),
            "MANITOBA" | "MB" | "MAN" => Some(Self::Manitoba),
            "ONTARIO" | "ON" | "ONT" => Some(Self::Ontario),
            "QUEBEC" | "QUÉBEC" | "QC" | "QUE" => Some(Self::Quebec),
            "NEW BRUNSWICK" | "NB" | "NBR" => Some(Self::NewBrunswick),
            "NOVA SCOTIA" | "NS" | "NSC" => Some(Self::NovaScotia),
            "PRINCE EDWARD ISLAND" | "PE" | "PEI" => Some(Self::PrinceEdwardIsland),
            "NEWFOUNDLAND" | "NEWFOUNDLAND AND LABRADOR" | "NL" | "NFL" => {
                Some(Self::Newfoundland)
            }
            "LABRADOR" | "LAB" => Some(Self::Labrador),
            "YUKON" | "YT" | "YUK" => Some(Self::Yukon),
            "NORTHWEST TERRITORIES" | "NT" | "NWT" => Some(Self::NorthwestTerritories),
            "NUNAVUT" | "NU" | "NUN" => Some(Self::Nunavut),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn province_count() {
        assert_eq!(Province::all().len(), 14);
    }

    #[test]
    fn tdwg_roundtrip() {
        for province in Province::all() {
            assert_eq!(
                Province::from_label(province.tdwg_code()),
                Some(*province),
                "roundtrip failed for {province}"
            );
        }
    }

    #[test]
    fn name_roundtrip() {
        for province in Province::all() {
            assert_eq!(Province::from_label(&province.to_string()), Some(*province));
        }
    }

    #[test]
    fn postal_codes_resolve() {
        assert_eq!(Province::from_label("on"), Some(Province::Ontario));
        assert_eq!(Province::from_label(" QC "), Some(Province::Quebec));
        assert_eq!(Province::from_label("NL"), Some(Province::Newfoundland));
    }

    #[test]
    fn unknown_label() {
        assert_eq!(Province::from_label("Ohio"), None);
        assert_eq!(Province::from_label(""), None);
    }
}
