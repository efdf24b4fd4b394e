//! Ordered find-and-replace correction rules.
//!
//! A rule replaces a misspelled fragment of a botanical name with its
//! correct form. Rules are matched on whole words only, so `acre -> acer`
//! leaves `sacred` alone, and they are applied in table order: a later
//! rule sees the output of every earlier one.

use canopy_source::Table;
use regex::{NoExpand, Regex};

use crate::TaxonomyError;

/// Rules shipped with the crate, used when no table is configured.
const BUILTIN_RULES_CSV: &str = include_str!("../data/corrections.csv");

/// One find/replace pair with its compiled whole-word pattern.
#[derive(Debug, Clone)]
pub struct CorrectionRule {
    find: String,
    replace: String,
    pattern: Regex,
}

impl CorrectionRule {
    /// Builds a rule. Both sides are lowercased and whitespace-collapsed.
    ///
    /// # Errors
    ///
    /// Returns [`TaxonomyError::InvalidRule`] if `find` is blank or the
    /// pattern cannot be compiled.
    pub fn new(find: &str, replace: &str) -> Result<Self, TaxonomyError> {
        let find = collapse(&find.to_lowercase());
        let replace = collapse(&replace.to_lowercase());

        if find.is_empty() {
            return Err(TaxonomyError::InvalidRule {
                find,
                message: "find pattern is blank".to_string(),
            });
        }

        let pattern = word_pattern(&find).map_err(|e| TaxonomyError::InvalidRule {
            find: find.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            find,
            replace,
            pattern,
        })
    }

    /// The text this rule looks for.
    #[must_use]
    pub fn find(&self) -> &str {
        &self.find
    }

    /// The text this rule substitutes.
    #[must_use]
    pub fn replace(&self) -> &str {
        &self.replace
    }

    /// Applies this rule to every whole-word occurrence in `input`.
    #[must_use]
    pub fn apply(&self, input: &str) -> String {
        self.pattern
            .replace_all(input, NoExpand(&self.replace))
            .into_owned()
    }
}

/// An ordered list of [`CorrectionRule`]s.
#[derive(Debug, Clone, Default)]
pub struct CorrectionRules {
    rules: Vec<CorrectionRule>,
}

impl CorrectionRules {
    /// Builds a rule list from `(find, replace)` pairs, keeping their
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`TaxonomyError::InvalidRule`] for the first unusable pair.
    pub fn new<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, TaxonomyError> {
        let rules = pairs
            .into_iter()
            .map(|(find, replace)| CorrectionRule::new(find, replace))
            .collect::<Result<Vec<_>, _>>()?;

        let out = Self { rules };
        out.warn_if_unstable();
        Ok(out)
    }

    /// Loads rules from a table with `Find` and `Replace` columns.
    ///
    /// Rows with a blank `Find` cell are skipped with a warning. A blank
    /// `Replace` cell deletes the matched text.
    ///
    /// # Errors
    ///
    /// Returns [`TaxonomyError::Table`] if either column is missing.
    pub fn from_table(table: &Table) -> Result<Self, TaxonomyError> {
        let find_col = table.column("Find")?;
        let replace_col = table.column("Replace")?;

        let mut pairs = Vec::with_capacity(table.len());
        for (i, row) in table.rows().enumerate() {
            let Some(find) = row.get(find_col) else {
                log::warn!("{}: row {} has no Find value, skipping", table.name(), i + 1);
                continue;
            };
            pairs.push((find, row.get(replace_col).unwrap_or_default()));
        }

        let rules = Self::new(pairs)?;
        log::info!("Loaded {} correction rules from '{}'", rules.len(), table.name());
        Ok(rules)
    }

    /// Returns the rules shipped with the crate.
    ///
    /// # Panics
    ///
    /// Panics if the embedded rule table is malformed (covered by tests).
    #[must_use]
    pub fn builtin() -> Self {
        Table::from_reader("corrections", BUILTIN_RULES_CSV.as_bytes())
            .map_err(TaxonomyError::from)
            .and_then(|table| Self::from_table(&table))
            .unwrap_or_else(|e| panic!("Failed to parse built-in correction rules: {e}"))
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterates over the rules in order.
    pub fn iter(&self) -> impl Iterator<Item = &CorrectionRule> {
        self.rules.iter()
    }

    /// Folds every rule over `input` once, in order.
    #[must_use]
    pub fn apply(&self, input: &str) -> String {
        let folded = self
            .rules
            .iter()
            .fold(input.to_string(), |acc, rule| rule.apply(&acc));
        collapse(&folded)
    }

    /// Returns the rules whose replacement is itself rewritten by the
    /// table. Names hitting these rules need more than one pass to settle.
    #[must_use]
    pub fn unstable_rules(&self) -> Vec<&CorrectionRule> {
        self.rules
            .iter()
            .filter(|rule| !rule.replace.is_empty() && self.apply(&rule.replace) != rule.replace)
            .collect()
    }

    fn warn_if_unstable(&self) {
        for rule in self.unstable_rules() {
            log::warn!(
                "Correction '{}' -> '{}' is rewritten again by the rule table",
                rule.find,
                rule.replace
            );
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Escapes `find` and anchors it with `\b` on every edge that is a word
/// character. An edge like `"."` cannot take a word boundary, so it is
/// matched literally.
fn word_pattern(find: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::with_capacity(find.len() + 4);
    if find.starts_with(is_word_char) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(find));
    if find.ends_with(is_word_char) {
        pattern.push_str(r"\b");
    }
    Regex::new(&pattern)
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_whole_words_only() {
        let rules = CorrectionRules::new([("acre", "acer")]).unwrap();
        assert_eq!(rules.apply("acre rubrum"), "acer rubrum");
        assert_eq!(rules.apply("sacred acre"), "sacred acer");
        assert_eq!(rules.apply("acres"), "acres");
    }

    #[test]
    fn applies_rules_in_order() {
        let rules = CorrectionRules::new([("a", "b"), ("b", "c")]).unwrap();
        assert_eq!(rules.apply("a"), "c");

        let reversed = CorrectionRules::new([("b", "c"), ("a", "b")]).unwrap();
        assert_eq!(reversed.apply("a"), "b");
    }

    #[test]
    fn replacement_is_literal() {
        let rules = CorrectionRules::new([("acer", "$1 acer")]).unwrap();
        assert_eq!(rules.apply("acer"), "$1 acer");
    }

    #[test]
    fn punctuation_edges_match_literally() {
        let rules = CorrectionRules::new([("spp..", "spp.")]).unwrap();
        assert_eq!(rules.apply("acer spp.."), "acer spp.");
    }

    #[test]
    fn blank_replacement_deletes() {
        let rules = CorrectionRules::new([("var.", "")]).unwrap();
        assert_eq!(rules.apply("picea glauca var. densata"), "picea glauca densata");
    }

    #[test]
    fn rejects_blank_find() {
        assert!(matches!(
            CorrectionRule::new("  ", "acer"),
            Err(TaxonomyError::InvalidRule { .. })
        ));
    }

    #[test]
    fn reports_unstable_rules() {
        let rules = CorrectionRules::new([("a", "b"), ("b", "c")]).unwrap();
        let unstable: Vec<&str> = rules.unstable_rules().iter().map(|r| r.find()).collect();
        assert_eq!(unstable, ["a"]);
    }

    #[test]
    fn loads_from_table() {
        let table = Table::from_reader(
            "rules",
            "Find,Replace\nGingko,Ginkgo\n,orphan\nvar.,\n".as_bytes(),
        )
        .unwrap();
        let rules = CorrectionRules::from_table(&table).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.apply("gingko biloba"), "ginkgo biloba");
    }

    #[test]
    fn missing_replace_column_is_fatal() {
        let table = Table::from_reader("rules", "Find,Fix\nacre,acer\n".as_bytes()).unwrap();
        let err = CorrectionRules::from_table(&table).unwrap_err();
        assert_eq!(
            err.to_string(),
            "table 'rules' is missing required column 'Replace'"
        );
    }

    #[test]
    fn builtin_rules_are_stable() {
        let rules = CorrectionRules::builtin();
        assert!(!rules.is_empty());
        assert!(rules.unstable_rules().is_empty());
        assert_eq!(rules.apply("syringa reticulata"), "syringa reticulata");
    }
}
