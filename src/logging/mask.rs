//! Message masking
//!
//! Ordered regex rules, each replacing every match with [`MASK_MARKER`].
//! Rules run in insertion order and see the output of earlier rules.

use crate::constants::MASK_MARKER;
use crate::error::{LogError, Result};
use regex::{NoExpand, Regex};
use std::borrow::Cow;

/// A compiled masking rule
#[derive(Debug, Clone)]
pub struct MaskRule {
    regex: Regex,
}

impl MaskRule {
    /// Compile a rule from a regex pattern
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| LogError::InvalidPattern {
            pattern: pattern.to_string(),
            source: e,
        })?;
        Ok(Self { regex })
    }

    /// Source pattern text
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

impl From<Regex> for MaskRule {
    fn from(regex: Regex) -> Self {
        Self { regex }
    }
}

/// Apply every rule in order. Returns the input borrowed when nothing matched.
pub fn mask<'a>(text: &'a str, rules: &[MaskRule]) -> Cow<'a, str> {
    let mut out = Cow::Borrowed(text);

    for rule in rules {
        let replaced = match rule.regex.replace_all(&out, NoExpand(MASK_MARKER)) {
            Cow::Owned(s) => Some(s),
            Cow::Borrowed(_) => None,
        };
        if let Some(s) = replaced {
            out = Cow::Owned(s);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rules(patterns: &[&str]) -> Vec<MaskRule> {
        patterns.iter().map(|p| MaskRule::new(p).unwrap()).collect()
    }

    #[test]
    fn test_no_match_is_borrowed() {
        let rules = rules(&[r"secret=\S+"]);
        let out = mask("nothing to hide", &rules);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, "nothing to hide");
    }

    #[test]
    fn test_replaces_all_occurrences() {
        let rules = rules(&[r"secret=\S+"]);
        assert_eq!(
            mask("secret=a and secret=b", &rules),
            "[MASKED] and [MASKED]"
        );
    }

    #[test]
    fn test_rules_are_cumulative_in_order() {
        // Second rule only matches after the first has rewritten the text.
        let rules = rules(&["password", r"\[MASKED\]=\w+"]);
        assert_eq!(mask("password=hunter2 ok", &rules), "[MASKED] ok");

        let reversed = {
            let mut r = rules.clone();
            r.reverse();
            r
        };
        assert_eq!(mask("password=hunter2 ok", &reversed), "[MASKED]=hunter2 ok");
    }

    #[test]
    fn test_marker_not_expanded() {
        let rules = rules(&[r"(?P<x>\d+)"]);
        assert_eq!(mask("pin 1234", &rules), "pin [MASKED]");
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = MaskRule::new("(unclosed").unwrap_err();
        assert!(matches!(err, LogError::InvalidPattern { pattern, .. } if pattern == "(unclosed"));
    }

    #[test]
    fn test_empty_rules_identity() {
        assert_eq!(mask("abc", &[]), "abc");
    }

    proptest! {
        #[test]
        fn prop_mask_idempotent(text in "[a-z0-9= ]{0,64}") {
            // Neither pattern matches the marker text.
            let rules = rules(&[r"secret=\S+", r"\d{4,}"]);
            let once = mask(&text, &rules).into_owned();
            let twice = mask(&once, &rules).into_owned();
            prop_assert_eq!(once, twice);
        }
    }
}
