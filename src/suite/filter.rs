//! Grep filter over expanded scenarios
//!
//! A plain pattern matches as a literal substring. A pattern written as
//! `/expr/` or `/expr/i` is a regular expression. Excluded scenarios are
//! dropped before execution and never reach the event bus.

use regex::{Regex, RegexBuilder};

use super::model::Scenario;
use crate::common::{Error, Result};

/// Compiled scenario name filter
#[derive(Debug, Clone)]
pub struct Filter {
    source: String,
    matcher: Regex,
    invert: bool,
}

impl Filter {
    /// Compile a grep pattern
    pub fn new(pattern: &str) -> Result<Self> {
        let matcher = match parse_regex_literal(pattern) {
            Some((expr, case_insensitive)) => RegexBuilder::new(expr)
                .case_insensitive(case_insensitive)
                .build()
                .map_err(|e| Error::InvalidPattern {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })?,
            None => Regex::new(&regex::escape(pattern)).map_err(|e| Error::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?,
        };

        Ok(Self {
            source: pattern.to_string(),
            matcher,
            invert: false,
        })
    }

    /// Keep scenarios that do not match instead
    pub fn inverted(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.source
    }

    /// Whether the scenario is selected
    ///
    /// The pattern is tried against the qualified name, the feature name and
    /// the display name.
    pub fn matches(&self, scenario: &Scenario) -> bool {
        let hit = self.matcher.is_match(&scenario.qualified_name())
            || self.matcher.is_match(&scenario.feature)
            || self.matcher.is_match(&scenario.display_name);
        hit != self.invert
    }

    /// Retain the selected scenarios, preserving order
    pub fn apply<I>(&self, scenarios: I) -> Vec<Scenario>
    where
        I: IntoIterator<Item = Scenario>,
    {
        scenarios.into_iter().filter(|s| self.matches(s)).collect()
    }
}

/// Build an optional filter; no pattern means no filtering
pub fn build(pattern: Option<&str>, invert: bool) -> Result<Option<Filter>> {
    pattern
        .map(|p| Filter::new(p).map(|f| f.inverted(invert)))
        .transpose()
}

fn parse_regex_literal(pattern: &str) -> Option<(&str, bool)> {
    let body = pattern.strip_prefix('/')?;
    if let Some(expr) = body.strip_suffix("/i") {
        return Some((expr, true));
    }
    body.strip_suffix('/').map(|expr| (expr, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::model::{DataBinding, RetryPolicy, RetryScope};

    fn scenario(feature: &str, name: &str) -> Scenario {
        Scenario {
            feature: feature.to_string(),
            title: name.to_string(),
            display_name: name.to_string(),
            steps: Vec::new(),
            data: DataBinding::None,
            retry: RetryPolicy::once(RetryScope::Scenario),
        }
    }

    #[test]
    fn test_substring_match() {
        let filter = Filter::new("davert").unwrap();
        assert!(filter.matches(&scenario("Grep", "Got login davert and password")));
        assert!(!filter.matches(&scenario("Grep", "Got changed login andrey")));
    }

    #[test]
    fn test_literal_pattern_with_regex_metacharacters() {
        let filter = Filter::new("(smoke)").unwrap();
        assert!(filter.matches(&scenario("Grep", "login (smoke)")));
        assert!(!filter.matches(&scenario("Grep", "login smoke")));
    }

    #[test]
    fn test_regex_pattern() {
        let filter = Filter::new("/^got (login|logout)/i").unwrap();
        assert!(filter.matches(&scenario("Grep", "Got login davert")));
        assert!(!filter.matches(&scenario("Grep", "Got changed login")));
    }

    #[test]
    fn test_feature_name_matches() {
        let filter = Filter::new("Flaky").unwrap();
        assert!(filter.matches(&scenario("Flaky", "Not so flaky test")));
    }

    #[test]
    fn test_invalid_regex_is_filter_error() {
        let err = Filter::new("/(unclosed/").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_inverted_filter() {
        let filter = build(Some("davert"), true).unwrap().unwrap();
        let kept = filter.apply(vec![
            scenario("Grep", "Got login davert"),
            scenario("Grep", "Got changed login"),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].display_name, "Got changed login");

        assert!(build(None, true).unwrap().is_none());
    }
}
