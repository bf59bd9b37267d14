//! Invalidation Engine
//!
//! Rule-based group removal of entries. A rule matches an entry if ANY of
//! its clauses do: the key pattern, a tag intersection (only consulted when
//! the rule carries tags), or a caller predicate (only consulted when one is
//! supplied). The clauses are independent OR-conditions, never AND.
//!
//! Rules are stateless value objects; the engine never stores them inside
//! the entry map. Standing rules registered on the cache are replayed on
//! demand via `Cache::apply_invalidation_rules`.

use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;

use crate::entry::EntryView;

/// Key pattern for invalidation: plain substring or compiled regex.
///
/// A plain string pattern is a substring test, not an anchored match.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Key contains the given fragment
    Substring(String),
    /// Key matches the compiled regular expression
    Regex(Regex),
}

impl Pattern {
    /// Build a substring pattern
    pub fn substring(fragment: impl Into<String>) -> Self {
        Pattern::Substring(fragment.into())
    }

    /// Compile a regex pattern
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Pattern::Regex(Regex::new(pattern)?))
    }

    /// Test a key against this pattern
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Pattern::Substring(fragment) => key.contains(fragment.as_str()),
            Pattern::Regex(regex) => regex.is_match(key),
        }
    }
}

impl From<&str> for Pattern {
    fn from(fragment: &str) -> Self {
        Pattern::Substring(fragment.to_string())
    }
}

impl From<String> for Pattern {
    fn from(fragment: String) -> Self {
        Pattern::Substring(fragment)
    }
}

impl From<Regex> for Pattern {
    fn from(regex: Regex) -> Self {
        Pattern::Regex(regex)
    }
}

/// Caller-supplied predicate over an entry's metadata view
pub type EntryPredicate = Arc<dyn Fn(&EntryView<'_>) -> bool + Send + Sync>;

/// A group-invalidation rule.
///
/// Matching is an OR across the key pattern, the tag set (when non-empty),
/// and the predicate (when supplied).
#[derive(Clone)]
pub struct InvalidationRule {
    /// Key pattern clause
    pub pattern: Pattern,
    /// Tag-intersection clause; ignored when empty
    pub tags: HashSet<String>,
    /// Predicate clause; ignored when absent
    pub condition: Option<EntryPredicate>,
}

impl InvalidationRule {
    /// Create a rule matching on a key pattern only
    pub fn matching(pattern: impl Into<Pattern>) -> Self {
        Self {
            pattern: pattern.into(),
            tags: HashSet::new(),
            condition: None,
        }
    }

    /// Add a tag clause
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Add multiple tag clauses
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Add a predicate clause
    pub fn with_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&EntryView<'_>) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// Test an entry against this rule
    pub fn matches(&self, view: &EntryView<'_>) -> bool {
        if self.pattern.matches(view.key) {
            return true;
        }
        if !self.tags.is_empty() && !self.tags.is_disjoint(view.tags) {
            return true;
        }
        if let Some(condition) = &self.condition {
            if condition(view) {
                return true;
            }
        }
        false
    }
}

impl std::fmt::Debug for InvalidationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationRule")
            .field("pattern", &self.pattern)
            .field("tags", &self.tags)
            .field("has_condition", &self.condition.is_some())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn view<'a>(key: &'a str, tags: &'a HashSet<String>) -> EntryView<'a> {
        EntryView {
            key,
            tags,
            access_count: 0,
            size_bytes: 16,
            version: "v1",
            age: Duration::from_secs(1),
            ttl: Duration::from_secs(300),
        }
    }

    #[test]
    fn test_substring_pattern() {
        let pattern = Pattern::substring("user:");
        assert!(pattern.matches("user:42"));
        assert!(pattern.matches("admin:user:42"));
        assert!(!pattern.matches("session:42"));
    }

    #[test]
    fn test_regex_pattern() {
        let pattern = Pattern::regex(r"^user:\d+$").unwrap();
        assert!(pattern.matches("user:42"));
        assert!(!pattern.matches("user:42:profile"));
        assert!(!pattern.matches("admin:user:42"));
    }

    #[test]
    fn test_regex_pattern_invalid() {
        assert!(Pattern::regex("user:(").is_err());
    }

    #[test]
    fn test_rule_pattern_clause() {
        let tags = HashSet::new();
        let rule = InvalidationRule::matching("reports:");
        assert!(rule.matches(&view("reports:daily", &tags)));
        assert!(!rule.matches(&view("metrics:daily", &tags)));
    }

    #[test]
    fn test_rule_tag_clause_is_or_not_and() {
        let tagged: HashSet<String> = ["analytics".to_string()].into_iter().collect();
        let untagged = HashSet::new();

        // The key pattern does NOT match, but the tag does: still invalidated.
        let rule = InvalidationRule::matching("no-such-prefix:").with_tag("analytics");
        assert!(rule.matches(&view("metrics:daily", &tagged)));
        assert!(!rule.matches(&view("metrics:daily", &untagged)));
    }

    #[test]
    fn test_rule_empty_tags_not_consulted() {
        let tags = HashSet::new();
        let rule = InvalidationRule::matching("x:");
        // Empty rule tags never match anything by themselves
        assert!(!rule.matches(&view("y:1", &tags)));
    }

    #[test]
    fn test_rule_condition_clause() {
        let tags = HashSet::new();
        let rule = InvalidationRule::matching("no-match:")
            .with_condition(|entry| entry.size_bytes > 10);

        assert!(rule.matches(&view("anything", &tags))); // size 16 > 10
    }

    #[test]
    fn test_rule_no_clause_matches() {
        let tags = HashSet::new();
        let rule = InvalidationRule::matching("a:")
            .with_tag("missing-tag")
            .with_condition(|entry| entry.access_count > 100);

        assert!(!rule.matches(&view("b:1", &tags)));
    }

    #[test]
    fn test_rule_debug_redacts_condition() {
        let rule = InvalidationRule::matching("a:").with_condition(|_| true);
        let debug = format!("{:?}", rule);
        assert!(debug.contains("has_condition: true"));
    }
}
