//! The ordered rule table consulted for every incoming request.
//!
//! Overrides are kept sorted by ascending priority. Generated rules
//! (examples and fallbacks) come after every override and are sorted by URL
//! specificity first, so a wildcard operation never shadows a literal one.
//! Remaining ties prefer more query and header constraints, then the most
//! recently added rule. The whole list is published as one immutable
//! snapshot, so a request never observes a half-applied batch.

use super::request::IncomingRequest;
use super::StubEngine;
use crate::stub::{patterns_match, StubRule, UrlKind, EXAMPLE_PRIORITY, PATH_PARAMETER_WILDCARD};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct Entry {
    sequence: u64,
    rule: StubRule,
}

/// URL kind, then fewer wildcards, then longer expression.
type Specificity = (u8, usize, Reverse<usize>);

impl Entry {
    fn specificity(&self) -> Specificity {
        match self.rule.pattern.url_expression() {
            Ok(expression) => {
                let kind = match expression.kind {
                    UrlKind::Exact => 0,
                    UrlKind::PathOnly => 1,
                    UrlKind::Regex => 2,
                    UrlKind::PathRegex => 3,
                };
                (
                    kind,
                    expression.value.matches(PATH_PARAMETER_WILDCARD).count(),
                    Reverse(expression.value.len()),
                )
            }
            Err(_) => (u8::MAX, usize::MAX, Reverse(0)),
        }
    }

    fn match_order(&self) -> (bool, u32, Specificity, u32, Reverse<usize>, Reverse<u64>) {
        let priority = self.rule.priority;
        let generated = priority >= EXAMPLE_PRIORITY;
        let pattern = &self.rule.pattern;
        (
            generated,
            if generated { 0 } else { priority },
            self.specificity(),
            priority,
            Reverse(pattern.query_parameters.len() + pattern.headers.len()),
            Reverse(self.sequence),
        )
    }
}

/// Rules in match order, swapped atomically on every change.
pub struct StubTable {
    entries: ArcSwap<Vec<Entry>>,
    /// Serializes writers and hands out insertion sequence numbers.
    next_sequence: Mutex<u64>,
}

impl StubTable {
    pub fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(Vec::new()),
            next_sequence: Mutex::new(0),
        }
    }

    /// First rule answering `request`, if any.
    pub fn find_rule(&self, request: &IncomingRequest) -> Option<StubRule> {
        let probe = request.to_probe();
        let entries = self.entries.load();
        entries
            .iter()
            .find(|entry| match patterns_match(&entry.rule.pattern, &probe) {
                Ok(true) => request.satisfies_values(&entry.rule.pattern),
                Ok(false) => false,
                Err(e) => {
                    warn!("Skipping rule {}: {}", entry.rule.pattern, e);
                    false
                }
            })
            .map(|entry| {
                debug!(
                    "Request {} {} matched rule {} (priority {})",
                    request.method,
                    request.url(),
                    entry.rule.pattern,
                    entry.rule.priority
                );
                entry.rule.clone()
            })
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Publish `rules` on top of (or instead of) the current ones.
    fn publish(&self, rules: Vec<StubRule>, keep_existing: bool) {
        let mut next_sequence = self.next_sequence.lock();
        let mut entries: Vec<Entry> = if keep_existing {
            self.entries.load().as_ref().clone()
        } else {
            Vec::with_capacity(rules.len())
        };
        for rule in rules {
            *next_sequence += 1;
            entries.push(Entry {
                sequence: *next_sequence,
                rule,
            });
        }
        entries.sort_by_cached_key(Entry::match_order);
        self.entries.store(Arc::new(entries));
    }
}

impl Default for StubTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StubEngine for StubTable {
    fn add_rule(&self, rule: StubRule) {
        self.publish(vec![rule], true);
    }

    fn add_rules(&self, rules: Vec<StubRule>) {
        self.publish(rules, true);
    }

    fn replace_rules(&self, rules: Vec<StubRule>) {
        self.publish(rules, false);
    }

    fn rules(&self) -> Vec<StubRule> {
        self.entries.load().iter().map(|e| e.rule.clone()).collect()
    }

    fn find_rule(&self, request: &IncomingRequest) -> Option<StubRule> {
        StubTable::find_rule(self, request)
    }

    fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::HttpMethod;
    use crate::stub::{
        canonical_pattern, ResponseDefinition, ValueMatcher, DEFAULT_PRIORITY, EXAMPLE_PRIORITY,
        FALLBACK_PRIORITY,
    };

    fn rule(path: &str, status: u16, priority: u32) -> StubRule {
        StubRule::builder(canonical_pattern(HttpMethod::Get, path))
            .will_return(ResponseDefinition::new(status))
            .priority(priority)
            .build()
    }

    fn get(target: &str) -> IncomingRequest {
        IncomingRequest::from_target(HttpMethod::Get, target)
    }

    #[test]
    fn test_lower_priority_wins() {
        let table = StubTable::new();
        table.add_rule(rule("/pets", 200, DEFAULT_PRIORITY));
        table.add_rule(rule("/pets", 501, FALLBACK_PRIORITY));

        assert_eq!(table.find_rule(&get("/pets")).unwrap().response.status, 200);
    }

    #[test]
    fn test_most_recent_wins_on_tie() {
        let table = StubTable::new();
        table.add_rule(rule("/pets", 400, FALLBACK_PRIORITY));
        table.add_rule(rule("/pets", 501, FALLBACK_PRIORITY));
        assert_eq!(table.find_rule(&get("/pets")).unwrap().response.status, 501);

        table.add_rules(vec![rule("/pets", 201, 1), rule("/pets", 202, 1)]);
        assert_eq!(table.find_rule(&get("/pets")).unwrap().response.status, 202);
    }

    #[test]
    fn test_literal_path_beats_wildcard_on_tie() {
        let login = || {
            canonical_pattern(HttpMethod::Get, "/user/login")
                .with_query_parameter("username", ValueMatcher::any())
                .with_query_parameter("password", ValueMatcher::any())
        };
        for wildcard_first in [true, false] {
            let table = StubTable::new();
            let wildcard = vec![
                rule("/user/{username}", 501, FALLBACK_PRIORITY),
                rule("/user/{username}", 200, EXAMPLE_PRIORITY),
            ];
            let literal = vec![
                rule("/user/login", 400, FALLBACK_PRIORITY),
                StubRule::builder(login())
                    .will_return(ResponseDefinition::new(501))
                    .priority(FALLBACK_PRIORITY)
                    .build(),
            ];
            if wildcard_first {
                table.add_rules(wildcard);
                table.add_rules(literal);
            } else {
                table.add_rules(literal);
                table.add_rules(wildcard);
            }

            let status = |target: &str| table.find_rule(&get(target)).unwrap().response.status;
            assert_eq!(status("/user/login?username=a"), 400);
            assert_eq!(status("/user/login?username=a&password=b"), 501);
            assert_eq!(status("/user/alice"), 200);
        }
    }

    #[test]
    fn test_override_beats_more_specific_generated_rule() {
        let table = StubTable::new();
        table.add_rule(rule("/user/login", 501, FALLBACK_PRIORITY));
        table.add_rule(rule("/user/{username}", 200, DEFAULT_PRIORITY));
        assert_eq!(table.find_rule(&get("/user/login")).unwrap().response.status, 200);
    }

    #[test]
    fn test_value_constraints_are_checked() {
        let table = StubTable::new();
        table.add_rule(rule("/search", 400, FALLBACK_PRIORITY));
        table.add_rule(
            StubRule::builder(
                canonical_pattern(HttpMethod::Get, "/search")
                    .with_query_parameter("q", ValueMatcher::EqualTo("rust".into())),
            )
            .will_return(ResponseDefinition::new(200))
            .build(),
        );

        assert_eq!(table.find_rule(&get("/search?q=rust")).unwrap().response.status, 200);
        assert_eq!(table.find_rule(&get("/search?q=go")).unwrap().response.status, 400);
        assert_eq!(table.find_rule(&get("/search")).unwrap().response.status, 400);
    }

    #[test]
    fn test_replace_rules() {
        let table = StubTable::new();
        table.add_rule(rule("/a", 200, DEFAULT_PRIORITY));
        table.replace_rules(vec![rule("/b", 200, DEFAULT_PRIORITY)]);

        assert_eq!(table.len(), 1);
        assert!(table.find_rule(&get("/a")).is_none());
        assert!(table.find_rule(&get("/b")).is_some());

        table.replace_rules(Vec::new());
        assert!(table.is_empty());
    }

    #[test]
    fn test_method_must_match() {
        let table = StubTable::new();
        table.add_rule(rule("/pets", 200, DEFAULT_PRIORITY));
        assert!(table
            .find_rule(&IncomingRequest::from_target(HttpMethod::Post, "/pets"))
            .is_none());
    }

    #[test]
    fn test_invalid_rule_is_skipped() {
        let table = StubTable::new();
        table.add_rule(
            StubRule::builder(
                crate::stub::CanonicalRequestPattern::new(HttpMethod::Get).with_url_pattern("/x/(["),
            )
            .priority(1)
            .build(),
        );
        table.add_rule(rule("/x/{id}", 501, FALLBACK_PRIORITY));
        assert_eq!(table.find_rule(&get("/x/1")).unwrap().response.status, 501);
    }
}
