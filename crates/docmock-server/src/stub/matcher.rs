//! Request pattern matching.
//!
//! Decides whether a probe pattern (an override request, a concrete request)
//! denotes the same operation as a specification pattern. Only the
//! authoritative URL expression of each side is compared, and query/header
//! constraints are checked by name presence only; value constraints are left
//! to the engine.

use super::pattern::{full_match, CanonicalRequestPattern, UrlExpression, UrlKind};
use crate::error::MatchError;
use tracing::debug;

/// Check whether `probe` matches the specification pattern `spec`.
///
/// Returns `Err(MatchError)` when either side has no usable URL field.
pub fn patterns_match(
    spec: &CanonicalRequestPattern,
    probe: &CanonicalRequestPattern,
) -> Result<bool, MatchError> {
    // Cheapest check first
    if spec.method != probe.method {
        debug!("Mismatch methods ({} vs {})", spec.method, probe.method);
        return Ok(false);
    }

    let probe_url = probe.url_expression()?;
    let spec_url = spec.url_expression()?;

    if !url_matches(spec_url, probe_url)? {
        debug!(
            "Mismatch URLs (spec:{}, received:{})",
            spec_url.value, probe_url.value
        );
        return Ok(false);
    }

    if !contains_all(probe.query_parameter_names(), spec.query_parameter_names(), false) {
        debug!(
            "Missing mandatory query parameter (required:{:?}, provided:{:?})",
            spec.query_parameters.keys().collect::<Vec<_>>(),
            probe.query_parameters.keys().collect::<Vec<_>>()
        );
        return Ok(false);
    }

    if !contains_all(probe.header_names(), spec.header_names(), true) {
        debug!(
            "Missing mandatory header (required:{:?}, provided:{:?})",
            spec.headers.keys().collect::<Vec<_>>(),
            probe.headers.keys().collect::<Vec<_>>()
        );
        return Ok(false);
    }

    debug!("Request patterns match ({} ~ {})", spec, probe);
    Ok(true)
}

/// Compare the probe URL value against the specification expression.
fn url_matches(spec: UrlExpression<'_>, probe: UrlExpression<'_>) -> Result<bool, MatchError> {
    // A concrete URL carries its query string; path-only expressions ignore it.
    let candidate = if spec.kind.is_path_only() && probe.kind == UrlKind::Exact {
        strip_query(probe.value)
    } else {
        probe.value
    };

    if spec.kind.is_regex() {
        // Identical expressions denote the same operation even when the
        // expression does not accept its own text.
        Ok(candidate == spec.value || full_match(spec.value, candidate)?)
    } else {
        Ok(candidate == spec.value)
    }
}

fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}

/// Whether every `required` name is present in `provided`.
fn contains_all<'a>(
    provided: impl Iterator<Item = &'a str>,
    mut required: impl Iterator<Item = &'a str>,
    ignore_case: bool,
) -> bool {
    let provided: Vec<&str> = provided.collect();
    required.all(|name| {
        provided.iter().any(|p| {
            if ignore_case {
                p.eq_ignore_ascii_case(name)
            } else {
                *p == name
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::HttpMethod;
    use crate::stub::pattern::{canonical_pattern, ValueMatcher};

    fn probe(method: HttpMethod, url: &str) -> CanonicalRequestPattern {
        CanonicalRequestPattern::new(method).with_url(url)
    }

    #[test]
    fn test_reflexive_for_compiled_patterns() {
        for template in ["/user/{username}", "/user/login", "/v1.0/store/{id}/order", "/"] {
            for method in HttpMethod::ALL {
                let pattern = canonical_pattern(method, template);
                assert!(
                    patterns_match(&pattern, &pattern).unwrap(),
                    "{method} {template} should match itself"
                );
            }
        }
    }

    #[test]
    fn test_reflexive_for_regex_only_pattern() {
        // `(\?.*)?` cannot match its own text, equality keeps reflexivity
        let pattern = CanonicalRequestPattern::new(HttpMethod::Get).with_url_pattern(r"/ping(\?.*)?");
        assert!(patterns_match(&pattern, &pattern).unwrap());
    }

    #[test]
    fn test_method_short_circuit() {
        let spec = canonical_pattern(HttpMethod::Get, "/user/{username}");
        let other = probe(HttpMethod::Post, "/user/alice");
        assert!(!patterns_match(&spec, &other).unwrap());

        // Even without any URL field the method check wins
        let no_url = CanonicalRequestPattern::new(HttpMethod::Delete);
        assert!(!patterns_match(&spec, &no_url).unwrap());
    }

    #[test]
    fn test_probe_without_url_is_an_error() {
        let spec = canonical_pattern(HttpMethod::Get, "/user/{username}");
        let no_url = CanonicalRequestPattern::new(HttpMethod::Get);
        assert_eq!(patterns_match(&spec, &no_url), Err(MatchError::NoUrlField));
    }

    #[test]
    fn test_path_parameter_scenario() {
        let spec = canonical_pattern(HttpMethod::Get, "/user/{username}");
        assert!(patterns_match(&spec, &probe(HttpMethod::Get, "/user/alice")).unwrap());
        assert!(patterns_match(&spec, &probe(HttpMethod::Get, "/user/alice?x=1")).unwrap());
        // `.*` accepts the empty segment
        assert!(patterns_match(&spec, &probe(HttpMethod::Get, "/user/")).unwrap());
        assert!(!patterns_match(&spec, &probe(HttpMethod::Get, "/users/alice")).unwrap());
    }

    #[test]
    fn test_login_scenario_subset_law() {
        let spec = canonical_pattern(HttpMethod::Get, "/user/login")
            .with_query_parameter("username", ValueMatcher::any())
            .with_query_parameter("password", ValueMatcher::any());

        let missing = probe(HttpMethod::Get, "/user/login?username=test")
            .with_query_parameter("username", ValueMatcher::EqualTo("test".into()));
        assert!(!patterns_match(&spec, &missing).unwrap());

        let complete = probe(HttpMethod::Get, "/user/login?username=test&password=test")
            .with_query_parameter("username", ValueMatcher::EqualTo("test".into()))
            .with_query_parameter("password", ValueMatcher::EqualTo("test".into()));
        assert!(patterns_match(&spec, &complete).unwrap());

        // The constraint-free fallback form accepts both
        let fallback = spec.without_constraints();
        assert!(patterns_match(&fallback, &missing).unwrap());
    }

    #[test]
    fn test_only_key_presence_is_checked() {
        let spec = canonical_pattern(HttpMethod::Get, "/items")
            .with_query_parameter("limit", ValueMatcher::Matches("[0-9]+".into()));
        let probe = probe(HttpMethod::Get, "/items?limit=abc")
            .with_query_parameter("limit", ValueMatcher::EqualTo("abc".into()));
        assert!(patterns_match(&spec, &probe).unwrap());
    }

    #[test]
    fn test_required_headers_case_insensitive() {
        let spec = canonical_pattern(HttpMethod::Get, "/secure")
            .with_header("X-Api-Key", ValueMatcher::any());
        let without = probe(HttpMethod::Get, "/secure");
        assert!(!patterns_match(&spec, &without).unwrap());

        let with = probe(HttpMethod::Get, "/secure")
            .with_header("x-api-key", ValueMatcher::EqualTo("k".into()));
        assert!(patterns_match(&spec, &with).unwrap());
    }

    #[test]
    fn test_exact_spec_requires_equality() {
        let spec = CanonicalRequestPattern::new(HttpMethod::Get).with_url("/hello?lang=en");
        assert!(patterns_match(&spec, &probe(HttpMethod::Get, "/hello?lang=en")).unwrap());
        assert!(!patterns_match(&spec, &probe(HttpMethod::Get, "/hello")).unwrap());
    }

    #[test]
    fn test_invalid_spec_regex() {
        let spec = CanonicalRequestPattern::new(HttpMethod::Get).with_url_pattern("/broken(");
        let result = patterns_match(&spec, &probe(HttpMethod::Get, "/broken"));
        assert!(matches!(result, Err(MatchError::InvalidRegex(_, _))));
    }
}
