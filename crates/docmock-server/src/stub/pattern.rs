//! Canonical request patterns and the builder deriving them from path templates.
//!
//! A pattern mirrors a WireMock request definition: a method, up to four
//! alternative URL fields, and name → value constraints on query parameters
//! and headers. When several URL fields are present the first of
//! `url`, `urlPath`, `urlPattern`, `urlPathPattern` is authoritative.

use crate::error::MatchError;
use crate::spec::HttpMethod;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// Wildcard replacing path parameters. Type-specific expressions are not generated.
pub const PATH_PARAMETER_WILDCARD: &str = ".*";

/// Suffix so a path expression is not defeated by a trailing query string.
pub const OPTIONAL_QUERY_SUFFIX: &str = r"(\?.*)?";

/// Constraint on the value of a query parameter or header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueMatcher {
    EqualTo(String),
    Matches(String),
    Contains(String),
    DoesNotMatch(String),
}

impl ValueMatcher {
    /// Constraint accepting any value, used for mandatory parameters.
    pub fn any() -> Self {
        ValueMatcher::Matches(PATH_PARAMETER_WILDCARD.to_string())
    }

    /// Check a concrete value. An expression that does not compile never matches.
    pub fn matches_value(&self, value: &str) -> bool {
        match self {
            ValueMatcher::EqualTo(expected) => expected == value,
            ValueMatcher::Contains(needle) => value.contains(needle.as_str()),
            ValueMatcher::Matches(expr) => full_match(expr, value).unwrap_or(false),
            ValueMatcher::DoesNotMatch(expr) => !full_match(expr, value).unwrap_or(true),
        }
    }
}

/// The kind of URL expression a pattern carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    Exact,
    PathOnly,
    Regex,
    PathRegex,
}

impl UrlKind {
    /// Whether the expression applies to the path only, without query string.
    pub fn is_path_only(&self) -> bool {
        matches!(self, UrlKind::PathOnly | UrlKind::PathRegex)
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, UrlKind::Regex | UrlKind::PathRegex)
    }
}

/// The authoritative URL expression of a pattern, selected by precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlExpression<'a> {
    pub kind: UrlKind,
    pub value: &'a str,
}

/// Normalized, matchable representation of method + URL + required parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRequestPattern {
    pub method: HttpMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query_parameters: BTreeMap<String, ValueMatcher>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, ValueMatcher>,
}

impl CanonicalRequestPattern {
    /// Pattern with a method and no URL field yet.
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            url: None,
            url_path: None,
            url_pattern: None,
            url_path_pattern: None,
            query_parameters: BTreeMap::new(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_url_path(mut self, path: impl Into<String>) -> Self {
        self.url_path = Some(path.into());
        self
    }

    pub fn with_url_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.url_pattern = Some(pattern.into());
        self
    }

    pub fn with_url_path_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.url_path_pattern = Some(pattern.into());
        self
    }

    pub fn with_query_parameter(mut self, name: impl Into<String>, matcher: ValueMatcher) -> Self {
        self.query_parameters.insert(name.into(), matcher);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, matcher: ValueMatcher) -> Self {
        self.headers.insert(name.into(), matcher);
        self
    }

    /// Same method and URL fields, without query or header constraints.
    pub fn without_constraints(&self) -> Self {
        Self {
            query_parameters: BTreeMap::new(),
            headers: BTreeMap::new(),
            ..self.clone()
        }
    }

    /// Select the authoritative URL expression: EXACT > PATH_ONLY > REGEX > PATH_REGEX.
    pub fn url_expression(&self) -> Result<UrlExpression<'_>, MatchError> {
        let candidates = [
            (UrlKind::Exact, &self.url),
            (UrlKind::PathOnly, &self.url_path),
            (UrlKind::Regex, &self.url_pattern),
            (UrlKind::PathRegex, &self.url_path_pattern),
        ];
        candidates
            .into_iter()
            .find_map(|(kind, field)| {
                field
                    .as_deref()
                    .filter(|v| !v.is_empty())
                    .map(|value| UrlExpression { kind, value })
            })
            .ok_or(MatchError::NoUrlField)
    }

    pub fn query_parameter_names(&self) -> impl Iterator<Item = &str> {
        self.query_parameters.keys().map(String::as_str)
    }

    pub fn header_names(&self) -> impl Iterator<Item = &str> {
        self.headers.keys().map(String::as_str)
    }
}

impl fmt::Display for CanonicalRequestPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.url_expression() {
            Ok(expr) => write!(f, "[{}]:{}", self.method, expr.value)?,
            Err(_) => write!(f, "[{}]:<no url>", self.method)?,
        }
        if !self.query_parameters.is_empty() {
            let names: Vec<&str> = self.query_parameter_names().collect();
            write!(f, " query={names:?}")?;
        }
        if !self.headers.is_empty() {
            let names: Vec<&str> = self.header_names().collect();
            write!(f, " headers={names:?}")?;
        }
        Ok(())
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{[^{}/]*\}").expect("Invalid placeholder regex"))
}

/// Whether a path template declares `{name}` placeholders
pub fn has_path_parameters(path_template: &str) -> bool {
    placeholder_regex().is_match(path_template)
}

/// Names of the `{name}` placeholders of a path template, in order.
/// Placeholders may share a segment, as in `/files/{name}.{ext}`.
pub fn path_parameter_names(path_template: &str) -> Vec<String> {
    placeholder_regex()
        .find_iter(path_template)
        .map(|placeholder| &placeholder.as_str()[1..placeholder.as_str().len() - 1])
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Convert a path template into a URL regular expression.
///
/// Every `{name}` placeholder becomes `.*`, literal text is escaped, and an
/// optional query-string suffix is appended. Unmatched braces are kept as
/// literal text.
pub fn template_to_regex(path_template: &str) -> String {
    let mut expr = String::with_capacity(path_template.len() + OPTIONAL_QUERY_SUFFIX.len());
    let mut last = 0;
    for placeholder in placeholder_regex().find_iter(path_template) {
        expr.push_str(&regex::escape(&path_template[last..placeholder.start()]));
        expr.push_str(PATH_PARAMETER_WILDCARD);
        last = placeholder.end();
    }
    expr.push_str(&regex::escape(&path_template[last..]));
    expr.push_str(OPTIONAL_QUERY_SUFFIX);
    expr
}

/// Build the canonical pattern of an operation.
///
/// The pattern always carries the REGEX form. Templates without path
/// parameters also carry the PATH_ONLY exact form, which then takes
/// precedence at match time.
pub fn canonical_pattern(method: HttpMethod, path_template: &str) -> CanonicalRequestPattern {
    let pattern = CanonicalRequestPattern::new(method).with_url_pattern(template_to_regex(path_template));
    if has_path_parameters(path_template) {
        pattern
    } else {
        pattern.with_url_path(path_template)
    }
}

/// Regex full match of `value` against `expr`.
pub(crate) fn full_match(expr: &str, value: &str) -> Result<bool, MatchError> {
    let anchored = format!("^(?:{expr})$");
    Regex::new(&anchored)
        .map(|re| re.is_match(value))
        .map_err(|e| MatchError::InvalidRegex(expr.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_to_regex_replaces_placeholders() {
        assert_eq!(template_to_regex("/user/{username}"), r"/user/.*(\?.*)?");
        assert_eq!(
            template_to_regex("/store/{storeId}/order/{orderId}"),
            r"/store/.*/order/.*(\?.*)?"
        );
    }

    #[test]
    fn test_path_parameter_names() {
        assert_eq!(path_parameter_names("/user/{username}"), vec!["username"]);
        assert_eq!(path_parameter_names("/files/{name}.{ext}"), vec!["name", "ext"]);
        assert_eq!(
            path_parameter_names("/store/{storeId}/order/{orderId}"),
            vec!["storeId", "orderId"]
        );
        assert!(path_parameter_names("/user/login").is_empty());
        assert!(path_parameter_names("/odd/{}").is_empty());
    }

    #[test]
    fn test_template_to_regex_escapes_literals() {
        assert_eq!(template_to_regex("/v1.0/users"), r"/v1\.0/users(\?.*)?");
    }

    #[test]
    fn test_unmatched_brace_passes_through() {
        let expr = template_to_regex("/user/{name");
        assert_eq!(expr, r"/user/\{name(\?.*)?");
        assert!(!has_path_parameters("/user/{name"));
    }

    #[test]
    fn test_canonical_pattern_forms() {
        let with_params = canonical_pattern(HttpMethod::Get, "/user/{username}");
        assert_eq!(with_params.url_path, None);
        let expr = with_params.url_expression().unwrap();
        assert_eq!(expr.kind, UrlKind::Regex);

        let without = canonical_pattern(HttpMethod::Get, "/user/login");
        assert_eq!(without.url_pattern.as_deref(), Some(r"/user/login(\?.*)?"));
        let expr = without.url_expression().unwrap();
        assert_eq!(expr.kind, UrlKind::PathOnly);
        assert_eq!(expr.value, "/user/login");
    }

    #[test]
    fn test_url_precedence() {
        let pattern = CanonicalRequestPattern::new(HttpMethod::Get)
            .with_url_path_pattern("/a/.*")
            .with_url_pattern("/b/.*")
            .with_url_path("/c")
            .with_url("/d");
        assert_eq!(pattern.url_expression().unwrap().value, "/d");

        let pattern = CanonicalRequestPattern::new(HttpMethod::Get)
            .with_url_path_pattern("/a/.*")
            .with_url_pattern("/b/.*");
        assert_eq!(pattern.url_expression().unwrap().kind, UrlKind::Regex);
    }

    #[test]
    fn test_no_url_field() {
        let pattern = CanonicalRequestPattern::new(HttpMethod::Post);
        assert_eq!(pattern.url_expression(), Err(MatchError::NoUrlField));
        let blank = CanonicalRequestPattern::new(HttpMethod::Post).with_url("");
        assert_eq!(blank.url_expression(), Err(MatchError::NoUrlField));
    }

    #[test]
    fn test_value_matchers() {
        assert!(ValueMatcher::any().matches_value(""));
        assert!(ValueMatcher::EqualTo("a".into()).matches_value("a"));
        assert!(!ValueMatcher::EqualTo("a".into()).matches_value("ab"));
        assert!(ValueMatcher::Contains("b".into()).matches_value("abc"));
        assert!(ValueMatcher::Matches("[0-9]+".into()).matches_value("42"));
        assert!(!ValueMatcher::Matches("[0-9]+".into()).matches_value("42a"));
        assert!(ValueMatcher::DoesNotMatch("[0-9]+".into()).matches_value("abc"));
        assert!(!ValueMatcher::Matches("(".into()).matches_value("("));
    }

    #[test]
    fn test_pattern_json_shape() {
        let json = r#"{
            "method": "GET",
            "urlPattern": "/user/.*",
            "queryParameters": { "username": { "matches": ".*" } }
        }"#;
        let pattern: CanonicalRequestPattern = serde_json::from_str(json).unwrap();
        assert_eq!(pattern.method, HttpMethod::Get);
        assert_eq!(pattern.url_pattern.as_deref(), Some("/user/.*"));
        assert_eq!(
            pattern.query_parameters.get("username"),
            Some(&ValueMatcher::Matches(".*".into()))
        );
    }
}
