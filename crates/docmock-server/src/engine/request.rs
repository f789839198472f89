//! Concrete requests as seen by the engine.

use crate::spec::HttpMethod;
use crate::stub::{CanonicalRequestPattern, ValueMatcher};

/// A request received by the engine, reduced to what rule matching needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl IncomingRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: Vec::new(),
        }
    }

    /// Build from a request target such as `/user/login?username=test`.
    pub fn from_target(method: HttpMethod, target: &str) -> Self {
        match target.split_once('?') {
            Some((path, query)) => Self {
                query: Some(query.to_string()).filter(|q| !q.is_empty()),
                ..Self::new(method, path)
            },
            None => Self::new(method, target),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Path plus query string, as the client sent it.
    pub fn url(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    /// Decoded query parameters in request order.
    pub fn query_parameters(&self) -> Vec<(String, String)> {
        let Some(query) = self.query.as_deref() else {
            return Vec::new();
        };
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode(key), decode(value))
            })
            .collect()
    }

    /// First value of a header, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Probe pattern describing this request, for registry and rule matching.
    pub fn to_probe(&self) -> CanonicalRequestPattern {
        let probe = CanonicalRequestPattern::new(self.method).with_url(self.url());
        let probe = self
            .query_parameters()
            .into_iter()
            .fold(probe, |p, (name, value)| {
                p.with_query_parameter(name, ValueMatcher::EqualTo(value))
            });
        self.headers.iter().fold(probe, |p, (name, value)| {
            p.with_header(name.as_str(), ValueMatcher::EqualTo(value.clone()))
        })
    }

    /// Whether every query and header value constraint of `pattern` holds.
    pub fn satisfies_values(&self, pattern: &CanonicalRequestPattern) -> bool {
        let query = self.query_parameters();
        let query_ok = pattern.query_parameters.iter().all(|(name, matcher)| {
            query
                .iter()
                .any(|(k, v)| k == name && matcher.matches_value(v))
        });
        query_ok
            && pattern.headers.iter().all(|(name, matcher)| {
                self.headers
                    .iter()
                    .any(|(k, v)| k.eq_ignore_ascii_case(name) && matcher.matches_value(v))
            })
    }
}

/// URL-decode a query component, treating `+` as a space.
fn decode(component: &str) -> String {
    let component = component.replace('+', " ");
    urlencoding::decode(&component)
        .map(|s| s.into_owned())
        .unwrap_or(component)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_target() {
        let req = IncomingRequest::from_target(HttpMethod::Get, "/user/login?username=test&password=a%20b");
        assert_eq!(req.path, "/user/login");
        assert_eq!(req.url(), "/user/login?username=test&password=a%20b");
        assert_eq!(
            req.query_parameters(),
            vec![
                ("username".to_string(), "test".to_string()),
                ("password".to_string(), "a b".to_string())
            ]
        );

        let bare = IncomingRequest::from_target(HttpMethod::Get, "/user/?");
        assert_eq!(bare.query, None);
        assert_eq!(bare.url(), "/user/");
    }

    #[test]
    fn test_probe_carries_names() {
        let probe = IncomingRequest::from_target(HttpMethod::Get, "/a?x=1&flag")
            .with_header("Accept", "application/json")
            .to_probe();
        assert_eq!(probe.url.as_deref(), Some("/a?x=1&flag"));
        assert!(probe.query_parameters.contains_key("x"));
        assert!(probe.query_parameters.contains_key("flag"));
        assert!(probe.headers.contains_key("Accept"));
    }

    #[test]
    fn test_satisfies_values() {
        let pattern = CanonicalRequestPattern::new(HttpMethod::Get)
            .with_url_path("/items")
            .with_query_parameter("limit", ValueMatcher::Matches("[0-9]+".into()))
            .with_header("X-Api-Key", ValueMatcher::EqualTo("secret".into()));

        let ok = IncomingRequest::from_target(HttpMethod::Get, "/items?limit=10")
            .with_header("x-api-key", "secret");
        assert!(ok.satisfies_values(&pattern));

        let bad_value = IncomingRequest::from_target(HttpMethod::Get, "/items?limit=ten")
            .with_header("x-api-key", "secret");
        assert!(!bad_value.satisfies_values(&pattern));

        let missing_header = IncomingRequest::from_target(HttpMethod::Get, "/items?limit=10");
        assert!(!missing_header.satisfies_values(&pattern));
    }
}
