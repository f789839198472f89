//! Stub rules: a request pattern, the response it answers with, and a priority.
//!
//! Rules are immutable values. They are assembled with [`StubRuleBuilder`] and
//! only handed to the registry or the engine once fully built.

use super::pattern::CanonicalRequestPattern;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Priority of rules installed from the specification (checked last).
pub const FALLBACK_PRIORITY: u32 = u32::MAX;

/// Priority of rules answering with an example taken from the specification.
pub const EXAMPLE_PRIORITY: u32 = u32::MAX - 1;

/// Priority given to overrides that do not set one explicitly.
pub const DEFAULT_PRIORITY: u32 = 5;

pub const NOT_IMPLEMENTED_BODY: &str = "No mocked response defined yet";
pub const BAD_REQUEST_BODY: &str = "Invalid Request, missing mandatory parameter or header";

/// Response returned by a stub rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDefinition {
    pub status: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Body read from a file when the rule answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_file_name: Option<String>,
}

impl ResponseDefinition {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: None,
            body_file_name: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set an inline body, dropping any body file reference.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.body_file_name = None;
        self
    }

    pub fn with_body_file(mut self, file_name: impl Into<String>) -> Self {
        self.body_file_name = Some(file_name.into());
        self
    }

    /// Plain-text, non-cacheable response used by the generated rules.
    pub fn plain_text(status: u16, body: &str) -> Self {
        Self::new(status)
            .with_header("Content-Type", "text/plain")
            .with_header("Cache-Control", "no-cache")
            .with_body(body)
    }

    /// 501 answer of a declared operation nobody has mocked yet.
    pub fn not_implemented() -> Self {
        Self::plain_text(501, NOT_IMPLEMENTED_BODY)
    }

    /// 400 answer of a declared operation called without a mandatory parameter.
    pub fn bad_request() -> Self {
        Self::plain_text(400, BAD_REQUEST_BODY)
    }

    /// Header lookup, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A (pattern, response, priority) triple installed into the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StubRule {
    #[serde(rename = "request")]
    pub pattern: CanonicalRequestPattern,
    pub response: ResponseDefinition,
    #[serde(default = "default_priority")]
    pub priority: u32,
}

fn default_priority() -> u32 {
    DEFAULT_PRIORITY
}

impl StubRule {
    /// Start building a rule for `pattern`.
    pub fn builder(pattern: CanonicalRequestPattern) -> StubRuleBuilder {
        StubRuleBuilder {
            pattern,
            response: ResponseDefinition::new(200),
            priority: DEFAULT_PRIORITY,
        }
    }

    /// Builder pre-filled with this rule, for deriving an override.
    ///
    /// The priority is reset to the override default so the result wins over
    /// the generated rules.
    pub fn to_builder(&self) -> StubRuleBuilder {
        StubRuleBuilder {
            pattern: self.pattern.clone(),
            response: self.response.clone(),
            priority: DEFAULT_PRIORITY,
        }
    }
}

/// Assembles a [`StubRule`].
#[derive(Debug, Clone)]
pub struct StubRuleBuilder {
    pattern: CanonicalRequestPattern,
    response: ResponseDefinition,
    priority: u32,
}

impl StubRuleBuilder {
    pub fn will_return(mut self, response: ResponseDefinition) -> Self {
        self.response = response;
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.response.status = status;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.response = self.response.with_header(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.response = self.response.with_body(body);
        self
    }

    pub fn body_file(mut self, file_name: impl Into<String>) -> Self {
        self.response = self.response.with_body_file(file_name);
        self
    }

    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn build(self) -> StubRule {
        StubRule {
            pattern: self.pattern,
            response: self.response,
            priority: self.priority,
        }
    }
}
