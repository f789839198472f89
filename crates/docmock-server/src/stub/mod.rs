//! Stub compilation and request pattern matching.
//!
//! ## Module Structure
//!
//! - `pattern`: canonical request patterns and the path-template builder
//! - `matcher`: decides whether two patterns denote the same operation
//! - `rule`: immutable stub rules and their builder
//! - `compiler`: derives patterns and generated rules from a specification

mod compiler;
mod matcher;
mod pattern;
mod rule;

pub use compiler::{operation_pattern, CompiledOperation, StubCompiler};
pub use matcher::patterns_match;
pub use pattern::{
    canonical_pattern, has_path_parameters, path_parameter_names, template_to_regex, CanonicalRequestPattern, UrlExpression,
    UrlKind, ValueMatcher, OPTIONAL_QUERY_SUFFIX, PATH_PARAMETER_WILDCARD,
};
pub use rule::{
    ResponseDefinition, StubRule, StubRuleBuilder, BAD_REQUEST_BODY, DEFAULT_PRIORITY,
    EXAMPLE_PRIORITY, FALLBACK_PRIORITY, NOT_IMPLEMENTED_BODY,
};
