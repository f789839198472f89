//! Stub compilation: derive patterns and generated rules from a specification.

use super::pattern::{canonical_pattern, CanonicalRequestPattern, ValueMatcher};
use super::rule::{
    ResponseDefinition, StubRule, EXAMPLE_PRIORITY, FALLBACK_PRIORITY,
};
use crate::spec::{ApiSpecification, OperationDescriptor};
use tracing::{debug, info, warn};

/// Everything the stub compiler derives for one declared operation.
#[derive(Debug, Clone)]
pub struct CompiledOperation {
    pub descriptor: OperationDescriptor,
    /// Pattern identifying the operation, with its mandatory parameters.
    pub pattern: CanonicalRequestPattern,
    /// The 501 "not implemented" rule, returned by `when(operationId)`.
    pub default_rule: StubRule,
    pub bad_request_rule: Option<StubRule>,
    pub example_rule: Option<StubRule>,
}

impl CompiledOperation {
    /// Rules of the operation. The engine orders them itself: the default
    /// rule carries the mandatory parameters, so it is tried before the
    /// unconstrained bad-request rule.
    pub fn rules(&self) -> impl Iterator<Item = &StubRule> {
        self.bad_request_rule
            .iter()
            .chain(std::iter::once(&self.default_rule))
            .chain(self.example_rule.iter())
    }
}

/// Compiles parsed specifications into stub rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubCompiler;

impl StubCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile every declared operation of `spec`.
    pub fn compile(&self, spec: &ApiSpecification) -> Vec<CompiledOperation> {
        if spec.paths.is_empty() {
            warn!("No operations found in specification");
            return Vec::new();
        }

        let mut compiled = Vec::with_capacity(spec.operation_count());
        for item in &spec.paths {
            debug!("Processing operation(s) at path {}", item.path);
            for operation in &item.operations {
                compiled.push(self.compile_operation(operation));
            }
        }
        compiled
    }

    /// Compile a single operation.
    pub fn compile_operation(&self, operation: &OperationDescriptor) -> CompiledOperation {
        info!(
            "Creating stub for [{}]:{} ({})",
            operation.method, operation.path_template, operation.operation_id
        );

        let pattern = operation_pattern(operation);

        let default_rule = StubRule::builder(pattern.clone())
            .will_return(ResponseDefinition::not_implemented())
            .priority(FALLBACK_PRIORITY)
            .build();

        let bad_request_rule = operation.has_mandatory_parameters().then(|| {
            debug!(
                "Creating default response for bad request [{}]:{}",
                operation.method, operation.path_template
            );
            StubRule::builder(pattern.without_constraints())
                .will_return(ResponseDefinition::bad_request())
                .priority(FALLBACK_PRIORITY)
                .build()
        });

        let example_rule = operation.example.as_ref().map(|example| {
            debug!(
                "Using {} example for [{}]:{}",
                example.status, operation.method, operation.path_template
            );
            StubRule::builder(pattern.clone())
                .will_return(
                    ResponseDefinition::new(example.status)
                        .with_header("Content-Type", example.content_type.as_str())
                        .with_body(example.body.as_str()),
                )
                .priority(EXAMPLE_PRIORITY)
                .build()
        });

        CompiledOperation {
            descriptor: operation.clone(),
            pattern,
            default_rule,
            bad_request_rule,
            example_rule,
        }
    }
}

/// Canonical pattern of an operation with its mandatory query parameters and headers.
pub fn operation_pattern(operation: &OperationDescriptor) -> CanonicalRequestPattern {
    let pattern = canonical_pattern(operation.method, &operation.path_template);
    let pattern = operation
        .required_query_parameters()
        .fold(pattern, |p, param| {
            p.with_query_parameter(param.name.as_str(), ValueMatcher::any())
        });
    operation
        .required_headers()
        .fold(pattern, |p, param| p.with_header(param.name.as_str(), ValueMatcher::any()))
}
