//! Operation registry: maps operation ids to their stub rule and request
//! patterns back to the declared operation.
//!
//! A registry is built once per specification and then shared read-only;
//! rebuilding means building a fresh registry and swapping it in (see
//! `MockServer`). `register` and `reset` therefore only ever run on a value
//! nobody else can observe yet.

use crate::error::{MatchError, MockError};
use crate::spec::OperationDescriptor;
use crate::stub::{patterns_match, CanonicalRequestPattern, CompiledOperation, StubRule};
use std::collections::HashMap;
use tracing::debug;

/// Operation id → rule and pattern → operation mappings.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    by_id: HashMap<String, StubRule>,
    /// Registration order is lookup order.
    by_pattern: Vec<(CanonicalRequestPattern, OperationDescriptor)>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry holding every compiled operation.
    pub fn from_compiled(compiled: &[CompiledOperation]) -> Self {
        let mut registry = Self::new();
        for operation in compiled {
            registry.register(
                operation.descriptor.clone(),
                operation.pattern.clone(),
                operation.default_rule.clone(),
            );
        }
        registry
    }

    /// Register an operation.
    ///
    /// A rule already registered under the same operation id is replaced.
    /// Patterns are not required to be unique.
    pub fn register(
        &mut self,
        descriptor: OperationDescriptor,
        pattern: CanonicalRequestPattern,
        rule: StubRule,
    ) {
        debug!(
            "Adding operation {} for request {}",
            descriptor.operation_id, pattern
        );
        self.by_id.insert(descriptor.operation_id.clone(), rule);
        self.by_pattern.push((pattern, descriptor));
    }

    /// Rule registered for `operation_id`.
    pub fn lookup_by_id(&self, operation_id: &str) -> Result<&StubRule, MockError> {
        self.by_id
            .get(operation_id)
            .ok_or_else(|| MockError::NotFound(operation_id.to_string()))
    }

    /// First registered operation whose pattern matches `probe`.
    pub fn lookup_by_pattern(
        &self,
        probe: &CanonicalRequestPattern,
    ) -> Result<Option<&OperationDescriptor>, MatchError> {
        for (pattern, descriptor) in &self.by_pattern {
            if patterns_match(pattern, probe)? {
                return Ok(Some(descriptor));
            }
        }
        debug!("No matching operation found for {}", probe);
        Ok(None)
    }

    /// Remove every registration.
    pub fn reset(&mut self) {
        self.by_id.clear();
        self.by_pattern.clear();
    }

    pub fn contains(&self, operation_id: &str) -> bool {
        self.by_id.contains_key(operation_id)
    }

    /// Registered operation ids, sorted.
    pub fn operation_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.by_id.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn operations(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.by_pattern.iter().map(|(_, descriptor)| descriptor)
    }

    /// Number of distinct operation ids.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty() && self.by_pattern.is_empty()
    }
}
