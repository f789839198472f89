//! Stub lifecycle controller.
//!
//! `MockServer` owns the operation registry and publishes rules to a
//! [`StubEngine`]. Registry snapshots are immutable and swapped in whole;
//! writers are serialized, readers never block.

use crate::config::ServerConfig;
use crate::engine::{HttpStubEngine, ResponseRenderer, StubEngine};
use crate::error::{MockError, Result};
use crate::loader::OverrideLoader;
use crate::registry::OperationRegistry;
use crate::spec::{ApiSpecification, FileSpec, OperationDescriptor, SpecSource, UrlSpec};
use crate::stub::{CanonicalRequestPattern, StubCompiler, StubRule};
use anyhow::Context;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Mock server driven by an API specification.
pub struct MockServer {
    registry: ArcSwap<OperationRegistry>,
    engine: Arc<dyn StubEngine>,
    compiler: StubCompiler,
    overrides: OverrideLoader,
    /// Serializes registry and engine updates.
    writer: Mutex<()>,
}

impl MockServer {
    /// Controller with an empty registry publishing to `engine`.
    pub fn new(engine: Arc<dyn StubEngine>) -> Self {
        Self {
            registry: ArcSwap::from_pointee(OperationRegistry::new()),
            engine,
            compiler: StubCompiler::new(),
            overrides: OverrideLoader::new(),
            writer: Mutex::new(()),
        }
    }

    pub fn with_override_loader(mut self, loader: OverrideLoader) -> Self {
        self.overrides = loader;
        self
    }

    /// Load a specification from `source` and create its stubs.
    pub async fn from_source(source: &dyn SpecSource, engine: Arc<dyn StubEngine>) -> Result<Self> {
        info!("Loading specification from {}", source.describe());
        let spec = source.load().await?;
        let server = Self::new(engine);
        server.create_stubs(&spec);
        Ok(server)
    }

    /// Start an HTTP engine and load the configured specification and overrides.
    pub async fn launch(config: &ServerConfig) -> anyhow::Result<(Self, Arc<HttpStubEngine>)> {
        config.validate()?;

        let mut renderer = ResponseRenderer::new();
        if let Some(root) = &config.files_root {
            renderer = renderer.with_files_root(root);
        }
        if let Some(dir) = &config.response_dir {
            renderer = renderer.with_response_dir(dir);
        }
        let engine = Arc::new(HttpStubEngine::start(&config.host, config.port, renderer).await?);

        let source: Box<dyn SpecSource> = match (&config.spec, &config.spec_url) {
            (Some(path), _) => Box::new(FileSpec::new(path)),
            (None, Some(url)) => Box::new(UrlSpec::new(url)),
            (None, None) => anyhow::bail!("No specification configured"),
        };

        let mut loader = OverrideLoader::new();
        if let Some(root) = &config.files_root {
            loader = loader.with_files_root(root);
        }
        let server = Self::from_source(source.as_ref(), engine.clone())
            .await?
            .with_override_loader(loader);

        if let Some(responses) = &config.responses {
            server
                .load_responses(responses)
                .with_context(|| format!("Failed to load responses from {}", responses.display()))?;
        }

        Ok((server, engine))
    }

    /// Replace every operation and generated rule with those of `spec`.
    ///
    /// Returns the number of operations found. Overrides published earlier
    /// are dropped as well.
    pub fn create_stubs(&self, spec: &ApiSpecification) -> usize {
        let compiled = self.compiler.compile(spec);
        let registry = OperationRegistry::from_compiled(&compiled);
        let rules: Vec<StubRule> = compiled
            .iter()
            .flat_map(|operation| operation.rules().cloned())
            .collect();

        let _guard = self.writer.lock();
        self.engine.replace_rules(rules);
        self.registry.store(Arc::new(registry));
        info!("Created stubs for {} operation(s)", compiled.len());
        compiled.len()
    }

    /// The generated rule of `operation_id`, as a starting point for an override.
    pub fn when(&self, operation_id: &str) -> Result<StubRule> {
        if operation_id.trim().is_empty() {
            return Err(MockError::Validation("operationId must not be blank".into()));
        }
        let registry = self.registry.load();
        registry.lookup_by_id(operation_id).cloned()
    }

    /// Publish an override rule.
    ///
    /// The rule's pattern must address a declared operation; otherwise the
    /// engine is left untouched.
    pub fn stub_for(&self, rule: StubRule) -> Result<()> {
        let _guard = self.writer.lock();
        let registry = self.registry.load();
        let operation = registry
            .lookup_by_pattern(&rule.pattern)?
            .ok_or_else(|| MockError::Configuration(rule.pattern.to_string()))?;
        debug!(
            "Publishing override for {} with priority {}",
            operation.operation_id, rule.priority
        );
        self.engine.add_rule(rule);
        Ok(())
    }

    /// Load a response override file and publish all of its records.
    ///
    /// Nothing is published unless every record addresses a declared
    /// operation. Returns the number of published rules.
    pub fn load_responses(&self, path: &Path) -> Result<usize> {
        let _guard = self.writer.lock();
        let registry = self.registry.load();
        let rules = self.overrides.load_file(path, &registry)?;
        let count = rules.len();
        self.engine.add_rules(rules);
        Ok(count)
    }

    /// The declared operation `pattern` resolves to.
    pub fn operation_for(&self, pattern: &CanonicalRequestPattern) -> Result<Option<OperationDescriptor>> {
        let registry = self.registry.load();
        Ok(registry.lookup_by_pattern(pattern)?.cloned())
    }

    /// Forget every operation and rule.
    pub fn reset(&self) {
        let _guard = self.writer.lock();
        self.engine.reset();
        self.registry.store(Arc::new(OperationRegistry::new()));
        info!("Mock server reset");
    }

    /// Stop the engine. Safe to call repeatedly.
    pub fn shutdown(&self) {
        self.engine.shutdown();
    }

    /// Current registry snapshot.
    pub fn registry(&self) -> Arc<OperationRegistry> {
        self.registry.load_full()
    }

    pub fn engine(&self) -> &Arc<dyn StubEngine> {
        &self.engine
    }
}
