//! Where a specification comes from.
//!
//! The stub compiler only sees an [`ApiSpecification`]; whether it was read
//! from a file, fetched over HTTP or declared in code is decided here.

use super::model::{ApiSpecification, OperationDescriptor};
use super::parser::parse_document;
use crate::error::SpecLoadError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// A capability producing a parsed specification.
#[async_trait]
pub trait SpecSource: Send + Sync {
    /// Human readable description used in logs.
    fn describe(&self) -> String;

    async fn load(&self) -> Result<ApiSpecification, SpecLoadError>;
}

/// RAML or Swagger/OpenAPI document on disk.
#[derive(Debug, Clone)]
pub struct FileSpec {
    path: PathBuf,
}

impl FileSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the document synchronously.
    pub fn load_blocking(&self) -> Result<ApiSpecification, SpecLoadError> {
        let name = self.path.display().to_string();
        if self.path.is_dir() {
            return Err(SpecLoadError::Io(
                name,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "is a directory"),
            ));
        }
        let text = std::fs::read_to_string(&self.path).map_err(|e| SpecLoadError::Io(name.clone(), e))?;
        let spec = parse_document(&name, &text)?;
        info!(
            "Loaded specification '{}' version '{}' from {}",
            spec.title.as_deref().unwrap_or("untitled"),
            spec.version.as_deref().unwrap_or("-"),
            name
        );
        Ok(spec)
    }
}

#[async_trait]
impl SpecSource for FileSpec {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    async fn load(&self) -> Result<ApiSpecification, SpecLoadError> {
        self.load_blocking()
    }
}

/// Document served over HTTP(S).
#[derive(Debug, Clone)]
pub struct UrlSpec {
    url: String,
    timeout: Duration,
}

impl UrlSpec {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SpecSource for UrlSpec {
    fn describe(&self) -> String {
        format!("url {}", self.url)
    }

    async fn load(&self) -> Result<ApiSpecification, SpecLoadError> {
        let http_error = |e: reqwest::Error| SpecLoadError::Http(self.url.clone(), e.to_string());

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(http_error)?;
        let response = client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_error)?;
        let text = response.text().await.map_err(http_error)?;

        let spec = parse_document(&self.url, &text)?;
        info!("Loaded specification from {}", self.url);
        Ok(spec)
    }
}

/// A type declaring API operations in code.
///
/// Implementors play the part annotated resource classes play in
/// reflection-based frameworks.
pub trait ApiResource {
    fn operations() -> Vec<OperationDescriptor>;
}

/// Specification assembled from [`ApiResource`] implementors.
#[derive(Debug, Clone, Default)]
pub struct DeclaredSpec {
    spec: ApiSpecification,
}

impl DeclaredSpec {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            spec: ApiSpecification::new(title),
        }
    }

    /// Add every operation declared by `R`.
    pub fn resource<R: ApiResource>(mut self) -> Self {
        for operation in R::operations() {
            self.spec.add_operation(operation);
        }
        self
    }

    pub fn operation(mut self, operation: OperationDescriptor) -> Self {
        self.spec.add_operation(operation);
        self
    }

    pub fn specification(&self) -> &ApiSpecification {
        &self.spec
    }
}

#[async_trait]
impl SpecSource for DeclaredSpec {
    fn describe(&self) -> String {
        format!(
            "declared resources '{}'",
            self.spec.title.as_deref().unwrap_or("untitled")
        )
    }

    async fn load(&self) -> Result<ApiSpecification, SpecLoadError> {
        if self.spec.paths.is_empty() {
            warn!("No operations declared. Make sure the resources are registered.");
        }
        Ok(self.spec.clone())
    }
}
