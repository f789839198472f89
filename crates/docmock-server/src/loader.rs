//! Response override files.
//!
//! An override file is a JSON array of stub records (or an object with a
//! `mappings` array):
//!
//! ```json
//! [
//!   {
//!     "request": { "method": "GET", "urlPath": "/hello" },
//!     "response": { "status": 200, "jsonBody": { "msg": "hi" } },
//!     "priority": 1
//!   }
//! ]
//! ```
//!
//! Every record must address a declared operation. Records are validated
//! and their body files inlined before any of them is returned, so a bad
//! file never results in a partial set of overrides.

use crate::error::SpecLoadError;
use crate::registry::OperationRegistry;
use crate::stub::{CanonicalRequestPattern, ResponseDefinition, StubRule, DEFAULT_PRIORITY};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OverrideFile {
    Records(Vec<OverrideRecord>),
    Mappings { mappings: Vec<OverrideRecord> },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OverrideRecord {
    request: CanonicalRequestPattern,
    #[serde(default)]
    response: ResponseRecord,
    priority: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseRecord {
    status: Option<u16>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    body: Option<String>,
    json_body: Option<serde_json::Value>,
    body_file_name: Option<String>,
}

/// Reads override files and turns them into stub rules.
#[derive(Debug, Clone, Default)]
pub struct OverrideLoader {
    files_root: Option<PathBuf>,
}

impl OverrideLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory `bodyFileName`s are resolved against.
    ///
    /// Defaults to the directory of the override file.
    pub fn with_files_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.files_root = Some(root.into());
        self
    }

    /// Load `path` and validate every record against `registry`.
    pub fn load_file(
        &self,
        path: &Path,
        registry: &OperationRegistry,
    ) -> Result<Vec<StubRule>, SpecLoadError> {
        let name = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| SpecLoadError::Io(name.clone(), e))?;
        let root = self
            .files_root
            .clone()
            .or_else(|| path.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        let rules = self.parse(&name, &text, &root, registry)?;
        info!("Loaded {} response override(s) from {}", rules.len(), name);
        Ok(rules)
    }

    /// Parse override records from `text`.
    pub fn load_str(
        &self,
        name: &str,
        text: &str,
        registry: &OperationRegistry,
    ) -> Result<Vec<StubRule>, SpecLoadError> {
        let root = self.files_root.clone().unwrap_or_default();
        self.parse(name, text, &root, registry)
    }

    fn parse(
        &self,
        name: &str,
        text: &str,
        files_root: &Path,
        registry: &OperationRegistry,
    ) -> Result<Vec<StubRule>, SpecLoadError> {
        let file: OverrideFile =
            serde_json::from_str(text).map_err(|e| SpecLoadError::Parse(name.to_string(), e.to_string()))?;
        let records = match file {
            OverrideFile::Records(records) => records,
            OverrideFile::Mappings { mappings } => mappings,
        };

        records
            .into_iter()
            .enumerate()
            .map(|(index, record)| to_rule(index, record, files_root, registry))
            .collect()
    }
}

fn to_rule(
    index: usize,
    record: OverrideRecord,
    files_root: &Path,
    registry: &OperationRegistry,
) -> Result<StubRule, SpecLoadError> {
    let operation = registry
        .lookup_by_pattern(&record.request)
        .map_err(|e| SpecLoadError::InvalidRecord(index, e.to_string()))?
        .ok_or_else(|| SpecLoadError::UnknownOperation(record.request.to_string()))?;
    debug!(
        "Override #{} addresses operation {}",
        index, operation.operation_id
    );

    let response = response_definition(index, record.response, files_root)?;
    Ok(StubRule::builder(record.request)
        .will_return(response)
        .priority(record.priority.unwrap_or(DEFAULT_PRIORITY))
        .build())
}

fn response_definition(
    index: usize,
    record: ResponseRecord,
    files_root: &Path,
) -> Result<ResponseDefinition, SpecLoadError> {
    let mut response = ResponseDefinition::new(record.status.unwrap_or(200));
    for (name, value) in record.headers {
        response = response.with_header(name, value);
    }

    let body = match (record.body, record.json_body, record.body_file_name) {
        (Some(body), None, None) => Some(body),
        (None, Some(json), None) => {
            if response.header("Content-Type").is_none() {
                response = response.with_header("Content-Type", "application/json");
            }
            Some(json.to_string())
        }
        (None, None, Some(file_name)) => Some(read_body_file(files_root, &file_name)?),
        (None, None, None) => None,
        _ => {
            return Err(SpecLoadError::InvalidRecord(
                index,
                "only one of body, jsonBody and bodyFileName may be set".into(),
            ))
        }
    };

    Ok(match body {
        Some(body) => response.with_body(body),
        None => response,
    })
}

/// Inline a body file so later changes to the file do not leak into answers.
fn read_body_file(files_root: &Path, file_name: &str) -> Result<String, SpecLoadError> {
    let path = files_root.join(file_name);
    info!("Reading response body from {}", path.display());
    std::fs::read_to_string(&path).map_err(|_| SpecLoadError::MissingBodyFile(file_name.to_string()))
}
