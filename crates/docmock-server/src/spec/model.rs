//! In-memory model of a parsed API specification.
//!
//! Both the RAML and the Swagger/OpenAPI parsers produce this model, as does
//! an in-code `DeclaredSpec`. Nothing downstream knows which format a
//! specification came from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HTTP methods an operation can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    /// Methods in the order a specification path item is traversed.
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Key used for this method inside RAML and Swagger documents.
    pub fn spec_key(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Put => "put",
            HttpMethod::Post => "post",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unsupported HTTP method '{s}'"))
    }
}

/// Where a parameter is carried in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
}

/// A declared operation parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, location: ParameterLocation, required: bool) -> Self {
        Self {
            name: name.into(),
            location,
            required,
            type_hint: None,
            pattern: None,
        }
    }

    pub fn with_type(mut self, type_hint: impl Into<String>) -> Self {
        self.type_hint = Some(type_hint.into());
        self
    }
}

/// Example response declared alongside an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

/// A single (method, path) endpoint declared in a specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    pub operation_id: String,
    pub method: HttpMethod,
    pub path_template: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<ExampleResponse>,
}

impl OperationDescriptor {
    pub fn new(
        operation_id: impl Into<String>,
        method: HttpMethod,
        path_template: impl Into<String>,
    ) -> Self {
        Self {
            operation_id: operation_id.into(),
            method,
            path_template: path_template.into(),
            parameters: Vec::new(),
            summary: None,
            example: None,
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_example(mut self, example: ExampleResponse) -> Self {
        self.example = Some(example);
        self
    }

    /// Id used when a document does not name the operation.
    pub fn derived_id(method: HttpMethod, path: &str) -> String {
        format!("{method} {path}")
    }

    pub fn required_query_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.required_in(ParameterLocation::Query)
    }

    pub fn required_headers(&self) -> impl Iterator<Item = &Parameter> {
        self.required_in(ParameterLocation::Header)
    }

    fn required_in(&self, location: ParameterLocation) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .filter(move |p| p.required && p.location == location)
    }

    /// Whether a request can be rejected for a missing query parameter or header
    pub fn has_mandatory_parameters(&self) -> bool {
        self.required_query_parameters().next().is_some() || self.required_headers().next().is_some()
    }
}

/// All operations declared under one path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathItem {
    pub path: String,
    pub operations: Vec<OperationDescriptor>,
}

/// A parsed specification: `path → method → operation`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSpecification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub paths: Vec<PathItem>,
}

impl ApiSpecification {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            version: None,
            paths: Vec::new(),
        }
    }

    /// Add an operation, grouping it with operations already declared on the same path.
    pub fn add_operation(&mut self, operation: OperationDescriptor) {
        match self
            .paths
            .iter_mut()
            .find(|item| item.path == operation.path_template)
        {
            Some(item) => item.operations.push(operation),
            None => self.paths.push(PathItem {
                path: operation.path_template.clone(),
                operations: vec![operation],
            }),
        }
    }

    pub fn operations(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.paths.iter().flat_map(|item| item.operations.iter())
    }

    pub fn operation_count(&self) -> usize {
        self.paths.iter().map(|item| item.operations.len()).sum()
    }
}
