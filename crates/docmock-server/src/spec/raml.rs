//! RAML 0.8 / 1.0 documents.
//!
//! Resources are nested mapping keys starting with `/`. Methods carry
//! `queryParameters` and `headers`; resources carry `uriParameters`.
//! Resource types and traits are not expanded.

use super::model::{
    ApiSpecification, ExampleResponse, HttpMethod, OperationDescriptor, Parameter, ParameterLocation,
};
use super::parser::{example_body, key_str, str_field};
use crate::error::SpecLoadError;
use crate::stub::path_parameter_names;
use serde_yaml::Value;
use tracing::debug;

const JSON: &str = "application/json";

/// RAML versions differ in the default of `required` for named parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RamlVersion {
    V08,
    V10,
}

impl RamlVersion {
    fn from_header(text: &str) -> Self {
        let header = text.trim_start().lines().next().unwrap_or_default();
        if header.starts_with("#%RAML 0.8") {
            RamlVersion::V08
        } else {
            RamlVersion::V10
        }
    }

    fn required_by_default(&self) -> bool {
        matches!(self, RamlVersion::V10)
    }
}

pub(crate) fn parse(name: &str, text: &str, doc: &Value) -> Result<ApiSpecification, SpecLoadError> {
    let root = doc
        .as_mapping()
        .ok_or_else(|| SpecLoadError::Parse(name.to_string(), "RAML root must be a mapping".into()))?;

    let version = RamlVersion::from_header(text);
    let mut spec = ApiSpecification {
        title: str_field(doc, "title").map(str::to_string),
        version: doc.get("version").and_then(key_str),
        paths: Vec::new(),
    };

    let walker = ResourceWalker { version };
    for (key, resource) in root {
        if let Some(segment) = key_str(key).filter(|k| k.starts_with('/')) {
            walker.walk(&mut spec, &segment, resource, &[]);
        }
    }

    Ok(spec)
}

struct ResourceWalker {
    version: RamlVersion,
}

impl ResourceWalker {
    fn walk(&self, spec: &mut ApiSpecification, path: &str, resource: &Value, inherited: &[Parameter]) {
        debug!("Processing RAML resource {}", path);

        let mut uri_parameters: Vec<Parameter> = inherited.to_vec();
        uri_parameters.extend(
            self.named_parameters(resource.get("uriParameters"), ParameterLocation::Path)
                .into_iter()
                .map(|mut p| {
                    p.required = true;
                    p
                }),
        );
        // Placeholders without an explicit declaration are still path parameters
        for name in path_parameter_names(path) {
            if !uri_parameters.iter().any(|p| p.name == name) {
                uri_parameters.push(Parameter::new(name, ParameterLocation::Path, true));
            }
        }

        for method in HttpMethod::ALL {
            let Some(action) = resource.get(method.spec_key()) else {
                continue;
            };
            spec.add_operation(self.operation(method, path, action, &uri_parameters));
        }

        let Some(children) = resource.as_mapping() else {
            return;
        };
        for (key, child) in children {
            if let Some(segment) = key_str(key).filter(|k| k.starts_with('/')) {
                let child_path = format!("{}{}", path.trim_end_matches('/'), segment);
                self.walk(spec, &child_path, child, &uri_parameters);
            }
        }
    }

    fn operation(
        &self,
        method: HttpMethod,
        path: &str,
        action: &Value,
        uri_parameters: &[Parameter],
    ) -> OperationDescriptor {
        let operation_id = str_field(action, "displayName")
            .filter(|id| !id.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| OperationDescriptor::derived_id(method, path));

        let mut descriptor = OperationDescriptor::new(operation_id, method, path);
        descriptor.parameters = uri_parameters
            .iter()
            .filter(|p| path.contains(&format!("{{{}}}", p.name)))
            .cloned()
            .collect();
        descriptor
            .parameters
            .extend(self.named_parameters(action.get("queryParameters"), ParameterLocation::Query));
        descriptor
            .parameters
            .extend(self.named_parameters(action.get("headers"), ParameterLocation::Header));
        descriptor.summary = str_field(action, "description").map(str::to_string);
        descriptor.example = action.get("responses").and_then(example_response);
        descriptor
    }

    /// Parse a RAML named-parameter mapping (`name: {type, required, pattern}`).
    fn named_parameters(&self, section: Option<&Value>, location: ParameterLocation) -> Vec<Parameter> {
        let Some(section) = section.and_then(Value::as_mapping) else {
            return Vec::new();
        };

        section
            .iter()
            .filter_map(|(key, declaration)| {
                let raw = key_str(key)?;
                // RAML 1.0: a trailing `?` marks an optional parameter
                let (name, optional) = match raw.strip_suffix('?') {
                    Some(stripped) => (stripped.to_string(), true),
                    None => (raw, false),
                };

                let required = if optional {
                    false
                } else {
                    declaration
                        .get("required")
                        .and_then(Value::as_bool)
                        .unwrap_or(self.version.required_by_default())
                };

                // RAML 1.0 shorthand: `limit: integer`
                let type_hint = declaration
                    .as_str()
                    .or_else(|| str_field(declaration, "type"))
                    .map(str::to_string);

                Some(Parameter {
                    name,
                    location,
                    required,
                    type_hint,
                    pattern: str_field(declaration, "pattern").map(str::to_string),
                })
            })
            .collect()
    }
}

/// First 2xx response with an `application/json` example.
fn example_response(responses: &Value) -> Option<ExampleResponse> {
    let responses = responses.as_mapping()?;
    let mut candidates: Vec<(u16, &Value)> = responses
        .iter()
        .filter_map(|(code, response)| {
            let status: u16 = key_str(code)?.parse().ok()?;
            (200..300).contains(&status).then_some((status, response))
        })
        .collect();
    candidates.sort_by_key(|(status, _)| *status);

    candidates.into_iter().find_map(|(status, response)| {
        let example = response.get("body")?.get(JSON)?.get("example")?;
        example_body(example).map(|body| ExampleResponse {
            status,
            content_type: JSON.to_string(),
            body,
        })
    })
}
