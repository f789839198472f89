//! Swagger 2.0 / OpenAPI 3.x documents.
//!
//! Only what stub compilation needs is read: paths, methods, operation ids,
//! path/query/header parameters (including local `$ref`s) and JSON response
//! examples. Body, form and cookie parameters are ignored.

use super::model::{
    ApiSpecification, ExampleResponse, HttpMethod, OperationDescriptor, Parameter, ParameterLocation,
};
use super::parser::{example_body, key_str, str_field};
use crate::error::SpecLoadError;
use serde_yaml::Value;
use tracing::{debug, warn};

const JSON: &str = "application/json";

pub(crate) fn parse(name: &str, doc: &Value) -> Result<ApiSpecification, SpecLoadError> {
    let info = doc.get("info");
    let mut spec = ApiSpecification {
        title: info.and_then(|i| str_field(i, "title")).map(str::to_string),
        version: info.and_then(|i| str_field(i, "version")).map(str::to_string),
        paths: Vec::new(),
    };

    let Some(paths) = doc.get("paths") else {
        warn!("No paths declared in '{}'", name);
        return Ok(spec);
    };
    let paths = paths
        .as_mapping()
        .ok_or_else(|| SpecLoadError::Parse(name.to_string(), "'paths' must be a mapping".into()))?;

    for (path, item) in paths {
        let Some(path) = key_str(path) else { continue };
        if !path.starts_with('/') {
            // vendor extensions (x-...) live next to paths
            continue;
        }
        let shared = parameters(doc, item.get("parameters"));

        for method in HttpMethod::ALL {
            let Some(operation) = item.get(method.spec_key()) else {
                continue;
            };
            let descriptor = operation_descriptor(doc, method, &path, operation, &shared);
            debug!(
                "Found operation {} [{}]:{}",
                descriptor.operation_id, method, path
            );
            spec.add_operation(descriptor);
        }
    }

    Ok(spec)
}

fn operation_descriptor(
    doc: &Value,
    method: HttpMethod,
    path: &str,
    operation: &Value,
    shared: &[Parameter],
) -> OperationDescriptor {
    let operation_id = str_field(operation, "operationId")
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| OperationDescriptor::derived_id(method, path));

    // Operation-level parameters override path-level ones with the same name and location
    let own = parameters(doc, operation.get("parameters"));
    let mut merged: Vec<Parameter> = shared
        .iter()
        .filter(|s| !own.iter().any(|o| o.name == s.name && o.location == s.location))
        .cloned()
        .collect();
    merged.extend(own);

    let mut descriptor = OperationDescriptor::new(operation_id, method, path);
    descriptor.parameters = merged;
    descriptor.summary = str_field(operation, "summary").map(str::to_string);
    descriptor.example = operation.get("responses").and_then(example_response);
    descriptor
}

fn parameters(doc: &Value, list: Option<&Value>) -> Vec<Parameter> {
    let Some(list) = list.and_then(Value::as_sequence) else {
        return Vec::new();
    };
    list.iter()
        .filter_map(|entry| resolve(doc, entry))
        .filter_map(parameter)
        .collect()
}

fn parameter(value: &Value) -> Option<Parameter> {
    let name = str_field(value, "name")?;
    let location = match str_field(value, "in")? {
        "path" => ParameterLocation::Path,
        "query" => ParameterLocation::Query,
        "header" => ParameterLocation::Header,
        _ => return None,
    };
    // Path parameters are always required
    let required =
        location == ParameterLocation::Path || value.get("required").and_then(Value::as_bool).unwrap_or(false);

    let schema = value.get("schema");
    let field = |key: &str| {
        str_field(value, key)
            .or_else(|| schema.and_then(|s| str_field(s, key)))
            .map(str::to_string)
    };

    Some(Parameter {
        name: name.to_string(),
        location,
        required,
        type_hint: field("type"),
        pattern: field("pattern"),
    })
}

/// Follow a local `$ref` (`#/parameters/x`, `#/components/parameters/x`).
fn resolve<'a>(doc: &'a Value, value: &'a Value) -> Option<&'a Value> {
    let Some(reference) = str_field(value, "$ref") else {
        return Some(value);
    };
    let Some(pointer) = reference.strip_prefix("#/") else {
        warn!("Ignoring non-local reference {}", reference);
        return None;
    };
    let target = pointer.split('/').try_fold(doc, |node, segment| {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        node.get(segment.as_str())
    });
    if target.is_none() {
        warn!("Unresolvable reference {}", reference);
    }
    target
}

/// First 2xx response carrying a JSON example.
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
        json_example(response).map(|body| ExampleResponse {
            status,
            content_type: JSON.to_string(),
            body,
        })
    })
}

fn json_example(response: &Value) -> Option<String> {
    // Swagger 2.0
    if let Some(example) = response.get("examples").and_then(|e| e.get(JSON)) {
        return example_body(example);
    }
    // OpenAPI 3.x
    let media = response.get("content").and_then(|c| c.get(JSON))?;
    if let Some(example) = media.get("example") {
        return example_body(example);
    }
    media
        .get("examples")
        .and_then(Value::as_mapping)
        .and_then(|examples| examples.values().find_map(|e| e.get("value")))
        .and_then(example_body)
}
