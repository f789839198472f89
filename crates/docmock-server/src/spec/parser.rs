//! Format detection and helpers shared by the RAML and Swagger parsers.

use super::model::ApiSpecification;
use super::{raml, swagger};
use crate::error::SpecLoadError;
use serde_yaml::Value;
use tracing::debug;

/// Document formats a specification can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Raml,
    /// Swagger 2.0 or OpenAPI 3.x
    Swagger,
}

impl SpecFormat {
    /// Detect the format of a document from its name and parsed content.
    pub fn detect(name: &str, text: &str, doc: &Value) -> Option<Self> {
        if text.trim_start().starts_with("#%RAML") || name.to_ascii_lowercase().ends_with(".raml") {
            return Some(SpecFormat::Raml);
        }
        if doc.get("swagger").is_some() || doc.get("openapi").is_some() {
            return Some(SpecFormat::Swagger);
        }
        None
    }
}

/// Parse a RAML or Swagger/OpenAPI document (YAML or JSON).
///
/// `name` is only used for format detection and error messages.
pub fn parse_document(name: &str, text: &str) -> Result<ApiSpecification, SpecLoadError> {
    let doc: Value =
        serde_yaml::from_str(text).map_err(|e| SpecLoadError::Parse(name.to_string(), e.to_string()))?;

    match SpecFormat::detect(name, text, &doc) {
        Some(SpecFormat::Raml) => {
            debug!("Parsing '{}' as RAML", name);
            raml::parse(name, text, &doc)
        }
        Some(SpecFormat::Swagger) => {
            debug!("Parsing '{}' as Swagger/OpenAPI", name);
            swagger::parse(name, &doc)
        }
        None => Err(SpecLoadError::UnknownFormat(name.to_string())),
    }
}

/// Mapping key as a string (YAML allows numeric keys such as response codes).
pub(crate) fn key_str(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Render an example value as a response body.
///
/// Strings are used verbatim, structured values are serialized as JSON.
pub(crate) fn example_body(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => serde_json::to_string(other).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_raml_by_header() {
        let text = "#%RAML 0.8\ntitle: Users\n";
        let doc: Value = serde_yaml::from_str(text).unwrap();
        assert_eq!(SpecFormat::detect("api.yaml", text, &doc), Some(SpecFormat::Raml));
    }

    #[test]
    fn test_detect_swagger_json() {
        let text = r#"{"swagger": "2.0", "paths": {}}"#;
        let doc: Value = serde_yaml::from_str(text).unwrap();
        assert_eq!(SpecFormat::detect("api.json", text, &doc), Some(SpecFormat::Swagger));
    }

    #[test]
    fn test_unknown_format() {
        let err = parse_document("notes.yaml", "hello: world\n").unwrap_err();
        assert!(matches!(err, SpecLoadError::UnknownFormat(_)));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = parse_document("broken.yaml", "paths: [unclosed").unwrap_err();
        assert!(matches!(err, SpecLoadError::Parse(_, _)));
    }

    #[test]
    fn test_example_body() {
        let value: Value = serde_yaml::from_str("{name: rex, age: 3}").unwrap();
        assert_eq!(example_body(&value).as_deref(), Some(r#"{"name":"rex","age":3}"#));
        assert_eq!(
            example_body(&Value::String("plain".into())).as_deref(),
            Some("plain")
        );
        assert_eq!(example_body(&Value::Null), None);
    }
}
