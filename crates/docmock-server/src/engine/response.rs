//! Turning a matched rule (or the lack of one) into an HTTP answer.

use super::request::IncomingRequest;
use crate::stub::{ResponseDefinition, StubRule};
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Answer sent back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl RenderedResponse {
    pub fn plain_text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: Bytes::from(body.into()),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// 404 for a request no rule answers.
    pub fn not_found(request: &IncomingRequest) -> Self {
        Self::plain_text(404, format!("No mocked response found for {}", request.path))
    }
}

/// Where response bodies may be read from at answer time.
#[derive(Debug, Clone, Default)]
pub struct ResponseRenderer {
    /// Root relative `bodyFileName`s are resolved against.
    files_root: Option<PathBuf>,
    /// Directory tree of `<path>/response.<ext>` canned bodies.
    response_dir: Option<PathBuf>,
}

impl ResponseRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.files_root = Some(root.into());
        self
    }

    pub fn with_response_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.response_dir = Some(dir.into());
        self
    }

    /// Render the answer for `request`, matched or not.
    pub fn render(&self, rule: Option<&StubRule>, request: &IncomingRequest) -> RenderedResponse {
        match rule {
            Some(rule) => self.render_rule(&rule.response, request),
            None => RenderedResponse::not_found(request),
        }
    }

    fn render_rule(&self, response: &ResponseDefinition, request: &IncomingRequest) -> RenderedResponse {
        let headers: Vec<(String, String)> = response
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if let Some(canned) = self.canned_body(request) {
            return match canned {
                Ok(body) => RenderedResponse {
                    status: response.status,
                    headers,
                    body: Bytes::from(body),
                },
                Err(message) => RenderedResponse {
                    status: response.status,
                    headers: with_plain_text(headers),
                    body: Bytes::from(message),
                },
            };
        }

        if let Some(file_name) = &response.body_file_name {
            let path = self.resolve_body_file(file_name);
            return match std::fs::read(&path) {
                Ok(body) => RenderedResponse {
                    status: response.status,
                    headers,
                    body: Bytes::from(body),
                },
                Err(e) => {
                    warn!("Can't read body file {}: {}", path.display(), e);
                    RenderedResponse::plain_text(
                        500,
                        format!("Can't read body file {}: {}", file_name, e),
                    )
                }
            };
        }

        match &response.body {
            Some(body) => RenderedResponse {
                status: response.status,
                headers,
                body: Bytes::from(body.clone()),
            },
            // With a response directory, a rule without body means nothing was mocked
            None if self.response_dir.is_some() => RenderedResponse::not_found(request),
            None => RenderedResponse {
                status: response.status,
                headers,
                body: Bytes::new(),
            },
        }
    }

    fn resolve_body_file(&self, file_name: &str) -> PathBuf {
        match &self.files_root {
            Some(root) if Path::new(file_name).is_relative() => root.join(file_name),
            _ => PathBuf::from(file_name),
        }
    }

    /// Body of `<response_dir>/<path>/response.<ext>`, if that file exists.
    ///
    /// The extension follows the request content type. A file that exists
    /// but cannot be read yields the error message.
    fn canned_body(&self, request: &IncomingRequest) -> Option<Result<Vec<u8>, String>> {
        let dir = self.response_dir.as_ref()?;
        let relative = Path::new(request.path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            debug!("Ignoring canned response lookup for {}", request.path);
            return None;
        }

        let ext = extension_for(request.header("Content-Type"));
        let path = dir.join(relative).join(format!("response.{ext}"));
        if !path.exists() {
            return None;
        }
        debug!("Response defined for '{}' : {}", request.path, path.display());
        Some(std::fs::read(&path).map_err(|e| e.to_string()))
    }
}

/// Canned response file extension for a request content type.
fn extension_for(content_type: Option<&str>) -> &'static str {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .unwrap_or_default()
        .to_ascii_lowercase();
    match mime.as_str() {
        "application/json" => "json",
        "text/xml" | "application/xml" => "xml",
        "text/html" => "html",
        _ => "txt",
    }
}

fn with_plain_text(mut headers: Vec<(String, String)>) -> Vec<(String, String)> {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case("Content-Type"));
    headers.push(("Content-Type".to_string(), "text/plain".to_string()));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::HttpMethod;
    use crate::stub::canonical_pattern;
    use std::fs;

    fn get(target: &str) -> IncomingRequest {
        IncomingRequest::from_target(HttpMethod::Get, target)
    }

    fn rule(response: ResponseDefinition) -> StubRule {
        StubRule::builder(canonical_pattern(HttpMethod::Get, "/pets"))
            .will_return(response)
            .build()
    }

    #[test]
    fn test_not_found() {
        let response = ResponseRenderer::new().render(None, &get("/missing?x=1"));
        assert_eq!(response.status, 404);
        assert_eq!(response.body, Bytes::from("No mocked response found for /missing"));
        assert_eq!(response.header("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_inline_body() {
        let response = ResponseRenderer::new().render(
            Some(&rule(ResponseDefinition::new(201).with_header("X-Id", "7").with_body("ok"))),
            &get("/pets"),
        );
        assert_eq!(response.status, 201);
        assert_eq!(response.header("x-id"), Some("7"));
        assert_eq!(response.body, Bytes::from("ok"));
    }

    #[test]
    fn test_body_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pets.json"), "[]").unwrap();
        let renderer = ResponseRenderer::new().with_files_root(dir.path());

        let response = renderer.render(
            Some(&rule(ResponseDefinition::new(200).with_body_file("pets.json"))),
            &get("/pets"),
        );
        assert_eq!(response.body, Bytes::from("[]"));

        let response = renderer.render(
            Some(&rule(ResponseDefinition::new(200).with_body_file("gone.json"))),
            &get("/pets"),
        );
        assert_eq!(response.status, 500);
        assert!(String::from_utf8_lossy(&response.body).contains("gone.json"));
    }

    #[test]
    fn test_missing_body() {
        let empty = rule(ResponseDefinition::new(204));
        let response = ResponseRenderer::new().render(Some(&empty), &get("/pets"));
        assert_eq!(response.status, 204);
        assert!(response.body.is_empty());

        let dir = tempfile::tempdir().unwrap();
        let renderer = ResponseRenderer::new().with_response_dir(dir.path());
        let response = renderer.render(Some(&empty), &get("/pets"));
        assert_eq!(response.status, 404);
        assert_eq!(response.body, Bytes::from("No mocked response found for /pets"));
    }

    #[test]
    fn test_canned_response_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pets")).unwrap();
        fs::write(dir.path().join("pets/response.json"), r#"[{"name":"rex"}]"#).unwrap();
        fs::write(dir.path().join("pets/response.txt"), "rex").unwrap();
        let renderer = ResponseRenderer::new().with_response_dir(dir.path());
        let matched = rule(ResponseDefinition::new(200).with_header("Content-Type", "application/json").with_body("[]"));

        let response = renderer.render(
            Some(&matched),
            &get("/pets").with_header("Content-Type", "application/json; charset=utf-8"),
        );
        assert_eq!(response.status, 200);
        assert_eq!(response.body, Bytes::from(r#"[{"name":"rex"}]"#));

        let response = renderer.render(Some(&matched), &get("/pets"));
        assert_eq!(response.body, Bytes::from("rex"));

        let response = renderer.render(Some(&matched), &get("/pets").with_header("Content-Type", "text/html"));
        assert_eq!(response.body, Bytes::from("[]"));

        assert_eq!(renderer.render(None, &get("/pets")).status, 404);
    }

    #[test]
    fn test_unreadable_canned_response() {
        let dir = tempfile::tempdir().unwrap();
        // A directory named like the file exists but cannot be read as one
        fs::create_dir_all(dir.path().join("pets/response.txt")).unwrap();
        let renderer = ResponseRenderer::new().with_response_dir(dir.path());

        let response = renderer.render(Some(&rule(ResponseDefinition::not_implemented())), &get("/pets"));
        assert_eq!(response.status, 501);
        assert_eq!(response.header("Content-Type"), Some("text/plain"));
        assert!(!response.body.is_empty());
    }

    #[test]
    fn test_canned_lookup_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("response.txt"), "secret").unwrap();
        let renderer = ResponseRenderer::new().with_response_dir(dir.path().join("responses"));

        let response = renderer.render(Some(&rule(ResponseDefinition::new(200).with_body("ok"))), &get("/../"));
        assert_eq!(response.body, Bytes::from("ok"));
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for(Some("application/json")), "json");
        assert_eq!(extension_for(Some("TEXT/XML; charset=utf-8")), "xml");
        assert_eq!(extension_for(Some("text/html")), "html");
        assert_eq!(extension_for(Some("image/png")), "txt");
        assert_eq!(extension_for(None), "txt");
    }
}
