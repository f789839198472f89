//! HTTP mock server generated from RAML and Swagger/OpenAPI specifications.
//!
//! Every operation declared in a specification is answered with
//! `501 No mocked response defined yet` until an override is published,
//! either programmatically through [`MockServer::when`] and
//! [`MockServer::stub_for`] or from a response override file.
//!
//! ## Module Structure
//!
//! - `spec` - Specification model, parsers and sources
//! - `stub` - Canonical patterns, matcher, rules and the stub compiler
//! - `registry` - Operation id and pattern lookups
//! - `engine` - Rule table and HTTP listener
//! - `loader` - Response override files
//! - `controller` - Stub lifecycle (`MockServer`)
//! - `config` - Server configuration file

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod loader;
pub mod registry;
pub mod spec;
pub mod stub;

pub use config::ServerConfig;
pub use controller::MockServer;
pub use engine::{HttpStubEngine, StubEngine, StubTable};
pub use error::{EngineError, MatchError, MockError, SpecLoadError};
pub use registry::OperationRegistry;
pub use stub::{ResponseDefinition, StubRule};
