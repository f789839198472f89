//! Error types for the mock server.
//!
//! Configuration-time failures (`MockError`, `SpecLoadError`) are returned to
//! the caller and never leave the registry or the engine half-updated.
//! Request-time failures are turned into diagnostic HTTP responses by the
//! engine and never show up here.

use thiserror::Error;

/// Errors surfaced by the programmatic surface of the mock server.
#[derive(Debug, Error)]
pub enum MockError {
    #[error("Invalid argument: {0}")]
    Validation(String),
    #[error("Specified operation could not be found: {0}")]
    NotFound(String),
    #[error("Operation you attempt to stub ({0}) is not specified in specs")]
    Configuration(String),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    SpecLoad(#[from] SpecLoadError),
}

/// A request pattern could not be compared.
///
/// This is malformed input, not a "no match" outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("Received request pattern without proper URL to match")]
    NoUrlField,
    #[error("Invalid URL expression '{0}': {1}")]
    InvalidRegex(String, String),
}

/// Failures while loading a specification or a response override file.
#[derive(Debug, Error)]
pub enum SpecLoadError {
    #[error("Failed to read '{0}': {1}")]
    Io(String, #[source] std::io::Error),
    #[error("Failed to fetch '{0}': {1}")]
    Http(String, String),
    #[error("Failed to parse '{0}': {1}")]
    Parse(String, String),
    #[error("Unrecognized specification format for '{0}'")]
    UnknownFormat(String),
    #[error("Attempting to create stub for non existing operation ('{0}')")]
    UnknownOperation(String),
    #[error("Can't find body file {0}")]
    MissingBodyFile(String),
    #[error("Invalid response record #{0}: {1}")]
    InvalidRecord(usize, String),
}

/// Failures of the HTTP stub engine itself.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to bind {0}: {1}")]
    Bind(String, String),
}

pub type Result<T, E = MockError> = std::result::Result<T, E>;
