//! Error types shared across the player.
//!
//! Everything here is an *authoring* error: a scenario that names an
//! unknown action, points at code that is not there, or leaves out a
//! required parameter. These halt playback and are never retried.
//! Editor command failures ([`CommandError`]) are the exception and are
//! swallowed by the actions that run commands.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while dispatching or running a scenario step.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The step type is not registered.
    #[error("no such action: {0}")]
    UnknownAction(String),

    /// The step options do not deserialize into the action's option struct.
    #[error("invalid options for \"{action}\" action: {source}")]
    InvalidOptions {
        action: String,
        #[source]
        source: serde_json::Error,
    },

    /// A parameter the action cannot run without is missing.
    #[error("no {parameter} specified for \"{action}\" action")]
    MissingParameter {
        action: &'static str,
        parameter: &'static str,
    },

    /// A location descriptor could not be resolved.
    #[error(transparent)]
    Locate(#[from] LocateError),
}

/// Failure while resolving a location descriptor against the document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocateError {
    #[error("method or class \"{location}\" can not be found in source text:\n```\n{region}\n```")]
    LocationNotFound { location: String, region: String },

    #[error("signature of \"{location}\" can not be found")]
    SignatureNotFound { location: String },

    #[error(
        "text can not be found in {scope}source text. Searched for:\n```\n{query}\n```\n\n...inside:\n```\n{region}\n```"
    )]
    TextNotFound {
        scope: String,
        query: String,
        region: String,
    },

    #[error("method {location} has no parameters")]
    NoParameters { location: String },

    #[error("{place} of \"{location}\" can not be found")]
    PlaceNotFound { place: String, location: String },

    #[error("place \"{place}\" needs a location to be resolved against")]
    MissingLocation { place: String },

    #[error("block of \"{location}\" is never closed")]
    UnbalancedBlock { location: String },

    #[error("invalid position: {0}")]
    InvalidPosition(String),

    #[error("invalid search pattern: {0}")]
    InvalidPattern(String),
}

/// Failure of a named editor command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown editor command: {0}")]
    Unknown(String),

    #[error("{0} can not be applied at this position")]
    NotApplicable(&'static str),
}

/// Failure while loading a scenario or texts file.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scenario: {0}")]
    Parse(#[from] json5::Error),

    /// Valid JSON5 that does not have the expected shape.
    #[error("malformed scenario: {0}")]
    Shape(#[from] serde_json::Error),
}

pub type Result<T, E = PlayerError> = std::result::Result<T, E>;
