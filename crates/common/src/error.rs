//! Common error types for the test harness.

use thiserror::Error;

/// Invalid test configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A value could not be parsed from its environment variable
    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    /// A required field was empty
    #[error("Missing required setting: {0}")]
    Missing(String),

    /// The retry budget must allow at least one attempt
    #[error("Retry attempts must be at least 1")]
    ZeroAttempts,
}

/// Errors reported by external collaborators (kubectl, helm, health endpoint).
#[derive(Error, Debug)]
pub enum CollaboratorError {
    /// The collaborator process could not be started
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The collaborator process exited unsuccessfully
    #[error("{program} exited with status {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: i32,
        stderr: String,
    },

    /// Collaborator output could not be parsed
    #[error("Failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// Local filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Health endpoint request failed
    #[error("Health request failed: {0}")]
    Http(String),

    /// An expected cluster resource is absent or incomplete
    #[error("Missing cluster resource: {0}")]
    MissingResource(String),

    /// The cluster answered but is not healthy
    #[error("Cluster is not healthy: {0}")]
    Unhealthy(String),
}

/// Result type alias for collaborator operations
pub type Result<T> = std::result::Result<T, CollaboratorError>;
