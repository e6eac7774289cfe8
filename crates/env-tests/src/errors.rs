//! Harness errors surfaced to the test-reporting layer.

use harness_common::error::{CollaboratorError, ConfigError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// Installation reported failure; teardown has already run.
    #[error("Setup failed for test {test}: {reason}")]
    SetupFailed { test: String, reason: String },

    /// Health polling exhausted its retry budget.
    #[error("Cluster did not become healthy after {attempts} attempts: {last_error}")]
    ConvergenceTimeout {
        attempts: u32,
        #[source]
        last_error: CollaboratorError,
    },

    /// One or more pod expectations did not hold.
    #[error("Pod expectations not met: {}", .0.join("; "))]
    ExpectationMismatch(Vec<String>),

    /// The test body panicked; teardown has already run.
    #[error("Unexpected panic occurred during test {test}: {message}")]
    Panicked { test: String, message: String },

    /// The API test client could not be created; teardown has already run.
    #[error("Cannot create API test client for test {test}: {reason}")]
    TestClientUnavailable { test: String, reason: String },

    #[error("Lifecycle manager was already torn down; create a new one for test {0}")]
    AlreadyTornDown(String),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
