//! Contracts the harness consumes from external collaborators.
//!
//! Installation mechanics, pod enumeration and the health protocol live
//! outside the harness. Only these result contracts are relied upon, so each
//! collaborator can be swapped for a mock (see the `env-test-utils` crate).

use async_trait::async_trait;

use crate::config::TestContext;
use crate::error::Result;
use crate::types::{HealthStatus, PodStatus};

/// Installs and removes the system under test.
#[async_trait]
pub trait Installer: Send + Sync {
    /// Install the storage system described by `context`.
    ///
    /// `Ok(false)` means the installation ran but did not come up.
    async fn install(&self, context: &TestContext) -> Result<bool>;

    /// Remove everything `install` created.
    async fn uninstall(&self, context: &TestContext) -> Result<()>;

    /// Capture diagnostic logs for every pod in `namespace`.
    async fn gather_logs(&self, namespace: &str, test_name: &str) -> Result<()>;
}

/// Enumerates pods per role.
#[async_trait]
pub trait PodQuery: Send + Sync {
    /// List the pods labelled with `role` in `namespace`.
    async fn list_pods(&self, role: &str, namespace: &str) -> Result<Vec<PodStatus>>;
}

/// One health query against the cluster; retries are the caller's concern.
#[async_trait]
pub trait HealthQuery: Send + Sync {
    async fn query_health(&self) -> Result<HealthStatus>;
}
