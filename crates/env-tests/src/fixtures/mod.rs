//! Concrete collaborators for running against a live cluster.

pub mod command;
pub mod health_client;
pub mod installer;
pub mod kubectl;

pub use health_client::{ApiHealthClient, API_URL_ENV};
pub use installer::{InstallerConfig, ManifestInstaller};
pub use kubectl::{K8sHelper, DEFAULT_KUBECTL};
