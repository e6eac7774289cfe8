//! Test run configuration.
//!
//! `TestContext` describes the cluster a test installs and `RetryPolicy` the
//! convergence budget used while waiting for it. Both load from environment
//! variables with defaults, and `TestContext` can also be assembled with
//! named setters through [`TestContextBuilder`].

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::StoreType;

/// Default namespace the operator and agents run in.
pub const DEFAULT_OPERATOR_NAMESPACE: &str = "rook-system";

/// Default namespace the storage cluster runs in.
pub const DEFAULT_CLUSTER_NAMESPACE: &str = "rook";

/// Default host path for persisted cluster data.
pub const DEFAULT_DATA_DIR_HOST_PATH: &str = "/var/lib/rook";

/// Default number of monitor replicas.
pub const DEFAULT_MON_COUNT: usize = 3;

/// Default number of health polling attempts.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 60;

/// Default pause between health polling attempts in seconds.
pub const DEFAULT_RETRY_INTERVAL_SECONDS: u64 = 5;

/// Immutable configuration for one test run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestContext {
    operator_namespace: String,
    cluster_namespace: String,
    store_type: StoreType,
    data_dir_host_path: String,
    package_manager_install: bool,
    use_devices: bool,
    mon_count: usize,
}

impl TestContext {
    /// Start a builder populated with the defaults.
    #[must_use]
    pub fn builder() -> TestContextBuilder {
        TestContextBuilder::default()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut builder = Self::builder();

        if let Some(ns) = vars.get("TEST_OPERATOR_NAMESPACE") {
            builder = builder.operator_namespace(ns.clone());
        }
        if let Some(ns) = vars.get("TEST_CLUSTER_NAMESPACE") {
            builder = builder.cluster_namespace(ns.clone());
        }
        if let Some(store) = vars.get("TEST_STORE_TYPE") {
            let store_type = store.parse::<StoreType>().map_err(|_| {
                ConfigError::InvalidValue {
                    var: "TEST_STORE_TYPE".to_string(),
                    message: format!("unknown store type '{store}'"),
                }
            })?;
            builder = builder.store_type(store_type);
        }
        if let Some(path) = vars.get("TEST_DATA_DIR_HOST_PATH") {
            builder = builder.data_dir_host_path(path.clone());
        }
        if let Some(value) = vars.get("TEST_HELM_INSTALL") {
            builder = builder.package_manager_install(parse_bool("TEST_HELM_INSTALL", value)?);
        }
        if let Some(value) = vars.get("TEST_USE_DEVICES") {
            builder = builder.use_devices(parse_bool("TEST_USE_DEVICES", value)?);
        }
        if let Some(value) = vars.get("TEST_MON_COUNT") {
            builder = builder.mon_count(parse_number("TEST_MON_COUNT", value)?);
        }

        builder.build()
    }

    /// Namespace the operator and agents are deployed into.
    #[must_use]
    pub fn operator_namespace(&self) -> &str {
        &self.operator_namespace
    }

    /// Namespace the storage cluster is deployed into.
    #[must_use]
    pub fn cluster_namespace(&self) -> &str {
        &self.cluster_namespace
    }

    #[must_use]
    pub fn store_type(&self) -> StoreType {
        self.store_type
    }

    #[must_use]
    pub fn data_dir_host_path(&self) -> &str {
        &self.data_dir_host_path
    }

    /// Whether the operator is installed through the package manager (helm).
    #[must_use]
    pub fn package_manager_install(&self) -> bool {
        self.package_manager_install
    }

    /// Whether storage daemons consume raw devices instead of directories.
    #[must_use]
    pub fn use_devices(&self) -> bool {
        self.use_devices
    }

    /// Expected number of monitor replicas.
    #[must_use]
    pub fn mon_count(&self) -> usize {
        self.mon_count
    }
}

/// Named-field construction of a [`TestContext`].
///
/// Every setter is optional; unset fields keep their default.
#[derive(Debug, Clone)]
pub struct TestContextBuilder {
    operator_namespace: String,
    cluster_namespace: String,
    store_type: StoreType,
    data_dir_host_path: String,
    package_manager_install: bool,
    use_devices: bool,
    mon_count: usize,
}

impl Default for TestContextBuilder {
    fn default() -> Self {
        Self {
            operator_namespace: DEFAULT_OPERATOR_NAMESPACE.to_string(),
            cluster_namespace: DEFAULT_CLUSTER_NAMESPACE.to_string(),
            store_type: StoreType::Bluestore,
            data_dir_host_path: DEFAULT_DATA_DIR_HOST_PATH.to_string(),
            package_manager_install: false,
            use_devices: false,
            mon_count: DEFAULT_MON_COUNT,
        }
    }
}

impl TestContextBuilder {
    /// Namespace for the operator and agent pods.
    #[must_use]
    pub fn operator_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.operator_namespace = namespace.into();
        self
    }

    /// Namespace for the cluster pods (api, mgr, osd, mon).
    #[must_use]
    pub fn cluster_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.cluster_namespace = namespace.into();
        self
    }

    /// Storage backend for the storage daemons.
    #[must_use]
    pub fn store_type(mut self, store_type: StoreType) -> Self {
        self.store_type = store_type;
        self
    }

    /// Host directory where the cluster persists its data.
    #[must_use]
    pub fn data_dir_host_path(mut self, path: impl Into<String>) -> Self {
        self.data_dir_host_path = path.into();
        self
    }

    /// Install the operator with helm rather than raw manifests.
    #[must_use]
    pub fn package_manager_install(mut self, enabled: bool) -> Self {
        self.package_manager_install = enabled;
        self
    }

    /// Let storage daemons claim every available raw device.
    #[must_use]
    pub fn use_devices(mut self, enabled: bool) -> Self {
        self.use_devices = enabled;
        self
    }

    /// Number of monitor replicas the cluster runs and the tests expect.
    #[must_use]
    pub fn mon_count(mut self, count: usize) -> Self {
        self.mon_count = count;
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<TestContext, ConfigError> {
        if self.operator_namespace.trim().is_empty() {
            return Err(ConfigError::Missing("operator namespace".to_string()));
        }
        if self.cluster_namespace.trim().is_empty() {
            return Err(ConfigError::Missing("cluster namespace".to_string()));
        }
        if self.data_dir_host_path.trim().is_empty() {
            return Err(ConfigError::Missing("data dir host path".to_string()));
        }
        if self.mon_count == 0 {
            return Err(ConfigError::InvalidValue {
                var: "mon count".to_string(),
                message: "at least one monitor is required".to_string(),
            });
        }

        Ok(TestContext {
            operator_namespace: self.operator_namespace,
            cluster_namespace: self.cluster_namespace,
            store_type: self.store_type,
            data_dir_host_path: self.data_dir_host_path,
            package_manager_install: self.package_manager_install,
            use_devices: self.use_devices,
            mon_count: self.mon_count,
        })
    }
}

/// Fixed-interval retry budget for convergence polling.
///
/// No backoff and no jitter: `attempts` queries separated by `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECONDS),
        }
    }
}

impl RetryPolicy {
    /// Create a policy; a zero attempt budget is rejected.
    pub fn new(attempts: u32, interval: Duration) -> Result<Self, ConfigError> {
        if attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(Self { attempts, interval })
    }

    /// Load the policy from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load the policy from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let attempts = match vars.get("TEST_RETRY_ATTEMPTS") {
            Some(value) => parse_number("TEST_RETRY_ATTEMPTS", value)?,
            None => DEFAULT_RETRY_ATTEMPTS,
        };
        let interval_seconds = match vars.get("TEST_RETRY_INTERVAL_SECONDS") {
            Some(value) => parse_number("TEST_RETRY_INTERVAL_SECONDS", value)?,
            None => DEFAULT_RETRY_INTERVAL_SECONDS,
        };

        Self::new(attempts, Duration::from_secs(interval_seconds))
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

fn parse_number<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue {
            var: var.to_string(),
            message: e.to_string(),
        })
}
