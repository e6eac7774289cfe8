//! Common data types for the test harness.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Pod label values (`app=<role>`) for the workloads of a deployed cluster.
pub mod roles {
    pub const OPERATOR: &str = "rook-operator";
    pub const AGENT: &str = "rook-agent";
    pub const API: &str = "rook-api";
    pub const MANAGER: &str = "rook-ceph-mgr";
    pub const STORAGE_DAEMON: &str = "rook-ceph-osd";
    pub const MONITOR: &str = "rook-ceph-mon";
}

/// Storage backend used by the storage daemons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    Bluestore,
    Filestore,
}

impl StoreType {
    /// Name used in cluster manifests
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreType::Bluestore => "bluestore",
            StoreType::Filestore => "filestore",
        }
    }
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bluestore" => Ok(StoreType::Bluestore),
            "filestore" => Ok(StoreType::Filestore),
            other => Err(ConfigError::InvalidValue {
                var: "store type".to_string(),
                message: format!("unknown store type '{other}'"),
            }),
        }
    }
}

/// Pod phase as reported by the orchestration platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PodPhase::Pending => "Pending",
            PodPhase::Running => "Running",
            PodPhase::Succeeded => "Succeeded",
            PodPhase::Failed => "Failed",
            PodPhase::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

impl FromStr for PodPhase {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        })
    }
}

/// One observed pod
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodStatus {
    pub name: String,
    pub phase: PodPhase,
}

impl PodStatus {
    pub fn new(name: impl Into<String>, phase: PodPhase) -> Self {
        Self {
            name: name.into(),
            phase,
        }
    }
}

/// Expected population of one role in one namespace.
///
/// A set of expectations describes a fully deployed cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodExpectation {
    pub role: String,
    pub namespace: String,
    pub count: usize,
    pub state: PodPhase,
}

impl PodExpectation {
    /// Expect `count` pods of `role` in `namespace`, all `Running`.
    pub fn running(role: impl Into<String>, namespace: impl Into<String>, count: usize) -> Self {
        Self {
            role: role.into(),
            namespace: namespace.into(),
            count,
            state: PodPhase::Running,
        }
    }

    /// Assertion message naming every expected value.
    #[must_use]
    pub fn describe(&self) -> String {
        let verb = if self.count == 1 { "is" } else { "are" };
        format!(
            "Make sure there {} {} {} present in {} state in namespace {}",
            verb, self.count, self.role, self.state, self.namespace
        )
    }
}

impl fmt::Display for PodExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} x{} {}",
            self.namespace, self.role, self.count, self.state
        )
    }
}

/// Opaque cluster health document.
///
/// Only the success of the query that produced it is meaningful to the
/// harness; the payload is kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthStatus(serde_json::Value);

impl HealthStatus {
    #[must_use]
    pub fn new(raw: serde_json::Value) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Where a lifecycle manager is in its install/teardown cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NotStarted,
    Installed,
    TornDown,
}
