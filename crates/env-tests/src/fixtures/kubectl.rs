//! kubectl-backed orchestration client.

use async_trait::async_trait;
use harness_common::contracts::PodQuery;
use harness_common::error::{CollaboratorError, Result};
use harness_common::types::{roles, PodPhase, PodStatus};
use serde::Deserialize;

use super::command::run_command;

/// Default kubectl binary, resolved through `PATH`.
pub const DEFAULT_KUBECTL: &str = "kubectl";

/// Service fronting the storage API pods.
pub const API_SERVICE: &str = roles::API;

/// Query-only handle on the cluster, driven through the kubectl CLI.
///
/// Cheap to clone; every call spawns a fresh kubectl process.
#[derive(Debug, Clone)]
pub struct K8sHelper {
    kubectl: String,
}

impl Default for K8sHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl K8sHelper {
    pub fn new() -> Self {
        Self::with_binary(DEFAULT_KUBECTL)
    }

    pub fn with_binary(kubectl: impl Into<String>) -> Self {
        Self {
            kubectl: kubectl.into(),
        }
    }

    /// Create a helper and verify the cluster API answers.
    pub async fn connect() -> Result<Self> {
        Self::connect_with(DEFAULT_KUBECTL).await
    }

    /// [`Self::connect`] through a specific kubectl binary.
    pub async fn connect_with(kubectl: impl Into<String>) -> Result<Self> {
        let helper = Self::with_binary(kubectl);
        helper.kubectl(&["cluster-info"]).await?;
        Ok(helper)
    }

    /// Run kubectl and return stdout as text.
    pub async fn kubectl(&self, args: &[&str]) -> Result<String> {
        let stdout = run_command(&self.kubectl, args, None).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    /// Run kubectl with `input` on stdin (e.g. `apply -f -`).
    pub async fn kubectl_with_stdin(&self, args: &[&str], input: &[u8]) -> Result<String> {
        let stdout = run_command(&self.kubectl, args, Some(input)).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    /// Every pod in `namespace`, regardless of role.
    pub async fn list_all_pods(&self, namespace: &str) -> Result<Vec<PodStatus>> {
        let stdout = run_command(
            &self.kubectl,
            &["get", "pods", "-n", namespace, "-o", "json"],
            None,
        )
        .await?;
        parse_pod_list(&stdout)
    }

    /// In-cluster base URL of the storage API service in `namespace`.
    pub async fn api_endpoint(&self, namespace: &str) -> Result<String> {
        let stdout = run_command(
            &self.kubectl,
            &["get", "service", API_SERVICE, "-n", namespace, "-o", "json"],
            None,
        )
        .await?;
        parse_service_endpoint(&stdout)
    }

    /// Logs of every container in `pod`.
    pub async fn pod_logs(&self, namespace: &str, pod: &str) -> Result<String> {
        self.kubectl(&["logs", pod, "-n", namespace, "--all-containers=true"])
            .await
    }
}

#[async_trait]
impl PodQuery for K8sHelper {
    async fn list_pods(&self, role: &str, namespace: &str) -> Result<Vec<PodStatus>> {
        let selector = format!("app={role}");
        let stdout = run_command(
            &self.kubectl,
            &["get", "pods", "-n", namespace, "-l", &selector, "-o", "json"],
            None,
        )
        .await?;
        parse_pod_list(&stdout)
    }
}

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<PodItem>,
}

#[derive(Debug, Deserialize)]
struct PodItem {
    metadata: PodMetadata,
    #[serde(default)]
    status: Option<PodItemStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodMetadata {
    name: String,
    #[serde(default)]
    deletion_timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PodItemStatus {
    #[serde(default)]
    phase: Option<PodPhase>,
}

/// Parse `kubectl get pods -o json` output.
///
/// Pods being deleted still report their last phase; they are reported as
/// `Unknown` so a terminating pod never satisfies a `Running` expectation.
pub fn parse_pod_list(json: &[u8]) -> Result<Vec<PodStatus>> {
    let list: PodList = serde_json::from_slice(json).map_err(|source| CollaboratorError::Parse {
        what: "pod list".to_string(),
        source,
    })?;

    Ok(list
        .items
        .into_iter()
        .map(|item| {
            let phase = if item.metadata.deletion_timestamp.is_some() {
                PodPhase::Unknown
            } else {
                item.status
                    .and_then(|s| s.phase)
                    .unwrap_or(PodPhase::Unknown)
            };
            PodStatus::new(item.metadata.name, phase)
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct Service {
    spec: ServiceSpec,
}

#[derive(Debug, Deserialize)]
struct ServiceSpec {
    #[serde(rename = "clusterIP", default)]
    cluster_ip: Option<String>,
    #[serde(default)]
    ports: Vec<ServicePort>,
}

#[derive(Debug, Deserialize)]
struct ServicePort {
    port: u16,
}

/// Parse `kubectl get service -o json` output into `http://<clusterIP>:<port>`.
///
/// Headless services (`clusterIP: None`) and services without ports have no
/// usable endpoint.
pub fn parse_service_endpoint(json: &[u8]) -> Result<String> {
    let service: Service =
        serde_json::from_slice(json).map_err(|source| CollaboratorError::Parse {
            what: "service".to_string(),
            source,
        })?;

    let ip = service
        .spec
        .cluster_ip
        .filter(|ip| !ip.is_empty() && ip != "None")
        .ok_or_else(|| {
            CollaboratorError::MissingResource("service has no cluster IP".to_string())
        })?;
    let port = service
        .spec
        .ports
        .first()
        .map(|p| p.port)
        .ok_or_else(|| {
            CollaboratorError::MissingResource("service exposes no port".to_string())
        })?;

    Ok(format!("http://{ip}:{port}"))
}
