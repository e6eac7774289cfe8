//! Manifest and helm based installer for the storage cluster.
//!
//! The operator is installed from a manifest file (`kubectl apply`) or a helm
//! chart. Once the operator pod runs, a namespace and `Cluster` resource
//! rendered from the [`TestContext`] are applied, and the installer waits for
//! every cluster role to come up before reporting success.

use async_trait::async_trait;
use chrono::Utc;
use harness_common::config::{RetryPolicy, TestContext};
use harness_common::contracts::Installer;
use harness_common::error::{ConfigError, Result};
use harness_common::types::{roles, PodPhase};
use regex::Regex;
use serde_json::json;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{info, instrument, warn};

use super::command::run_command;
use super::kubectl::K8sHelper;
use crate::health::retry_fixed_interval;
use crate::pods::PodExpectationChecker;

/// Default operator manifest, relative to the working directory.
pub const DEFAULT_OPERATOR_MANIFEST: &str = "deploy/rook-operator.yaml";

/// Default helm chart reference for package-manager installs.
pub const DEFAULT_HELM_CHART: &str = "rook-beta/rook";

/// Default helm release name.
pub const DEFAULT_HELM_RELEASE: &str = "rook";

/// Default image tag for the cluster components.
pub const DEFAULT_VERSION_TAG: &str = "master";

/// Default root directory for gathered logs.
pub const DEFAULT_LOG_DIR: &str = "_output/tests";

/// Characters that are not safe in a single path component.
static UNSAFE_PATH_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.-]+").unwrap());

/// Installer settings that are not part of the cluster description.
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    pub operator_manifest: PathBuf,
    pub helm_chart: String,
    pub helm_release: String,
    pub helm_binary: String,
    pub version_tag: String,
    pub log_dir: PathBuf,
    /// Budget for the operator and cluster pods to come up after install.
    pub readiness: RetryPolicy,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            operator_manifest: PathBuf::from(DEFAULT_OPERATOR_MANIFEST),
            helm_chart: DEFAULT_HELM_CHART.to_string(),
            helm_release: DEFAULT_HELM_RELEASE.to_string(),
            helm_binary: "helm".to_string(),
            version_tag: DEFAULT_VERSION_TAG.to_string(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            readiness: RetryPolicy::default(),
        }
    }
}

impl InstallerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> std::result::Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            operator_manifest: vars
                .get("TEST_OPERATOR_MANIFEST")
                .map(PathBuf::from)
                .unwrap_or(defaults.operator_manifest),
            helm_chart: vars
                .get("TEST_HELM_CHART")
                .cloned()
                .unwrap_or(defaults.helm_chart),
            helm_release: vars
                .get("TEST_HELM_RELEASE")
                .cloned()
                .unwrap_or(defaults.helm_release),
            helm_binary: vars
                .get("TEST_HELM_BINARY")
                .cloned()
                .unwrap_or(defaults.helm_binary),
            version_tag: vars
                .get("TEST_VERSION_TAG")
                .cloned()
                .unwrap_or(defaults.version_tag),
            log_dir: vars
                .get("TEST_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            readiness: RetryPolicy::from_vars(vars)?,
        })
    }
}

pub struct ManifestInstaller {
    kube: K8sHelper,
    config: InstallerConfig,
}

impl ManifestInstaller {
    pub fn new(kube: K8sHelper, config: InstallerConfig) -> Self {
        Self { kube, config }
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    async fn install_operator(&self, context: &TestContext) -> Result<()> {
        let namespace = context.operator_namespace();

        if context.package_manager_install() {
            let image_tag = format!("image.tag={}", self.config.version_tag);
            run_command(
                &self.config.helm_binary,
                &[
                    "install",
                    &self.config.helm_release,
                    &self.config.helm_chart,
                    "--namespace",
                    namespace,
                    "--create-namespace",
                    "--set",
                    &image_tag,
                ],
                None,
            )
            .await?;
        } else {
            let manifest = self.config.operator_manifest.to_string_lossy();
            self.kube
                .kubectl(&["apply", "-n", namespace, "-f", &manifest])
                .await?;
        }
        Ok(())
    }

    async fn uninstall_operator(&self, context: &TestContext) -> Result<()> {
        let namespace = context.operator_namespace();

        if context.package_manager_install() {
            run_command(
                &self.config.helm_binary,
                &[
                    "uninstall",
                    &self.config.helm_release,
                    "--namespace",
                    namespace,
                ],
                None,
            )
            .await?;
        } else {
            let manifest = self.config.operator_manifest.to_string_lossy();
            self.kube
                .kubectl(&[
                    "delete",
                    "-n",
                    namespace,
                    "-f",
                    &manifest,
                    "--ignore-not-found=true",
                ])
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Installer for ManifestInstaller {
    #[instrument(skip_all, name = "env_tests.installer.install")]
    async fn install(&self, context: &TestContext) -> Result<bool> {
        info!(
            target: "env_tests.installer",
            operator_namespace = context.operator_namespace(),
            helm = context.package_manager_install(),
            "Installing operator"
        );
        self.install_operator(context).await?;

        let checker = PodExpectationChecker::new(self.kube.clone());
        let checker = &checker;
        let policy = self.config.readiness;

        let operator_up = retry_fixed_interval(policy, |_| async move {
            checker
                .check_pod_count_and_state(
                    roles::OPERATOR,
                    context.operator_namespace(),
                    1,
                    PodPhase::Running,
                )
                .await
                .then_some(())
                .ok_or(())
        })
        .await
        .is_ok();
        if !operator_up {
            warn!(
                target: "env_tests.installer",
                attempts = policy.attempts(),
                "Operator pod did not reach Running"
            );
            return Ok(false);
        }

        info!(
            target: "env_tests.installer",
            cluster_namespace = context.cluster_namespace(),
            store_type = %context.store_type(),
            mons = context.mon_count(),
            "Creating storage cluster"
        );
        let manifest = cluster_manifest(context, &self.config.version_tag);
        self.kube
            .kubectl_with_stdin(&["apply", "-f", "-"], manifest.to_string().as_bytes())
            .await?;

        let cluster_up = retry_fixed_interval(policy, |_| async move {
            let failed = checker.verify_cluster_installed(context).await;
            if failed.is_empty() {
                Ok(())
            } else {
                Err(failed)
            }
        })
        .await
        .inspect_err(|failed| {
            for expectation in failed {
                warn!(target: "env_tests.installer", "{}", expectation.describe());
            }
        })
        .is_ok();
        if !cluster_up {
            warn!(
                target: "env_tests.installer",
                attempts = policy.attempts(),
                "Cluster pods did not all reach Running"
            );
        }
        Ok(cluster_up)
    }

    #[instrument(skip_all, name = "env_tests.installer.uninstall")]
    async fn uninstall(&self, context: &TestContext) -> Result<()> {
        let namespace = context.cluster_namespace();
        info!(
            target: "env_tests.installer",
            cluster_namespace = namespace,
            "Uninstalling storage cluster"
        );

        // Every step runs; the first failure is reported.
        let steps = [
            self.kube
                .kubectl(&[
                    "delete",
                    "-n",
                    namespace,
                    "cluster",
                    namespace,
                    "--ignore-not-found=true",
                ])
                .await
                .map(drop),
            self.kube
                .kubectl(&["delete", "namespace", namespace, "--ignore-not-found=true"])
                .await
                .map(drop),
            self.uninstall_operator(context).await,
        ];

        steps.into_iter().collect::<Result<Vec<()>>>().map(drop)
    }

    #[instrument(skip_all, name = "env_tests.installer.gather_logs")]
    async fn gather_logs(&self, namespace: &str, test_name: &str) -> Result<()> {
        let dir = log_directory(&self.config.log_dir, test_name, namespace);
        tokio::fs::create_dir_all(&dir).await?;

        let pods = self.kube.list_all_pods(namespace).await?;
        info!(
            target: "env_tests.installer",
            namespace,
            pods = pods.len(),
            dir = %dir.display(),
            "Gathering pod logs"
        );

        for pod in pods {
            match self.kube.pod_logs(namespace, &pod.name).await {
                Ok(logs) => {
                    let contents = format!(
                        "# pod {} ({}) gathered {}\n{}",
                        pod.name,
                        pod.phase,
                        Utc::now().to_rfc3339(),
                        logs
                    );
                    let file = dir.join(format!("{}.log", sanitize_path_component(&pod.name)));
                    tokio::fs::write(file, contents).await?;
                }
                Err(e) => {
                    warn!(
                        target: "env_tests.installer",
                        pod = %pod.name,
                        error = %e,
                        "Could not fetch pod logs"
                    );
                }
            }
        }
        Ok(())
    }
}

/// Namespace and `Cluster` resource for `context`, as a kubectl `List`.
pub fn cluster_manifest(context: &TestContext, version_tag: &str) -> serde_json::Value {
    let namespace = context.cluster_namespace();

    json!({
        "apiVersion": "v1",
        "kind": "List",
        "items": [
            {
                "apiVersion": "v1",
                "kind": "Namespace",
                "metadata": { "name": namespace }
            },
            {
                "apiVersion": "rook.io/v1alpha1",
                "kind": "Cluster",
                "metadata": { "name": namespace, "namespace": namespace },
                "spec": {
                    "versionTag": version_tag,
                    "dataDirHostPath": context.data_dir_host_path(),
                    "mon": {
                        "count": context.mon_count(),
                        "allowMultiplePerNode": true
                    },
                    "storage": {
                        "useAllNodes": true,
                        "useAllDevices": context.use_devices(),
                        "config": {
                            "storeType": context.store_type().as_str()
                        }
                    }
                }
            }
        ]
    })
}

/// `<root>/<test>/<namespace>` with both components made path-safe.
pub fn log_directory(root: &Path, test_name: &str, namespace: &str) -> PathBuf {
    root.join(sanitize_path_component(test_name))
        .join(sanitize_path_component(namespace))
}

/// Replace anything outside `[A-Za-z0-9_.-]` so `name` is one path component.
pub fn sanitize_path_component(name: &str) -> String {
    let cleaned = UNSAFE_PATH_CHARS.replace_all(name, "_").into_owned();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "unnamed".to_string()
    } else {
        cleaned
    }
}
