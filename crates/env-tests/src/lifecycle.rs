//! Setup and teardown of the system under test.
//!
//! A [`TestLifecycleManager`] owns the installer for one test run. Setup is
//! attempted once; a failed install is torn down before the failure is
//! reported. Teardown gathers diagnostics when the test has failed, then
//! uninstalls, and only ever does so once per manager.

use harness_common::config::TestContext;
use harness_common::contracts::Installer;
use harness_common::types::LifecycleState;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

use crate::errors::HarnessError;
use crate::fixtures::{
    ApiHealthClient, InstallerConfig, K8sHelper, ManifestInstaller, API_URL_ENV, DEFAULT_KUBECTL,
};
use crate::guard::supervise;
use crate::handle::TestHandle;

/// Installs and tears down the storage cluster for one test.
pub struct TestLifecycleManager {
    context: TestContext,
    installer: Box<dyn Installer>,
    handle: TestHandle,
    state: Mutex<LifecycleState>,
    span: Span,
}

impl TestLifecycleManager {
    /// Create a manager in `NotStarted`; nothing is installed until [`Self::set_up`].
    pub fn new(
        handle: TestHandle,
        context: TestContext,
        installer: impl Installer + 'static,
    ) -> Self {
        let span = info_span!(
            "env_tests.lifecycle",
            test = %handle.name(),
            cluster_namespace = %context.cluster_namespace()
        );

        Self {
            context,
            installer: Box::new(installer),
            handle,
            state: Mutex::new(LifecycleState::NotStarted),
            span,
        }
    }

    /// Configuration the cluster is installed with.
    pub fn context(&self) -> &TestContext {
        &self.context
    }

    /// Handle of the test this manager belongs to.
    pub fn handle(&self) -> &TestHandle {
        &self.handle
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        *self.lock_state()
    }

    fn lock_state(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install the system under test.
    ///
    /// Calling it again once installed is a no-op. On install failure the
    /// test is marked failed and torn down before
    /// [`HarnessError::SetupFailed`] is returned.
    pub async fn set_up(&self) -> Result<(), HarnessError> {
        async {
            match self.state() {
                LifecycleState::Installed => return Ok(()),
                LifecycleState::TornDown => {
                    return Err(HarnessError::AlreadyTornDown(self.handle.name().to_string()))
                }
                LifecycleState::NotStarted => {}
            }

            info!(
                target: "env_tests.lifecycle",
                operator_namespace = self.context.operator_namespace(),
                store_type = %self.context.store_type(),
                helm = self.context.package_manager_install(),
                use_devices = self.context.use_devices(),
                mons = self.context.mon_count(),
                "Installing storage cluster"
            );

            let reason = match self.installer.install(&self.context).await {
                Ok(true) => {
                    *self.lock_state() = LifecycleState::Installed;
                    info!(target: "env_tests.lifecycle", "Storage cluster installed");
                    return Ok(());
                }
                Ok(false) => "installation did not come up".to_string(),
                Err(e) => e.to_string(),
            };

            error!(
                target: "env_tests.lifecycle",
                reason = %reason,
                "Storage cluster was not installed successfully"
            );
            self.handle.fail();
            self.tear_down().await;

            Err(HarnessError::SetupFailed {
                test: self.handle.name().to_string(),
                reason,
            })
        }
        .instrument(self.span.clone())
        .await
    }

    /// Release the system under test. Safe to call any number of times.
    ///
    /// When the test has failed, logs are gathered for the cluster and
    /// operator namespaces first. Errors from either step are logged and
    /// never stop the uninstall.
    pub async fn tear_down(&self) {
        async {
            if !self.begin_teardown() {
                debug!(target: "env_tests.lifecycle", "Already torn down, skipping");
                return;
            }

            if self.handle.failed() {
                for namespace in self.log_namespaces() {
                    let gathered = self.installer.gather_logs(namespace, self.handle.name()).await;
                    if let Err(e) = gathered {
                        warn!(
                            target: "env_tests.lifecycle",
                            namespace,
                            error = %e,
                            "Failed to gather logs"
                        );
                    }
                }
            }

            match self.installer.uninstall(&self.context).await {
                Ok(()) => info!(target: "env_tests.lifecycle", "Storage cluster uninstalled"),
                Err(e) => error!(
                    target: "env_tests.lifecycle",
                    error = %e,
                    "Failed to uninstall storage cluster"
                ),
            }
        }
        .instrument(self.span.clone())
        .await
    }

    /// Claim the teardown; false if it already happened.
    fn begin_teardown(&self) -> bool {
        let mut state = self.lock_state();
        if *state == LifecycleState::TornDown {
            return false;
        }
        *state = LifecycleState::TornDown;
        true
    }

    fn log_namespaces(&self) -> Vec<&str> {
        let cluster = self.context.cluster_namespace();
        let operator = self.context.operator_namespace();
        if cluster == operator {
            vec![cluster]
        } else {
            vec![cluster, operator]
        }
    }

    /// API test client for this cluster.
    ///
    /// Uses `TEST_API_URL` when set, otherwise the API service endpoint
    /// resolved through `kube`. See [`Self::health_client_with`].
    pub async fn health_client(&self, kube: &K8sHelper) -> Result<ApiHealthClient, HarnessError> {
        let api_url = std::env::var(API_URL_ENV).ok();
        self.health_client_with(kube, api_url).await
    }

    /// API test client at `api_url`, or at the endpoint resolved through
    /// `kube` when `None`.
    ///
    /// On failure the test is marked failed and torn down before
    /// [`HarnessError::TestClientUnavailable`] is returned.
    pub async fn health_client_with(
        &self,
        kube: &K8sHelper,
        api_url: Option<String>,
    ) -> Result<ApiHealthClient, HarnessError> {
        async {
            let api_url = match api_url {
                Some(url) => Ok(url),
                None => kube.api_endpoint(self.context.cluster_namespace()).await,
            };

            match api_url.and_then(ApiHealthClient::new) {
                Ok(client) => {
                    debug!(
                        target: "env_tests.lifecycle",
                        api_url = client.base_url(),
                        "Created API test client"
                    );
                    Ok(client)
                }
                Err(e) => {
                    error!(
                        target: "env_tests.lifecycle",
                        error = %e,
                        "Cannot create API test client"
                    );
                    self.handle.fail();
                    self.tear_down().await;
                    Err(HarnessError::TestClientUnavailable {
                        test: self.handle.name().to_string(),
                        reason: e.to_string(),
                    })
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }

    /// Set up, run `body`, and tear down on every exit path.
    ///
    /// An `Err` from `body` marks the test failed so teardown captures logs.
    /// A panic is handled by [`supervise`], which tears down itself.
    pub async fn run_scoped<F, T>(&self, body: F) -> Result<T, HarnessError>
    where
        F: Future<Output = Result<T, HarnessError>>,
    {
        self.set_up().await?;

        match supervise(self, body).await? {
            Ok(value) => {
                self.tear_down().await;
                Ok(value)
            }
            Err(e) => {
                warn!(
                    target: "env_tests.lifecycle",
                    test = %self.handle.name(),
                    error = %e,
                    "Test body failed"
                );
                self.handle.fail();
                self.tear_down().await;
                Err(e)
            }
        }
    }
}

/// Stand up the system under test against the current kubectl context.
///
/// Verifies the cluster API is reachable, installs with `context`, and
/// returns the manager together with a query-only orchestration client.
/// Installer settings come from the environment.
pub async fn new_base_test_operations(
    handle: TestHandle,
    context: TestContext,
) -> Result<(TestLifecycleManager, K8sHelper), HarnessError> {
    let config = InstallerConfig::from_env().inspect_err(|e| {
        error!(
            target: "env_tests.lifecycle",
            test = %handle.name(),
            error = %e,
            "Invalid installer configuration"
        );
        handle.fail();
    })?;

    new_base_test_operations_with(handle, context, DEFAULT_KUBECTL, config).await
}

/// [`new_base_test_operations`] through a specific kubectl binary and
/// installer configuration.
///
/// An unreachable cluster marks the test failed and returns the error
/// without installing anything.
pub async fn new_base_test_operations_with(
    handle: TestHandle,
    context: TestContext,
    kubectl: &str,
    config: InstallerConfig,
) -> Result<(TestLifecycleManager, K8sHelper), HarnessError> {
    let kube = K8sHelper::connect_with(kubectl).await.inspect_err(|e| {
        error!(
            target: "env_tests.lifecycle",
            test = %handle.name(),
            error = %e,
            "Cannot reach the cluster"
        );
        handle.fail();
    })?;

    let installer = ManifestInstaller::new(kube.clone(), config);
    let manager = TestLifecycleManager::new(handle, context, installer);
    manager.set_up().await?;

    Ok((manager, kube))
}
