//! Mock installer that records calls.
//!
//! Clones share state, so a test can hand one clone to the lifecycle manager
//! and inspect the calls through another.

use async_trait::async_trait;
use harness_common::config::TestContext;
use harness_common::contracts::Installer;
use harness_common::error::{CollaboratorError, Result};
use std::sync::{Arc, Mutex};

/// One call made against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallerCall {
    Install,
    Uninstall,
    GatherLogs { namespace: String, test_name: String },
}

/// What `install` should answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// `Ok(true)`
    Installed,
    /// `Ok(false)`
    NotInstalled,
    /// `Err(..)`
    Error,
}

#[derive(Debug, Clone)]
pub struct MockInstaller {
    inner: Arc<Mutex<MockInstallerInner>>,
}

#[derive(Debug)]
struct MockInstallerInner {
    outcome: InstallOutcome,
    fail_gather_logs: bool,
    fail_uninstall: bool,
    calls: Vec<InstallerCall>,
}

impl MockInstaller {
    fn with_outcome(outcome: InstallOutcome) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockInstallerInner {
                outcome,
                fail_gather_logs: false,
                fail_uninstall: false,
                calls: Vec::new(),
            })),
        }
    }

    /// Create a mock whose install succeeds.
    pub fn succeeding() -> Self {
        Self::with_outcome(InstallOutcome::Installed)
    }

    /// Create a mock whose install runs but reports the cluster did not come up.
    pub fn not_installed() -> Self {
        Self::with_outcome(InstallOutcome::NotInstalled)
    }

    /// Create a mock whose install returns an error.
    pub fn failing() -> Self {
        Self::with_outcome(InstallOutcome::Error)
    }

    /// Make `gather_logs` return an error.
    #[must_use]
    pub fn with_gather_logs_error(self) -> Self {
        self.inner.lock().unwrap().fail_gather_logs = true;
        self
    }

    /// Make `uninstall` return an error.
    #[must_use]
    pub fn with_uninstall_error(self) -> Self {
        self.inner.lock().unwrap().fail_uninstall = true;
        self
    }

    /// Every call in order.
    pub fn calls(&self) -> Vec<InstallerCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn install_count(&self) -> usize {
        self.count(|c| matches!(c, InstallerCall::Install))
    }

    pub fn uninstall_count(&self) -> usize {
        self.count(|c| matches!(c, InstallerCall::Uninstall))
    }

    pub fn gather_logs_count(&self) -> usize {
        self.count(|c| matches!(c, InstallerCall::GatherLogs { .. }))
    }

    /// Namespaces passed to `gather_logs`, in call order.
    pub fn gathered_namespaces(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                InstallerCall::GatherLogs { namespace, .. } => Some(namespace),
                _ => None,
            })
            .collect()
    }

    fn count(&self, predicate: impl Fn(&InstallerCall) -> bool) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| predicate(c))
            .count()
    }

    fn record(&self, call: InstallerCall) {
        self.inner.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl Installer for MockInstaller {
    async fn install(&self, _context: &TestContext) -> Result<bool> {
        self.record(InstallerCall::Install);
        match self.inner.lock().unwrap().outcome {
            InstallOutcome::Installed => Ok(true),
            InstallOutcome::NotInstalled => Ok(false),
            InstallOutcome::Error => Err(CollaboratorError::CommandFailed {
                program: "kubectl".to_string(),
                status: 1,
                stderr: "mock install failure".to_string(),
            }),
        }
    }

    async fn uninstall(&self, _context: &TestContext) -> Result<()> {
        self.record(InstallerCall::Uninstall);
        if self.inner.lock().unwrap().fail_uninstall {
            return Err(CollaboratorError::Unhealthy(
                "mock uninstall failure".to_string(),
            ));
        }
        Ok(())
    }

    async fn gather_logs(&self, namespace: &str, test_name: &str) -> Result<()> {
        self.record(InstallerCall::GatherLogs {
            namespace: namespace.to_string(),
            test_name: test_name.to_string(),
        });
        if self.inner.lock().unwrap().fail_gather_logs {
            return Err(CollaboratorError::Io(std::io::Error::other(
                "mock log capture failure",
            )));
        }
        Ok(())
    }
}
