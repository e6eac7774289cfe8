//! Pod count and state expectations.

use harness_common::config::TestContext;
use harness_common::contracts::PodQuery;
use harness_common::types::{roles, PodExpectation, PodPhase};
use tracing::{debug, info, warn};

use crate::errors::HarnessError;

/// Compares observed pods per role against expected counts and states.
///
/// Each check is a single observation; callers that need to wait for pods
/// layer their own retry on top.
pub struct PodExpectationChecker<P> {
    pods: P,
}

impl<P: PodQuery> PodExpectationChecker<P> {
    pub fn new(pods: P) -> Self {
        Self { pods }
    }

    /// True iff exactly `expected_count` pods of `role` exist in `namespace`
    /// and every one of them is in `expected_state`.
    ///
    /// A failed enumeration counts as "not yet satisfied".
    pub async fn check_pod_count_and_state(
        &self,
        role: &str,
        namespace: &str,
        expected_count: usize,
        expected_state: PodPhase,
    ) -> bool {
        let pods = match self.pods.list_pods(role, namespace).await {
            Ok(pods) => pods,
            Err(e) => {
                warn!(
                    target: "env_tests.pods",
                    role,
                    namespace,
                    error = %e,
                    "Could not enumerate pods"
                );
                return false;
            }
        };

        let matching = pods.iter().filter(|p| p.phase == expected_state).count();
        let satisfied = pods.len() == expected_count && matching == pods.len();

        debug!(
            target: "env_tests.pods",
            role,
            namespace,
            expected_count,
            expected_state = %expected_state,
            observed = pods.len(),
            matching,
            satisfied,
            "Checked pod expectation"
        );

        satisfied
    }

    pub async fn check(&self, expectation: &PodExpectation) -> bool {
        self.check_pod_count_and_state(
            &expectation.role,
            &expectation.namespace,
            expectation.count,
            expectation.state,
        )
        .await
    }

    /// Check every role of a fully deployed cluster.
    ///
    /// Returns the expectations that did not hold; an empty list means the
    /// cluster is installed and running. All roles are checked even after a
    /// mismatch so the report is complete.
    pub async fn verify_cluster_installed(&self, context: &TestContext) -> Vec<PodExpectation> {
        info!(
            target: "env_tests.pods",
            cluster_namespace = context.cluster_namespace(),
            "Make sure all pods in the cluster are running"
        );

        let mut failed = Vec::new();
        for expectation in cluster_expectations(context) {
            if !self.check(&expectation).await {
                failed.push(expectation);
            }
        }
        failed
    }

    /// [`Self::verify_cluster_installed`] as a `Result`.
    pub async fn ensure_cluster_installed(
        &self,
        context: &TestContext,
    ) -> Result<(), HarnessError> {
        let failed = self.verify_cluster_installed(context).await;
        if failed.is_empty() {
            return Ok(());
        }
        Err(HarnessError::ExpectationMismatch(
            failed.iter().map(PodExpectation::describe).collect(),
        ))
    }
}

/// Expectations that together define "cluster fully deployed".
pub fn cluster_expectations(context: &TestContext) -> Vec<PodExpectation> {
    let operator_ns = context.operator_namespace();
    let cluster_ns = context.cluster_namespace();

    vec![
        PodExpectation::running(roles::OPERATOR, operator_ns, 1),
        PodExpectation::running(roles::AGENT, operator_ns, 1),
        PodExpectation::running(roles::API, cluster_ns, 1),
        PodExpectation::running(roles::MANAGER, cluster_ns, 1),
        PodExpectation::running(roles::STORAGE_DAEMON, cluster_ns, 1),
        PodExpectation::running(roles::MONITOR, cluster_ns, context.mon_count()),
    ]
}
