//! Mock pod enumeration with fixed listings.

use async_trait::async_trait;
use harness_common::contracts::PodQuery;
use harness_common::error::{CollaboratorError, Result};
use harness_common::types::{PodPhase, PodStatus};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Key = (String, String);

/// Pod listings keyed by (role, namespace).
///
/// Unknown keys list no pods; keys registered with [`MockPods::failing_for`]
/// return an enumeration error.
#[derive(Debug, Clone, Default)]
pub struct MockPods {
    listings: Arc<Mutex<HashMap<Key, Vec<PodStatus>>>>,
    failing: Arc<Mutex<HashSet<Key>>>,
    queries: Arc<AtomicUsize>,
}

impl MockPods {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the exact pods listed for `role` in `namespace`.
    #[must_use]
    pub fn with_pods(self, role: &str, namespace: &str, pods: Vec<PodStatus>) -> Self {
        self.listings
            .lock()
            .unwrap()
            .insert((role.to_string(), namespace.to_string()), pods);
        self
    }

    /// List `count` running pods for `role` in `namespace`.
    #[must_use]
    pub fn with_running(self, role: &str, namespace: &str, count: usize) -> Self {
        let pods = (0..count)
            .map(|i| PodStatus::new(format!("{role}-{i}"), PodPhase::Running))
            .collect();
        self.with_pods(role, namespace, pods)
    }

    /// Make enumeration of `role` in `namespace` fail.
    #[must_use]
    pub fn failing_for(self, role: &str, namespace: &str) -> Self {
        self.failing
            .lock()
            .unwrap()
            .insert((role.to_string(), namespace.to_string()));
        self
    }

    /// Number of `list_pods` calls made.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PodQuery for MockPods {
    async fn list_pods(&self, role: &str, namespace: &str) -> Result<Vec<PodStatus>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let key = (role.to_string(), namespace.to_string());

        if self.failing.lock().unwrap().contains(&key) {
            return Err(CollaboratorError::CommandFailed {
                program: "kubectl".to_string(),
                status: 1,
                stderr: "Unable to connect to the server".to_string(),
            });
        }

        Ok(self
            .listings
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }
}
