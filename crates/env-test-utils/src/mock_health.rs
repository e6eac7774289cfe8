//! Mock health query with scripted answers.

use async_trait::async_trait;
use harness_common::contracts::HealthQuery;
use harness_common::error::{CollaboratorError, Result};
use harness_common::types::HealthStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Answers health queries from a fixed script.
///
/// Failed answers carry the 1-based attempt number in their message
/// (`"attempt 2: ..."`) so tests can tell which error was kept.
#[derive(Debug, Clone)]
pub struct MockHealth {
    /// Number of unhealthy answers before the first healthy one;
    /// `None` never becomes healthy.
    failures: Option<usize>,
    call_count: Arc<AtomicUsize>,
}

impl MockHealth {
    /// Create a mock that is healthy on the first query.
    pub fn healthy() -> Self {
        Self::failing_then_healthy(0)
    }

    /// Create a mock that fails `failures` times, then stays healthy.
    pub fn failing_then_healthy(failures: usize) -> Self {
        Self {
            failures: Some(failures),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a mock that never becomes healthy.
    pub fn always_failing() -> Self {
        Self {
            failures: None,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Status document returned on healthy answers.
    pub fn healthy_status() -> HealthStatus {
        HealthStatus::new(serde_json::json!({ "overall": "HEALTH_OK" }))
    }
}

#[async_trait]
impl HealthQuery for MockHealth {
    async fn query_health(&self) -> Result<HealthStatus> {
        let attempt = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;

        match self.failures {
            Some(failures) if attempt > failures => Ok(Self::healthy_status()),
            _ => Err(CollaboratorError::Unhealthy(format!(
                "attempt {attempt}: HEALTH_WARN"
            ))),
        }
    }
}
