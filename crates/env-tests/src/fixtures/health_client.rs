//! HTTP client for the cluster status endpoint.

use async_trait::async_trait;
use harness_common::contracts::HealthQuery;
use harness_common::error::{CollaboratorError, Result};
use harness_common::types::HealthStatus;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Per-request timeout; the poller owns the overall budget.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Overrides the in-cluster API endpoint, e.g. with a port-forward URL.
pub const API_URL_ENV: &str = "TEST_API_URL";

/// The only overall status that counts as healthy.
pub const HEALTH_OK: &str = "HEALTH_OK";

/// Fields of the status document the health decision reads.
#[derive(Debug, Deserialize)]
struct StatusSummary {
    overall: String,
}

/// Queries `<base_url>/status` on the cluster API service.
///
/// A 2xx response whose `overall` field is `HEALTH_OK` is a healthy status.
/// Any other outcome, including a 2xx reporting `HEALTH_WARN` or
/// `HEALTH_ERR`, is an error the poller retries.
#[derive(Debug)]
pub struct ApiHealthClient {
    base_url: String,
    http_client: Client,
}

impl ApiHealthClient {
    /// Create a new health client.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CollaboratorError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl HealthQuery for ApiHealthClient {
    async fn query_health(&self) -> Result<HealthStatus> {
        let status_url = format!("{}/status", self.base_url);

        let response = self
            .http_client
            .get(&status_url)
            .send()
            .await
            .map_err(|e| CollaboratorError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Unhealthy(format!(
                "status endpoint returned {status}: {body}"
            )));
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| CollaboratorError::Http(format!("invalid status body: {e}")))?;

        let summary = StatusSummary::deserialize(&body)
            .map_err(|e| CollaboratorError::Http(format!("invalid status body: {e}")))?;
        if summary.overall != HEALTH_OK {
            return Err(CollaboratorError::Unhealthy(format!(
                "overall status is {}",
                summary.overall
            )));
        }

        Ok(HealthStatus::new(body))
    }
}
