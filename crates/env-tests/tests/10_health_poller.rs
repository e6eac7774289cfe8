//! Health convergence polling against scripted health answers.
//!
//! The timing tests run on paused tokio time, so elapsed virtual time counts
//! the sleeps between attempts exactly. The HTTP tests use a zero interval.

use env_test_utils::MockHealth;
use env_tests::{HarnessError, HealthPoller};
use harness_common::config::RetryPolicy;
use std::time::Duration;
use tokio::time::Instant;

fn policy(attempts: u32, interval_secs: u64) -> RetryPolicy {
    RetryPolicy::new(attempts, Duration::from_secs(interval_secs)).expect("valid policy")
}

#[tokio::test(start_paused = true)]
async fn test_first_attempt_success_does_not_sleep() {
    let health = MockHealth::healthy();
    let poller = HealthPoller::new(health.clone(), policy(5, 10));
    let start = Instant::now();

    let status = poller.wait_for_healthy().await.expect("should be healthy");

    assert_eq!(status, MockHealth::healthy_status());
    assert_eq!(health.call_count(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_success_on_third_attempt_after_two_sleeps() {
    let health = MockHealth::failing_then_healthy(2);
    let poller = HealthPoller::new(health.clone(), policy(3, 1));
    let start = Instant::now();

    poller
        .wait_for_healthy()
        .await
        .expect("third attempt should succeed");

    assert_eq!(health.call_count(), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

#[tokio::test]
async fn test_success_on_third_attempt_with_zero_interval() {
    let health = MockHealth::failing_then_healthy(2);
    let poller = HealthPoller::new(health.clone(), policy(3, 0));

    let result = poller.wait_for_healthy().await;

    assert!(result.is_ok());
    assert_eq!(health.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_early_success_stops_polling() {
    let health = MockHealth::failing_then_healthy(1);
    let poller = HealthPoller::new(health.clone(), policy(10, 3));
    let start = Instant::now();

    poller.wait_for_healthy().await.expect("second attempt succeeds");

    assert_eq!(health.call_count(), 2);
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_budget_exhaustion_returns_last_error() {
    let health = MockHealth::always_failing();
    let poller = HealthPoller::new(health.clone(), policy(4, 1));
    let start = Instant::now();

    let err = poller
        .wait_for_healthy()
        .await
        .expect_err("should exhaust the budget");

    match err {
        HarnessError::ConvergenceTimeout {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 4);
            assert!(
                last_error.to_string().contains("attempt 4"),
                "last error should be preserved, got: {}",
                last_error
            );
        }
        other => panic!("expected ConvergenceTimeout, got {other:?}"),
    }

    assert_eq!(health.call_count(), 4);
    // No sleep after the final attempt
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_query_and_sleep_counts_for_every_budget() {
    for attempts in 1..=6_u32 {
        let health = MockHealth::always_failing();
        let poller = HealthPoller::new(health.clone(), policy(attempts, 2));
        let start = Instant::now();

        assert!(poller.wait_for_healthy().await.is_err());

        assert_eq!(health.call_count(), attempts as usize);
        assert_eq!(
            start.elapsed(),
            Duration::from_secs(2 * u64::from(attempts - 1)),
            "budget {} should sleep {} times",
            attempts,
            attempts - 1
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_single_attempt_budget() {
    let health = MockHealth::failing_then_healthy(1);
    let poller = HealthPoller::new(health.clone(), policy(1, 30));
    let start = Instant::now();

    let result = poller.wait_for_healthy().await;

    assert!(matches!(
        result,
        Err(HarnessError::ConvergenceTimeout { attempts: 1, .. })
    ));
    assert_eq!(health.call_count(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn test_poller_converges_against_status_endpoint() {
    use env_tests::fixtures::ApiHealthClient;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(503).set_body_string("HEALTH_WARN"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"overall": "HEALTH_OK"})),
        )
        .mount(&server)
        .await;

    let client = ApiHealthClient::new(server.uri()).expect("HTTP client");
    let poller = HealthPoller::new(
        client,
        RetryPolicy::new(5, Duration::from_millis(10)).expect("valid policy"),
    );

    let status = poller.wait_for_healthy().await.expect("third attempt succeeds");

    assert_eq!(status.as_json()["overall"], "HEALTH_OK");
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_poller_retries_degraded_status_document() {
    use env_tests::fixtures::ApiHealthClient;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"overall": "HEALTH_ERR"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"overall": "HEALTH_OK"})),
        )
        .mount(&server)
        .await;

    let client = ApiHealthClient::new(server.uri()).expect("HTTP client");
    let poller = HealthPoller::new(
        client,
        RetryPolicy::new(3, Duration::ZERO).expect("valid policy"),
    );

    let status = poller.wait_for_healthy().await.expect("second attempt succeeds");

    assert_eq!(status.as_json()["overall"], "HEALTH_OK");
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_poller_times_out_on_persistent_health_err() {
    use env_tests::fixtures::ApiHealthClient;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"overall": "HEALTH_ERR"})),
        )
        .mount(&server)
        .await;

    let client = ApiHealthClient::new(server.uri()).expect("HTTP client");
    let poller = HealthPoller::new(
        client,
        RetryPolicy::new(3, Duration::ZERO).expect("valid policy"),
    );

    let result = poller.wait_for_healthy().await;

    assert!(matches!(
        result,
        Err(HarnessError::ConvergenceTimeout { attempts: 3, .. })
    ));
}
