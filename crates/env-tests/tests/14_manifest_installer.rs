//! Manifest installer against a scripted stand-in for kubectl.

#![cfg(unix)]

mod support;

use env_tests::fixtures::{InstallerConfig, ManifestInstaller};
use harness_common::config::{RetryPolicy, TestContext};
use harness_common::contracts::Installer;
use serial_test::serial;
use std::time::Duration;
use support::{read, FakeKubectl};

fn installer(fake: &FakeKubectl) -> ManifestInstaller {
    let config = InstallerConfig {
        log_dir: fake.log_dir(),
        readiness: RetryPolicy::new(2, Duration::ZERO).expect("valid policy"),
        ..InstallerConfig::default()
    };
    ManifestInstaller::new(fake.helper(), config)
}

fn single_mon_context() -> TestContext {
    TestContext::builder()
        .mon_count(1)
        .build()
        .expect("valid context")
}

#[tokio::test]
#[serial]
async fn test_install_applies_operator_then_cluster() {
    let fake = FakeKubectl::builder().build();
    let installer = installer(&fake);

    let installed = installer
        .install(&single_mon_context())
        .await
        .expect("install runs");

    assert!(installed);
    let calls = fake.calls();
    assert_eq!(
        calls.first().map(String::as_str),
        Some("apply -n rook-system -f deploy/rook-operator.yaml")
    );
    assert!(calls.iter().any(|c| c == "apply -f -"), "calls: {calls:?}");
    assert!(calls
        .iter()
        .any(|c| c == "get pods -n rook -l app=rook-ceph-mon -o json"));
}

#[tokio::test]
#[serial]
async fn test_install_reports_false_when_mons_missing() {
    let fake = FakeKubectl::builder().build();
    let installer = installer(&fake);
    // The stand-in only ever lists one pod per role
    let context = TestContext::builder().mon_count(3).build().expect("valid context");

    let installed = installer.install(&context).await.expect("install runs");

    assert!(!installed);
}

#[tokio::test]
#[serial]
async fn test_uninstall_runs_every_step() {
    let fake = FakeKubectl::builder().build();
    let installer = installer(&fake);

    installer
        .uninstall(&single_mon_context())
        .await
        .expect("uninstall succeeds");

    assert_eq!(
        fake.calls(),
        vec![
            "delete -n rook cluster rook --ignore-not-found=true",
            "delete namespace rook --ignore-not-found=true",
            "delete -n rook-system -f deploy/rook-operator.yaml --ignore-not-found=true",
        ]
    );
}

#[tokio::test]
#[serial]
async fn test_uninstall_continues_past_failed_step() {
    let fake = FakeKubectl::builder().failing_cluster_delete().build();
    let installer = installer(&fake);

    let result = installer.uninstall(&single_mon_context()).await;

    assert!(result.is_err());
    assert_eq!(fake.calls().len(), 3, "later steps must still run");
}

#[tokio::test]
#[serial]
async fn test_gather_logs_writes_one_file_per_pod() {
    let fake = FakeKubectl::builder().build();
    let installer = installer(&fake);

    installer
        .gather_logs("rook", "suite::mon failover")
        .await
        .expect("gathering succeeds");

    let dir = fake.log_dir().join("suite_mon_failover").join("rook");
    let mon_log = read(&dir.join("rook-ceph-mon-0.log"));
    assert!(mon_log.starts_with("# pod rook-ceph-mon-0 (Running) gathered "));
    assert!(mon_log.contains("mon.a elected leader"));

    // Log fetch failures for one pod are skipped
    assert!(!dir.join("rook-ceph-osd-0.log").exists());
}
