//! Scripted stand-in for kubectl shared by the integration tests.
//!
//! The stand-in records every invocation, answers `get pods` with running
//! pods, and serves logs for one pod only.

#![allow(dead_code)]

use env_tests::fixtures::K8sHelper;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Answer to `get pods -n <ns> -o json`.
pub const POD_LIST: &str = r#"{"items":[
  {"metadata":{"name":"rook-ceph-mon-0"},"status":{"phase":"Running"}},
  {"metadata":{"name":"rook-ceph-osd-0"},"status":{"phase":"Running"}}
]}"#;

/// Answer to every label-selected `get pods`.
pub const SINGLE_POD: &str =
    r#"{"items":[{"metadata":{"name":"pod-0"},"status":{"phase":"Running"}}]}"#;

/// `get service rook-api` answer with a usable endpoint.
pub const API_SERVICE: &str =
    r#"{"spec":{"clusterIP":"10.96.0.20","ports":[{"name":"http","port":8124}]}}"#;

#[derive(Debug, Default)]
pub struct FakeKubectlBuilder {
    fail_cluster_info: bool,
    fail_cluster_delete: bool,
    service: Option<&'static str>,
}

impl FakeKubectlBuilder {
    /// `cluster-info` exits 1.
    pub fn unreachable(mut self) -> Self {
        self.fail_cluster_info = true;
        self
    }

    /// `delete -n <ns> cluster ...` exits 1.
    pub fn failing_cluster_delete(mut self) -> Self {
        self.fail_cluster_delete = true;
        self
    }

    /// `get service` prints `json`; without it the service is not found.
    pub fn with_service(mut self, json: &'static str) -> Self {
        self.service = Some(json);
        self
    }

    pub fn build(self) -> FakeKubectl {
        let dir = tempfile::tempdir().expect("temp dir");
        let binary = dir.path().join("kubectl");
        let calls = dir.path().join("calls.txt");

        let service_branch = match self.service {
            Some(json) => format!("cat <<'EOF'\n{json}\nEOF"),
            None => "echo 'services \"rook-api\" not found' >&2\n      exit 1".to_string(),
        };

        let script = format!(
            r#"#!/bin/sh
echo "$*" >> '{calls}'
case "$1" in
  cluster-info)
    exit {cluster_info_status}
    ;;
  apply)
    cat > /dev/null
    ;;
  get)
    if [ "$2" = "service" ]; then
      {service_branch}
    elif [ "$5" = "-l" ]; then
      cat <<'EOF'
{single}
EOF
    else
      cat <<'EOF'
{list}
EOF
    fi
    ;;
  logs)
    if [ "$2" = "rook-ceph-mon-0" ]; then
      echo "mon.a elected leader"
    else
      echo "container not ready" >&2
      exit 1
    fi
    ;;
  delete)
    if [ "$4" = "cluster" ]; then
      exit {delete_status}
    fi
    ;;
esac
exit 0
"#,
            calls = calls.display(),
            cluster_info_status = u8::from(self.fail_cluster_info),
            service_branch = service_branch,
            single = SINGLE_POD,
            list = POD_LIST,
            delete_status = u8::from(self.fail_cluster_delete),
        );

        std::fs::write(&binary, script).expect("write script");
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755))
            .expect("make script executable");

        FakeKubectl { dir, binary, calls }
    }
}

pub struct FakeKubectl {
    dir: TempDir,
    binary: PathBuf,
    calls: PathBuf,
}

impl FakeKubectl {
    pub fn builder() -> FakeKubectlBuilder {
        FakeKubectlBuilder::default()
    }

    pub fn binary(&self) -> String {
        self.binary.to_string_lossy().into_owned()
    }

    pub fn helper(&self) -> K8sHelper {
        K8sHelper::with_binary(self.binary())
    }

    /// Every invocation so far, arguments joined by spaces.
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(&self.calls)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn log_dir(&self) -> PathBuf {
        self.dir.path().join("logs")
    }
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}
