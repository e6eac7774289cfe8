//! Storage Cluster Integration Test Harness
//!
//! This crate drives the lifecycle of a storage cluster deployed on
//! Kubernetes for integration tests: install it, validate that every role's
//! pods come up, wait for health convergence, and guarantee teardown on every
//! exit path including panics.
//!
//! # Components
//!
//! - [`pods::PodExpectationChecker`]: per-role pod count and state checks
//! - [`health::HealthPoller`]: fixed-interval, bounded health polling
//! - [`lifecycle::TestLifecycleManager`]: setup and idempotent teardown
//! - [`guard::supervise`]: panic interception with guaranteed teardown
//!
//! # Features
//!
//! - `smoke`: Install a cluster on the current kubectl context and validate it
//! - `all`: Enable all test categories
//!
//! # Prerequisites (live tests)
//!
//! 1. A cluster reachable through `kubectl` (kind works)
//! 2. `helm` in PATH when `TEST_HELM_INSTALL=true`
//! 3. The operator manifest at `TEST_OPERATOR_MANIFEST`
//!
//! # Usage
//!
//! ```bash
//! # Harness unit and mock-backed tests only
//! cargo test -p env-tests
//!
//! # Full install against the current cluster
//! cargo test -p env-tests --features smoke
//! ```

pub mod errors;
pub mod fixtures;
pub mod guard;
pub mod handle;
pub mod health;
pub mod lifecycle;
pub mod logging;
pub mod pods;

pub use errors::HarnessError;
pub use guard::{handle_panics, supervise};
pub use handle::TestHandle;
pub use health::{retry_fixed_interval, HealthPoller};
pub use lifecycle::{new_base_test_operations, new_base_test_operations_with, TestLifecycleManager};
pub use pods::PodExpectationChecker;
