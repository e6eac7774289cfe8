//! # Env Test Utilities
//!
//! In-memory implementations of the collaborator contracts from
//! `harness_common::contracts`, for exercising the harness without a cluster.
//!
//! ## Modules
//!
//! - `mock_installer` - Scripted install outcome, records every call
//! - `mock_pods` - Fixed pod listings per (role, namespace)
//! - `mock_health` - Scripted health responses with a call counter
//!
//! ## Usage
//!
//! ```rust,ignore
//! use env_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     // Installer that reports a successful install
//!     let installer = MockInstaller::succeeding();
//!
//!     // Two unhealthy answers, then healthy
//!     let health = MockHealth::failing_then_healthy(2);
//!
//!     // Three running monitors
//!     let pods = MockPods::new().with_running("rook-ceph-mon", "rook", 3);
//!
//!     // Hand clones to the harness and inspect the originals afterwards
//!     assert_eq!(installer.install_count(), 0);
//! }
//! ```

pub mod mock_health;
pub mod mock_installer;
pub mod mock_pods;

// Re-export commonly used items
pub use mock_health::*;
pub use mock_installer::*;
pub use mock_pods::*;
