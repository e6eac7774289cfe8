//! Handle on the running test for failure reporting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Name used when the current thread carries none.
pub const UNNAMED_TEST: &str = "unnamed-test";

/// Identifies the running test and records whether it has failed.
///
/// Clones share the same failure flag. Marking a test failed is non-fatal:
/// execution continues so teardown and diagnostics can still run.
#[derive(Debug, Clone)]
pub struct TestHandle {
    inner: Arc<TestHandleInner>,
}

#[derive(Debug)]
struct TestHandleInner {
    name: String,
    failed: AtomicBool,
}

impl TestHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TestHandleInner {
                name: name.into(),
                failed: AtomicBool::new(false),
            }),
        }
    }

    /// Handle named after the current thread.
    ///
    /// libtest runs each test on a thread named after the test path, and
    /// `#[tokio::test]` keeps the test body on that thread.
    pub fn current() -> Self {
        let name = std::thread::current()
            .name()
            .filter(|n| *n != "main")
            .unwrap_or(UNNAMED_TEST)
            .to_string();
        Self::new(name)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Mark the test as failed without aborting it.
    pub fn fail(&self) {
        self.inner.failed.store(true, Ordering::SeqCst);
    }

    pub fn failed(&self) -> bool {
        self.inner.failed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_is_shared_between_clones() {
        let handle = TestHandle::new("suite::case");
        let clone = handle.clone();

        assert!(!handle.failed());
        clone.fail();
        assert!(handle.failed());
        assert_eq!(handle.name(), "suite::case");
    }

    #[test]
    fn test_current_uses_thread_name() {
        let handle = std::thread::Builder::new()
            .name("pool_tests::creates_pool".to_string())
            .spawn(TestHandle::current)
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(handle.name(), "pool_tests::creates_pool");
    }
}
