//! Supervised execution of test bodies.
//!
//! A panic inside a supervised body is logged against the test, the test is
//! marked failed, the lifecycle is torn down, and the panic comes back as
//! [`HarnessError::Panicked`] so the test ends without running further
//! statements.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::error;

use crate::errors::HarnessError;
use crate::lifecycle::TestLifecycleManager;

/// Run `body`, converting a panic into a torn-down, failed test.
///
/// Normal completion returns the body's output untouched and does not tear
/// down; pair with [`TestLifecycleManager::run_scoped`] for that.
pub async fn supervise<F>(
    lifecycle: &TestLifecycleManager,
    body: F,
) -> Result<F::Output, HarnessError>
where
    F: Future,
{
    match AssertUnwindSafe(body).catch_unwind().await {
        Ok(output) => Ok(output),
        Err(payload) => Err(handle_panic(payload, lifecycle).await),
    }
}

/// Handle an already captured panic payload; `None` means no panic occurred.
pub async fn handle_panics(
    payload: Option<Box<dyn Any + Send>>,
    lifecycle: &TestLifecycleManager,
) -> Result<(), HarnessError> {
    match payload {
        None => Ok(()),
        Some(payload) => Err(handle_panic(payload, lifecycle).await),
    }
}

async fn handle_panic(
    payload: Box<dyn Any + Send>,
    lifecycle: &TestLifecycleManager,
) -> HarnessError {
    let handle = lifecycle.handle();
    let message = panic_message(&*payload);

    error!(
        target: "env_tests.guard",
        test = %handle.name(),
        panic = %message,
        "Unexpected panic occurred during test"
    );

    handle.fail();
    lifecycle.tear_down().await;

    HarnessError::Panicked {
        test: handle.name().to_string(),
        message,
    }
}

/// Text of a panic payload (`panic!` produces `&str` or `String`).
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
