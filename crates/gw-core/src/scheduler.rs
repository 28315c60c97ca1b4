//! Request scheduler: the thin layer every handler runs under. Applies a per-request deadline,
//! propagates client-disconnect cancellation into the pipeline, decides inline-vs-background
//! execution for a completion, and maps a panicking handler onto a structured `internal` error
//! rather than tearing down the connection.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;

use gw_common::{GatewayError, GatewayResult};

use crate::orchestrator::CancelSignal;

pub struct RequestScheduler {
    default_deadline: Duration,
}

impl RequestScheduler {
    pub fn new(default_deadline: Duration) -> Self {
        Self { default_deadline }
    }

    pub fn default_deadline(&self) -> Duration {
        self.default_deadline
    }

    /// Runs `work` under `deadline`, translating a timed-out future into `providerTimeout`. Panics
    /// inside `work` are caught and mapped to `internal` rather than propagated, so one misbehaving
    /// handler can't take the listener down.
    pub async fn run_with_deadline<F>(&self, deadline: Duration, work: F) -> GatewayResult<F::Output>
    where
        F: Future + Send,
    {
        match tokio::time::timeout(deadline, AssertUnwindSafe(work).catch_unwind()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(panic)) => Err(GatewayError::internal(anyhow::anyhow!(
                "handler panicked: {}",
                panic_message(&panic)
            ))),
            Err(_) => Err(GatewayError::ProviderTimeout),
        }
    }

    /// Runs `work` under the configured default deadline.
    pub async fn run<F>(&self, work: F) -> GatewayResult<F::Output>
    where
        F: Future + Send,
    {
        self.run_with_deadline(self.default_deadline, work).await
    }

    /// Hands `work` to a detached task for `background: true` completions. The caller already has the
    /// `Response` row in `processing` and is expected to poll or subscribe externally; this task's own
    /// panics are caught the same way `run` catches them, just logged instead of returned since there's
    /// no caller left to return to.
    pub fn spawn_background<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move {
            if AssertUnwindSafe(work).catch_unwind().await.is_err() {
                tracing::error!("background completion task panicked");
            }
        });
    }
}

/// Ties a client connection's disconnect into a [`CancelSignal`] the orchestrator observes. The
/// caller drives `on_disconnect` to completion in a companion task (e.g. axum's
/// `Request::into_body.is_end_stream` or a `tokio::select!` against the connection future) and
/// calls [`CancelSignal::cancel`] on it; this helper is the shared primitive both the streaming and
/// unary paths hand into the completion pipeline.
pub fn new_cancel_signal() -> CancelSignal {
    CancelSignal::new()
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_within_deadline() {
        let scheduler = RequestScheduler::new(Duration::from_secs(5));
        let result = scheduler.run(async { 42 }).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn expiry_maps_to_provider_timeout() {
        let scheduler = RequestScheduler::new(Duration::from_millis(10));
        let result = scheduler
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
            })
            .await;
        assert!(matches!(result, Err(GatewayError::ProviderTimeout)));
    }

    #[tokio::test]
    async fn panic_is_caught_as_internal_error() {
        let scheduler = RequestScheduler::new(Duration::from_secs(5));
        let result = scheduler
            .run(async {
                panic!("boom");
            })
            .await;
        assert!(matches!(result, Err(GatewayError::Internal { .. })));
    }
}
