//! Background discovery tick: every `interval` seconds, fetch `/v1/models` from each configured
//! upstream under a bounded timeout and fold the result into the registry. This module stays
//! transport-agnostic — `ModelSource` is the seam a higher layer (the wreq-backed dispatcher in
//! `gw-core`) implements per upstream, keeping HTTP concerns out of the registry itself.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::registry::{ModelDetail, ProviderRegistry};

#[async_trait]
pub trait ModelSource: Send + Sync {
    /// Stable identifier for this upstream, used as the registry's `service`/endpoint key.
    fn name(&self) -> &str;

    async fn list_models(&self) -> Result<Vec<ModelDetail>, anyhow::Error>;
}

pub struct DiscoveryHandle {
    task: tokio::task::JoinHandle<()>,
}

impl DiscoveryHandle {
    /// Cancels the background tick. Awaited during shutdown so the discovery loop never outlives the
    /// process's drain window.
    pub async fn shutdown(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Spawns the periodic discovery loop. `interval` defaults to 60s per.
pub fn spawn_discovery(
    registry: Arc<ProviderRegistry>,
    sources: Vec<Arc<dyn ModelSource>>,
    interval: Duration,
) -> DiscoveryHandle {
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            run_tick(&registry, &sources).await;
        }
    });
    DiscoveryHandle { task }
}

async fn run_tick(registry: &ProviderRegistry, sources: &[Arc<dyn ModelSource>]) {
    for source in sources {
        let fetch = tokio::time::timeout(DEFAULT_FETCH_TIMEOUT, source.list_models());
        match fetch.await {
            Ok(Ok(models)) => {
                registry.set_models(source.name(), models).await;
            }
            Ok(Err(err)) => {
                tracing::warn!(service = source.name(), error = %err, "model discovery failed, dropping service from registry");
                registry.remove_service_models(source.name()).await;
            }
            Err(_) => {
                tracing::warn!(service = source.name(), "model discovery timed out, dropping service from registry");
                registry.remove_service_models(source.name()).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakySource {
        name: String,
        fail_first_n: AtomicUsize,
    }

    #[async_trait]
    impl ModelSource for FlakySource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn list_models(&self) -> Result<Vec<ModelDetail>, anyhow::Error> {
            if self.fail_first_n.fetch_sub(1, Ordering::SeqCst) > 0 {
                anyhow::bail!("network error");
            }
            Ok(vec![ModelDetail {
                id: "m1".to_string(),
                object: "model".to_string(),
                created: 0,
                owned_by: "test".to_string(),
            }])
        }
    }

    #[tokio::test]
    async fn transient_failure_then_recovery_matches_s5() {
        let registry = Arc::new(ProviderRegistry::default());
        let source = Arc::new(FlakySource {
            name: "upstream-a".to_string(),
            fail_first_n: AtomicUsize::new(1),
        });
        let sources: Vec<Arc<dyn ModelSource>> = vec![source];

        run_tick(&registry, &sources).await;
        assert!(registry.snapshot().first_endpoint_for_model("m1").is_none());

        run_tick(&registry, &sources).await;
        assert_eq!(
            registry.snapshot().first_endpoint_for_model("m1"),
            Some("upstream-a")
        );
    }
}
