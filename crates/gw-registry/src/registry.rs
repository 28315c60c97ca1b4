//! In-memory model <-> endpoint index with a TTL read-through cache in front of it. Readers never
//! block on writers: the in-memory maps live behind an `ArcSwap`, so a write rebuilds both indexes
//! and atomically swaps in a fresh immutable snapshot while reads proceed lock-free against
//! whatever snapshot was current when they started.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use gw_cache::Cache;

/// Per-model detail record mirroring the OpenAI `/v1/models` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDetail {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

/// Immutable point-in-time view of the registry. Cheap to clone (it's swapped wholesale on every
/// write, copy-on-write style).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// model id -> endpoints serving it, in registration order (first registered wins ties,
    /// "deterministic selection").
    pub model_to_endpoints: HashMap<String, Vec<String>>,
    /// endpoint -> models it serves.
    pub endpoint_to_models: HashMap<String, Vec<ModelDetail>>,
    /// Services in the order they were first registered. `endpoint_to_models` is itself a
    /// `HashMap` with randomized iteration order, so `model_to_endpoints` is rebuilt by walking
    /// this `Vec` rather than the map directly — otherwise tie-break selection between two
    /// endpoints serving the same model would vary from run to run.
    service_order: Vec<String>,
}

impl RegistrySnapshot {
    pub fn endpoints_for_model(&self, model_id: &str) -> &[String] {
        self.model_to_endpoints
            .get(model_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First endpoint in registration order serving `model_id`, or `None` if no endpoint serves it.
    pub fn first_endpoint_for_model(&self, model_id: &str) -> Option<&str> {
        self.endpoints_for_model(model_id).first().map(String::as_str)
    }

    pub fn models_for_endpoint(&self, endpoint: &str) -> Option<&[ModelDetail]> {
        self.endpoint_to_models.get(endpoint).map(Vec::as_slice)
    }

    pub fn all_models(&self) -> Vec<&ModelDetail> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for models in self.endpoint_to_models.values() {
            for model in models {
                if seen.insert(&model.id) {
                    out.push(model);
                }
            }
        }
        out
    }
}

const CACHE_KEY_GENERAL: &str = "registry:snapshot";
const CACHE_TTL_GENERAL: Duration = Duration::from_secs(60);
const CACHE_TTL_MODEL_DETAIL: Duration = Duration::from_secs(600);

/// The registry singleton (owned by the composition root, per Design Notes — not a process-wide
/// global).
pub struct ProviderRegistry {
    snapshot: ArcSwap<RegistrySnapshot>,
    cache: Cache,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(Cache::default())
    }
}

impl ProviderRegistry {
    pub fn new(cache: Cache) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(RegistrySnapshot::default()),
            cache,
        }
    }

    /// Read-through accelerator for `GET /v1/models`. On cache miss it falls back to the in-memory
    /// snapshot, which is always present — the cache is never the source of truth.
    pub async fn get_model_to_endpoints(&self) -> Arc<RegistrySnapshot> {
        let current = self.snapshot.load_full();
        if self.cache.get::<bool>(CACHE_KEY_GENERAL).await.is_none() {
            self.cache.set(CACHE_KEY_GENERAL, &true, CACHE_TTL_GENERAL).await;
        }
        current
    }

    /// Direct in-memory read, bypassing the cache entirely. This is what every request-plane lookup on
    /// the hot path actually uses; the cache above only accelerates the aggregate `/v1/models` listing.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.load_full()
    }

    pub async fn model_detail(&self, model_id: &str) -> Option<ModelDetail> {
        let cache_key = format!("registry:model:{model_id}");
        if let Some(detail) = self.cache.get::<ModelDetail>(&cache_key).await {
            return Some(detail);
        }
        let snapshot = self.snapshot.load();
        let detail = snapshot
            .endpoint_to_models
            .values()
            .flatten()
            .find(|m| m.id == model_id)
            .cloned();
        if let Some(detail) = &detail {
            self.cache.set(&cache_key, detail, CACHE_TTL_MODEL_DETAIL).await;
        }
        detail
    }

    /// Updates the registry with the model set reported by `service` for this discovery tick. If the
    /// incoming id set is identical to what's already registered for this service, this is a no-op —
    /// cache churn stays bounded when an upstream is stable.
    pub async fn set_models(&self, service: &str, models: Vec<ModelDetail>) {
        let current = self.snapshot.load();
        if let Some(existing) = current.endpoint_to_models.get(service) {
            let mut existing_ids: Vec<&str> = existing.iter().map(|m| m.id.as_str()).collect();
            let mut incoming_ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
            existing_ids.sort_unstable();
            incoming_ids.sort_unstable();
            if existing_ids == incoming_ids {
                return;
            }
        }

        let mut next = (**current).clone();
        next.endpoint_to_models.insert(service.to_string(), models.clone());
        if !next.service_order.iter().any(|s| s == service) {
            next.service_order.push(service.to_string());
        }

        // Rebuild model_to_endpoints from scratch: simplest correct way to
        // keep both directions consistent without tracking per-model
        // reference counts: invalidation drops both directions together.
        // Walk `service_order`, not `endpoint_to_models` (a `HashMap`), so
        // the result is deterministic across runs.
        let mut model_to_endpoints: HashMap<String, Vec<String>> = HashMap::new();
        for endpoint in &next.service_order {
            let Some(endpoint_models) = next.endpoint_to_models.get(endpoint) else {
                continue;
            };
            for model in endpoint_models {
                let entry = model_to_endpoints.entry(model.id.clone()).or_default();
                if !entry.contains(endpoint) {
                    entry.push(endpoint.clone());
                }
            }
        }
        next.model_to_endpoints = model_to_endpoints;

        self.snapshot.store(Arc::new(next));
        self.cache.unlink(CACHE_KEY_GENERAL);
        self.cache.delete_pattern(&format!("registry:service:{service}")).await;
        for model in &models {
            self.cache.unlink(format!("registry:model:{}", model.id));
        }
    }

    /// Drops `service` from both index directions — called when an upstream becomes unreachable so it
    /// disappears from routing rather than poisoning the registry with stale entries.
    pub async fn remove_service_models(&self, service: &str) {
        let current = self.snapshot.load();
        if !current.endpoint_to_models.contains_key(service) {
            return;
        }

        let mut next = (**current).clone();
        let removed_models = next.endpoint_to_models.remove(service).unwrap_or_default();
        next.service_order.retain(|s| s != service);
        for entry in next.model_to_endpoints.values_mut() {
            entry.retain(|e| e != service);
        }
        next.model_to_endpoints.retain(|_, endpoints| !endpoints.is_empty());

        self.snapshot.store(Arc::new(next));
        self.cache.unlink(CACHE_KEY_GENERAL);
        for model in &removed_models {
            self.cache.unlink(format!("registry:model:{}", model.id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str) -> ModelDetail {
        ModelDetail {
            id: id.to_string(),
            object: "model".to_string(),
            created: 0,
            owned_by: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn set_then_remove_drops_both_directions() {
        let registry = ProviderRegistry::default();
        registry
            .set_models("svc-a", vec![model("m1"), model("m2")])
            .await;
        assert_eq!(
            registry.snapshot().first_endpoint_for_model("m1"),
            Some("svc-a")
        );

        registry.remove_service_models("svc-a").await;
        let snapshot = registry.snapshot();
        assert!(snapshot.first_endpoint_for_model("m1").is_none());
        assert!(snapshot.first_endpoint_for_model("m2").is_none());
        assert!(!snapshot.endpoint_to_models.contains_key("svc-a"));
    }

    #[tokio::test]
    async fn tie_break_prefers_first_registered_endpoint() {
        let registry = ProviderRegistry::default();
        registry.set_models("svc-a", vec![model("shared")]).await;
        registry.set_models("svc-b", vec![model("shared")]).await;
        assert_eq!(
            registry.snapshot().first_endpoint_for_model("shared"),
            Some("svc-a")
        );
    }

    #[tokio::test]
    async fn unchanged_model_set_is_a_no_op() {
        let registry = ProviderRegistry::default();
        registry.set_models("svc-a", vec![model("m1")]).await;
        let before = registry.snapshot();
        registry.set_models("svc-a", vec![model("m1")]).await;
        let after = registry.snapshot();
        assert!(Arc::ptr_eq(&before, &after), "re-registering the same set must not rebuild");
    }

    #[tokio::test]
    async fn removing_unknown_service_is_a_no_op() {
        let registry = ProviderRegistry::default();
        registry.remove_service_models("does-not-exist").await;
        assert!(registry.snapshot().endpoint_to_models.is_empty());
    }
}
