//! Provider registry: the model-to-endpoint index every completion request consults to pick an
//! upstream. This crate intentionally does **not** depend on axum or any concrete HTTP client —
//! discovery ticks call out through the [`ModelSource`] trait, and a higher layer (`gw-core`)
//! supplies the wreq-backed implementation that actually talks to upstreams.

pub mod discovery;
pub mod registry;

pub use discovery::{DiscoveryHandle, ModelSource, spawn_discovery};
pub use registry::{ModelDetail, ProviderRegistry, RegistrySnapshot};
