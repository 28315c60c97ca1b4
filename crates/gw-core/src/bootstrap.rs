//! Composition root. Connects storage, merges `CLI > ENV > stored config` (mirroring
//! `bootstrap::bootstrap` precedence), builds every request-plane service once, and spawns the
//! registry's background discovery tick.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use gw_cache::Cache;
use gw_registry::{ModelSource, ProviderRegistry, spawn_discovery, DiscoveryHandle};
use gw_storage::{SeaOrmStorage, Storage};

use crate::auth::PrincipalResolver;
use crate::auth::jwt::JwtVerifier;
use crate::config::{CliArgs, GatewayConfig, GatewayConfigPatch};
use crate::conversation::ConversationStore;
use crate::credential::CredentialStore;
use crate::crypto::ProviderKeyCipher;
use crate::dispatch::Dispatcher;
use crate::dispatch::http_client::{UpstreamHttpClient, UpstreamModelSource};
use crate::events::EventHub;
use crate::response::ResponseService;
use crate::scheduler::RequestScheduler;
use crate::tenant::TenantGraph;

/// Everything a request handler needs, owned once by the composition root and shared by reference.
pub struct AppState {
    pub config: GatewayConfig,
    pub storage: Arc<dyn Storage>,
    pub tenant: Arc<TenantGraph>,
    pub credentials: Arc<CredentialStore>,
    pub principals: Arc<PrincipalResolver>,
    pub registry: Arc<ProviderRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub conversations: Arc<ConversationStore>,
    pub responses: Arc<ResponseService>,
    pub scheduler: Arc<RequestScheduler>,
    pub events: Arc<EventHub>,
}

pub struct Bootstrap {
    pub state: Arc<AppState>,
    /// Held by the caller so the discovery loop can be cancelled during shutdown.
    pub discovery: DiscoveryHandle,
}

pub async fn bootstrap_from_env() -> anyhow::Result<Bootstrap> {
    bootstrap(CliArgs::parse()).await
}

pub async fn bootstrap(args: CliArgs) -> anyhow::Result<Bootstrap> {
    let cli_patch: GatewayConfigPatch = args.into();
    let db_write_dsn = cli_patch
        .db_write_dsn
        .clone()
        .unwrap_or_else(|| "sqlite://gateway.db?mode=rwc".to_string());

    let storage = Arc::new(
        SeaOrmStorage::connect(&db_write_dsn)
            .await
            .context("connect storage")?,
    );
    storage.sync().await.context("schema sync")?;

    // CLI/ENV > stored config, merged once at boot and persisted back.
    let stored = storage.load_global_config().await.context("load global config")?;
    let mut merged = stored
        .and_then(|row| serde_json::from_value::<GatewayConfigPatch>(row.config).ok())
        .unwrap_or_default();
    merged.overlay(cli_patch);
    let config = merged.into_config();
    storage
        .upsert_global_config(&serde_json::to_value(GatewayConfigPatch::from(config.clone()))?)
        .await
        .context("persist merged global config")?;

    let tenant = Arc::new(TenantGraph::load(storage.clone() as Arc<dyn Storage>).await?);
    let credentials = Arc::new(CredentialStore::new(storage.clone(), config.apikey_secret.clone()));
    let jwt = JwtVerifier::new(&config.jwt_secret);
    let principals = Arc::new(PrincipalResolver::new(
        storage.clone(),
        credentials.clone(),
        jwt,
        tenant.clone(),
    ));

    let cache = Cache::default();
    let registry = Arc::new(ProviderRegistry::new(cache));
    let cipher = ProviderKeyCipher::new(&config.model_provider_secret);
    let http_client = UpstreamHttpClient::new().context("build upstream http client")?;

    let sources = model_sources(storage.as_ref(), &http_client, &cipher).await?;
    let discovery = spawn_discovery(registry.clone(), sources, config.discovery_interval());

    let dispatcher = Arc::new(Dispatcher::new(
        storage.clone(),
        registry.clone(),
        cipher,
        http_client.clone(),
    ));

    let conversations = Arc::new(ConversationStore::new(storage.clone()));
    let responses = Arc::new(ResponseService::new(storage.clone()));
    let events = Arc::new(EventHub::default());
    let scheduler = Arc::new(RequestScheduler::new(config.request_deadline()));

    let state = Arc::new(AppState {
        config,
        storage: storage as Arc<dyn Storage>,
        tenant,
        credentials,
        principals,
        registry,
        dispatcher,
        conversations,
        responses,
        scheduler,
        events,
    });

    Ok(Bootstrap { state, discovery })
}

/// Binds every active [`gw_storage::ModelProviderRecord`] to a [`ModelSource`] the discovery tick
/// can poll. The provider's own `public_id` is the registry's service key so
/// `Dispatcher::resolve`'s registry fallback path resolves straight back to the provider row.
async fn model_sources(
    storage: &dyn Storage,
    client: &UpstreamHttpClient,
    cipher: &ProviderKeyCipher,
) -> anyhow::Result<Vec<Arc<dyn ModelSource>>> {
    let providers = storage.list_active_model_providers().await?;
    providers
        .into_iter()
        .map(|provider| {
            let api_key = if provider.encrypted_api_key.is_empty() {
                None
            } else {
                Some(cipher.decrypt(&provider.encrypted_api_key)?)
            };
            Ok(Arc::new(UpstreamModelSource {
                name: provider.public_id,
                base_url: provider.base_url,
                api_key,
                client: client.clone(),
            }) as Arc<dyn ModelSource>)
        })
        .collect()
}

