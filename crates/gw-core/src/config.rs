//! CLI/env configuration loader: merges `CLI > ENV > stored config`, mirroring
//! `bootstrap::CliArgs` + `GlobalConfigPatch` precedence, and persists the merged result back to
//! the database on every boot.

use clap::Parser;
use serde::{Deserialize, Serialize};

use gw_common::ids::new_correlation_id;

#[derive(Debug, Clone, Parser)]
#[command(name = "gateway", version, about = "Multi-tenant OpenAI-compatible model gateway")]
pub struct CliArgs {
    #[arg(long, env = "HOST")]
    pub host: Option<String>,
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,
    #[arg(long, env = "APIKEY_SECRET")]
    pub apikey_secret: Option<String>,
    #[arg(long, env = "MODEL_PROVIDER_SECRET")]
    pub model_provider_secret: Option<String>,
    #[arg(long, env = "JAN_INFERENCE_MODEL_URL")]
    pub jan_inference_model_url: Option<String>,
    #[arg(long, env = "DB_POSTGRESQL_WRITE_DSN")]
    pub db_write_dsn: Option<String>,
    #[arg(long, env = "DB_POSTGRESQL_READ1_DSN")]
    pub db_read_dsn: Option<String>,
    /// Comma-separated list; entries may be `*.suffix` wildcards.
    #[arg(long, env = "ALLOWED_CORS_HOSTS")]
    pub allowed_cors_hosts: Option<String>,
    #[arg(long, env = "ENABLE_ADMIN_API")]
    pub enable_admin_api: Option<bool>,
    /// Per-completion deadline in seconds, default 120.
    #[arg(long, env = "REQUEST_DEADLINE_SECS")]
    pub request_deadline_secs: Option<u64>,
    /// Registry discovery tick interval in seconds, default 60.
    #[arg(long, env = "DISCOVERY_INTERVAL_SECS")]
    pub discovery_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub apikey_secret: String,
    pub model_provider_secret: String,
    pub jan_inference_model_url: Option<String>,
    pub db_write_dsn: String,
    pub db_read_dsn: Option<String>,
    pub allowed_cors_hosts: Vec<String>,
    pub enable_admin_api: bool,
    pub request_deadline_secs: u64,
    pub discovery_interval_secs: u64,
}

impl GatewayConfig {
    pub fn request_deadline(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_deadline_secs)
    }

    pub fn discovery_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.discovery_interval_secs)
    }
}

/// Partially-filled configuration; each stage (DB load, CLI/ENV overlay) only sets the fields it
/// knows about, mirroring `GlobalConfigPatch`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfigPatch {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub jwt_secret: Option<String>,
    pub apikey_secret: Option<String>,
    pub model_provider_secret: Option<String>,
    pub jan_inference_model_url: Option<String>,
    pub db_write_dsn: Option<String>,
    pub db_read_dsn: Option<String>,
    pub allowed_cors_hosts: Option<Vec<String>>,
    pub enable_admin_api: Option<bool>,
    pub request_deadline_secs: Option<u64>,
    pub discovery_interval_secs: Option<u64>,
}

impl GatewayConfigPatch {
    /// `other`'s fields win wherever set; this mirrors the `CLI > ENV > DB` precedence when `other` is
    /// the CLI/ENV layer.
    pub fn overlay(&mut self, other: GatewayConfigPatch) {
        if other.host.is_some() {
            self.host = other.host;
        }
        if other.port.is_some() {
            self.port = other.port;
        }
        if other.jwt_secret.is_some() {
            self.jwt_secret = other.jwt_secret;
        }
        if other.apikey_secret.is_some() {
            self.apikey_secret = other.apikey_secret;
        }
        if other.model_provider_secret.is_some() {
            self.model_provider_secret = other.model_provider_secret;
        }
        if other.jan_inference_model_url.is_some() {
            self.jan_inference_model_url = other.jan_inference_model_url;
        }
        if other.db_write_dsn.is_some() {
            self.db_write_dsn = other.db_write_dsn;
        }
        if other.db_read_dsn.is_some() {
            self.db_read_dsn = other.db_read_dsn;
        }
        if other.allowed_cors_hosts.is_some() {
            self.allowed_cors_hosts = other.allowed_cors_hosts;
        }
        if other.enable_admin_api.is_some() {
            self.enable_admin_api = other.enable_admin_api;
        }
        if other.request_deadline_secs.is_some() {
            self.request_deadline_secs = other.request_deadline_secs;
        }
        if other.discovery_interval_secs.is_some() {
            self.discovery_interval_secs = other.discovery_interval_secs;
        }
    }

    /// Finalizes the patch into a runnable config. Secrets that are still missing after the CLI/ENV/DB
    /// overlay are generated once and logged at warn level — a dev-mode convenience, never silent in
    /// production logs.
    pub fn into_config(mut self) -> GatewayConfig {
        for (label, secret) in [
            ("jwt_secret", &mut self.jwt_secret),
            ("apikey_secret", &mut self.apikey_secret),
            ("model_provider_secret", &mut self.model_provider_secret),
        ] {
            if secret.is_none() {
                let generated = new_correlation_id();
                tracing::warn!(secret = label, "no value configured, generated an ephemeral one for this boot");
                *secret = Some(generated);
            }
        }

        GatewayConfig {
            host: self.host.unwrap_or_else(|| "0.0.0.0".to_string()),
            port: self.port.unwrap_or(8080),
            jwt_secret: self.jwt_secret.expect("filled above"),
            apikey_secret: self.apikey_secret.expect("filled above"),
            model_provider_secret: self.model_provider_secret.expect("filled above"),
            jan_inference_model_url: self.jan_inference_model_url,
            db_write_dsn: self.db_write_dsn.unwrap_or_else(|| "sqlite://gateway.db?mode=rwc".to_string()),
            db_read_dsn: self.db_read_dsn,
            allowed_cors_hosts: self.allowed_cors_hosts.unwrap_or_default(),
            enable_admin_api: self.enable_admin_api.unwrap_or(false),
            request_deadline_secs: self.request_deadline_secs.unwrap_or(120),
            discovery_interval_secs: self.discovery_interval_secs.unwrap_or(60),
        }
    }
}

impl From<GatewayConfig> for GatewayConfigPatch {
    fn from(value: GatewayConfig) -> Self {
        Self {
            host: Some(value.host),
            port: Some(value.port),
            jwt_secret: Some(value.jwt_secret),
            apikey_secret: Some(value.apikey_secret),
            model_provider_secret: Some(value.model_provider_secret),
            jan_inference_model_url: value.jan_inference_model_url,
            db_write_dsn: Some(value.db_write_dsn),
            db_read_dsn: value.db_read_dsn,
            allowed_cors_hosts: Some(value.allowed_cors_hosts),
            enable_admin_api: Some(value.enable_admin_api),
            request_deadline_secs: Some(value.request_deadline_secs),
            discovery_interval_secs: Some(value.discovery_interval_secs),
        }
    }
}

impl From<CliArgs> for GatewayConfigPatch {
    fn from(args: CliArgs) -> Self {
        let allowed_cors_hosts = args.allowed_cors_hosts.map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });
        Self {
            host: args.host,
            port: args.port,
            jwt_secret: args.jwt_secret,
            apikey_secret: args.apikey_secret,
            model_provider_secret: args.model_provider_secret,
            jan_inference_model_url: args.jan_inference_model_url,
            db_write_dsn: args.db_write_dsn,
            db_read_dsn: args.db_read_dsn,
            allowed_cors_hosts,
            enable_admin_api: args.enable_admin_api,
            request_deadline_secs: args.request_deadline_secs,
            discovery_interval_secs: args.discovery_interval_secs,
        }
    }
}

/// Checks a CORS origin host against the configured allow-list, honoring `*.suffix` wildcard
/// entries.
pub fn cors_host_allowed(allowed: &[String], host: &str) -> bool {
    allowed.iter().any(|entry| {
        if let Some(suffix) = entry.strip_prefix("*.") {
            host == suffix || host.ends_with(&format!(".{suffix}"))
        } else {
            entry == host
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_overlay_prefers_other_when_set() {
        let mut base = GatewayConfigPatch {
            host: Some("base".to_string()),
            ..Default::default()
        };
        base.overlay(GatewayConfigPatch {
            host: Some("override".to_string()),
            ..Default::default()
        });
        assert_eq!(base.host.as_deref(), Some("override"));
    }

    #[test]
    fn patch_overlay_keeps_base_when_other_unset() {
        let mut base = GatewayConfigPatch {
            port: Some(1234),
            ..Default::default()
        };
        base.overlay(GatewayConfigPatch::default());
        assert_eq!(base.port, Some(1234));
    }

    #[test]
    fn wildcard_suffix_matches() {
        let allowed = vec!["*.example.com".to_string()];
        assert!(cors_host_allowed(&allowed, "app.example.com"));
        assert!(cors_host_allowed(&allowed, "example.com"));
        assert!(!cors_host_allowed(&allowed, "example.net"));
    }

    #[test]
    fn exact_host_matches() {
        let allowed = vec!["localhost:3000".to_string()];
        assert!(cors_host_allowed(&allowed, "localhost:3000"));
        assert!(!cors_host_allowed(&allowed, "localhost:3001"));
    }
}
