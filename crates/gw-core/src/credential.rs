//! Credential store: hash, persist, look up, and expire API keys. Pure over the repository — no
//! caching here; a hash lookup is a single indexed query. `HMAC-SHA256` keyed by `APIKEY_SECRET`
//! stands in for OAuth-token hashing discipline, generalized to the gateway's own bearer-key
//! scheme.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde_json::Value as JsonValue;
use sha2::Sha256;
use time::OffsetDateTime;

use gw_common::{GatewayError, GatewayResult, IdKind, OwnerKind, ids};
use gw_storage::{ApiKeyRecord, NewApiKey, Storage};

type HmacSha256 = Hmac<Sha256>;

pub struct CreatedApiKey {
    pub record: ApiKeyRecord,
    /// Exists only at creation time; the caller must show this to the user exactly once.
    pub plaintext: String,
}

pub struct CredentialStore {
    storage: Arc<dyn Storage>,
    secret: String,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn Storage>, secret: String) -> Self {
        Self { storage, secret }
    }

    fn hash(&self, plaintext: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).expect("HMAC accepts a key of any length");
        mac.update(plaintext.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    /// `Create(key)`. Rotation is additive: callers disable the old key via the (out-of-scope) admin
    /// surface rather than mutating it.
    pub async fn create(
        &self,
        owner_kind: OwnerKind,
        owner_user_id: Option<i64>,
        org_id: Option<i64>,
        description: Option<String>,
        permissions: JsonValue,
        expires_at: Option<OffsetDateTime>,
    ) -> GatewayResult<CreatedApiKey> {
        let public_id = ids::generate(IdKind::ApiKey);
        let plaintext = generate_plaintext();
        let key_hash = self.hash(&plaintext);
        let plaintext_hint = format!("***{}", &plaintext[plaintext.len().saturating_sub(4)..]);

        let owner_kind_str = match owner_kind {
            OwnerKind::User => "user",
            OwnerKind::Admin => "admin",
            OwnerKind::Project => "project",
            OwnerKind::Ephemeral => "ephemeral",
        };

        let record = self
            .storage
            .insert_api_key(NewApiKey {
                public_id,
                key_hash,
                plaintext_hint,
                description,
                owner_kind: owner_kind_str.to_string(),
                owner_user_id,
                org_id,
                permissions,
                expires_at,
            })
            .await
            .map_err(GatewayError::internal)?;

        Ok(CreatedApiKey { record, plaintext })
    }

    /// `Lookup(plaintext) = repo.FindByKeyHash(HMAC(secret, plaintext))`. Fails with `unauthorized` if
    /// missing, disabled, or expired.
    pub async fn lookup(&self, plaintext: &str) -> GatewayResult<ApiKeyRecord> {
        let key_hash = self.hash(plaintext);
        let found = self
            .storage
            .find_api_key_by_hash(&key_hash)
            .await
            .map_err(GatewayError::internal)?;

        let record = found.ok_or(GatewayError::Unauthorized)?;
        if !record.enabled {
            return Err(GatewayError::Unauthorized);
        }
        if let Some(expires_at) = record.expires_at {
            if expires_at <= OffsetDateTime::now_utc() {
                return Err(GatewayError::Unauthorized);
            }
        }
        Ok(record)
    }
}

fn generate_plaintext() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    format!("sk-{}", URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_storage::test_support::InMemoryStorage;

    #[tokio::test]
    async fn lookup_returns_created_key_only_for_exact_plaintext() {
        let store = CredentialStore::new(Arc::new(InMemoryStorage::default()), "test-secret".to_string());
        let created = store
            .create(OwnerKind::User, Some(1), None, None, JsonValue::Null, None)
            .await
            .unwrap();

        let found = store.lookup(&created.plaintext).await.unwrap();
        assert_eq!(found.public_id, created.record.public_id);

        let other = store.lookup("not-the-right-key").await;
        assert!(matches!(other, Err(GatewayError::Unauthorized)));
    }

    #[tokio::test]
    async fn lookup_rejects_expired_key() {
        let store = CredentialStore::new(Arc::new(InMemoryStorage::default()), "test-secret".to_string());
        let expired = OffsetDateTime::now_utc() - time::Duration::seconds(10);
        let created = store
            .create(OwnerKind::User, Some(1), None, None, JsonValue::Null, Some(expired))
            .await
            .unwrap();

        let result = store.lookup(&created.plaintext).await;
        assert!(matches!(result, Err(GatewayError::Unauthorized)));
    }
}
