//! Principal resolver: composes the JWT and API-key middlewares, then hydrates the full `User`
//! plus default `Organization` plus project memberships into the enriched [`Principal`] that is the
//! only input to authorization decisions downstream.

pub mod api_key;
pub mod jwt;

use std::sync::Arc;

use gw_common::{GatewayError, GatewayResult, OwnerKind, Principal};
use gw_storage::Storage;

use crate::credential::CredentialStore;
use crate::tenant::TenantGraph;
use api_key::{extract_bearer, owner_kind_of};
use jwt::JwtVerifier;

/// Which caller class a route expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerClass {
    App,
    Admin,
}

pub struct PrincipalResolver {
    storage: Arc<dyn Storage>,
    credentials: Arc<CredentialStore>,
    jwt: JwtVerifier,
    tenant: Arc<TenantGraph>,
}

impl PrincipalResolver {
    pub fn new(
        storage: Arc<dyn Storage>,
        credentials: Arc<CredentialStore>,
        jwt: JwtVerifier,
        tenant: Arc<TenantGraph>,
    ) -> Self {
        Self {
            storage,
            credentials,
            jwt,
            tenant,
        }
    }

    pub async fn resolve(&self, authorization: Option<&str>, expected: CallerClass) -> GatewayResult<Principal> {
        let header = authorization.ok_or(GatewayError::Unauthorized)?;
        let token = extract_bearer(header).ok_or(GatewayError::Unauthorized)?;

        if let Some(claims) = self.jwt.verify(token) {
            let user = self
                .storage
                .get_user_by_public_id(&claims.sub)
                .await
                .map_err(GatewayError::internal)?
                .filter(|u| u.enabled)
                .ok_or(GatewayError::Unauthorized)?;

            if expected == CallerClass::Admin {
                // A JWT never carries admin API-key scope.
                return Err(GatewayError::Forbidden);
            }

            return Ok(self.hydrate(user.id, &user.public_id, None, None));
        }

        let record = self.credentials.lookup(token).await?;
        let owner_kind = owner_kind_of(&record);

        match expected {
            CallerClass::Admin if owner_kind != Some(OwnerKind::Admin) => return Err(GatewayError::Forbidden),
            CallerClass::App if owner_kind == Some(OwnerKind::Admin) => return Err(GatewayError::Forbidden),
            _ => {}
        }

        let user_id = record.owner_user_id.ok_or(GatewayError::Unauthorized)?;
        let user = self
            .storage
            .get_user(user_id)
            .await
            .map_err(GatewayError::internal)?
            .filter(|u| u.enabled)
            .ok_or(GatewayError::Unauthorized)?;

        Ok(self.hydrate(user.id, &user.public_id, record.org_id, owner_kind))
    }

    fn hydrate(&self, user_id: i64, user_public_id: &str, key_org_id: Option<i64>, owner_kind: Option<OwnerKind>) -> Principal {
        // Trust the key's own scoping if it names an org directly.
        let org = key_org_id.or_else(|| self.tenant.find_org_by_owner(user_id).map(|o| o.id));

        let role = org.and_then(|org_id| self.tenant.role_of(org_id, user_id));
        let project_ids = self
            .tenant
            .list_projects_for_user(user_id)
            .into_iter()
            .map(|p| p.id)
            .collect();

        Principal {
            user_id,
            user_public_id: user_public_id.to_string(),
            org_id: org,
            project_ids,
            role,
            owner_kind,
        }
    }
}
