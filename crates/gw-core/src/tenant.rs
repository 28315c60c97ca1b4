//! Tenant graph: read-only service over organizations, members, projects, and project members.
//! Runtime reads never touch the database — only the in-memory snapshot populated at bootstrap and
//! refreshed after tenant-admin mutations.

use std::sync::Arc;

use arc_swap::ArcSwap;

use gw_common::{GatewayError, GatewayResult, MemberRole};
use gw_storage::{MembershipRecord, OrganizationRecord, ProjectRecord, Storage, TenantSnapshot};

pub struct TenantGraph {
    storage: Arc<dyn Storage>,
    snapshot: ArcSwap<TenantSnapshot>,
}

impl TenantGraph {
    pub async fn load(storage: Arc<dyn Storage>) -> GatewayResult<Self> {
        let snapshot = storage
            .load_tenant_snapshot()
            .await
            .map_err(GatewayError::internal)?;
        Ok(Self {
            storage,
            snapshot: ArcSwap::from_pointee(snapshot),
        })
    }

    /// Re-pulls the snapshot from storage. Called after tenant-admin mutations (out of scope HTTP
    /// surface, but the refresh hook belongs here regardless of who calls it).
    pub async fn refresh(&self) -> GatewayResult<()> {
        let snapshot = self
            .storage
            .load_tenant_snapshot()
            .await
            .map_err(GatewayError::internal)?;
        self.snapshot.store(Arc::new(snapshot));
        Ok(())
    }

    pub fn find_org_by_owner(&self, user_id: i64) -> Option<OrganizationRecord> {
        self.snapshot.load().org_owned_by(user_id).cloned()
    }

    pub fn find_member(&self, org_id: i64, user_id: i64) -> Option<MembershipRecord> {
        self.snapshot.load().membership(org_id, user_id).cloned()
    }

    pub fn list_projects_for_user(&self, user_id: i64) -> Vec<ProjectRecord> {
        self.snapshot
            .load()
            .projects_for_user(user_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn role_of(&self, org_id: i64, user_id: i64) -> Option<MemberRole> {
        self.find_member(org_id, user_id).and_then(|m| match m.role.as_str() {
            "owner" => Some(MemberRole::Owner),
            "member" => Some(MemberRole::Member),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_storage::test_support::InMemoryStorage;

    #[tokio::test]
    async fn resolves_default_org_membership_and_projects() {
        let storage = Arc::new(InMemoryStorage::default());
        let user_id = storage.seed_user("owner@example.com").await;
        let org_id = storage.find_org_by_owner(user_id).await.unwrap().unwrap().id;
        storage.seed_project(org_id, user_id, "owner");

        let graph = TenantGraph::load(storage).await.unwrap();
        assert_eq!(graph.find_org_by_owner(user_id).unwrap().name, "Default");
        assert_eq!(graph.role_of(org_id, user_id), Some(MemberRole::Owner));
        assert_eq!(graph.list_projects_for_user(user_id).len(), 1);
        assert!(graph.list_projects_for_user(user_id + 1).is_empty());
    }
}
