//! In-memory snapshot of the tenant graph, used so that authorization reads never hit the database
//! on the request path — only at bootstrap and after tenant-admin mutations (out of scope for HTTP
//! handlers, but the snapshot refresh hook is load-bearing here).

use crate::storage::{MembershipRecord, OrganizationRecord, ProjectMembershipRecord, ProjectRecord};

#[derive(Debug, Clone, Default)]
pub struct TenantSnapshot {
    pub organizations: Vec<OrganizationRecord>,
    pub memberships: Vec<MembershipRecord>,
    pub projects: Vec<ProjectRecord>,
    pub project_memberships: Vec<ProjectMembershipRecord>,
}

impl TenantSnapshot {
    pub fn org_owned_by(&self, user_id: i64) -> Option<&OrganizationRecord> {
        self.organizations.iter().find(|o| o.owner_user_id == user_id)
    }

    pub fn membership(&self, org_id: i64, user_id: i64) -> Option<&MembershipRecord> {
        self.memberships
            .iter()
            .find(|m| m.org_id == org_id && m.user_id == user_id)
    }

    pub fn projects_for_user(&self, user_id: i64) -> Vec<&ProjectRecord> {
        let project_ids: Vec<i64> = self
            .project_memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.project_id)
            .collect();
        self.projects
            .iter()
            .filter(|p| project_ids.contains(&p.id))
            .collect()
    }
}
