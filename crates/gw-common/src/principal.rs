use serde::{Deserialize, Serialize};

/// Role within an organization or project membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Member,
}

impl MemberRole {
    pub fn is_owner(self) -> bool {
        matches!(self, Self::Owner)
    }
}

/// The kind of owner an `ApiKey` is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    User,
    Admin,
    Project,
    Ephemeral,
}

/// The authenticated caller, enriched with enough tenant context to make authorization decisions.
/// This is the only input to authorization.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: i64,
    pub user_public_id: String,
    pub org_id: Option<i64>,
    pub project_ids: Vec<i64>,
    pub role: Option<MemberRole>,
    /// Set when the caller authenticated with an API key rather than a JWT; admin-only routes require
    /// `OwnerKind::Admin` here.
    pub owner_kind: Option<OwnerKind>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        matches!(self.owner_kind, Some(OwnerKind::Admin))
    }

    pub fn is_org_owner(&self) -> bool {
        matches!(self.role, Some(MemberRole::Owner))
    }

    pub fn has_project(&self, project_id: i64) -> bool {
        self.project_ids.contains(&project_id)
    }
}
