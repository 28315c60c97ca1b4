pub mod db;
pub mod entities;
pub mod seaorm;
pub mod snapshot;
pub mod storage;

#[cfg(feature = "test-support")]
pub mod test_support;

pub use seaorm::SeaOrmStorage;
pub use snapshot::TenantSnapshot;
pub use storage::{
    ApiKeyRecord, ConversationRecord, GlobalConfigRecord, ItemPage, ItemRecord, MembershipRecord,
    ModelProviderRecord, NewApiKey, NewConversation, NewItem, NewModelProvider, NewResponse,
    NewUser, OrganizationRecord, ProjectMembershipRecord, ProjectRecord, ResponseRecord, Storage,
    StorageError, StorageResult, UserRecord,
};
