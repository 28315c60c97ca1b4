pub mod api_keys;
pub mod conversations;
pub mod global_config;
pub mod items;
pub mod model_providers;
pub mod organization_members;
pub mod organizations;
pub mod project_members;
pub mod projects;
pub mod responses;
pub mod users;

pub use api_keys::Entity as ApiKeys;
pub use conversations::Entity as Conversations;
pub use global_config::Entity as GlobalConfigRows;
pub use items::Entity as Items;
pub use model_providers::Entity as ModelProviders;
pub use organization_members::Entity as OrganizationMembers;
pub use organizations::Entity as Organizations;
pub use project_members::Entity as ProjectMembers;
pub use projects::Entity as Projects;
pub use responses::Entity as Responses;
pub use users::Entity as Users;
