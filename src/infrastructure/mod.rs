use crate::domain::abac::FilterExpr;
use crate::domain::error::AuthzError;
use crate::domain::group::Group;
use crate::domain::policy::Policy;
use crate::domain::resource::ResourceInstance;
use crate::domain::role::Role;
use crate::domain::unit::Unit;
use crate::domain::user::User;
use async_trait::async_trait;

// Infrastructure layer: storage adapters, directory, seed data
pub mod directory_repository;
pub mod filter_sql;
pub mod resource_store;
pub mod seed;

pub use directory_repository::StoreDirectoryRepository;
pub use resource_store::{InMemoryResourceStore, PostgresResourceStore};

pub type RepoResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document has no string \"id\" field")]
    MissingId,

    #[error("Stored value is not a JSON object")]
    NotADocument,

    #[error("{resource_type} \"{id}\" already exists")]
    Conflict { resource_type: String, id: String },

    #[error("{resource_type} \"{id}\" does not exist")]
    Missing { resource_type: String, id: String },
}

impl From<StoreError> for AuthzError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Missing { resource_type, id } => AuthzError::NotFound { resource_type, id },
            StoreError::Conflict { .. } | StoreError::MissingId => {
                AuthzError::InvalidInput(err.to_string())
            }
            other => AuthzError::Storage(other.to_string()),
        }
    }
}

/// Document storage keyed by resource type. Every read and write that selects
/// documents takes a [`FilterExpr`] and must honour
/// [`FilterExpr::evaluate`] exactly.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn insert(
        &self,
        resource_type: &str,
        instance: ResourceInstance,
    ) -> RepoResult<ResourceInstance>;

    async fn find_one(
        &self,
        resource_type: &str,
        filter: &FilterExpr,
    ) -> RepoResult<Option<ResourceInstance>>;

    /// Matching documents in insertion order.
    async fn find_many(
        &self,
        resource_type: &str,
        filter: &FilterExpr,
    ) -> RepoResult<Vec<ResourceInstance>>;

    /// Replaces the document with the same `id`.
    async fn replace(
        &self,
        resource_type: &str,
        instance: ResourceInstance,
    ) -> RepoResult<ResourceInstance>;

    async fn delete_matching(&self, resource_type: &str, filter: &FilterExpr) -> RepoResult<u64>;
}

/// Typed, tenant-agnostic reads of the identity directory. Lookups by id list
/// return records in the order of the ids given and skip unknown ids.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    async fn find_user(&self, user_id: &str) -> RepoResult<Option<User>>;
    async fn find_groups(&self, group_ids: &[String]) -> RepoResult<Vec<Group>>;
    async fn find_roles(&self, role_ids: &[String]) -> RepoResult<Vec<Role>>;
    async fn find_policies(&self, policy_ids: &[String]) -> RepoResult<Vec<Policy>>;
    async fn find_unit(&self, unit_id: &str) -> RepoResult<Option<Unit>>;
}
