use super::{DirectoryRepository, RepoResult, ResourceStore};
use crate::domain::abac::FilterExpr;
use crate::domain::group::Group;
use crate::domain::policy::Policy;
use crate::domain::resource::{ResourceInstance, fields, resource_types};
use crate::domain::role::Role;
use crate::domain::unit::Unit;
use crate::domain::user::User;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Directory view over the same [`ResourceStore`] the gateway writes to, so
/// users, groups, roles, policies and units are ordinary resources.
#[derive(Clone)]
pub struct StoreDirectoryRepository {
    store: Arc<dyn ResourceStore>,
}

impl StoreDirectoryRepository {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    async fn find_by_id<T: DeserializeOwned>(
        &self,
        resource_type: &str,
        id: &str,
    ) -> RepoResult<Option<T>> {
        self.store
            .find_one(resource_type, &FilterExpr::field_in(fields::ID, [id]))
            .await?
            .map(decode)
            .transpose()
    }

    async fn find_by_ids<T: DeserializeOwned>(
        &self,
        resource_type: &str,
        ids: &[String],
    ) -> RepoResult<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let filter = FilterExpr::field_in(fields::ID, ids.iter().cloned());
        let mut by_id: HashMap<String, ResourceInstance> = self
            .store
            .find_many(resource_type, &filter)
            .await?
            .into_iter()
            .filter_map(|doc| doc.id().map(str::to_string).map(|id| (id, doc)))
            .collect();

        ids.iter()
            .filter_map(|id| match by_id.remove(id) {
                Some(doc) => Some(decode(doc)),
                None => {
                    warn!(resource_type, id = %id, "referenced record does not exist");
                    None
                }
            })
            .collect()
    }
}

fn decode<T: DeserializeOwned>(doc: ResourceInstance) -> RepoResult<T> {
    Ok(serde_json::from_value(doc.into_value())?)
}

#[async_trait]
impl DirectoryRepository for StoreDirectoryRepository {
    async fn find_user(&self, user_id: &str) -> RepoResult<Option<User>> {
        self.find_by_id(resource_types::USER, user_id).await
    }

    async fn find_groups(&self, group_ids: &[String]) -> RepoResult<Vec<Group>> {
        self.find_by_ids(resource_types::GROUP, group_ids).await
    }

    async fn find_roles(&self, role_ids: &[String]) -> RepoResult<Vec<Role>> {
        self.find_by_ids(resource_types::ROLE, role_ids).await
    }

    async fn find_policies(&self, policy_ids: &[String]) -> RepoResult<Vec<Policy>> {
        self.find_by_ids(resource_types::POLICY, policy_ids).await
    }

    async fn find_unit(&self, unit_id: &str) -> RepoResult<Option<Unit>> {
        self.find_by_id(resource_types::UNIT, unit_id).await
    }
}
