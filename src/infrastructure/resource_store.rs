use super::filter_sql::push_filter;
use super::{RepoResult, ResourceStore, StoreError};
use crate::domain::abac::FilterExpr;
use crate::domain::resource::ResourceInstance;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

fn document_id(instance: &ResourceInstance) -> RepoResult<String> {
    instance
        .id()
        .map(str::to_string)
        .ok_or(StoreError::MissingId)
}

/// Store backed by process memory. Filters are applied with
/// [`FilterExpr::evaluate`].
#[derive(Debug, Default)]
pub struct InMemoryResourceStore {
    documents: RwLock<HashMap<String, Vec<ResourceInstance>>>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn insert(
        &self,
        resource_type: &str,
        instance: ResourceInstance,
    ) -> RepoResult<ResourceInstance> {
        let id = document_id(&instance)?;
        let mut documents = self.documents.write().await;
        let bucket = documents.entry(resource_type.to_string()).or_default();
        if bucket.iter().any(|doc| doc.id() == Some(id.as_str())) {
            return Err(StoreError::Conflict {
                resource_type: resource_type.to_string(),
                id,
            });
        }
        bucket.push(instance.clone());
        Ok(instance)
    }

    async fn find_one(
        &self,
        resource_type: &str,
        filter: &FilterExpr,
    ) -> RepoResult<Option<ResourceInstance>> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(resource_type)
            .and_then(|bucket| bucket.iter().find(|doc| filter.evaluate(doc)))
            .cloned())
    }

    async fn find_many(
        &self,
        resource_type: &str,
        filter: &FilterExpr,
    ) -> RepoResult<Vec<ResourceInstance>> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(resource_type)
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|doc| filter.evaluate(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn replace(
        &self,
        resource_type: &str,
        instance: ResourceInstance,
    ) -> RepoResult<ResourceInstance> {
        let id = document_id(&instance)?;
        let mut documents = self.documents.write().await;
        let slot = documents
            .get_mut(resource_type)
            .and_then(|bucket| bucket.iter_mut().find(|doc| doc.id() == Some(id.as_str())))
            .ok_or_else(|| StoreError::Missing {
                resource_type: resource_type.to_string(),
                id: id.clone(),
            })?;
        *slot = instance.clone();
        Ok(instance)
    }

    async fn delete_matching(&self, resource_type: &str, filter: &FilterExpr) -> RepoResult<u64> {
        let mut documents = self.documents.write().await;
        let Some(bucket) = documents.get_mut(resource_type) else {
            return Ok(0);
        };
        let before = bucket.len();
        bucket.retain(|doc| !filter.evaluate(doc));
        Ok((before - bucket.len()) as u64)
    }
}

/// Store backed by the Postgres `resources` table, one JSONB document per row.
#[derive(Debug, Clone)]
pub struct PostgresResourceStore {
    pool: PgPool,
}

impl PostgresResourceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> RepoResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    fn select<'a>(resource_type: &str, filter: &FilterExpr) -> QueryBuilder<'a, Postgres> {
        let mut qb = QueryBuilder::new("SELECT fields FROM resources WHERE resource_type = ");
        qb.push_bind(resource_type.to_string());
        qb.push(" AND ");
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at, id");
        qb
    }
}

fn into_instance(Json(value): Json<Value>) -> RepoResult<ResourceInstance> {
    ResourceInstance::try_from(value).map_err(|_| StoreError::NotADocument)
}

#[async_trait]
impl ResourceStore for PostgresResourceStore {
    #[instrument(skip(self, instance))]
    async fn insert(
        &self,
        resource_type: &str,
        instance: ResourceInstance,
    ) -> RepoResult<ResourceInstance> {
        let id = document_id(&instance)?;
        let result = sqlx::query("INSERT INTO resources (resource_type, id, fields) VALUES ($1, $2, $3)")
            .bind(resource_type)
            .bind(&id)
            .bind(Json(instance.fields()))
            .execute(&self.pool)
            .await;
        match result {
            Ok(_) => Ok(instance),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(StoreError::Conflict {
                resource_type: resource_type.to_string(),
                id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, filter))]
    async fn find_one(
        &self,
        resource_type: &str,
        filter: &FilterExpr,
    ) -> RepoResult<Option<ResourceInstance>> {
        let mut qb = Self::select(resource_type, filter);
        qb.push(" LIMIT 1");
        qb.build_query_scalar::<Json<Value>>()
            .fetch_optional(&self.pool)
            .await?
            .map(into_instance)
            .transpose()
    }

    #[instrument(skip(self, filter))]
    async fn find_many(
        &self,
        resource_type: &str,
        filter: &FilterExpr,
    ) -> RepoResult<Vec<ResourceInstance>> {
        let mut qb = Self::select(resource_type, filter);
        debug!(sql = qb.sql(), "listing resources");
        qb.build_query_scalar::<Json<Value>>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(into_instance)
            .collect()
    }

    #[instrument(skip(self, instance))]
    async fn replace(
        &self,
        resource_type: &str,
        instance: ResourceInstance,
    ) -> RepoResult<ResourceInstance> {
        let id = document_id(&instance)?;
        let result = sqlx::query("UPDATE resources SET fields = $3 WHERE resource_type = $1 AND id = $2")
            .bind(resource_type)
            .bind(&id)
            .bind(Json(instance.fields()))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing {
                resource_type: resource_type.to_string(),
                id,
            });
        }
        Ok(instance)
    }

    #[instrument(skip(self, filter))]
    async fn delete_matching(&self, resource_type: &str, filter: &FilterExpr) -> RepoResult<u64> {
        let mut qb = QueryBuilder::new("DELETE FROM resources WHERE resource_type = ");
        qb.push_bind(resource_type.to_string());
        qb.push(" AND ");
        push_filter(&mut qb, filter);
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
