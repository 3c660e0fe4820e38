use super::gateway::ResourceGateway;
use super::queries::{
    CheckPermissionQuery, CompileFilterQuery, GetResourceQuery, ListResourcesQuery,
};
use super::query_bus::QueryHandler;
use crate::domain::abac::{AbilityAggregator, Decision, FilterExpr};
use crate::domain::error::AuthzError;
use crate::domain::resource::ResourceInstance;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

// ============================================================================
// QUERY HANDLERS
// ============================================================================

/// Get resource query handler
pub struct GetResourceQueryHandler {
    aggregator: AbilityAggregator,
    gateway: Arc<ResourceGateway>,
}

impl GetResourceQueryHandler {
    pub fn new(aggregator: AbilityAggregator, gateway: Arc<ResourceGateway>) -> Self {
        Self {
            aggregator,
            gateway,
        }
    }
}

#[async_trait]
impl QueryHandler<GetResourceQuery> for GetResourceQueryHandler {
    #[instrument(
        name = "get_resource_query_handler",
        skip(self, query),
        fields(user_id = %query.principal.user_id(), resource_type = %query.resource_type, id = %query.id)
    )]
    async fn handle(&self, query: GetResourceQuery) -> Result<ResourceInstance, AuthzError> {
        let ability = self.aggregator.build(&query.principal)?;
        self.gateway
            .get(&ability, &query.resource_type, &query.id)
            .await
    }
}

/// List resources query handler
pub struct ListResourcesQueryHandler {
    aggregator: AbilityAggregator,
    gateway: Arc<ResourceGateway>,
}

impl ListResourcesQueryHandler {
    pub fn new(aggregator: AbilityAggregator, gateway: Arc<ResourceGateway>) -> Self {
        Self {
            aggregator,
            gateway,
        }
    }
}

#[async_trait]
impl QueryHandler<ListResourcesQuery> for ListResourcesQueryHandler {
    #[instrument(
        name = "list_resources_query_handler",
        skip(self, query),
        fields(user_id = %query.principal.user_id(), resource_type = %query.resource_type)
    )]
    async fn handle(&self, query: ListResourcesQuery) -> Result<Vec<ResourceInstance>, AuthzError> {
        let ability = self.aggregator.build(&query.principal)?;
        self.gateway.list(&ability, &query.resource_type).await
    }
}

/// Point decision query handler
pub struct CheckPermissionQueryHandler {
    aggregator: AbilityAggregator,
}

impl CheckPermissionQueryHandler {
    pub fn new(aggregator: AbilityAggregator) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl QueryHandler<CheckPermissionQuery> for CheckPermissionQueryHandler {
    #[instrument(
        name = "check_permission_query_handler",
        skip(self, query),
        fields(user_id = %query.principal.user_id(), action = %query.action)
    )]
    async fn handle(&self, query: CheckPermissionQuery) -> Result<Decision, AuthzError> {
        let ability = self.aggregator.build(&query.principal)?;
        let decision = ability.decide(&query.action, &query.resource_type, &query.instance);
        info!(allowed = decision.is_allowed(), "permission checked");
        Ok(decision)
    }
}

/// Access filter query handler
pub struct CompileFilterQueryHandler {
    aggregator: AbilityAggregator,
}

impl CompileFilterQueryHandler {
    pub fn new(aggregator: AbilityAggregator) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl QueryHandler<CompileFilterQuery> for CompileFilterQueryHandler {
    #[instrument(
        name = "compile_filter_query_handler",
        skip(self, query),
        fields(user_id = %query.principal.user_id(), action = %query.action)
    )]
    async fn handle(&self, query: CompileFilterQuery) -> Result<FilterExpr, AuthzError> {
        let ability = self.aggregator.build(&query.principal)?;
        Ok(ability.access_filter(&query.action, &query.resource_type))
    }
}
