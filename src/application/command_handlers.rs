use super::command_bus::CommandHandler;
use super::commands::{
    AssumeRoleCommand, CreateResourceCommand, DeleteResourceCommand, UpdateResourceCommand,
};
use super::gateway::ResourceGateway;
use super::services::{AssumedRole, RoleAssumptionService};
use crate::domain::abac::AbilityAggregator;
use crate::domain::error::AuthzError;
use crate::domain::resource::ResourceInstance;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

/// Create resource command handler
pub struct CreateResourceCommandHandler {
    aggregator: AbilityAggregator,
    gateway: Arc<ResourceGateway>,
}

impl CreateResourceCommandHandler {
    pub fn new(aggregator: AbilityAggregator, gateway: Arc<ResourceGateway>) -> Self {
        Self {
            aggregator,
            gateway,
        }
    }
}

#[async_trait]
impl CommandHandler<CreateResourceCommand> for CreateResourceCommandHandler {
    #[instrument(
        name = "create_resource_command_handler",
        skip(self, command),
        fields(user_id = %command.principal.user_id(), resource_type = %command.resource_type)
    )]
    async fn handle(&self, command: CreateResourceCommand) -> Result<ResourceInstance, AuthzError> {
        let ability = self.aggregator.build(&command.principal)?;
        self.gateway
            .create(&ability, &command.resource_type, command.fields)
            .await
    }
}

/// Update resource command handler
pub struct UpdateResourceCommandHandler {
    aggregator: AbilityAggregator,
    gateway: Arc<ResourceGateway>,
}

impl UpdateResourceCommandHandler {
    pub fn new(aggregator: AbilityAggregator, gateway: Arc<ResourceGateway>) -> Self {
        Self {
            aggregator,
            gateway,
        }
    }
}

#[async_trait]
impl CommandHandler<UpdateResourceCommand> for UpdateResourceCommandHandler {
    #[instrument(
        name = "update_resource_command_handler",
        skip(self, command),
        fields(user_id = %command.principal.user_id(), resource_type = %command.resource_type, id = %command.id)
    )]
    async fn handle(&self, command: UpdateResourceCommand) -> Result<ResourceInstance, AuthzError> {
        let ability = self.aggregator.build(&command.principal)?;
        self.gateway
            .update(&ability, &command.resource_type, &command.id, command.patch)
            .await
    }
}

/// Delete resource command handler
pub struct DeleteResourceCommandHandler {
    aggregator: AbilityAggregator,
    gateway: Arc<ResourceGateway>,
}

impl DeleteResourceCommandHandler {
    pub fn new(aggregator: AbilityAggregator, gateway: Arc<ResourceGateway>) -> Self {
        Self {
            aggregator,
            gateway,
        }
    }
}

#[async_trait]
impl CommandHandler<DeleteResourceCommand> for DeleteResourceCommandHandler {
    #[instrument(
        name = "delete_resource_command_handler",
        skip(self, command),
        fields(user_id = %command.principal.user_id(), resource_type = %command.resource_type, id = %command.id)
    )]
    async fn handle(&self, command: DeleteResourceCommand) -> Result<(), AuthzError> {
        let ability = self.aggregator.build(&command.principal)?;
        self.gateway
            .delete(&ability, &command.resource_type, &command.id)
            .await
    }
}

/// Assume role command handler
pub struct AssumeRoleCommandHandler {
    role_assumption: Arc<RoleAssumptionService>,
}

impl AssumeRoleCommandHandler {
    pub fn new(role_assumption: Arc<RoleAssumptionService>) -> Self {
        Self { role_assumption }
    }
}

#[async_trait]
impl CommandHandler<AssumeRoleCommand> for AssumeRoleCommandHandler {
    #[instrument(name = "assume_role_command_handler", skip(self, command), fields(role_id = %command.role_id))]
    async fn handle(&self, command: AssumeRoleCommand) -> Result<AssumedRole, AuthzError> {
        self.role_assumption
            .assume(&command.claims, &command.role_id)
            .await
    }
}
