use crate::application::command_bus::CommandBus;
use crate::application::query_bus::QueryBus;
use crate::application::services::{PrincipalResolver, TokenService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub token_service: Arc<TokenService>,
    pub principal_resolver: Arc<PrincipalResolver>,
    pub command_bus: Arc<CommandBus>,
    pub query_bus: Arc<QueryBus>,
}
