use super::command_bus::BusError;
use super::queries::Query;
use crate::domain::error::AuthzError;
use async_trait::async_trait;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Query handler trait
#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync {
    async fn handle(&self, query: Q) -> Result<Q::Output, AuthzError>;
}

/// Query bus for read-only operations
pub struct QueryBus {
    handlers: Arc<RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>>,
}

impl Default for QueryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBus {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a query handler
    pub async fn register_handler<Q, H>(&self, handler: H)
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        let handler: Arc<dyn QueryHandler<Q>> = Arc::new(handler);
        let mut handlers = self.handlers.write().await;
        handlers.insert(TypeId::of::<Q>(), Box::new(handler));
    }

    /// Execute a query
    pub async fn execute<Q: Query>(&self, query: Q) -> Result<Q::Output, BusError> {
        let handler = {
            let handlers = self.handlers.read().await;
            handlers
                .get(&TypeId::of::<Q>())
                .and_then(|boxed| boxed.downcast_ref::<Arc<dyn QueryHandler<Q>>>())
                .cloned()
                .ok_or(BusError::NoHandler(std::any::type_name::<Q>()))?
        };
        Ok(handler.handle(query).await?)
    }
}
