use super::commands::Command;
use crate::domain::error::AuthzError;
use async_trait::async_trait;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Command handler trait
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    async fn handle(&self, command: C) -> Result<C::Output, AuthzError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("No handler registered for {0}")]
    NoHandler(&'static str),

    #[error(transparent)]
    Handler(#[from] AuthzError),
}

/// Command bus for state-changing operations. One handler per command type.
pub struct CommandBus {
    handlers: Arc<RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>>,
}

impl CommandBus {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a command handler, replacing any previous one for `C`.
    pub async fn register_handler<C, H>(&self, handler: H)
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let handler: Arc<dyn CommandHandler<C>> = Arc::new(handler);
        let mut handlers = self.handlers.write().await;
        handlers.insert(TypeId::of::<C>(), Box::new(handler));
    }

    /// Execute a command
    pub async fn execute<C: Command>(&self, command: C) -> Result<C::Output, BusError> {
        let handler = {
            let handlers = self.handlers.read().await;
            handlers
                .get(&TypeId::of::<C>())
                .and_then(|boxed| boxed.downcast_ref::<Arc<dyn CommandHandler<C>>>())
                .cloned()
                .ok_or(BusError::NoHandler(std::any::type_name::<C>()))?
        };
        Ok(handler.handle(command).await?)
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}
