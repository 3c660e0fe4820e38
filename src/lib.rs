pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interface;
pub mod test_utils;

use application::{
    command_bus::CommandBus,
    command_handlers::{
        AssumeRoleCommandHandler, CreateResourceCommandHandler, DeleteResourceCommandHandler,
        UpdateResourceCommandHandler,
    },
    commands::{
        AssumeRoleCommand, CreateResourceCommand, DeleteResourceCommand, UpdateResourceCommand,
    },
    gateway::ResourceGateway,
    queries::{CheckPermissionQuery, CompileFilterQuery, GetResourceQuery, ListResourcesQuery},
    query_bus::QueryBus,
    query_handlers::{
        CheckPermissionQueryHandler, CompileFilterQueryHandler, GetResourceQueryHandler,
        ListResourcesQueryHandler,
    },
    services::{PrincipalResolver, RoleAssumptionService, TokenService},
};
use domain::abac::AbilityAggregator;
use domain::resource::{ResourceKinds, resource_types};
use infrastructure::{
    DirectoryRepository, InMemoryResourceStore, PostgresResourceStore, ResourceStore,
    StoreDirectoryRepository, StoreError, seed,
};
use interface::AppState;
use sqlx::PgPool;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" => Ok(StorageBackend::Postgres),
            other => Err(ConfigError::Invalid(format!(
                "STORAGE_BACKEND must be \"memory\" or \"postgres\", got \"{other}\""
            ))),
        }
    }
}

/// Application configuration with all environment variables
#[derive(Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub http_host: String,
    pub http_port: String,
    pub storage_backend: StorageBackend,
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub assumed_role_token_ttl_minutes: i64,
    pub organization_scoped_types: Vec<String>,
    pub seed_file: Option<PathBuf>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("http_host", &self.http_host)
            .field("http_port", &self.http_port)
            .field("storage_backend", &self.storage_backend)
            .field("jwt_secret", &"<redacted>")
            .field("access_token_ttl_minutes", &self.access_token_ttl_minutes)
            .field("assumed_role_token_ttl_minutes", &self.assumed_role_token_ttl_minutes)
            .field("organization_scoped_types", &self.organization_scoped_types)
            .field("seed_file", &self.seed_file)
            .finish()
    }
}

fn parse_minutes(key: &str, value: Option<String>, default: i64) -> Result<i64, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(minutes) if minutes > 0 => Ok(minutes),
            _ => Err(ConfigError::Invalid(format!(
                "{key} must be a positive number of minutes, got \"{raw}\""
            ))),
        },
    }
}

impl AppConfig {
    /// Creates a new AppConfig from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates an AppConfig from any key lookup (useful for testing)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| ConfigError::MissingRequired("JWT_SECRET".to_string()))?;
        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => StorageBackend::Memory,
        };
        let database_url = lookup("DATABASE_URL");
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingRequired("DATABASE_URL".to_string()));
        }

        let mut organization_scoped_types: Vec<String> = lookup("ORGANIZATION_SCOPED_TYPES")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if !organization_scoped_types
            .iter()
            .any(|name| name == resource_types::UNIT)
        {
            organization_scoped_types.push(resource_types::UNIT.to_string());
        }

        Ok(AppConfig {
            database_url,
            http_host: lookup("HTTP_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            http_port: lookup("HTTP_PORT").unwrap_or_else(|| "8080".to_string()),
            storage_backend,
            jwt_secret,
            access_token_ttl_minutes: parse_minutes(
                "ACCESS_TOKEN_TTL_MINUTES",
                lookup("ACCESS_TOKEN_TTL_MINUTES"),
                15,
            )?,
            assumed_role_token_ttl_minutes: parse_minutes(
                "ASSUMED_ROLE_TOKEN_TTL_MINUTES",
                lookup("ASSUMED_ROLE_TOKEN_TTL_MINUTES"),
                5,
            )?,
            organization_scoped_types,
            seed_file: lookup("SEED_FILE").map(PathBuf::from),
        })
    }

    /// Creates the HTTP address string from host and port
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    pub fn resource_kinds(&self) -> ResourceKinds {
        ResourceKinds::with_organization_scoped(self.organization_scoped_types.iter().cloned())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingRequired(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// STORAGE BOOTSTRAP
// ============================================================================

/// Opens the configured store, running migrations and loading the seed file
/// when one is configured.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn ResourceStore>, AppError> {
    let store: Arc<dyn ResourceStore> = match config.storage_backend {
        StorageBackend::Memory => Arc::new(InMemoryResourceStore::new()),
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| ConfigError::MissingRequired("DATABASE_URL".to_string()))?;
            let store = PostgresResourceStore::new(PgPool::connect(url).await?);
            store.migrate().await?;
            Arc::new(store)
        }
    };
    info!(backend = ?config.storage_backend, "resource store ready");

    if let Some(path) = &config.seed_file {
        seed::load_seed_file(store.as_ref(), path).await?;
    }
    Ok(store)
}

// ============================================================================
// APPLICATION BUILDER
// ============================================================================

/// Builder for creating application state with better testability
#[derive(Default)]
pub struct AppStateBuilder {
    store: Option<Arc<dyn ResourceStore>>,
    config: Option<AppConfig>,
}

impl AppStateBuilder {
    /// Creates a new AppStateBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the resource store
    pub fn with_store(mut self, store: Arc<dyn ResourceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the configuration
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the application state
    pub async fn build(self) -> Result<Arc<AppState>, AppError> {
        let config = self.config.ok_or(AppError::MissingConfig)?;
        let store = self.store.ok_or(AppError::MissingStore)?;

        // Create repositories
        let directory =
            Arc::new(StoreDirectoryRepository::new(store.clone())) as Arc<dyn DirectoryRepository>;

        // Create services
        let token_service = Arc::new(TokenService::new(
            &config.jwt_secret,
            config.access_token_ttl_minutes,
            config.assumed_role_token_ttl_minutes,
        ));
        let principal_resolver = Arc::new(PrincipalResolver::new(directory.clone()));
        let role_assumption = Arc::new(RoleAssumptionService::new(
            directory,
            token_service.clone(),
        ));
        let aggregator = AbilityAggregator::new(config.resource_kinds());
        let gateway = Arc::new(ResourceGateway::new(store));

        // Create CQRS buses
        let command_bus = Arc::new(CommandBus::new());
        let query_bus = Arc::new(QueryBus::new());

        Self::register_command_handlers(&command_bus, &aggregator, &gateway, role_assumption).await;
        Self::register_query_handlers(&query_bus, &aggregator, &gateway).await;

        Ok(Arc::new(AppState {
            token_service,
            principal_resolver,
            command_bus,
            query_bus,
        }))
    }

    async fn register_command_handlers(
        command_bus: &CommandBus,
        aggregator: &AbilityAggregator,
        gateway: &Arc<ResourceGateway>,
        role_assumption: Arc<RoleAssumptionService>,
    ) {
        command_bus
            .register_handler::<CreateResourceCommand, _>(CreateResourceCommandHandler::new(
                aggregator.clone(),
                gateway.clone(),
            ))
            .await;
        command_bus
            .register_handler::<UpdateResourceCommand, _>(UpdateResourceCommandHandler::new(
                aggregator.clone(),
                gateway.clone(),
            ))
            .await;
        command_bus
            .register_handler::<DeleteResourceCommand, _>(DeleteResourceCommandHandler::new(
                aggregator.clone(),
                gateway.clone(),
            ))
            .await;
        command_bus
            .register_handler::<AssumeRoleCommand, _>(AssumeRoleCommandHandler::new(
                role_assumption,
            ))
            .await;
    }

    async fn register_query_handlers(
        query_bus: &QueryBus,
        aggregator: &AbilityAggregator,
        gateway: &Arc<ResourceGateway>,
    ) {
        query_bus
            .register_handler::<GetResourceQuery, _>(GetResourceQueryHandler::new(
                aggregator.clone(),
                gateway.clone(),
            ))
            .await;
        query_bus
            .register_handler::<ListResourcesQuery, _>(ListResourcesQueryHandler::new(
                aggregator.clone(),
                gateway.clone(),
            ))
            .await;
        query_bus
            .register_handler::<CheckPermissionQuery, _>(CheckPermissionQueryHandler::new(
                aggregator.clone(),
            ))
            .await;
        query_bus
            .register_handler::<CompileFilterQuery, _>(CompileFilterQueryHandler::new(
                aggregator.clone(),
            ))
            .await;
    }
}

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Missing configuration")]
    MissingConfig,
    #[error("Missing resource store")]
    MissingStore,
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_app_config_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();

        assert_eq!(config.http_address(), "127.0.0.1:8080");
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.access_token_ttl_minutes, 15);
        assert_eq!(config.assumed_role_token_ttl_minutes, 5);
        assert_eq!(config.organization_scoped_types, vec!["Unit"]);
        assert!(config.seed_file.is_none());
        assert!(!format!("{config:?}").contains("s3cret"));
    }

    #[test]
    fn test_app_config_requires_secret() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(key) if key == "JWT_SECRET"));
    }

    #[test]
    fn test_app_config_postgres_requires_database_url() {
        let err = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("STORAGE_BACKEND", "postgres"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(key) if key == "DATABASE_URL"));
    }

    #[test]
    fn test_app_config_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("STORAGE_BACKEND", "Postgres"),
            ("DATABASE_URL", "postgresql://localhost/acl"),
            ("HTTP_PORT", "9000"),
            ("ASSUMED_ROLE_TOKEN_TTL_MINUTES", "2"),
            ("ORGANIZATION_SCOPED_TYPES", "Policy, Role"),
            ("SEED_FILE", "seed.json"),
        ]))
        .unwrap();

        assert_eq!(config.storage_backend, StorageBackend::Postgres);
        assert_eq!(config.http_address(), "127.0.0.1:9000");
        assert_eq!(config.assumed_role_token_ttl_minutes, 2);
        assert_eq!(config.organization_scoped_types, vec!["Policy", "Role", "Unit"]);
        assert_eq!(config.seed_file, Some(PathBuf::from("seed.json")));
    }

    #[test]
    fn test_app_config_rejects_bad_values() {
        assert!(
            AppConfig::from_lookup(lookup(&[("JWT_SECRET", "x"), ("STORAGE_BACKEND", "mongo")]))
                .is_err()
        );
        assert!(
            AppConfig::from_lookup(lookup(&[
                ("JWT_SECRET", "x"),
                ("ACCESS_TOKEN_TTL_MINUTES", "0")
            ]))
            .is_err()
        );
    }

    #[tokio::test]
    async fn test_builder_requires_store() {
        let config = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();
        let result = AppStateBuilder::new().with_config(config).build().await;
        assert!(matches!(result, Err(AppError::MissingStore)));
    }
}
