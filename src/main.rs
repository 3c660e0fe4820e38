use access_control_service::interface::{
    // DTOs
    AccessFilterResponse,
    AssumeRoleRequest,
    AssumeRoleResponse,
    CheckPermissionRequest,
    CheckPermissionResponse,
    CreateResourceRequest,
    ErrorResponse,
    ResourceListResponse,
    ResourceResponse,
    UpdateResourceRequest,
    api_router,
};
use access_control_service::{AppConfig, AppError, AppStateBuilder, open_store};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(utoipa::OpenApi)]
#[openapi(
    paths(
        access_control_service::interface::http_handlers::assume_role_handler,
        access_control_service::interface::http_handlers::check_permission_handler,
        access_control_service::interface::http_handlers::access_filter_handler,
        access_control_service::interface::http_handlers::list_resources_handler,
        access_control_service::interface::http_handlers::create_resource_handler,
        access_control_service::interface::http_handlers::get_resource_handler,
        access_control_service::interface::http_handlers::update_resource_handler,
        access_control_service::interface::http_handlers::delete_resource_handler,
    ),
    components(schemas(
        AssumeRoleRequest, AssumeRoleResponse, CheckPermissionRequest, CheckPermissionResponse,
        AccessFilterResponse, CreateResourceRequest, UpdateResourceRequest, ResourceResponse,
        ResourceListResponse, ErrorResponse
    )),
    tags(
        (name = "IAM", description = "Role assumption and permission evaluation endpoints"),
        (name = "Resources", description = "Tenant-scoped resource CRUD endpoints")
    ),
    security((), ("bearerAuth" = [])),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

// Add a security scheme modifier
pub struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let store = open_store(&config).await?;

    // Setup application state
    let app_state = AppStateBuilder::new()
        .with_store(store)
        .with_config(config.clone())
        .build()
        .await?;

    let app = api_router(app_state)
        .merge(SwaggerUi::new("/swagger").url("/openapi.json", ApiDoc::openapi()));

    let http_addr = config.http_address();
    let listener = TcpListener::bind(&http_addr).await?;
    info!(address = %http_addr, "HTTP server running");
    axum::serve(listener, app).await?;
    Ok(())
}
