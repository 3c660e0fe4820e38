// Interface layer: HTTP API, extractors, DTOs

pub mod app_state;
pub mod http_handlers;
pub mod routes;

pub use app_state::AppState;
pub use http_handlers::*;
pub use routes::api_router;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssumeRoleRequest {
    pub role_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssumeRoleResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub role_id: String,
    pub organization_id: String,
    pub unit_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckPermissionRequest {
    pub action: String,
    pub resource_type: String,
    /// Document the action would apply to.
    #[schema(value_type = Object)]
    pub instance: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckPermissionResponse {
    pub allowed: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AccessFilterParams {
    /// Fully qualified action, e.g. `Group:ListGroups`.
    pub action: String,
    pub resource_type: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccessFilterResponse {
    /// Boolean filter tree over document fields, tenant boundary included.
    #[schema(value_type = Object)]
    pub filter: Value,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateResourceRequest {
    #[schema(value_type = Object)]
    pub fields: Map<String, Value>,
}

/// JSON merge patch: `null` removes a field.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateResourceRequest {
    #[schema(value_type = Object)]
    pub patch: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResourceResponse {
    #[schema(value_type = Object)]
    pub resource: Value,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResourceListResponse {
    #[schema(value_type = Vec<Object>)]
    pub resources: Vec<Value>,
}
