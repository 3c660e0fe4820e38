use crate::application::command_bus::BusError;
use crate::application::commands::{
    AssumeRoleCommand, CreateResourceCommand, DeleteResourceCommand, UpdateResourceCommand,
};
use crate::application::queries::{
    CheckPermissionQuery, CompileFilterQuery, GetResourceQuery, ListResourcesQuery,
};
use crate::application::services::Claims;
use crate::domain::error::AuthzError;
use crate::domain::principal::PrincipalIdentity;
use crate::domain::resource::ResourceInstance;
use crate::interface::app_state::AppState;
use crate::interface::{
    AccessFilterParams, AccessFilterResponse, AssumeRoleRequest, AssumeRoleResponse,
    CheckPermissionRequest, CheckPermissionResponse, CreateResourceRequest, ErrorResponse,
    ResourceListResponse, ResourceResponse, UpdateResourceRequest,
};
use axum::Json;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::{StatusCode, request::Parts};
use axum::response::{IntoResponse, Response};
use std::ops::Deref;
use std::sync::Arc;
use tracing::error;

/// Error rendered as `ErrorResponse` with a status derived from the cause.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn unauthorized(message: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.to_string(),
        }
    }

    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal server error".to_string(),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        let status = match &err {
            AuthzError::Forbidden { .. }
            | AuthzError::RoleNotAssigned { .. }
            | AuthzError::RoleChaining { .. } => StatusCode::FORBIDDEN,
            AuthzError::NotFound { .. } => StatusCode::NOT_FOUND,
            AuthzError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AuthzError::InvalidToken(_) | AuthzError::UnknownPrincipal { .. } => {
                StatusCode::UNAUTHORIZED
            }
            AuthzError::TokenIssuance(_) | AuthzError::Storage(_) => {
                error!(error = %err, "request failed");
                return ApiError::internal();
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<BusError> for ApiError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::Handler(err) => err.into(),
            BusError::NoHandler(_) => {
                error!(error = %err, "dispatch failed");
                ApiError::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Validated bearer token claims.
pub struct BearerClaims(pub Claims);

impl<S> FromRequestParts<S> for BearerClaims
where
    S: Deref<Target = AppState> + Send + Sync + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state: &AppState = state.deref();
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header"))?;
        let claims = app_state.token_service.validate_token(token)?;
        Ok(BearerClaims(claims))
    }
}

/// Caller identity snapshot, resolved once per request.
pub struct AuthenticatedPrincipal {
    pub claims: Claims,
    pub principal: PrincipalIdentity,
}

impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    S: Deref<Target = AppState> + Send + Sync + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerClaims(claims) = BearerClaims::from_request_parts(parts, state).await?;
        let principal = state.deref().principal_resolver.resolve(&claims).await?;
        Ok(AuthenticatedPrincipal { claims, principal })
    }
}

fn resource_response(instance: ResourceInstance) -> ResourceResponse {
    ResourceResponse {
        resource: instance.into_value(),
    }
}

// --- IAM HANDLERS ---

#[utoipa::path(
    post,
    path = "/v1/iam/assume-role",
    request_body = AssumeRoleRequest,
    responses(
        (status = 200, description = "Token acting under the role", body = AssumeRoleResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Role not assigned, or caller already acting under a role", body = ErrorResponse),
    ),
    tags = ["IAM"],
    security(("bearerAuth" = [])),
    description = "Assume one of the caller's roles. The returned token carries only that role's policies and its tenant."
)]
pub async fn assume_role_handler(
    State(state): State<Arc<AppState>>,
    BearerClaims(claims): BearerClaims,
    Json(payload): Json<AssumeRoleRequest>,
) -> Result<Json<AssumeRoleResponse>, ApiError> {
    let assumed = state
        .command_bus
        .execute(AssumeRoleCommand {
            claims,
            role_id: payload.role_id,
        })
        .await?;
    Ok(Json(AssumeRoleResponse {
        access_token: assumed.token.access_token,
        expires_in: assumed.token.expires_in,
        role_id: assumed.role_id,
        organization_id: assumed.tenant.organization_id,
        unit_id: assumed.tenant.unit_id,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/iam/abilities/check",
    request_body = CheckPermissionRequest,
    responses(
        (status = 200, description = "Decision", body = CheckPermissionResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Assumed role no longer assigned", body = ErrorResponse),
    ),
    tags = ["IAM"],
    security(("bearerAuth" = [])),
    description = "Decide whether the caller may perform an action on the supplied document."
)]
pub async fn check_permission_handler(
    State(state): State<Arc<AppState>>,
    caller: AuthenticatedPrincipal,
    Json(payload): Json<CheckPermissionRequest>,
) -> Result<Json<CheckPermissionResponse>, ApiError> {
    let decision = state
        .query_bus
        .execute(CheckPermissionQuery {
            principal: caller.principal,
            action: payload.action,
            resource_type: payload.resource_type,
            instance: ResourceInstance::from_fields(payload.instance),
        })
        .await?;
    Ok(Json(CheckPermissionResponse {
        allowed: decision.is_allowed(),
    }))
}

#[utoipa::path(
    get,
    path = "/v1/iam/abilities/filter",
    params(AccessFilterParams),
    responses(
        (status = 200, description = "Compiled filter", body = AccessFilterResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Assumed role no longer assigned", body = ErrorResponse),
    ),
    tags = ["IAM"],
    security(("bearerAuth" = [])),
    description = "Compile the caller's policies into the tenant-scoped filter selecting every document the action is allowed on."
)]
pub async fn access_filter_handler(
    State(state): State<Arc<AppState>>,
    caller: AuthenticatedPrincipal,
    Query(params): Query<AccessFilterParams>,
) -> Result<Json<AccessFilterResponse>, ApiError> {
    let filter = state
        .query_bus
        .execute(CompileFilterQuery {
            principal: caller.principal,
            action: params.action,
            resource_type: params.resource_type,
        })
        .await?;
    let filter = serde_json::to_value(&filter)
        .map_err(|e| ApiError::from(AuthzError::Storage(e.to_string())))?;
    Ok(Json(AccessFilterResponse { filter }))
}

// --- RESOURCE HANDLERS ---

#[utoipa::path(
    get,
    path = "/v1/resources/{resource_type}",
    params(("resource_type" = String, Path, description = "Resource type, e.g. Group")),
    responses(
        (status = 200, description = "Resources the caller may list", body = ResourceListResponse),
        (status = 400, description = "Invalid resource type", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Assumed role no longer assigned", body = ErrorResponse),
    ),
    tags = ["Resources"],
    security(("bearerAuth" = []))
)]
pub async fn list_resources_handler(
    State(state): State<Arc<AppState>>,
    caller: AuthenticatedPrincipal,
    Path(resource_type): Path<String>,
) -> Result<Json<ResourceListResponse>, ApiError> {
    let resources = state
        .query_bus
        .execute(ListResourcesQuery {
            principal: caller.principal,
            resource_type,
        })
        .await?;
    Ok(Json(ResourceListResponse {
        resources: resources
            .into_iter()
            .map(ResourceInstance::into_value)
            .collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/v1/resources/{resource_type}",
    params(("resource_type" = String, Path, description = "Resource type, e.g. Group")),
    request_body = CreateResourceRequest,
    responses(
        (status = 201, description = "Resource created", body = ResourceResponse),
        (status = 400, description = "Reserved field supplied", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Action not allowed or assumed role no longer assigned", body = ErrorResponse),
    ),
    tags = ["Resources"],
    security(("bearerAuth" = []))
)]
pub async fn create_resource_handler(
    State(state): State<Arc<AppState>>,
    caller: AuthenticatedPrincipal,
    Path(resource_type): Path<String>,
    Json(payload): Json<CreateResourceRequest>,
) -> Result<(StatusCode, Json<ResourceResponse>), ApiError> {
    let created = state
        .command_bus
        .execute(CreateResourceCommand {
            principal: caller.principal,
            resource_type,
            fields: payload.fields,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(resource_response(created))))
}

#[utoipa::path(
    get,
    path = "/v1/resources/{resource_type}/{id}",
    params(
        ("resource_type" = String, Path, description = "Resource type, e.g. Group"),
        ("id" = String, Path, description = "Resource id"),
    ),
    responses(
        (status = 200, description = "Resource", body = ResourceResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Assumed role no longer assigned", body = ErrorResponse),
        (status = 404, description = "Not found or not visible to the caller", body = ErrorResponse),
    ),
    tags = ["Resources"],
    security(("bearerAuth" = []))
)]
pub async fn get_resource_handler(
    State(state): State<Arc<AppState>>,
    caller: AuthenticatedPrincipal,
    Path((resource_type, id)): Path<(String, String)>,
) -> Result<Json<ResourceResponse>, ApiError> {
    let resource = state
        .query_bus
        .execute(GetResourceQuery {
            principal: caller.principal,
            resource_type,
            id,
        })
        .await?;
    Ok(Json(resource_response(resource)))
}

#[utoipa::path(
    put,
    path = "/v1/resources/{resource_type}/{id}",
    params(
        ("resource_type" = String, Path, description = "Resource type, e.g. Group"),
        ("id" = String, Path, description = "Resource id"),
    ),
    request_body = UpdateResourceRequest,
    responses(
        (status = 200, description = "Resource updated", body = ResourceResponse),
        (status = 400, description = "Reserved field in patch", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Patched resource not allowed or assumed role no longer assigned", body = ErrorResponse),
        (status = 404, description = "Not found or not visible to the caller", body = ErrorResponse),
    ),
    tags = ["Resources"],
    security(("bearerAuth" = []))
)]
pub async fn update_resource_handler(
    State(state): State<Arc<AppState>>,
    caller: AuthenticatedPrincipal,
    Path((resource_type, id)): Path<(String, String)>,
    Json(payload): Json<UpdateResourceRequest>,
) -> Result<Json<ResourceResponse>, ApiError> {
    let updated = state
        .command_bus
        .execute(UpdateResourceCommand {
            principal: caller.principal,
            resource_type,
            id,
            patch: payload.patch,
        })
        .await?;
    Ok(Json(resource_response(updated)))
}

#[utoipa::path(
    delete,
    path = "/v1/resources/{resource_type}/{id}",
    params(
        ("resource_type" = String, Path, description = "Resource type, e.g. Group"),
        ("id" = String, Path, description = "Resource id"),
    ),
    responses(
        (status = 204, description = "Resource deleted"),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Assumed role no longer assigned", body = ErrorResponse),
        (status = 404, description = "Not found or not visible to the caller", body = ErrorResponse),
    ),
    tags = ["Resources"],
    security(("bearerAuth" = []))
)]
pub async fn delete_resource_handler(
    State(state): State<Arc<AppState>>,
    caller: AuthenticatedPrincipal,
    Path((resource_type, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .command_bus
        .execute(DeleteResourceCommand {
            principal: caller.principal,
            resource_type,
            id,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
