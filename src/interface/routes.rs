use crate::interface::app_state::AppState;
use crate::interface::http_handlers::{
    access_filter_handler, assume_role_handler, check_permission_handler,
    create_resource_handler, delete_resource_handler, get_resource_handler,
    list_resources_handler, update_resource_handler,
};
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

/// Versioned API routes with state applied.
pub fn api_router(state: Arc<AppState>) -> Router {
    let v1_routes = Router::new()
        .route("/iam/assume-role", post(assume_role_handler))
        .route("/iam/abilities/check", post(check_permission_handler))
        .route("/iam/abilities/filter", get(access_filter_handler))
        .route(
            "/resources/{resource_type}",
            get(list_resources_handler).post(create_resource_handler),
        )
        .route(
            "/resources/{resource_type}/{id}",
            get(get_resource_handler)
                .put(update_resource_handler)
                .delete(delete_resource_handler),
        );

    Router::new().nest("/v1", v1_routes).with_state(state)
}
