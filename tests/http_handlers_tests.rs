use access_control_service::interface::{
    AccessFilterResponse, AssumeRoleResponse, CheckPermissionResponse, ErrorResponse,
    ResourceListResponse, ResourceResponse, api_router,
};
use access_control_service::test_utils::{access_token_for, create_test_app_state};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn app() -> Router {
    api_router(create_test_app_state().await)
}

fn alice_token() -> String {
    access_token_for("alice", "org1", "unit1")
}

fn bob_token() -> String {
    access_token_for("bob", "org1", "unit2")
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn resource_ids(list: &ResourceListResponse) -> Vec<&str> {
    list.resources
        .iter()
        .filter_map(|r| r.get("id").and_then(Value::as_str))
        .collect()
}

// ===== AUTHENTICATION =====

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let response = app()
        .await
        .oneshot(request("GET", "/v1/resources/Group", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorResponse = read_json(response).await;
    assert_eq!(body.error, "Missing Authorization header");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let response = app()
        .await
        .oneshot(request("GET", "/v1/resources/Group", Some("not-a-jwt"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_user_is_unauthorized() {
    let token = access_token_for("mallory", "org1", "unit1");
    let response = app()
        .await
        .oneshot(request("GET", "/v1/resources/Group", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ===== RESOURCES =====

#[tokio::test]
async fn test_list_groups_applies_policies() {
    let response = app()
        .await
        .oneshot(request("GET", "/v1/resources/Group", Some(&alice_token()), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: ResourceListResponse = read_json(response).await;
    assert_eq!(resource_ids(&body), vec!["g-editors", "g-foo"]);
}

#[tokio::test]
async fn test_get_hidden_group_is_not_found() {
    let response = app()
        .await
        .oneshot(request(
            "GET",
            "/v1/resources/Group/g-secret",
            Some(&alice_token()),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_get_and_delete_group() {
    let app = app().await;
    let token = alice_token();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/resources/Group",
            Some(&token),
            Some(json!({"fields": {"name": "Ops", "kind": "team"}})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: ResourceResponse = read_json(response).await;
    assert_eq!(created.resource["unit_id"], "unit1");
    let id = created.resource["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/v1/resources/Group/{id}"),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/v1/resources/Group/{id}"),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(request(
            "GET",
            &format!("/v1/resources/Group/{id}"),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_with_reserved_field_is_bad_request() {
    let response = app()
        .await
        .oneshot(request(
            "POST",
            "/v1/resources/Group",
            Some(&alice_token()),
            Some(json!({"fields": {"name": "Ops", "kind": "team", "id": "mine"}})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_out_of_condition_is_forbidden() {
    let response = app()
        .await
        .oneshot(request(
            "PUT",
            "/v1/resources/Group/g-foo",
            Some(&alice_token()),
            Some(json!({"patch": {"kind": "archived"}})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: ErrorResponse = read_json(response).await;
    assert_eq!(body.error, "Cannot execute \"Group:UpdateGroup\" on \"Group\"");
}

#[tokio::test]
async fn test_create_without_create_rule_is_forbidden() {
    let response = app()
        .await
        .oneshot(request(
            "POST",
            "/v1/resources/Group",
            Some(&bob_token()),
            Some(json!({"fields": {"name": "Ops", "kind": "team"}})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ===== IAM =====

#[tokio::test]
async fn test_assume_role_not_assigned_is_forbidden() {
    let response = app()
        .await
        .oneshot(request(
            "POST",
            "/v1/iam/assume-role",
            Some(&bob_token()),
            Some(json!({"role_id": "r-auditor"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_assume_role_then_list_under_role() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/iam/assume-role",
            Some(&alice_token()),
            Some(json!({"role_id": "r-auditor"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let assumed: AssumeRoleResponse = read_json(response).await;
    assert_eq!(assumed.role_id, "r-auditor");
    assert_eq!(assumed.unit_id, "unit2");
    assert_eq!(assumed.expires_in, 5 * 60);

    let response = app
        .oneshot(request(
            "GET",
            "/v1/resources/Group",
            Some(&assumed.access_token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: ResourceListResponse = read_json(response).await;
    assert_eq!(resource_ids(&body), vec!["g-foo-2"]);
}

#[tokio::test]
async fn test_assume_role_from_assumed_role_is_forbidden() {
    let app = app().await;
    let assume = |token: &str| {
        request(
            "POST",
            "/v1/iam/assume-role",
            Some(token),
            Some(json!({"role_id": "r-auditor"})),
        )
    };

    let response = app.clone().oneshot(assume(&alice_token())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let assumed: AssumeRoleResponse = read_json(response).await;

    let response = app.oneshot(assume(&assumed.access_token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: ErrorResponse = read_json(response).await;
    assert_eq!(body.error, "Already acting under role \"r-auditor\"");
}

#[tokio::test]
async fn test_check_permission_reports_decision() {
    let app = app().await;
    let check = |instance: Value| {
        request(
            "POST",
            "/v1/iam/abilities/check",
            Some(&alice_token()),
            Some(json!({
                "action": "Group:GetGroup",
                "resource_type": "Group",
                "instance": instance,
            })),
        )
    };

    let response = app
        .clone()
        .oneshot(check(json!({"id": "g-foo", "unit_id": "unit1"})))
        .await
        .unwrap();
    let body: CheckPermissionResponse = read_json(response).await;
    assert!(body.allowed);

    let response = app
        .clone()
        .oneshot(check(json!({"id": "g-secret", "unit_id": "unit1"})))
        .await
        .unwrap();
    let body: CheckPermissionResponse = read_json(response).await;
    assert!(!body.allowed);

    let response = app
        .oneshot(check(json!({"id": "g-other", "unit_id": "unit2"})))
        .await
        .unwrap();
    let body: CheckPermissionResponse = read_json(response).await;
    assert!(!body.allowed);
}

#[tokio::test]
async fn test_access_filter_includes_tenant_boundary() {
    let response = app()
        .await
        .oneshot(request(
            "GET",
            "/v1/iam/abilities/filter?action=Group:ListGroups&resource_type=Group",
            Some(&bob_token()),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: AccessFilterResponse = read_json(response).await;
    let rendered = body.filter.to_string();
    assert!(rendered.contains("unit_id"));
    assert!(rendered.contains("unit2"));
}
