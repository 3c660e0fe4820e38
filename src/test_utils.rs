//! Shared fixtures for unit and integration tests: one organization with a
//! root unit and two child units, a handful of groups, policies, a role living
//! in `unit2`, and two users.

use crate::application::services::TokenService;
use crate::domain::tenant::TenantContext;
use crate::infrastructure::seed::{SeedDocuments, load_documents};
use crate::infrastructure::{InMemoryResourceStore, ResourceStore};
use crate::interface::app_state::AppState;
use crate::{AppConfig, AppStateBuilder};
use serde_json::json;
use std::sync::Arc;

pub const TEST_JWT_SECRET: &str = "test-secret-key-for-testing-only";

/// Creates a test configuration backed by the in-memory store
pub fn create_test_config() -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "JWT_SECRET" => Some(TEST_JWT_SECRET.to_string()),
        _ => None,
    })
    .unwrap_or_else(|e| panic!("test configuration is invalid: {e}"))
}

pub fn create_test_token_service() -> TokenService {
    let config = create_test_config();
    TokenService::new(
        &config.jwt_secret,
        config.access_token_ttl_minutes,
        config.assumed_role_token_ttl_minutes,
    )
}

/// Fixture directory and resources.
///
/// * `alice` (unit1): reads every group except `g-secret`, is a member of
///   `g-editors` (write access to team and project groups) and holds the
///   `r-auditor` role.
/// * `bob` (unit2): reads every group.
/// * `r-auditor` lives in unit2 and may only list groups named `Foo`.
pub fn fixture_documents() -> SeedDocuments {
    serde_json::from_value(json!({
        "Unit": [
            {"id": "root", "name": "Root", "organization_id": "org1", "ancestry": []},
            {"id": "unit1", "name": "Unit 1", "organization_id": "org1", "parent_id": "root", "ancestry": ["root"]},
            {"id": "unit2", "name": "Unit 2", "organization_id": "org1", "parent_id": "root", "ancestry": ["root"]},
            {"id": "elsewhere", "name": "Elsewhere", "organization_id": "org2", "ancestry": []}
        ],
        "Policy": [
            {
                "id": "p-groups-read", "name": "Read groups", "organization_id": "org1", "unit_id": "root",
                "statements": [{
                    "name": "read-groups", "effect": "allow", "resource_type": "Group",
                    "actions": ["Group:ListGroups", "Group:GetGroup"]
                }]
            },
            {
                "id": "p-hide-secret", "name": "Hide secret group", "organization_id": "org1", "unit_id": "root",
                "statements": [{
                    "name": "hide-secret", "effect": "deny", "resource_type": "Group",
                    "actions": ["Group:ListGroups", "Group:GetGroup"],
                    "resource_match": {"type": "explicit_ids", "ids": ["g-secret"]}
                }]
            },
            {
                "id": "p-groups-write", "name": "Edit team groups", "organization_id": "org1", "unit_id": "root",
                "statements": [{
                    "name": "edit-team-groups", "effect": "allow", "resource_type": "Group",
                    "actions": ["Group:CreateGroup", "Group:UpdateGroup", "Group:DeleteGroup"],
                    "condition": {"kind": {"$in": ["team", "project"]}}
                }]
            },
            {
                "id": "p-auditor", "name": "Audit Foo", "organization_id": "org1", "unit_id": "root",
                "statements": [
                    {
                        "name": "list-foo", "effect": "allow", "resource_type": "Group",
                        "actions": ["Group:ListGroups"], "condition": {"name": "Foo"}
                    },
                    {
                        "name": "list-policies", "effect": "allow", "resource_type": "Policy",
                        "actions": ["Policy:ListPolicies"]
                    }
                ]
            }
        ],
        "Role": [
            {"id": "r-auditor", "name": "Auditor", "organization_id": "org1", "unit_id": "unit2", "policy_ids": ["p-auditor"]}
        ],
        "Group": [
            {"id": "g-editors", "name": "Editors", "kind": "team", "organization_id": "org1", "unit_id": "unit1", "policy_ids": ["p-groups-write"]},
            {"id": "g-secret", "name": "Secret", "kind": "team", "organization_id": "org1", "unit_id": "unit1"},
            {"id": "g-foo", "name": "Foo", "kind": "project", "organization_id": "org1", "unit_id": "unit1"},
            {"id": "g-other", "name": "Other", "kind": "team", "organization_id": "org1", "unit_id": "unit2"},
            {"id": "g-foo-2", "name": "Foo", "kind": "team", "organization_id": "org1", "unit_id": "unit2"}
        ],
        "User": [
            {
                "id": "alice", "email": "alice@example.com", "organization_id": "org1", "unit_id": "unit1",
                "policy_ids": ["p-groups-read", "p-hide-secret"], "group_ids": ["g-editors"], "role_ids": ["r-auditor"]
            },
            {
                "id": "bob", "email": "bob@example.com", "organization_id": "org1", "unit_id": "unit2",
                "policy_ids": ["p-groups-read"]
            }
        ]
    }))
    .unwrap_or_else(|e| panic!("fixture documents are invalid: {e}"))
}

/// Creates an in-memory store loaded with [`fixture_documents`]
pub async fn create_seeded_store() -> Arc<InMemoryResourceStore> {
    let store = Arc::new(InMemoryResourceStore::new());
    load_documents(store.as_ref(), fixture_documents())
        .await
        .unwrap_or_else(|e| panic!("failed to seed fixtures: {e}"));
    store
}

/// Creates a test application state over the seeded in-memory store
pub async fn create_test_app_state() -> Arc<AppState> {
    let store: Arc<dyn ResourceStore> = create_seeded_store().await;
    AppStateBuilder::new()
        .with_store(store)
        .with_config(create_test_config())
        .build()
        .await
        .unwrap_or_else(|e| panic!("failed to build test app state: {e}"))
}

/// Home-tenant access token for a fixture user
pub fn access_token_for(user_id: &str, organization_id: &str, unit_id: &str) -> String {
    create_test_token_service()
        .issue_access_token(user_id, &TenantContext::new(organization_id, unit_id))
        .map(|issued| issued.access_token)
        .unwrap_or_else(|e| panic!("failed to issue test token: {e}"))
}
