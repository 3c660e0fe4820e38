use crate::domain::abac::{Decision, FilterExpr};
use crate::domain::principal::PrincipalIdentity;
use crate::domain::resource::ResourceInstance;

/// Base trait for all queries
pub trait Query: Send + 'static {
    type Output: Send + 'static;
}

/// Query to fetch one resource the caller may read
#[derive(Debug, Clone)]
pub struct GetResourceQuery {
    pub principal: PrincipalIdentity,
    pub resource_type: String,
    pub id: String,
}

impl Query for GetResourceQuery {
    type Output = ResourceInstance;
}

/// Query to list every resource of a type the caller may list
#[derive(Debug, Clone)]
pub struct ListResourcesQuery {
    pub principal: PrincipalIdentity,
    pub resource_type: String,
}

impl Query for ListResourcesQuery {
    type Output = Vec<ResourceInstance>;
}

/// Point decision for an action on a caller-supplied instance
#[derive(Debug, Clone)]
pub struct CheckPermissionQuery {
    pub principal: PrincipalIdentity,
    pub action: String,
    pub resource_type: String,
    pub instance: ResourceInstance,
}

impl Query for CheckPermissionQuery {
    type Output = Decision;
}

/// Tenant-scoped filter selecting what the caller may do `action` on
#[derive(Debug, Clone)]
pub struct CompileFilterQuery {
    pub principal: PrincipalIdentity,
    pub action: String,
    pub resource_type: String,
}

impl Query for CompileFilterQuery {
    type Output = FilterExpr;
}
