use super::services::{AssumedRole, Claims};
use crate::domain::principal::PrincipalIdentity;
use crate::domain::resource::ResourceInstance;
use serde_json::{Map, Value};

/// Base trait for all commands
pub trait Command: Send + 'static {
    type Output: Send + 'static;
}

/// Command to create a resource in the caller's tenant
#[derive(Debug, Clone)]
pub struct CreateResourceCommand {
    pub principal: PrincipalIdentity,
    pub resource_type: String,
    pub fields: Map<String, Value>,
}

impl Command for CreateResourceCommand {
    type Output = ResourceInstance;
}

/// Command to merge-patch an existing resource
#[derive(Debug, Clone)]
pub struct UpdateResourceCommand {
    pub principal: PrincipalIdentity,
    pub resource_type: String,
    pub id: String,
    pub patch: Map<String, Value>,
}

impl Command for UpdateResourceCommand {
    type Output = ResourceInstance;
}

/// Command to delete a resource
#[derive(Debug, Clone)]
pub struct DeleteResourceCommand {
    pub principal: PrincipalIdentity,
    pub resource_type: String,
    pub id: String,
}

impl Command for DeleteResourceCommand {
    type Output = ();
}

/// Command to act under one of the caller's roles
#[derive(Debug, Clone)]
pub struct AssumeRoleCommand {
    pub claims: Claims,
    pub role_id: String,
}

impl Command for AssumeRoleCommand {
    type Output = AssumedRole;
}
