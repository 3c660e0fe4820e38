use crate::domain::error::AuthzError;
use crate::domain::policy::PolicyStatement;
use crate::domain::tenant::TenantContext;
use serde::{Deserialize, Serialize};

/// Statements a principal receives through membership in a group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupGrant {
    pub group_id: String,
    pub statements: Vec<PolicyStatement>,
}

/// Statements and home tenant of a role assigned to a principal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role_id: String,
    pub tenant: TenantContext,
    pub statements: Vec<PolicyStatement>,
}

/// Who is asking, snapshotted once per request.
///
/// Groups and roles are kept in association order; the aggregator relies on it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrincipalIdentity {
    user_id: String,
    tenant: TenantContext,
    statements: Vec<PolicyStatement>,
    groups: Vec<GroupGrant>,
    roles: Vec<RoleGrant>,
    assumed_role_id: Option<String>,
}

impl PrincipalIdentity {
    pub fn builder(user_id: impl Into<String>, tenant: TenantContext) -> PrincipalIdentityBuilder {
        PrincipalIdentityBuilder {
            identity: PrincipalIdentity {
                user_id: user_id.into(),
                tenant,
                statements: Vec::new(),
                groups: Vec::new(),
                roles: Vec::new(),
                assumed_role_id: None,
            },
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn tenant(&self) -> &TenantContext {
        &self.tenant
    }

    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    pub fn groups(&self) -> &[GroupGrant] {
        &self.groups
    }

    pub fn roles(&self) -> &[RoleGrant] {
        &self.roles
    }

    pub fn assumed_role_id(&self) -> Option<&str> {
        self.assumed_role_id.as_deref()
    }

    pub fn role_grant(&self, role_id: &str) -> Option<&RoleGrant> {
        self.roles.iter().find(|grant| grant.role_id == role_id)
    }

    /// Returns a new identity acting as `role_id`, with the tenant switched to
    /// the role's own unit. The receiver is left untouched.
    pub fn assume_role(&self, role_id: &str) -> Result<PrincipalIdentity, AuthzError> {
        let grant = self
            .role_grant(role_id)
            .ok_or_else(|| AuthzError::RoleNotAssigned {
                role_id: role_id.to_string(),
            })?;
        Ok(PrincipalIdentity {
            tenant: grant.tenant.clone(),
            assumed_role_id: Some(grant.role_id.clone()),
            ..self.clone()
        })
    }
}

pub struct PrincipalIdentityBuilder {
    identity: PrincipalIdentity,
}

impl PrincipalIdentityBuilder {
    pub fn statements(mut self, statements: Vec<PolicyStatement>) -> Self {
        self.identity.statements = statements;
        self
    }

    pub fn group(mut self, grant: GroupGrant) -> Self {
        self.identity.groups.push(grant);
        self
    }

    pub fn groups(mut self, grants: Vec<GroupGrant>) -> Self {
        self.identity.groups.extend(grants);
        self
    }

    pub fn role(mut self, grant: RoleGrant) -> Self {
        self.identity.roles.push(grant);
        self
    }

    pub fn roles(mut self, grants: Vec<RoleGrant>) -> Self {
        self.identity.roles.extend(grants);
        self
    }

    pub fn assumed_role(mut self, role_id: impl Into<String>) -> Self {
        self.identity.assumed_role_id = Some(role_id.into());
        self
    }

    pub fn build(self) -> PrincipalIdentity {
        self.identity
    }
}
