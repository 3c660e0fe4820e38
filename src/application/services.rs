use crate::domain::error::AuthzError;
use crate::domain::group::Group;
use crate::domain::policy::{Policy, PolicyStatement};
use crate::domain::principal::{GroupGrant, PrincipalIdentity, RoleGrant};
use crate::domain::role::Role;
use crate::domain::tenant::TenantContext;
use crate::infrastructure::{DirectoryRepository, RepoResult};
use chrono::{Duration, Utc};
use futures::future::try_join_all;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub jti: String,
    pub organization_id: String,
    pub unit_id: String,
    #[serde(default)]
    pub unit_ancestry: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assumed_role_id: Option<String>,
}

impl Claims {
    pub fn tenant(&self) -> TenantContext {
        TenantContext::new(self.organization_id.clone(), self.unit_id.clone())
            .with_ancestry(self.unit_ancestry.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: i64,
}

/// Issues and validates HS256 access tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    assumed_role_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl_minutes: i64, assumed_role_ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::minutes(access_ttl_minutes),
            assumed_role_ttl: Duration::minutes(assumed_role_ttl_minutes),
        }
    }

    /// Token for a user acting in its home tenant.
    #[instrument(name = "issue_access_token", skip(self, tenant))]
    pub fn issue_access_token(
        &self,
        user_id: &str,
        tenant: &TenantContext,
    ) -> Result<IssuedToken, AuthzError> {
        self.issue(user_id, tenant, None, self.access_ttl)
    }

    /// Shorter-lived token for a user acting under an assumed role.
    #[instrument(name = "issue_assumed_role_token", skip(self, tenant))]
    pub fn issue_assumed_role_token(
        &self,
        user_id: &str,
        tenant: &TenantContext,
        role_id: &str,
    ) -> Result<IssuedToken, AuthzError> {
        self.issue(user_id, tenant, Some(role_id), self.assumed_role_ttl)
    }

    fn issue(
        &self,
        user_id: &str,
        tenant: &TenantContext,
        assumed_role_id: Option<&str>,
        ttl: Duration,
    ) -> Result<IssuedToken, AuthzError> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (Utc::now() + ttl).timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
            organization_id: tenant.organization_id.clone(),
            unit_id: tenant.unit_id.clone(),
            unit_ancestry: tenant.unit_ancestry.clone(),
            assumed_role_id: assumed_role_id.map(str::to_string),
        };
        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(AuthzError::TokenIssuance)?;
        info!(user_id, jti = %claims.jti, "access token issued");
        Ok(IssuedToken {
            access_token,
            expires_in: ttl.num_seconds(),
        })
    }

    #[instrument(name = "validate_token", skip_all)]
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthzError> {
        let token_data: TokenData<Claims> = decode(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(AuthzError::InvalidToken)?;
        Ok(token_data.claims)
    }
}

fn statements_of(policies: Vec<Policy>) -> Vec<PolicyStatement> {
    policies
        .into_iter()
        .flat_map(|policy| policy.statements)
        .collect()
}

/// Tenant a role's statements operate in: the role's own unit.
pub async fn role_tenant(directory: &dyn DirectoryRepository, role: &Role) -> RepoResult<TenantContext> {
    let ancestry = directory
        .find_unit(&role.unit_id)
        .await?
        .map(|unit| unit.ancestry)
        .unwrap_or_default();
    Ok(TenantContext::new(role.organization_id.clone(), role.unit_id.clone()).with_ancestry(ancestry))
}

/// Builds the per-request [`PrincipalIdentity`] snapshot from validated claims.
#[derive(Clone)]
pub struct PrincipalResolver {
    directory: Arc<dyn DirectoryRepository>,
}

impl PrincipalResolver {
    pub fn new(directory: Arc<dyn DirectoryRepository>) -> Self {
        Self { directory }
    }

    /// Membership is read from the directory on every call, so a role
    /// removed after a token was issued stops working immediately.
    #[instrument(name = "resolve_principal", skip(self, claims), fields(user_id = %claims.sub))]
    pub async fn resolve(&self, claims: &Claims) -> Result<PrincipalIdentity, AuthzError> {
        let directory = self.directory.as_ref();
        let user = directory
            .find_user(&claims.sub)
            .await?
            .ok_or_else(|| AuthzError::UnknownPrincipal {
                user_id: claims.sub.clone(),
            })?;

        let (direct, groups, roles, home_unit) = futures::try_join!(
            directory.find_policies(&user.policy_ids),
            directory.find_groups(&user.group_ids),
            directory.find_roles(&user.role_ids),
            directory.find_unit(&user.unit_id),
        )?;

        let (group_grants, role_grants) = futures::try_join!(
            try_join_all(groups.iter().map(|group| self.group_grant(group))),
            try_join_all(roles.iter().map(|role| self.role_grant(role))),
        )?;

        let home = TenantContext::new(user.organization_id.clone(), user.unit_id.clone())
            .with_ancestry(home_unit.map(|unit| unit.ancestry).unwrap_or_default());
        let principal = PrincipalIdentity::builder(user.id.clone(), home)
            .statements(statements_of(direct))
            .groups(group_grants)
            .roles(role_grants)
            .build();

        match &claims.assumed_role_id {
            Some(role_id) => principal.assume_role(role_id),
            None => Ok(principal),
        }
    }

    async fn group_grant(&self, group: &Group) -> RepoResult<GroupGrant> {
        let policies = self.directory.find_policies(&group.policy_ids).await?;
        Ok(GroupGrant {
            group_id: group.id.clone(),
            statements: statements_of(policies),
        })
    }

    async fn role_grant(&self, role: &Role) -> RepoResult<RoleGrant> {
        let (policies, tenant) = futures::try_join!(
            self.directory.find_policies(&role.policy_ids),
            role_tenant(self.directory.as_ref(), role),
        )?;
        Ok(RoleGrant {
            role_id: role.id.clone(),
            tenant,
            statements: statements_of(policies),
        })
    }
}

/// Result of a successful role assumption.
#[derive(Debug, Clone, PartialEq)]
pub struct AssumedRole {
    pub role_id: String,
    pub tenant: TenantContext,
    pub token: IssuedToken,
}

pub struct RoleAssumptionService {
    directory: Arc<dyn DirectoryRepository>,
    tokens: Arc<TokenService>,
}

impl RoleAssumptionService {
    pub fn new(directory: Arc<dyn DirectoryRepository>, tokens: Arc<TokenService>) -> Self {
        Self { directory, tokens }
    }

    /// Checks that the caller holds `role_id` and issues a token acting under it.
    ///
    /// Only a home token may assume a role. A token issued under a role
    /// cannot renew itself or switch to another role.
    #[instrument(name = "assume_role", skip(self, claims), fields(user_id = %claims.sub))]
    pub async fn assume(&self, claims: &Claims, role_id: &str) -> Result<AssumedRole, AuthzError> {
        if let Some(active) = &claims.assumed_role_id {
            warn!(role_id, active_role_id = %active, "role assumption from assumed role refused");
            return Err(AuthzError::RoleChaining {
                role_id: active.clone(),
            });
        }
        let user = self
            .directory
            .find_user(&claims.sub)
            .await?
            .ok_or_else(|| AuthzError::UnknownPrincipal {
                user_id: claims.sub.clone(),
            })?;
        let not_assigned = || AuthzError::RoleNotAssigned {
            role_id: role_id.to_string(),
        };
        if !user.has_role(role_id) {
            warn!(role_id, "role assumption refused");
            return Err(not_assigned());
        }
        let role = self
            .directory
            .find_roles(&[role_id.to_string()])
            .await?
            .pop()
            .ok_or_else(not_assigned)?;

        let tenant = role_tenant(self.directory.as_ref(), &role).await?;
        let token = self
            .tokens
            .issue_assumed_role_token(&user.id, &tenant, &role.id)?;
        info!(role_id, unit_id = %tenant.unit_id, "role assumed");
        Ok(AssumedRole {
            role_id: role.id,
            tenant,
            token,
        })
    }
}
