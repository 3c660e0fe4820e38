use super::compiler;
use super::evaluator::{self, Decision};
use super::filter::FilterExpr;
use super::rule::RuleSet;
use super::tenant_scope::TenantScope;
use crate::domain::error::AuthzError;
use crate::domain::principal::PrincipalIdentity;
use crate::domain::resource::{ResourceInstance, ResourceKinds};
use crate::domain::tenant::{TenantContext, TenantLevel};
use std::sync::Arc;
use tracing::{debug, instrument};

/// What a principal may do for the lifetime of one request: its rule set and
/// the tenant every answer is confined to.
#[derive(Clone, Debug)]
pub struct Ability {
    rules: RuleSet,
    tenant: TenantContext,
    kinds: Arc<ResourceKinds>,
}

impl Ability {
    pub fn new(rules: RuleSet, tenant: TenantContext, kinds: Arc<ResourceKinds>) -> Self {
        Self {
            rules,
            tenant,
            kinds,
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn tenant(&self) -> &TenantContext {
        &self.tenant
    }

    pub fn tenant_level(&self, resource_type: &str) -> TenantLevel {
        self.kinds.tenant_level(resource_type)
    }

    fn tenant_scope(&self, resource_type: &str) -> TenantScope<'_> {
        TenantScope::new(&self.tenant, self.tenant_level(resource_type))
    }

    /// Point decision, confined to the active tenant.
    pub fn decide(
        &self,
        action: &str,
        resource_type: &str,
        instance: &ResourceInstance,
    ) -> Decision {
        let decision = evaluator::decide(&self.rules, action, resource_type, instance);
        self.tenant_scope(resource_type)
            .scope_decision(decision, instance)
    }

    pub fn can(&self, action: &str, resource_type: &str, instance: &ResourceInstance) -> bool {
        self.decide(action, resource_type, instance).is_allowed()
    }

    /// Like [`Ability::decide`] but turns `Deny` into [`AuthzError::Forbidden`].
    pub fn ensure(
        &self,
        action: &str,
        resource_type: &str,
        instance: &ResourceInstance,
    ) -> Result<(), AuthzError> {
        if self.can(action, resource_type, instance) {
            Ok(())
        } else {
            Err(AuthzError::forbidden(action, resource_type))
        }
    }

    /// Filter selecting exactly the documents [`Ability::decide`] allows.
    pub fn access_filter(&self, action: &str, resource_type: &str) -> FilterExpr {
        let filter = compiler::compile(&self.rules, action, resource_type);
        self.tenant_scope(resource_type).scope_filter(filter)
    }
}

/// Builds an [`Ability`] from a principal's aggregated statements.
#[derive(Clone, Debug, Default)]
pub struct AbilityAggregator {
    kinds: Arc<ResourceKinds>,
}

impl AbilityAggregator {
    pub fn new(kinds: ResourceKinds) -> Self {
        Self {
            kinds: Arc::new(kinds),
        }
    }

    /// Direct statements first, then groups, then roles, each in association
    /// order. Under role assumption only the assumed role's statements are
    /// used and the tenant becomes the role's own.
    #[instrument(level = "debug", skip(self, principal), fields(user_id = %principal.user_id()))]
    pub fn build(&self, principal: &PrincipalIdentity) -> Result<Ability, AuthzError> {
        if let Some(role_id) = principal.assumed_role_id() {
            let grant = principal
                .role_grant(role_id)
                .ok_or_else(|| AuthzError::RoleNotAssigned {
                    role_id: role_id.to_string(),
                })?;
            let rules = RuleSet::from_statements(&grant.statements);
            debug!(role_id, rules = rules.len(), "built ability for assumed role");
            return Ok(Ability::new(rules, grant.tenant.clone(), self.kinds.clone()));
        }

        let mut rules = RuleSet::from_statements(principal.statements());
        for group in principal.groups() {
            rules.extend_from_statements(&group.statements);
        }
        for role in principal.roles() {
            rules.extend_from_statements(&role.statements);
        }
        debug!(rules = rules.len(), "built ability");
        Ok(Ability::new(
            rules,
            principal.tenant().clone(),
            self.kinds.clone(),
        ))
    }
}
