use super::evaluator::Decision;
use super::filter::FilterExpr;
use crate::domain::resource::ResourceInstance;
use crate::domain::tenant::{TenantContext, TenantLevel};
use serde_json::Value;

/// Tenant isolation boundary. Applied after ABAC and independent of it: no
/// policy can widen it.
#[derive(Clone, Copy, Debug)]
pub struct TenantScope<'a> {
    tenant: &'a TenantContext,
    level: TenantLevel,
}

impl<'a> TenantScope<'a> {
    pub fn new(tenant: &'a TenantContext, level: TenantLevel) -> Self {
        Self { tenant, level }
    }

    fn tenant_value(&self) -> Value {
        Value::String(self.level.tenant_id(self.tenant).to_string())
    }

    /// Filter selecting only documents owned by the active tenant.
    pub fn boundary(&self) -> FilterExpr {
        FilterExpr::field_equals(self.level.field(), self.tenant_value())
    }

    pub fn scope_filter(&self, filter: FilterExpr) -> FilterExpr {
        self.boundary().and(filter)
    }

    pub fn contains(&self, instance: &ResourceInstance) -> bool {
        instance.field_equals(self.level.field(), &self.tenant_value())
    }

    pub fn scope_decision(&self, decision: Decision, instance: &ResourceInstance) -> Decision {
        if decision.is_allowed() && self.contains(instance) {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}
