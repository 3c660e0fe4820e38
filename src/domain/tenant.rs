use serde::{Deserialize, Serialize};

/// Active tenant of a request: the organization, the unit inside it, and the
/// unit's ancestor chain (root first).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub organization_id: String,
    pub unit_id: String,
    #[serde(default)]
    pub unit_ancestry: Vec<String>,
}

impl TenantContext {
    pub fn new(organization_id: impl Into<String>, unit_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            unit_id: unit_id.into(),
            unit_ancestry: Vec::new(),
        }
    }

    pub fn with_ancestry(mut self, unit_ancestry: Vec<String>) -> Self {
        self.unit_ancestry = unit_ancestry;
        self
    }

    /// Ancestry recorded on a unit created directly under the active unit.
    pub fn child_ancestry(&self) -> Vec<String> {
        let mut ancestry = self.unit_ancestry.clone();
        ancestry.push(self.unit_id.clone());
        ancestry
    }
}

/// Granularity at which a resource type is isolated between tenants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TenantLevel {
    Unit,
    Organization,
}

impl TenantLevel {
    /// Document field holding the owning tenant for this level.
    pub fn field(self) -> &'static str {
        match self {
            TenantLevel::Unit => crate::domain::resource::fields::UNIT_ID,
            TenantLevel::Organization => crate::domain::resource::fields::ORGANIZATION_ID,
        }
    }

    /// Identifier of the active tenant at this level.
    pub fn tenant_id(self, tenant: &TenantContext) -> &str {
        match self {
            TenantLevel::Unit => &tenant.unit_id,
            TenantLevel::Organization => &tenant.organization_id,
        }
    }
}
