use crate::domain::tenant::TenantLevel;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};

/// Reserved document fields.
pub mod fields {
    pub const ID: &str = "id";
    pub const UNIT_ID: &str = "unit_id";
    pub const ORGANIZATION_ID: &str = "organization_id";
    pub const PARENT_ID: &str = "parent_id";
    pub const ANCESTRY: &str = "ancestry";
}

/// Built-in resource type names.
pub mod resource_types {
    pub const USER: &str = "User";
    pub const GROUP: &str = "Group";
    pub const ROLE: &str = "Role";
    pub const POLICY: &str = "Policy";
    pub const UNIT: &str = "Unit";
}

/// A stored document as seen by the access-control engine and the storage
/// collaborator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceInstance {
    fields: Map<String, Value>,
}

impl ResourceInstance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.get_str(fields::ID)
    }

    pub fn unit_id(&self) -> Option<&str> {
        self.get_str(fields::UNIT_ID)
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.get_str(fields::ORGANIZATION_ID)
    }

    /// Structural equality of a field against `expected`. Absent fields never match.
    pub fn field_equals(&self, field: &str, expected: &Value) -> bool {
        self.fields.get(field).is_some_and(|actual| actual == expected)
    }

    /// String membership of a field in `values`. Absent and non-string fields never match.
    pub fn field_in(&self, field: &str, values: &BTreeSet<String>) -> bool {
        self.get_str(field).is_some_and(|actual| values.contains(actual))
    }

    /// Applies a top-level JSON merge patch: `null` removes a field, anything
    /// else replaces it.
    pub fn merge_patch(&mut self, patch: Map<String, Value>) {
        for (field, value) in patch {
            if value.is_null() {
                self.fields.remove(&field);
            } else {
                self.fields.insert(field, value);
            }
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl TryFrom<Value> for ResourceInstance {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(other),
        }
    }
}

/// Verbs exposed by the resource gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceVerb {
    Create,
    Get,
    Update,
    Delete,
    List,
}

/// Action name for `verb` on `resource_type`, e.g. `Group:GetGroup` or
/// `Policy:ListPolicies`.
pub fn action_name(resource_type: &str, verb: ResourceVerb) -> String {
    match verb {
        ResourceVerb::Create => format!("{resource_type}:Create{resource_type}"),
        ResourceVerb::Get => format!("{resource_type}:Get{resource_type}"),
        ResourceVerb::Update => format!("{resource_type}:Update{resource_type}"),
        ResourceVerb::Delete => format!("{resource_type}:Delete{resource_type}"),
        ResourceVerb::List => format!("{resource_type}:List{}", plural(resource_type)),
    }
}

fn plural(noun: &str) -> String {
    const VOWELS: [char; 5] = ['a', 'e', 'i', 'o', 'u'];
    if let Some(stem) = noun.strip_suffix('y') {
        if !stem.ends_with(VOWELS) && !stem.is_empty() {
            return format!("{stem}ies");
        }
    }
    if noun.ends_with('s') || noun.ends_with('x') || noun.ends_with("ch") || noun.ends_with("sh") {
        return format!("{noun}es");
    }
    format!("{noun}s")
}

/// Tenant isolation level per resource type. Types not listed as
/// organization-scoped are isolated per unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceKinds {
    organization_scoped: HashSet<String>,
}

impl Default for ResourceKinds {
    fn default() -> Self {
        Self::with_organization_scoped([resource_types::UNIT])
    }
}

impl ResourceKinds {
    pub fn with_organization_scoped<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            organization_scoped: types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn tenant_level(&self, resource_type: &str) -> TenantLevel {
        if self.organization_scoped.contains(resource_type) {
            TenantLevel::Organization
        } else {
            TenantLevel::Unit
        }
    }
}
