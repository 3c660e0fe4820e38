use serde::{Deserialize, Serialize};

/// Role record. A role lives in its own unit, which becomes the active tenant
/// when a principal assumes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub organization_id: String,
    pub unit_id: String,
    #[serde(default)]
    pub policy_ids: Vec<String>,
}
