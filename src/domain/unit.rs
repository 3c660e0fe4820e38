use serde::{Deserialize, Serialize};

/// Organizational unit. `ancestry` lists the unit's ancestors, root first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub name: String,
    pub organization_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub ancestry: Vec<String>,
}
