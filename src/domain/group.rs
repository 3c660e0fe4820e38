use serde::{Deserialize, Serialize};

/// Group record: a set of users sharing the group's policies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub unit_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub policy_ids: Vec<String>,
}
