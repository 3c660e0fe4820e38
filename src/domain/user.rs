use serde::{Deserialize, Serialize};

/// User record as stored in the directory.
///
/// Group and role ids are kept in association order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub organization_id: String,
    pub unit_id: String,
    #[serde(default)]
    pub policy_ids: Vec<String>,
    #[serde(default)]
    pub group_ids: Vec<String>,
    #[serde(default)]
    pub role_ids: Vec<String>,
}

impl User {
    /// Returns true if the role is assigned to the user.
    pub fn has_role(&self, role_id: &str) -> bool {
        self.role_ids.iter().any(|id| id == role_id)
    }
}
