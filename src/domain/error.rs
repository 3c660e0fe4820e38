/// Errors surfaced by the access-control engine and the services around it.
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("Cannot execute \"{action}\" on \"{resource_type}\"")]
    Forbidden {
        action: String,
        resource_type: String,
    },

    #[error("Role \"{role_id}\" is not assigned to this principal")]
    RoleNotAssigned { role_id: String },

    #[error("Already acting under role \"{role_id}\"")]
    RoleChaining { role_id: String },

    #[error("{resource_type} \"{id}\" not found")]
    NotFound { resource_type: String, id: String },

    #[error("Principal \"{user_id}\" is unknown")]
    UnknownPrincipal { user_id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid or expired token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error("Failed to issue token")]
    TokenIssuance(#[source] jsonwebtoken::errors::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl AuthzError {
    pub fn forbidden(action: impl Into<String>, resource_type: impl Into<String>) -> Self {
        AuthzError::Forbidden {
            action: action.into(),
            resource_type: resource_type.into(),
        }
    }

    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        AuthzError::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}
