//! Minimal user projection consumed by the auth core.
//!
//! The user schema is owned by the surrounding CRUD layer; auth only sees
//! the fields it needs and treats them as read-only except during login and
//! registration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;

/// The slice of a user record the auth core operates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User's unique identifier.
    pub id: Uuid,

    /// Login email, unique across users.
    pub email: String,

    /// Display name.
    pub name: String,

    /// Application-wide role.
    pub role: Role,

    /// Argon2 password hash. Never serialized to API responses.
    #[serde(skip_serializing)]
    pub password_hash: String,
}

impl User {
    /// Returns `true` if the user holds the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "dana@example.com".to_string(),
            name: "Dana".to_string(),
            role: Role::Member,
            password_hash: "$argon2id$v=19$secret".to_string(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("dana@example.com"));
    }
}
