//! Authenticated user identity
//!
//! The identity is what the backend returns from `POST /auth/login`, narrowed
//! to the fields the client needs. It is also the record persisted by the
//! session store, so the field names double as the on-disk format.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The role of a CuraCore account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Patient,
    Doctor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "patient" => Some(Role::Patient),
            "doctor" => Some(Role::Doctor),
            _ => None,
        }
    }

    pub fn all() -> Vec<Role> {
        vec![Role::Patient, Role::Doctor]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Patient => "Patient",
            Role::Doctor => "Doctor",
        }
    }

    /// The other role, used by the signup form's role toggle
    pub fn toggled(&self) -> Self {
        match self {
            Role::Patient => Role::Doctor,
            Role::Doctor => Role::Patient,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "user_id")]
    pub subject_id: i64,
    #[serde(rename = "full_name")]
    pub display_name: String,
    pub role: Role,
    pub email: String,
}

impl Identity {
    pub fn is_doctor(&self) -> bool {
        matches!(self.role, Role::Doctor)
    }

    /// First letters of the display name, shown in place of an avatar
    pub fn initials(&self) -> String {
        self.display_name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .take(2)
            .flat_map(char::to_uppercase)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_from_login_response() {
        // Extra fields like "status" are ignored
        let body = r#"{
            "status": "success",
            "user_id": 7,
            "full_name": "Pugazh Mani",
            "email": "pugazh@example.com",
            "role": "patient"
        }"#;
        let identity: Identity = serde_json::from_str(body).unwrap();
        assert_eq!(identity.subject_id, 7);
        assert_eq!(identity.display_name, "Pugazh Mani");
        assert_eq!(identity.role, Role::Patient);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let body = r#"{"user_id": 1, "full_name": "X", "email": "x@y", "role": "admin"}"#;
        assert!(serde_json::from_str::<Identity>(body).is_err());
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!(Role::from_str("Doctor"), Some(Role::Doctor));
        assert_eq!(Role::from_str(" patient "), Some(Role::Patient));
        assert_eq!(Role::from_str("nurse"), None);
    }

    #[test]
    fn test_initials() {
        let identity = Identity {
            subject_id: 1,
            display_name: "sarah jane connor".to_string(),
            role: Role::Doctor,
            email: "sarah@example.com".to_string(),
        };
        assert_eq!(identity.initials(), "SJ");
    }
}
