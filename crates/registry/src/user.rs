use chrono::{DateTime, Utc};
use serde::Serialize;

use fiscalhub_core::{DomainError, DomainResult, UserId};

/// A registered account. Owns fiscal modules and, through them, terminals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub inn: String,
    pub username: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub company_name: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user. The password is already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub inn: String,
    pub username: String,
    pub password_hash: String,
    pub company_name: String,
    pub is_admin: bool,
    pub is_active: bool,
}

impl NewUser {
    pub fn validate(&self) -> DomainResult<()> {
        if self.username.trim().is_empty() {
            return Err(DomainError::validation("username must not be empty"));
        }
        if self.password_hash.is_empty() {
            return Err(DomainError::validation("password must not be empty"));
        }
        Ok(())
    }
}

/// Partial update of a user. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub inn: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub company_name: Option<String>,
    pub is_admin: Option<bool>,
    pub is_active: Option<bool>,
}

impl UserPatch {
    pub fn apply_to(self, user: &mut User) -> DomainResult<()> {
        if let Some(username) = &self.username {
            if username.trim().is_empty() {
                return Err(DomainError::validation("username must not be empty"));
            }
        }

        if let Some(v) = self.inn {
            user.inn = v;
        }
        if let Some(v) = self.username {
            user.username = v;
        }
        if let Some(v) = self.password_hash {
            user.password_hash = v;
        }
        if let Some(v) = self.company_name {
            user.company_name = v;
        }
        if let Some(v) = self.is_admin {
            user.is_admin = v;
        }
        if let Some(v) = self.is_active {
            user.is_active = v;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: UserId::new(1),
            inn: "7700000000".into(),
            username: "alice".into(),
            password_hash: "$argon2id$stub".into(),
            company_name: "Acme".into(),
            is_admin: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut u = user();
        UserPatch {
            company_name: Some(String::new()),
            is_active: Some(false),
            ..Default::default()
        }
        .apply_to(&mut u)
        .unwrap();

        assert_eq!(u.company_name, "");
        assert!(!u.is_active);
        assert_eq!(u.username, "alice");
        assert_eq!(u.inn, "7700000000");
    }

    #[test]
    fn blank_username_is_rejected_without_partial_apply() {
        let mut u = user();
        let before = u.clone();
        let err = UserPatch {
            username: Some("  ".into()),
            inn: Some("1".into()),
            ..Default::default()
        }
        .apply_to(&mut u)
        .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(u, before);
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let json = serde_json::to_value(user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "alice");
        assert_eq!(json["id"], 1);
    }
}
