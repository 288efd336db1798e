use serde::Serialize;

/// Admin user record. The password hash and token never leave the store
/// through `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// UUIDv7.
    pub id: String,
    pub user_name: String,
    /// PHC-format argon2 hash.
    #[serde(skip_serializing)]
    pub password: String,
    /// Bearer token, URL-safe base64 of 32 random bytes.
    pub token: String,
    pub created_at: String,
    pub updated_at: String,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("user_name", &self.user_name)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// Fields an authenticated caller may change. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub user_name: Option<String>,
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_name.is_none() && self.password.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User {
            id: "0190".into(),
            user_name: "admin".into(),
            password: "$argon2id$v=19$secret".into(),
            token: "tok".into(),
            created_at: "2026-01-01T00:00:00+00:00".into(),
            updated_at: "2026-01-01T00:00:00+00:00".into(),
        }
    }

    #[test]
    fn serialized_user_omits_password_hash() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value.get("password").is_none());
        assert_eq!(value["user_name"], "admin");
    }

    #[test]
    fn debug_hides_secrets() {
        let out = format!("{:?}", sample());
        assert!(!out.contains("secret"));
        assert!(!out.contains("tok\""));
    }
}
