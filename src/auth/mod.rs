//! # Authentication
//!
//! Credentials used to register and log in, and the bearer session that
//! login hands back.

use serde_json::{Value, json};

/// Account details sent once to `/auth/register` and reused for `/auth/login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

impl Credentials {
    pub fn registration_body(&self) -> Value {
        json!({
            "name": self.name,
            "email": self.email,
            "password": self.password,
            "role": self.role,
        })
    }

    pub fn login_body(&self) -> Value {
        json!({
            "email": self.email,
            "password": self.password,
        })
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            name: "Test User".into(),
            email: "testuser@example.com".into(),
            password: "password123".into(),
            role: "member".into(),
        }
    }
}

/// Bearer session obtained from a successful login. Lives for the rest of the run.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
}

impl Session {
    /// Returns `None` for an empty or whitespace-only token.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return None;
        }
        Some(Self { token })
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("token", &"<redacted>").finish()
    }
}
