use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub password_hash: Option<String>,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("admin") {
            UserRole::Admin
        } else {
            UserRole::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub password_hash: String,
}

/// Partial update. The nested options on the reset fields allow clearing them.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub password_hash: Option<String>,
    pub reset_token: Option<Option<String>>,
    pub reset_token_expiry: Option<Option<DateTime<Utc>>>,
    pub last_login: Option<DateTime<Utc>>,
}

impl UserPatch {
    pub fn clear_reset() -> Self {
        Self {
            reset_token: Some(None),
            reset_token_expiry: Some(None),
            ..Default::default()
        }
    }

    pub fn apply(self, user: &mut DashboardUser) {
        if let Some(v) = self.email {
            user.email = v;
        }
        if let Some(v) = self.name {
            user.name = v;
        }
        if let Some(v) = self.role {
            user.role = v;
        }
        if let Some(v) = self.password_hash {
            user.password_hash = Some(v);
        }
        if let Some(v) = self.reset_token {
            user.reset_token = v;
        }
        if let Some(v) = self.reset_token_expiry {
            user.reset_token_expiry = v;
        }
        if let Some(v) = self.last_login {
            user.last_login = Some(v);
        }
    }
}
