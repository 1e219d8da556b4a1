use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Column width of `users.name`.
pub const MAX_NAME_LEN: usize = 255;

/// Trims a display name and checks it fits the column. Empty is allowed.
pub fn validate_name(raw: &str) -> Result<String, String> {
    let name = raw.trim();
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        ));
    }
    Ok(name.to_string())
}

/// Authorization level of an account.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Staff,
    Superuser,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Staff => "staff",
            Role::Superuser => "superuser",
        }
    }

    pub fn is_staff(self) -> bool {
        matches!(self, Role::Staff | Role::Superuser)
    }

    pub fn is_superuser(self) -> bool {
        self == Role::Superuser
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "staff" => Ok(Role::Staff),
            "superuser" => Ok(Role::Superuser),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String, // argon2 PHC string, never exposed
    pub name: String,
    pub is_active: bool,
    pub role: Role,
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn is_superuser(&self) -> bool {
        self.role.is_superuser()
    }
}

/// Optional attributes accepted at creation time.
#[derive(Debug, Clone)]
pub struct UserExtras {
    pub name: String,
    pub is_active: bool,
    pub role: Role,
}

impl Default for UserExtras {
    fn default() -> Self {
        Self {
            name: String::new(),
            is_active: true,
            role: Role::User,
        }
    }
}

/// A row ready to be persisted: email already normalized, password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub is_active: bool,
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub password_hash: Option<String>,
}
