//! User identity types
//!
//! Roles and permissions are opaque string tags issued by the backend. There is
//! no hierarchy and no wildcard: `super_admin` does not imply `admin`, and no
//! role implies any permission.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

/// Coarse-grained actor category, e.g. `super_admin`, `admin`, `employee`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

/// Fine-grained capability tag, e.g. `view_employees`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(String);

macro_rules! string_tag {
    ($name:ident) => {
        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_tag!(Role);
string_tag!(Permission);

/// Backend user identifier. The API sends either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawUserId", into = "String")]
pub struct UserId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawUserId {
    Number(i64),
    Text(String),
}

impl From<RawUserId> for UserId {
    fn from(raw: RawUserId) -> Self {
        match raw {
            RawUserId::Number(n) => Self(n.to_string()),
            RawUserId::Text(s) => Self(s),
        }
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two independent populations that sign in to the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserClass {
    /// Agency employees
    Staff,
    /// General administrators
    Admin,
}

impl UserClass {
    pub const ALL: [UserClass; 2] = [UserClass::Staff, UserClass::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserClass::Staff => "staff",
            UserClass::Admin => "admin",
        }
    }

    /// Persisted key holding the bearer token
    pub fn token_key(&self) -> &'static str {
        match self {
            UserClass::Staff => "staff_token",
            UserClass::Admin => "admin_token",
        }
    }

    /// Persisted key holding the serialized [`UserProfile`]
    pub fn user_key(&self) -> &'static str {
        match self {
            UserClass::Staff => "staff_user",
            UserClass::Admin => "admin_user",
        }
    }
}

impl fmt::Display for UserClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "staff" | "employee" => Ok(UserClass::Staff),
            "admin" => Ok(UserClass::Admin),
            _ => Err(format!("Unknown user class: {}", s)),
        }
    }
}

/// User object as returned by the backend and persisted locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub roles: BTreeSet<Role>,
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
}

impl UserProfile {
    /// Get user display string
    pub fn display_string(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }
}

/// An authenticated actor of one user class
#[derive(Clone, PartialEq)]
pub struct Session {
    pub class: UserClass,
    pub user: UserProfile,
    pub token: String,
    pub token_type: String,
}

impl Session {
    pub fn new(class: UserClass, user: UserProfile, token: impl Into<String>) -> Self {
        Self {
            class,
            user,
            token: token.into(),
            token_type: "Bearer".to_string(),
        }
    }

    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = token_type.into();
        self
    }

    /// Value for the `Authorization` header
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.token)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("class", &self.class)
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}
