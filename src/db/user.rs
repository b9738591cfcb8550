//! User model for slotbook.
//!
//! This module defines the User struct and Role enum consumed by session
//! resolution, plus the profile types produced by enrichment.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// User role for permission management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular user.
    #[default]
    User,
    /// Instance administrator.
    Admin,
}

impl Role {
    /// Convert role to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Check if this role has at least the required permission level.
    pub fn can_access(&self, required: Role) -> bool {
        *self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// User entity as loaded from the identity store.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Stable external identifier.
    pub uuid: String,
    /// Handle (optional until onboarding completes).
    pub username: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Email address.
    pub email: String,
    /// When the email was verified, if it was.
    pub email_verified_at: Option<String>,
    /// Whether onboarding has been completed.
    pub completed_onboarding: bool,
    /// User role for permissions.
    pub role: Role,
    /// Stored avatar URL (optional; resolution falls back to a generated path).
    pub avatar_url: Option<String>,
    /// Preferred locale.
    pub locale: Option<String>,
    /// Account creation timestamp.
    pub created_at: String,
}

impl User {
    /// Check if this user is an administrator.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Minimal identity used for the impersonation overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimalUser {
    /// User id.
    pub id: i64,
    /// Stable external identifier.
    pub uuid: String,
    /// Role.
    pub role: Role,
}

/// Profile a session acts under.
///
/// The personal profile is synthesized from the user record; organization
/// profiles are stored rows keyed by their unified profile id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    /// Unified profile id.
    pub up_id: String,
    /// Username within this profile's context.
    pub username: Option<String>,
    /// Organization the profile belongs to, if any.
    pub organization_id: Option<i64>,
}

/// User record enriched with its profile.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedUser {
    /// The underlying user record.
    pub user: User,
    /// The profile resolved for the requested unified profile id.
    pub profile: UserProfile,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Stable external identifier.
    pub uuid: String,
    /// Email address.
    pub email: String,
    /// Handle.
    pub username: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// User role (defaults to User).
    pub role: Role,
    /// Whether onboarding is already complete.
    pub completed_onboarding: bool,
    /// Preferred locale.
    pub locale: Option<String>,
    /// Stored avatar URL.
    pub avatar_url: Option<String>,
}

impl NewUser {
    /// Create a new user with minimal required fields.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            email: email.into(),
            username: None,
            name: None,
            role: Role::User,
            completed_onboarding: false,
            locale: None,
            avatar_url: None,
        }
    }

    /// Set the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Mark onboarding as completed.
    pub fn with_completed_onboarding(mut self) -> Self {
        self.completed_onboarding = true;
        self
    }

    /// Set the locale.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Set the stored avatar URL.
    pub fn with_avatar_url(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }
}
