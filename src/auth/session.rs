//! Resolved session types.
//!
//! A [`ResolvedSession`] is the server-side value derived from a verified
//! credential: identity summary, entitlement flag, expiry and the optional
//! impersonation overlay. It is immutable once constructed and cached keyed
//! by the exact serialized claims that produced it.

use serde::Serialize;

use crate::auth::credential::OrgClaim;
use crate::db::{Role, UserProfile};

/// Identity summary carried by a resolved session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionUser {
    /// User id.
    pub id: i64,
    /// Stable external identifier.
    pub uuid: String,
    /// Display name.
    pub name: Option<String>,
    /// Handle.
    pub username: Option<String>,
    /// Email address.
    pub email: String,
    /// When the email was verified, if it was.
    pub email_verified_at: Option<String>,
    /// Whether the email is verified.
    pub email_verified: bool,
    /// Whether onboarding has been completed.
    pub completed_onboarding: bool,
    /// Role.
    pub role: Role,
    /// Resolved avatar URL (never empty, falls back to the generated path).
    pub avatar_url: String,
    /// Whether the user belongs to an active team, per the credential.
    pub belongs_to_active_team: bool,
    /// Organization context, passed through verbatim from the credential.
    pub org: Option<OrgClaim>,
    /// Organization-scoped username, passed through from the credential.
    pub org_aware_username: Option<String>,
    /// Preferred locale.
    pub locale: Option<String>,
    /// Profile the session is acting under.
    pub profile: UserProfile,
    /// Impersonation overlay, present while another principal acts as this
    /// user. Carried from the credential and enriched with a minimal lookup.
    pub impersonated_by: Option<ImpersonatedBy>,
}

/// Minimal identity of an impersonating principal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpersonatedBy {
    /// User id of the impersonator.
    pub id: i64,
    /// Stable external identifier of the impersonator.
    pub uuid: String,
    /// Role of the impersonator.
    pub role: Role,
}

/// The derived, cacheable session value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSession {
    /// Whether this deployment holds a valid license.
    pub has_valid_license: bool,
    /// Session expiry as an RFC 3339 UTC timestamp, from the credential.
    pub expires: String,
    /// Identity summary.
    pub user: SessionUser,
    /// Profile record id from the credential, if any.
    pub profile_id: Option<i64>,
    /// Unified profile id (from the credential, or synthesized).
    pub up_id: String,
}

/// Resolve the avatar URL for a user.
///
/// An explicitly stored URL wins; otherwise a deterministic path under the
/// site is generated from the stable external id.
pub fn resolve_avatar_url(avatar_url: Option<&str>, uuid: &str, website_url: &str) -> String {
    match avatar_url {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => format!(
            "{}/api/avatar/{}.png",
            website_url.trim_end_matches('/'),
            uuid
        ),
    }
}
