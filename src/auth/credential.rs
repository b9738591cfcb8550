//! Session credential verification.
//!
//! A credential is an HS256-signed compact token issued by the upstream
//! authentication flow. This module only reads it: signature and expiry are
//! checked, and the claims are extracted into a closed struct. Refresh and
//! issuance live outside this crate.

use chrono::{SecondsFormat, TimeZone, Utc};
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Credential verification errors.
///
/// Only tampering-class faults surface here; expired or absent credentials
/// are signalled as `Ok(None)` by [`VerifyCredential::verify`] so anonymous
/// requests stay on the cheap path.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// Signature does not match, or the algorithm is wrong.
    #[error("invalid credential signature")]
    InvalidSignature,

    /// Token is structurally broken (bad base64, bad JSON, missing parts).
    #[error("malformed credential: {0}")]
    Malformed(String),

    /// Infrastructure fault while verifying (unreachable verifier backend,
    /// timeout, refused connection).
    #[error("credential infrastructure fault: {0}")]
    Infra(String),
}

impl CredentialError {
    /// Whether this fault is a soft infrastructure fault that callers must
    /// absorb as "no credential" instead of failing the request.
    ///
    /// Classified by message, not variant: the fault may arrive wrapped in
    /// another error type whose category is only visible in the text.
    pub fn is_soft(&self) -> bool {
        is_soft_infra_fault(&self.to_string())
    }
}

/// Classify an error message as a soft infrastructure fault.
pub(crate) fn is_soft_infra_fault(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("fetch failed")
        || message.contains("networkerror")
        || message.contains("network unreachable")
        || message.contains("econnrefused")
        || message.contains("connection refused")
        || message.contains("timed out")
        || message.contains("timeout")
        || message.contains("infrastructure fault")
}

/// Organization context carried by a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgClaim {
    /// Organization id.
    pub id: i64,
    /// Organization slug, if the issuer included one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

/// Impersonator descriptor carried by a credential.
///
/// Identifier only; the full identity is looked up at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpersonatorClaim {
    /// User id of the impersonating principal.
    pub id: i64,
}

/// Verified contents of a session credential.
///
/// The field names mirror the wire format of the issuing flow exactly; this
/// struct is the external contract. Unknown extra fields are ignored on
/// parse. Optional fields are skipped when serializing so the serialized
/// form is stable and usable as a cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id as a decimal string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Email address bound to the credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Expiry as Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Unified profile id tying the user to an organizational context.
    #[serde(default, rename = "upId", skip_serializing_if = "Option::is_none")]
    pub up_id: Option<String>,
    /// Profile record id, if the issuer resolved one.
    #[serde(default, rename = "profileId", skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<i64>,
    /// Whether the user belongs to an active team.
    #[serde(
        default,
        rename = "belongsToActiveTeam",
        skip_serializing_if = "Option::is_none"
    )]
    pub belongs_to_active_team: Option<bool>,
    /// Organization context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<OrgClaim>,
    /// Username scoped to the organization.
    #[serde(
        default,
        rename = "orgAwareUsername",
        skip_serializing_if = "Option::is_none"
    )]
    pub org_aware_username: Option<String>,
    /// Impersonator descriptor, present while an admin acts as this user.
    #[serde(
        default,
        rename = "impersonatedBy",
        skip_serializing_if = "Option::is_none"
    )]
    pub impersonated_by: Option<ImpersonatorClaim>,
}

impl Claims {
    /// Serialized form of the claims, used as the session cache key.
    ///
    /// The exact serialization is the key on purpose: any claim change
    /// produces a new key and therefore a fresh resolution, which is how
    /// permission changes become visible without an invalidation hook.
    pub fn cache_key(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Session expiry as an RFC 3339 UTC timestamp derived from `exp`.
    ///
    /// Falls back to the current instant when the claim is missing.
    pub fn expires_at(&self) -> String {
        let instant = self
            .exp
            .and_then(|exp| Utc.timestamp_opt(exp, 0).single())
            .unwrap_or_else(Utc::now);
        instant.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Seam for credential verification.
///
/// `Ok(None)` means "no usable credential": absent input, an expired token,
/// or a soft infrastructure fault. `Err` means the token is tampered or
/// structurally broken and the request must fail.
pub trait VerifyCredential: Send + Sync {
    /// Verify a raw credential string.
    fn verify(&self, raw: &str) -> Result<Option<Claims>, CredentialError>;
}

/// HS256 credential verifier over a shared signing secret.
pub struct HmacCredentialVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl HmacCredentialVerifier {
    /// Create a verifier from the configured secret.
    ///
    /// An empty secret is a configuration fault: it is surfaced as a warning
    /// here and every subsequent verification will fail closed (anonymous).
    pub fn new(secret: &str) -> Self {
        if secret.is_empty() {
            warn!("auth secret is not set; session authentication may fail");
        }
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            decoding_key,
            validation,
        }
    }
}

impl VerifyCredential for HmacCredentialVerifier {
    fn verify(&self, raw: &str) -> Result<Option<Claims>, CredentialError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        match decode::<Claims>(raw, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(Some(data.claims)),
            Err(e) => match e.kind() {
                // Routine credential end-of-life, not a fault.
                ErrorKind::ExpiredSignature => {
                    debug!("credential expired");
                    Ok(None)
                }
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName => Err(CredentialError::InvalidSignature),
                _ => {
                    let message = e.to_string();
                    if is_soft_infra_fault(&message) {
                        warn!(
                            error = %message,
                            "soft infrastructure fault during credential verification; \
                             treating request as anonymous"
                        );
                        Ok(None)
                    } else {
                        Err(CredentialError::Malformed(message))
                    }
                }
            },
        }
    }
}
