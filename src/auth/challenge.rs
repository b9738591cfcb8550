//! Login challenge token verification.
//!
//! A challenge token is a short-lived HS256 token carrying a single email
//! claim, minted when a second authentication step is triggered (for example
//! a verification link). It is scoped to one login surface through its
//! issuer and audience, so a token minted for another surface never opens
//! this one.
//!
//! The trust boundary is separate from the session credential: different
//! secret, different claim schema, different failure routing.

use chrono::Utc;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

/// Challenge verification faults.
///
/// `InvalidPayload` is deliberately distinct from the signature/expiry
/// faults: callers route the two classes to different user-visible outcomes.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChallengeError {
    /// Signature verified but the payload carries no usable email claim.
    #[error("challenge payload carries no email")]
    InvalidPayload,

    /// Signature mismatch, structural damage, or wrong issuer/audience.
    #[error("invalid challenge token")]
    InvalidSignature,

    /// The challenge has passed its expiry.
    #[error("challenge expired")]
    Expired,
}

/// A successfully verified challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedChallenge {
    /// Email address pending the second authentication step.
    pub email: String,
}

#[derive(Debug, Deserialize)]
struct ChallengeClaims {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    aud: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Verifier for login challenge tokens.
pub struct ChallengeVerifier {
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
}

impl ChallengeVerifier {
    /// Create a verifier with explicit issuer/audience scoping.
    pub fn new(secret: &str, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// Create the verifier for the login surface of the given site.
    ///
    /// Issuer is the site itself, audience is its login page.
    pub fn for_login_surface(secret: &str, website_url: &str) -> Self {
        let website_url = website_url.trim_end_matches('/');
        Self::new(secret, website_url, format!("{website_url}/auth/login"))
    }

    /// Verify a raw challenge token and extract the pending email.
    ///
    /// The signature is checked first; claim checks run on the verified
    /// payload so that an empty payload with a valid signature reports
    /// `InvalidPayload` rather than a generic verification fault.
    pub fn verify(&self, raw: &str) -> Result<VerifiedChallenge, ChallengeError> {
        // Signature and structure only; claims are checked by hand below.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<ChallengeClaims>(raw.trim(), &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ChallengeError::Expired,
                _ => ChallengeError::InvalidSignature,
            })?;
        let claims = data.claims;

        let email = match claims.email {
            Some(email) if !email.is_empty() => email,
            _ => return Err(ChallengeError::InvalidPayload),
        };

        if claims.iss.as_deref() != Some(self.issuer.as_str())
            || claims.aud.as_deref() != Some(self.audience.as_str())
        {
            return Err(ChallengeError::InvalidSignature);
        }

        match claims.exp {
            Some(exp) if exp > Utc::now().timestamp() => Ok(VerifiedChallenge { email }),
            _ => Err(ChallengeError::Expired),
        }
    }
}
