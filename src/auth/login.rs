//! Login flow orchestration.
//!
//! Every login-page request walks the same decision ladder: an attached
//! challenge token is verified first (its faults terminate the flow with
//! distinct reason codes), then an existing session redirects the caller
//! away, and only an anonymous caller reaches the login surface itself —
//! unless the deployment has no users yet, which routes to first-run setup.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::auth::challenge::{ChallengeError, ChallengeVerifier};
use crate::auth::credential::VerifyCredential;
use crate::auth::redirect::RedirectResolver;
use crate::auth::resolver::SessionResolver;
use crate::config::AuthConfig;
use crate::db::IdentityStore;
use crate::license::EntitlementGateway;
use crate::Result;

/// Default landing destination for already-authenticated callers.
pub const DEFAULT_LANDING: &str = "/";

/// First-run setup surface.
pub const SETUP_DESTINATION: &str = "/auth/setup";

/// Error surface for challenge faults.
const ERROR_SURFACE: &str = "/auth/error";

/// Reason shown when a challenge verifies but carries no email.
const REASON_INVALID_PAYLOAD: &str = "JWT Invalid Payload";

/// Reason shown for signature or expiry faults on a challenge.
const REASON_INVALID_CHALLENGE: &str = "Invalid JWT: Please try again";

/// Seam for obtaining anti-forgery tokens.
///
/// Best-effort collaborator: failure to obtain a token is logged by the
/// orchestrator and the login surface renders without one.
pub trait CsrfTokenProvider: Send + Sync {
    /// Issue a fresh anti-forgery token.
    fn issue(&self) -> impl Future<Output = Result<String>> + Send;
}

/// Anti-forgery tokens from process-local randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCsrfProvider;

impl CsrfTokenProvider for RandomCsrfProvider {
    async fn issue(&self) -> Result<String> {
        Ok(uuid::Uuid::new_v4().simple().to_string())
    }
}

/// Login-method availability, read from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginMethods {
    /// Password login offered.
    pub password: bool,
    /// Google OAuth offered.
    pub google: bool,
    /// SAML SSO offered.
    pub saml: bool,
    /// SAML tenant identifier.
    pub saml_tenant_id: String,
    /// SAML product identifier.
    pub saml_product_id: String,
}

impl LoginMethods {
    /// Read the flags from auth configuration.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            password: config.password_login_enabled,
            google: config.google_login_enabled,
            saml: config.saml_login_enabled,
            saml_tenant_id: config.saml_tenant_id.clone(),
            saml_product_id: config.saml_product_id.clone(),
        }
    }
}

/// Inputs of one login-page request.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoginPageRequest<'a> {
    /// Raw session credential, if the request carried one.
    pub credential: Option<&'a str>,
    /// Raw challenge token from the `totp` query parameter.
    pub challenge_token: Option<&'a str>,
    /// Caller-supplied callback destination.
    pub callback_url: Option<&'a str>,
}

/// Props handed to the login surface when it renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginPageProps {
    /// Anti-forgery token, omitted if the provider failed.
    pub csrf_token: Option<String>,
    /// Whether password login is offered.
    pub is_password_login_enabled: bool,
    /// Whether Google OAuth is offered.
    pub is_google_login_enabled: bool,
    /// Whether SAML SSO is offered.
    pub is_saml_login_enabled: bool,
    /// SAML tenant identifier.
    pub saml_tenant_id: String,
    /// SAML product identifier.
    pub saml_product_id: String,
    /// Email pending the second authentication step, if a challenge
    /// verified on this request.
    pub totp_email: Option<String>,
}

/// Outcome of one login-page request.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginDecision {
    /// Terminal redirect to the given destination.
    Redirect {
        /// Destination path or URL.
        destination: String,
    },
    /// Render the login surface with the given props.
    Render(Box<LoginPageProps>),
}

impl LoginDecision {
    fn redirect(destination: impl Into<String>) -> Self {
        LoginDecision::Redirect {
            destination: destination.into(),
        }
    }

    fn challenge_fault(reason: &str) -> Self {
        Self::redirect(format!(
            "{ERROR_SURFACE}?error={}",
            urlencoding::encode(reason)
        ))
    }
}

/// Orchestrates the login-page decision ladder.
pub struct LoginOrchestrator<V, S, L, C> {
    resolver: Arc<SessionResolver<V, S, L>>,
    store: S,
    challenge: ChallengeVerifier,
    redirects: RedirectResolver,
    csrf: C,
    methods: LoginMethods,
}

impl<V, S, L, C> LoginOrchestrator<V, S, L, C>
where
    V: VerifyCredential,
    S: IdentityStore,
    L: EntitlementGateway,
    C: CsrfTokenProvider,
{
    /// Create an orchestrator.
    pub fn new(
        resolver: Arc<SessionResolver<V, S, L>>,
        store: S,
        challenge: ChallengeVerifier,
        redirects: RedirectResolver,
        csrf: C,
        methods: LoginMethods,
    ) -> Self {
        Self {
            resolver,
            store,
            challenge,
            redirects,
            csrf,
            methods,
        }
    }

    /// Decide the outcome of one login-page request.
    ///
    /// Hard faults (tampered credential, identity store failure during
    /// session resolution, entitlement failure) propagate to the caller;
    /// everything else lands on a decision.
    pub async fn decide(&self, request: LoginPageRequest<'_>) -> Result<LoginDecision> {
        // A challenge fault is terminal, but a verified challenge does not
        // short-circuit session resolution below.
        let mut totp_email = None;
        if let Some(token) = request.challenge_token {
            match self.challenge.verify(token) {
                Ok(verified) => totp_email = Some(verified.email),
                Err(ChallengeError::InvalidPayload) => {
                    return Ok(LoginDecision::challenge_fault(REASON_INVALID_PAYLOAD));
                }
                Err(ChallengeError::InvalidSignature) | Err(ChallengeError::Expired) => {
                    return Ok(LoginDecision::challenge_fault(REASON_INVALID_CHALLENGE));
                }
            }
        }

        if self.resolver.resolve(request.credential).await?.is_some() {
            if let Some(callback) = request.callback_url {
                if let Some(destination) = self.redirects.resolve(callback) {
                    return Ok(LoginDecision::redirect(destination));
                }
            }
            return Ok(LoginDecision::redirect(DEFAULT_LANDING));
        }

        match self.store.any_user_exists().await {
            Ok(false) => return Ok(LoginDecision::redirect(SETUP_DESTINATION)),
            Ok(true) => {}
            Err(e) => {
                // Identity store unreachable: render the login surface
                // rather than failing the page.
                warn!(error = %e, "could not check for existing users; rendering login surface");
            }
        }

        let csrf_token = match self.csrf.issue().await {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(error = %e, "failed to obtain anti-forgery token");
                None
            }
        };

        Ok(LoginDecision::Render(Box::new(LoginPageProps {
            csrf_token,
            is_password_login_enabled: self.methods.password,
            is_google_login_enabled: self.methods.google,
            is_saml_login_enabled: self.methods.saml,
            saml_tenant_id: self.methods.saml_tenant_id.clone(),
            saml_product_id: self.methods.saml_product_id.clone(),
            totp_email,
        })))
    }
}
