//! Authentication core for slotbook.
//!
//! This module turns opaque signed credentials into trusted sessions and
//! drives the login-page decision flow:
//!
//! - [`credential`]: session credential verification
//! - [`challenge`]: short-lived, purpose-bound login challenge tokens
//! - [`cache`]: the process-wide resolved-session cache
//! - [`resolver`]: credential-to-session resolution
//! - [`redirect`]: safe-redirect validation
//! - [`login`]: the login-page orchestrator

pub mod cache;
pub mod challenge;
pub mod credential;
pub mod login;
pub mod redirect;
pub mod resolver;
pub mod session;

pub use cache::{SessionCache, DEFAULT_CAPACITY};
pub use challenge::{ChallengeError, ChallengeVerifier, VerifiedChallenge};
pub use credential::{
    Claims, CredentialError, HmacCredentialVerifier, ImpersonatorClaim, OrgClaim, VerifyCredential,
};
pub use login::{
    CsrfTokenProvider, LoginDecision, LoginMethods, LoginOrchestrator, LoginPageProps,
    LoginPageRequest, RandomCsrfProvider, DEFAULT_LANDING, SETUP_DESTINATION,
};
pub use redirect::RedirectResolver;
pub use resolver::SessionResolver;
pub use session::{ImpersonatedBy, ResolvedSession, SessionUser};
