//! slotbook - scheduling server auth core
//!
//! Session resolution and login gating: verifies signed session credentials,
//! caches resolved sessions process-wide, validates short-lived login
//! challenge tokens, and drives the login-page decision flow.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod license;
pub mod logging;
pub mod web;

pub use auth::{
    ChallengeError, ChallengeVerifier, Claims, CredentialError, HmacCredentialVerifier,
    LoginDecision, LoginMethods, LoginOrchestrator, LoginPageProps, LoginPageRequest,
    RandomCsrfProvider, RedirectResolver, ResolvedSession, SessionCache, SessionResolver,
    SessionUser, VerifyCredential,
};
pub use config::Config;
pub use db::{Database, IdentityStore, NewUser, Role, SqlIdentityStore, User};
pub use error::{Result, SlotbookError};
pub use license::{EntitlementGateway, LicenseService};
