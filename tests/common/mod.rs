//! Test helpers for integration tests.
//!
//! Provides a TestServer wired to an in-memory database plus token builders
//! for session credentials and login challenge tokens.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;

use slotbook::web::{create_health_router, create_router, AppState};
use slotbook::{Claims, Config, Database, LicenseService, NewUser, SqlIdentityStore, User};

/// Credential signing secret used by tests.
pub const AUTH_SECRET: &str = "test-auth-secret";

/// Challenge token secret used by tests.
pub const ENCRYPTION_KEY: &str = "test-encryption-key";

/// Site base URL used by tests.
pub const SITE: &str = "https://book.example.com";

/// Create a test configuration.
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.auth.secret = AUTH_SECRET.to_string();
    config.auth.encryption_key = ENCRYPTION_KEY.to_string();
    config.auth.website_url = SITE.to_string();
    config.auth.google_login_enabled = true;
    config
}

/// Create a test server with an in-memory database.
///
/// The license service is keyless, so entitlement checks resolve to `false`
/// without any network traffic.
pub async fn create_test_server() -> (TestServer, SqlIdentityStore) {
    let config = create_test_config();

    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let store = SqlIdentityStore::new(db.pool().clone());

    let license = Arc::new(
        LicenseService::new(&config.license).expect("Failed to create license service"),
    );

    let app_state = Arc::new(
        AppState::new(&config, db.pool().clone(), license)
            .expect("Failed to create app state"),
    );

    let router = create_router(app_state).merge(create_health_router());
    let server = TestServer::new(router).expect("Failed to create test server");

    (server, store)
}

/// Seed a user with a deterministic email and completed onboarding.
pub async fn seed_user(store: &SqlIdentityStore, username: &str) -> User {
    store
        .create_user(
            &NewUser::new(format!("{username}@example.com"))
                .with_username(username)
                .with_completed_onboarding(),
        )
        .await
        .expect("Failed to seed user")
}

/// Build a signed session credential for the given user.
pub fn credential_for(user: &User) -> String {
    sign_credential(&Claims {
        sub: Some(user.id.to_string()),
        email: Some(user.email.clone()),
        exp: Some(Utc::now().timestamp() + 3600),
        up_id: None,
        profile_id: None,
        belongs_to_active_team: None,
        org: None,
        org_aware_username: None,
        impersonated_by: None,
    })
}

/// Sign arbitrary claims with the test auth secret.
pub fn sign_credential(claims: &Claims) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(AUTH_SECRET.as_bytes()),
    )
    .unwrap()
}

#[derive(Serialize)]
struct RawChallenge {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    iss: String,
    aud: String,
    exp: i64,
}

/// Build a challenge token for the login surface.
///
/// `secret` lets tests produce badly-signed tokens; `exp_offset` seconds
/// relative to now lets them produce expired ones.
pub fn challenge_token(email: Option<&str>, exp_offset: i64, secret: &str) -> String {
    encode(
        &Header::default(),
        &RawChallenge {
            email: email.map(str::to_string),
            iss: SITE.to_string(),
            aud: format!("{SITE}/auth/login"),
            exp: Utc::now().timestamp() + exp_offset,
        },
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
