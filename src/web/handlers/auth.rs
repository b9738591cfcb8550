//! Authentication handlers.

use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::{
    ChallengeVerifier, HmacCredentialVerifier, LoginDecision, LoginMethods, LoginOrchestrator,
    LoginPageRequest, RandomCsrfProvider, RedirectResolver, ResolvedSession, SessionCache,
    SessionResolver,
};
use crate::config::Config;
use crate::db::SqlIdentityStore;
use crate::license::LicenseService;
use crate::web::error::ApiError;
use crate::Result;

/// Cookie carrying the session credential.
pub const SESSION_COOKIE: &str = "slotbook.session-token";

type WebResolver =
    SessionResolver<HmacCredentialVerifier, SqlIdentityStore, Arc<LicenseService>>;
type WebOrchestrator = LoginOrchestrator<
    HmacCredentialVerifier,
    SqlIdentityStore,
    Arc<LicenseService>,
    RandomCsrfProvider,
>;

/// Application state shared across handlers.
pub struct AppState {
    /// Session resolver, shared with the orchestrator.
    pub resolver: Arc<WebResolver>,
    /// Login-page orchestrator.
    pub orchestrator: WebOrchestrator,
}

impl AppState {
    /// Wire up the auth core from configuration, a database pool and the
    /// process-wide license service.
    pub fn new(
        config: &Config,
        pool: sqlx::SqlitePool,
        license: Arc<LicenseService>,
    ) -> Result<Self> {
        let store = SqlIdentityStore::new(pool);
        let cache = Arc::new(SessionCache::new(config.auth.session_cache_capacity));

        let resolver = Arc::new(SessionResolver::new(
            HmacCredentialVerifier::new(&config.auth.secret),
            store.clone(),
            license,
            cache,
            config.auth.website_url.clone(),
        ));

        let orchestrator = LoginOrchestrator::new(
            resolver.clone(),
            store,
            ChallengeVerifier::for_login_surface(
                &config.auth.encryption_key,
                &config.auth.website_url,
            ),
            RedirectResolver::new(&config.auth.website_url, &config.auth.trusted_origins)?,
            RandomCsrfProvider,
            LoginMethods::from_config(&config.auth),
        );

        Ok(Self {
            resolver,
            orchestrator,
        })
    }
}

/// Query parameters of the login page.
#[derive(Debug, Deserialize)]
pub struct LoginPageQuery {
    /// Challenge token from a verification link.
    pub totp: Option<String>,
    /// Caller-supplied callback destination.
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

/// Extract the raw session credential from the request.
///
/// The session cookie wins; a bearer token is accepted as a fallback for
/// API callers.
fn extract_credential(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// GET /auth/login - Login page decision.
///
/// Redirects authenticated callers away (honoring a safe callback), routes
/// challenge faults to the error surface, and otherwise responds with the
/// login surface props.
pub async fn login_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(query): Query<LoginPageQuery>,
) -> std::result::Result<Response, ApiError> {
    let credential = extract_credential(&jar, &headers);

    let decision = state
        .orchestrator
        .decide(LoginPageRequest {
            credential: credential.as_deref(),
            challenge_token: query.totp.as_deref(),
            callback_url: query.callback_url.as_deref(),
        })
        .await?;

    Ok(match decision {
        LoginDecision::Redirect { destination } => {
            Redirect::temporary(&destination).into_response()
        }
        LoginDecision::Render(props) => Json(*props).into_response(),
    })
}

/// GET /api/auth/session - Resolve the request's session.
///
/// Returns the resolved session, or `null` for anonymous requests.
pub async fn session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> std::result::Result<Json<Option<ResolvedSession>>, ApiError> {
    let credential = extract_credential(&jar, &headers);
    let session = state.resolver.resolve(credential.as_deref()).await?;
    Ok(Json(session))
}
