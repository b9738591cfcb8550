//! Session resolution.
//!
//! Turns a raw credential into a [`ResolvedSession`] or a definitive "no
//! session". The common anonymous path is fast and side-effect-free; the
//! full derivation (identity load, entitlement check, profile enrichment,
//! impersonation overlay) runs only on a cache miss and its result is
//! stored keyed by the serialized claims.
//!
//! Fault contract: soft infrastructure faults and stale credentials resolve
//! to `None`; tampered credentials, identity store failures and entitlement
//! failures propagate.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::auth::cache::SessionCache;
use crate::auth::credential::{Claims, VerifyCredential};
use crate::auth::session::{resolve_avatar_url, ImpersonatedBy, ResolvedSession, SessionUser};
use crate::db::{EnrichedUser, IdentityStore};
use crate::license::EntitlementGateway;
use crate::Result;

/// Resolves credentials into sessions, backed by the shared session cache.
pub struct SessionResolver<V, S, L> {
    verifier: V,
    store: S,
    entitlements: L,
    cache: Arc<SessionCache>,
    website_url: String,
}

impl<V, S, L> SessionResolver<V, S, L>
where
    V: VerifyCredential,
    S: IdentityStore,
    L: EntitlementGateway,
{
    /// Create a resolver. The cache is shared process-wide state owned by
    /// the bootstrap and injected here.
    pub fn new(
        verifier: V,
        store: S,
        entitlements: L,
        cache: Arc<SessionCache>,
        website_url: impl Into<String>,
    ) -> Self {
        Self {
            verifier,
            store,
            entitlements,
            cache,
            website_url: website_url.into(),
        }
    }

    /// Resolve a raw credential into a session, or `None` for anonymous.
    pub async fn resolve(&self, raw_credential: Option<&str>) -> Result<Option<ResolvedSession>> {
        let raw = match raw_credential {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Ok(None),
        };

        let claims = match self.verifier.verify(raw) {
            Ok(Some(claims)) => claims,
            Ok(None) => return Ok(None),
            Err(e) if e.is_soft() => {
                warn!(
                    error = %e,
                    "soft infrastructure fault while verifying credential; treating request as anonymous"
                );
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if claims.email.is_none() || claims.sub.is_none() {
            debug!("credential lacks email or subject claim");
            return Ok(None);
        }

        let key = claims.cache_key()?;
        if let Some(session) = self.cache.get(&key).await {
            debug!(user_id = session.user.id, "returning cached session");
            return Ok(Some(session));
        }

        let session = match self.derive_session(&claims).await? {
            Some(session) => session,
            None => return Ok(None),
        };

        self.cache.put(key, session.clone()).await;
        Ok(Some(session))
    }

    /// Derive a fresh session from verified claims (cache-miss path).
    async fn derive_session(&self, claims: &Claims) -> Result<Option<ResolvedSession>> {
        let sub = claims.sub.as_deref().unwrap_or_default();
        let user_id = match sub.parse::<i64>() {
            Ok(id) if id > 0 => id,
            _ => {
                warn!(sub = %sub, "invalid or missing user id in credential");
                return Ok(None);
            }
        };

        let user = match self.store.find_user_by_id(user_id).await? {
            Some(user) => user,
            None => {
                warn!(user_id, "no user found for valid credential");
                return Ok(None);
            }
        };

        // Entitlement unavailability is fatal by contract; no absorption here.
        let has_valid_license = self.entitlements.check_license().await?;

        let up_id = claims
            .up_id
            .clone()
            .filter(|up_id| !up_id.is_empty())
            .unwrap_or_else(|| format!("usr-{}", user.id));
        if up_id.is_empty() {
            error!(user_id = user.id, "empty unified profile id for session");
            return Ok(None);
        }

        let EnrichedUser { user, profile } = self.store.enrich_with_profile(user, &up_id).await?;

        let avatar_url =
            resolve_avatar_url(user.avatar_url.as_deref(), &user.uuid, &self.website_url);

        let mut session = ResolvedSession {
            has_valid_license,
            expires: claims.expires_at(),
            user: SessionUser {
                id: user.id,
                uuid: user.uuid,
                name: user.name,
                username: user.username,
                email: user.email,
                email_verified: user.email_verified_at.is_some(),
                email_verified_at: user.email_verified_at,
                completed_onboarding: user.completed_onboarding,
                role: user.role,
                avatar_url,
                belongs_to_active_team: claims.belongs_to_active_team.unwrap_or(false),
                org: claims.org.clone(),
                org_aware_username: claims.org_aware_username.clone(),
                locale: user.locale,
                profile,
                impersonated_by: None,
            },
            profile_id: claims.profile_id,
            up_id,
        };

        if let Some(impersonator) = claims.impersonated_by.as_ref() {
            // A lookup miss silently omits the overlay; store errors propagate.
            if let Some(minimal) = self.store.find_user_minimal_by_id(impersonator.id).await? {
                session.user.impersonated_by = Some(ImpersonatedBy {
                    id: minimal.id,
                    uuid: minimal.uuid,
                    role: minimal.role,
                });
            }
        }

        debug!(user_id = session.user.id, "resolved session");
        Ok(Some(session))
    }

    /// The shared session cache.
    pub fn cache(&self) -> &Arc<SessionCache> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credential::{CredentialError, ImpersonatorClaim, OrgClaim};
    use crate::db::{MinimalUser, Role, User, UserProfile};
    use crate::SlotbookError;
    use std::collections::HashMap;

    const WEBSITE: &str = "https://book.example.com";

    enum VerifierBehavior {
        Claims(Box<Claims>),
        Absent,
        SoftFault,
        Tampered,
    }

    struct FakeVerifier(VerifierBehavior);

    impl VerifyCredential for FakeVerifier {
        fn verify(&self, _raw: &str) -> std::result::Result<Option<Claims>, CredentialError> {
            match &self.0 {
                VerifierBehavior::Claims(claims) => Ok(Some((**claims).clone())),
                VerifierBehavior::Absent => Ok(None),
                VerifierBehavior::SoftFault => {
                    Err(CredentialError::Infra("connection refused".to_string()))
                }
                VerifierBehavior::Tampered => Err(CredentialError::InvalidSignature),
            }
        }
    }

    #[derive(Clone, Default)]
    struct FakeStore {
        users: HashMap<i64, User>,
        profiles: HashMap<String, UserProfile>,
    }

    impl FakeStore {
        fn with_user(mut self, user: User) -> Self {
            self.users.insert(user.id, user);
            self
        }
    }

    impl IdentityStore for FakeStore {
        async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
            Ok(self.users.get(&id).cloned())
        }

        async fn find_user_minimal_by_id(&self, id: i64) -> Result<Option<MinimalUser>> {
            Ok(self.users.get(&id).map(|u| MinimalUser {
                id: u.id,
                uuid: u.uuid.clone(),
                role: u.role,
            }))
        }

        async fn enrich_with_profile(&self, user: User, up_id: &str) -> Result<EnrichedUser> {
            let profile = self.profiles.get(up_id).cloned().unwrap_or(UserProfile {
                up_id: up_id.to_string(),
                username: user.username.clone(),
                organization_id: None,
            });
            Ok(EnrichedUser { user, profile })
        }

        async fn any_user_exists(&self) -> Result<bool> {
            Ok(!self.users.is_empty())
        }
    }

    enum EntitlementBehavior {
        Fixed(bool),
        Unavailable,
    }

    struct FakeEntitlements(EntitlementBehavior);

    impl EntitlementGateway for FakeEntitlements {
        async fn check_license(&self) -> Result<bool> {
            match self.0 {
                EntitlementBehavior::Fixed(valid) => Ok(valid),
                EntitlementBehavior::Unavailable => Err(SlotbookError::Entitlement(
                    "license api unreachable".to_string(),
                )),
            }
        }
    }

    fn test_user(id: i64) -> User {
        User {
            id,
            uuid: format!("uuid-{id}"),
            username: Some(format!("user{id}")),
            name: Some(format!("User {id}")),
            email: format!("user{id}@example.com"),
            email_verified_at: Some("2024-01-01 00:00:00".to_string()),
            completed_onboarding: true,
            role: Role::User,
            avatar_url: None,
            locale: Some("en".to_string()),
            created_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    fn test_claims(id: i64) -> Claims {
        Claims {
            sub: Some(id.to_string()),
            email: Some(format!("user{id}@example.com")),
            exp: Some(chrono::Utc::now().timestamp() + 3600),
            up_id: None,
            profile_id: None,
            belongs_to_active_team: None,
            org: None,
            org_aware_username: None,
            impersonated_by: None,
        }
    }

    fn resolver(
        behavior: VerifierBehavior,
        store: FakeStore,
        entitlements: EntitlementBehavior,
    ) -> SessionResolver<FakeVerifier, FakeStore, FakeEntitlements> {
        SessionResolver::new(
            FakeVerifier(behavior),
            store,
            FakeEntitlements(entitlements),
            Arc::new(SessionCache::new(10)),
            WEBSITE,
        )
    }

    #[tokio::test]
    async fn test_no_credential_resolves_to_none() {
        let resolver = resolver(
            VerifierBehavior::Absent,
            FakeStore::default(),
            EntitlementBehavior::Fixed(true),
        );
        assert!(resolver.resolve(None).await.unwrap().is_none());
        assert!(resolver.resolve(Some("")).await.unwrap().is_none());
        assert!(resolver.resolve(Some("token")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_email_resolves_to_none() {
        let mut claims = test_claims(1);
        claims.email = None;
        let resolver = resolver(
            VerifierBehavior::Claims(Box::new(claims)),
            FakeStore::default().with_user(test_user(1)),
            EntitlementBehavior::Fixed(true),
        );
        assert!(resolver.resolve(Some("token")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_sub_resolves_to_none() {
        let mut claims = test_claims(1);
        claims.sub = None;
        let resolver = resolver(
            VerifierBehavior::Claims(Box::new(claims)),
            FakeStore::default().with_user(test_user(1)),
            EntitlementBehavior::Fixed(true),
        );
        assert!(resolver.resolve(Some("token")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_soft_fault_is_absorbed() {
        let resolver = resolver(
            VerifierBehavior::SoftFault,
            FakeStore::default().with_user(test_user(1)),
            EntitlementBehavior::Fixed(true),
        );
        assert!(resolver.resolve(Some("token")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tampered_credential_is_hard_error() {
        let resolver = resolver(
            VerifierBehavior::Tampered,
            FakeStore::default().with_user(test_user(1)),
            EntitlementBehavior::Fixed(true),
        );
        assert!(resolver.resolve(Some("token")).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_subject_resolves_to_none() {
        for sub in ["0", "-5", "abc"] {
            let mut claims = test_claims(1);
            claims.sub = Some(sub.to_string());
            let resolver = resolver(
                VerifierBehavior::Claims(Box::new(claims)),
                FakeStore::default().with_user(test_user(1)),
                EntitlementBehavior::Fixed(true),
            );
            assert!(
                resolver.resolve(Some("token")).await.unwrap().is_none(),
                "sub {sub:?} must not resolve"
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_user_resolves_to_none() {
        let resolver = resolver(
            VerifierBehavior::Claims(Box::new(test_claims(404))),
            FakeStore::default(),
            EntitlementBehavior::Fixed(true),
        );
        assert!(resolver.resolve(Some("token")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entitlement_failure_propagates() {
        let resolver = resolver(
            VerifierBehavior::Claims(Box::new(test_claims(1))),
            FakeStore::default().with_user(test_user(1)),
            EntitlementBehavior::Unavailable,
        );
        let err = resolver.resolve(Some("token")).await.unwrap_err();
        assert!(matches!(err, SlotbookError::Entitlement(_)));
    }

    #[tokio::test]
    async fn test_resolved_session_fields() {
        let mut claims = test_claims(1);
        claims.belongs_to_active_team = Some(true);
        claims.org = Some(OrgClaim {
            id: 9,
            slug: Some("acme".to_string()),
        });
        claims.org_aware_username = Some("user1-acme".to_string());
        claims.profile_id = Some(5);
        claims.exp = Some(1_700_000_000);

        let resolver = resolver(
            VerifierBehavior::Claims(Box::new(claims)),
            FakeStore::default().with_user(test_user(1)),
            EntitlementBehavior::Fixed(true),
        );

        let session = resolver.resolve(Some("token")).await.unwrap().unwrap();
        assert!(session.has_valid_license);
        assert_eq!(session.expires, "2023-11-14T22:13:20.000Z");
        assert_eq!(session.user.id, 1);
        assert_eq!(session.user.email, "user1@example.com");
        assert!(session.user.email_verified);
        assert!(session.user.belongs_to_active_team);
        assert_eq!(session.user.org.as_ref().unwrap().id, 9);
        assert_eq!(session.user.org_aware_username.as_deref(), Some("user1-acme"));
        assert_eq!(
            session.user.avatar_url,
            "https://book.example.com/api/avatar/uuid-1.png"
        );
        assert_eq!(session.profile_id, Some(5));
        assert_eq!(session.up_id, "usr-1");
        assert_eq!(session.user.profile.up_id, "usr-1");
    }

    #[tokio::test]
    async fn test_up_id_from_claims_wins_over_synthesis() {
        let mut claims = test_claims(1);
        claims.up_id = Some("org-3-user1".to_string());

        let resolver = resolver(
            VerifierBehavior::Claims(Box::new(claims)),
            FakeStore::default().with_user(test_user(1)),
            EntitlementBehavior::Fixed(false),
        );

        let session = resolver.resolve(Some("token")).await.unwrap().unwrap();
        assert_eq!(session.up_id, "org-3-user1");
        assert!(!session.has_valid_license);
    }

    #[tokio::test]
    async fn test_cache_hit_returns_identical_session() {
        let resolver = resolver(
            VerifierBehavior::Claims(Box::new(test_claims(1))),
            FakeStore::default().with_user(test_user(1)),
            EntitlementBehavior::Fixed(true),
        );

        let first = resolver.resolve(Some("token")).await.unwrap().unwrap();
        let second = resolver.resolve(Some("token")).await.unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(resolver.cache().len().await, 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_identity_store() {
        // Same claims, but the user disappears from the store between
        // calls: the cached session must still be returned unchanged.
        let claims = test_claims(1);
        let cache = Arc::new(SessionCache::new(10));

        let populated = SessionResolver::new(
            FakeVerifier(VerifierBehavior::Claims(Box::new(claims.clone()))),
            FakeStore::default().with_user(test_user(1)),
            FakeEntitlements(EntitlementBehavior::Fixed(true)),
            cache.clone(),
            WEBSITE,
        );
        let first = populated.resolve(Some("token")).await.unwrap().unwrap();

        let emptied = SessionResolver::new(
            FakeVerifier(VerifierBehavior::Claims(Box::new(claims))),
            FakeStore::default(),
            FakeEntitlements(EntitlementBehavior::Fixed(true)),
            cache,
            WEBSITE,
        );
        let second = emptied.resolve(Some("token")).await.unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_distinct_claims_occupy_distinct_cache_slots() {
        let cache = Arc::new(SessionCache::new(10));
        let store = FakeStore::default().with_user(test_user(1));

        let mut other = test_claims(1);
        other.belongs_to_active_team = Some(true);

        for claims in [test_claims(1), other] {
            let resolver = SessionResolver::new(
                FakeVerifier(VerifierBehavior::Claims(Box::new(claims))),
                store.clone(),
                FakeEntitlements(EntitlementBehavior::Fixed(true)),
                cache.clone(),
                WEBSITE,
            );
            assert!(resolver.resolve(Some("token")).await.unwrap().is_some());
        }

        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_impersonation_overlay_attached() {
        let mut claims = test_claims(1);
        claims.impersonated_by = Some(ImpersonatorClaim { id: 2 });

        let mut admin = test_user(2);
        admin.role = Role::Admin;

        let resolver = resolver(
            VerifierBehavior::Claims(Box::new(claims)),
            FakeStore::default().with_user(test_user(1)).with_user(admin),
            EntitlementBehavior::Fixed(true),
        );

        let session = resolver.resolve(Some("token")).await.unwrap().unwrap();
        let overlay = session.user.impersonated_by.unwrap();
        assert_eq!(overlay.id, 2);
        assert_eq!(overlay.uuid, "uuid-2");
        assert_eq!(overlay.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_impersonator_lookup_miss_omits_overlay() {
        let mut claims = test_claims(1);
        claims.impersonated_by = Some(ImpersonatorClaim { id: 999 });

        let resolver = resolver(
            VerifierBehavior::Claims(Box::new(claims)),
            FakeStore::default().with_user(test_user(1)),
            EntitlementBehavior::Fixed(true),
        );

        let session = resolver.resolve(Some("token")).await.unwrap().unwrap();
        assert!(session.user.impersonated_by.is_none());
    }
}
