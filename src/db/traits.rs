//! Identity store trait for slotbook.
//!
//! Session resolution depends on this seam rather than on a concrete
//! database, so tests (and alternative backends) can provide their own
//! implementations.

use std::future::Future;

use crate::db::{EnrichedUser, MinimalUser, User};
use crate::Result;

/// Gateway to the identity store.
pub trait IdentityStore: Send + Sync {
    /// Load a full user record by id.
    fn find_user_by_id(&self, id: i64) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Load the minimal identity used for the impersonation overlay.
    fn find_user_minimal_by_id(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<MinimalUser>>> + Send;

    /// Enrich a user record with the profile for the given unified profile id.
    ///
    /// A `usr-<id>` unified profile id denotes the personal profile; other
    /// ids are looked up in the profile store, falling back to the personal
    /// profile on a miss.
    fn enrich_with_profile(
        &self,
        user: User,
        up_id: &str,
    ) -> impl Future<Output = Result<EnrichedUser>> + Send;

    /// Whether at least one user exists.
    ///
    /// May fail with a connectivity fault; callers that probe this for
    /// first-run detection must absorb that failure.
    fn any_user_exists(&self) -> impl Future<Output = Result<bool>> + Send;
}
