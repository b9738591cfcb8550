//! SQL identity store for slotbook.
//!
//! This module implements the [`IdentityStore`] trait over a sqlx pool and
//! provides the write operations used by bootstrap and tests.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::traits::IdentityStore;
use super::user::{EnrichedUser, MinimalUser, NewUser, Role, User, UserProfile};
use crate::{Result, SlotbookError};

/// Identity store backed by the application database.
#[derive(Clone)]
pub struct SqlIdentityStore {
    pool: SqlitePool,
}

const USER_COLUMNS: &str = "id, uuid, username, name, email, email_verified_at, \
     completed_onboarding, role, avatar_url, locale, created_at";

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    let role = role
        .parse::<Role>()
        .map_err(SlotbookError::Database)?;

    Ok(User {
        id: row.try_get("id")?,
        uuid: row.try_get("uuid")?,
        username: row.try_get("username")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        email_verified_at: row.try_get("email_verified_at")?,
        completed_onboarding: row.try_get("completed_onboarding")?,
        role,
        avatar_url: row.try_get("avatar_url")?,
        locale: row.try_get("locale")?,
        created_at: row.try_get("created_at")?,
    })
}

fn personal_profile(user: &User, up_id: &str) -> UserProfile {
    UserProfile {
        up_id: up_id.to_string(),
        username: user.username.clone(),
        organization_id: None,
    }
}

impl SqlIdentityStore {
    /// Create a new store over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create a new user in the database.
    ///
    /// Returns the created user with the assigned ID.
    pub async fn create_user(&self, new_user: &NewUser) -> Result<User> {
        let result = sqlx::query(
            "INSERT INTO users (uuid, email, username, name, role, completed_onboarding, locale, avatar_url)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new_user.uuid)
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.name)
        .bind(new_user.role.as_str())
        .bind(new_user.completed_onboarding)
        .bind(&new_user.locale)
        .bind(&new_user.avatar_url)
        .execute(&self.pool)
        .await
        .map_err(|e| SlotbookError::Database(e.to_string()))?;

        let id = result.last_insert_rowid();
        self.find_user_by_id(id)
            .await?
            .ok_or_else(|| SlotbookError::NotFound("user".to_string()))
    }

    /// Create an organization profile row.
    pub async fn create_profile(
        &self,
        upid: &str,
        user_id: i64,
        username: Option<&str>,
        organization_id: Option<i64>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO profiles (upid, user_id, username, organization_id) VALUES (?, ?, ?, ?)",
        )
        .bind(upid)
        .bind(user_id)
        .bind(username)
        .bind(organization_id)
        .execute(&self.pool)
        .await
        .map_err(|e| SlotbookError::Database(e.to_string()))?;

        Ok(())
    }

    /// Count all users.
    pub async fn count_users(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SlotbookError::Database(e.to_string()))?;
        Ok(count)
    }
}

impl IdentityStore for SqlIdentityStore {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SlotbookError::Database(e.to_string()))?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_minimal_by_id(&self, id: i64) -> Result<Option<MinimalUser>> {
        let row = sqlx::query("SELECT id, uuid, role FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SlotbookError::Database(e.to_string()))?;

        row.map(|row| {
            let role: String = row.try_get("role")?;
            let role = role.parse::<Role>().map_err(SlotbookError::Database)?;
            Ok::<_, SlotbookError>(MinimalUser {
                id: row.try_get("id")?,
                uuid: row.try_get("uuid")?,
                role,
            })
        })
        .transpose()
    }

    async fn enrich_with_profile(&self, user: User, up_id: &str) -> Result<EnrichedUser> {
        // Personal profile ids are synthesized, never stored.
        if up_id.starts_with("usr-") {
            let profile = personal_profile(&user, up_id);
            return Ok(EnrichedUser { user, profile });
        }

        let row = sqlx::query("SELECT upid, username, organization_id FROM profiles WHERE upid = ?")
            .bind(up_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SlotbookError::Database(e.to_string()))?;

        let profile = match row {
            Some(row) => UserProfile {
                up_id: row.try_get("upid")?,
                username: row
                    .try_get::<Option<String>, _>("username")?
                    .or_else(|| user.username.clone()),
                organization_id: row.try_get("organization_id")?,
            },
            None => {
                debug!(up_id = %up_id, user_id = user.id, "no profile for unified profile id; using personal profile");
                personal_profile(&user, up_id)
            }
        };

        Ok(EnrichedUser { user, profile })
    }

    async fn any_user_exists(&self) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users)")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SlotbookError::DatabaseConnection(e.to_string()))?;
        Ok(exists)
    }
}
