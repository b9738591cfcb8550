//! Database schema migrations for slotbook.
//!
//! Each entry is one migration; the migrate loop in `db` applies pending
//! entries in order and records them in `schema_version`.

/// Ordered list of schema migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: users and profiles
    r#"
    CREATE TABLE users (
        id                      INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid                    TEXT NOT NULL UNIQUE,
        username                TEXT,
        name                    TEXT,
        email                   TEXT NOT NULL UNIQUE,
        email_verified_at       TEXT,
        completed_onboarding    INTEGER NOT NULL DEFAULT 0,
        role                    TEXT NOT NULL DEFAULT 'user',
        avatar_url              TEXT,
        locale                  TEXT,
        created_at              TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE INDEX idx_users_email ON users(email);

    CREATE TABLE profiles (
        id                      INTEGER PRIMARY KEY AUTOINCREMENT,
        upid                    TEXT NOT NULL UNIQUE,
        user_id                 INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        username                TEXT,
        organization_id         INTEGER,
        created_at              TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE INDEX idx_profiles_upid ON profiles(upid);
    CREATE INDEX idx_profiles_user_id ON profiles(user_id);
    "#,
];
