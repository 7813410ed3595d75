//! API key credential model.
//!
//! Callers authenticate with an opaque secret. The database only ever sees the
//! SHA-256 digest of that secret (see [`crate::auth::hasher`]).

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `api_keys` table with columns:
/// - `id`: Unique identifier (UUID)
/// - `name`: Display name of the key's owner
/// - `key_hash`: SHA-256 hex digest of the secret, unique across all keys
/// - `is_active`: Whether the key is currently accepted
/// - `created_at`: When the key was issued
/// - `last_used_at`: Last successful authentication, if any
///
/// Keys are never deleted. Revocation flips `is_active` to false.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Credential {
    pub id: Uuid,

    pub name: String,

    /// SHA-256 hash of the secret (64 hex characters)
    pub key_hash: String,

    /// Inactive keys are rejected during authentication.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    /// Updated best-effort after each successful authentication.
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Output of the key-issuing command.
///
/// This is the only place the raw secret ever appears.
#[derive(Debug, Serialize)]
pub struct IssuedKey {
    pub id: Uuid,
    pub name: String,
    pub secret: String,
    pub created_at: DateTime<Utc>,
}
