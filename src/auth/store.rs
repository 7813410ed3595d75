//! Credential lookup behind a narrow repository interface.
//!
//! The guard only needs two operations from the credential store, so it
//! depends on the [`CredentialStore`] trait rather than on Postgres directly.

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::DbPool;
use crate::models::credential::Credential;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find the credential whose digest matches, only if it is active.
    async fn find_active_by_digest(&self, digest: &str) -> anyhow::Result<Option<Credential>>;

    /// Record that the credential was just used.
    async fn touch_last_used(&self, id: Uuid) -> anyhow::Result<()>;
}

/// Postgres-backed credential store over the `api_keys` table.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: DbPool,
}

impl PgCredentialStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a newly issued key. Only the digest is stored.
    pub async fn insert(&self, name: &str, key_hash: &str) -> Result<Credential, sqlx::Error> {
        sqlx::query_as::<_, Credential>(
            r#"
            INSERT INTO api_keys (name, key_hash)
            VALUES ($1, $2)
            RETURNING id, name, key_hash, is_active, created_at, last_used_at
            "#,
        )
        .bind(name)
        .bind(key_hash)
        .fetch_one(&self.pool)
        .await
    }

    /// Revoke a key by flipping its active flag. Returns false if no such key.
    pub async fn deactivate(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE api_keys SET is_active = false WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_active_by_digest(&self, digest: &str) -> anyhow::Result<Option<Credential>> {
        let credential = sqlx::query_as::<_, Credential>(
            "SELECT id, name, key_hash, is_active, created_at, last_used_at
             FROM api_keys
             WHERE key_hash = $1 AND is_active = true",
        )
        .bind(digest)
        .fetch_optional(&self.pool)
        .await?;

        Ok(credential)
    }

    async fn touch_last_used(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
pub use memory::InMemoryCredentialStore;
