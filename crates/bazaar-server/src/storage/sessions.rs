//! Server-side session queries.

use bazaar_core::db::unix_timestamp;

use super::db::{DatabaseError, MarketDatabase};
use super::models::{Flash, SessionRecord};

impl MarketDatabase {
    /// Create a session keyed by the hash of its token.
    pub async fn create_session(
        &self,
        token_hash: &str,
        user_id: Option<i64>,
        ttl_secs: i64,
    ) -> Result<(), DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(now)
        .bind(now + ttl_secs)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Find a live (non-expired) session together with its user, if any.
    pub async fn get_session(&self, token_hash: &str) -> Result<Option<SessionRecord>, DatabaseError> {
        let now = unix_timestamp();

        let session = sqlx::query_as::<_, SessionRecord>(
            "SELECT s.token_hash, s.user_id, u.name AS user_name, u.role, s.expires_at \
             FROM sessions s LEFT JOIN users u ON s.user_id = u.user_id \
             WHERE s.token_hash = ? AND s.expires_at > ?",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;

        Ok(session)
    }

    /// Append a flash message to a session.
    pub async fn push_flash(&self, token_hash: &str, flash: &Flash) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(flash).map_err(|e| DatabaseError::Query(e.to_string()))?;

        sqlx::query("UPDATE sessions SET flashes = json_insert(flashes, '$[#]', json(?)) WHERE token_hash = ?")
            .bind(json)
            .bind(token_hash)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    /// Remove and return all pending flash messages, oldest first.
    pub async fn take_flashes(&self, token_hash: &str) -> Result<Vec<Flash>, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let raw: Option<(String,)> = sqlx::query_as("SELECT flashes FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .fetch_optional(&mut *tx)
            .await?;

        let Some((raw,)) = raw else {
            return Ok(Vec::new());
        };

        sqlx::query("UPDATE sessions SET flashes = '[]' WHERE token_hash = ?")
            .bind(token_hash)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        serde_json::from_str(&raw).map_err(|e| DatabaseError::Query(e.to_string()))
    }

    /// Delete a session.
    pub async fn delete_session(&self, token_hash: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove expired sessions. Returns the number removed.
    pub async fn delete_expired_sessions(&self) -> Result<u64, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
