use chrono::Utc;
use sqlx::Row;

use matreq_core::domain::profile::{Caller, Session};

use super::{format_timestamp, parse_timestamp, RepositoryError, SessionRepository};
use crate::DbPool;

pub struct SqlSessionRepository {
    pool: DbPool,
}

impl SqlSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(format_timestamp(Utc::now()))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl SessionRepository for SqlSessionRepository {
    async fn resolve(&self, token: &str) -> Result<Option<Caller>, RepositoryError> {
        let row = sqlx::query("SELECT user_id, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let user_id: String =
            row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let expires_at: String =
            row.try_get("expires_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

        if parse_timestamp("expires_at", &expires_at)? <= Utc::now() {
            return Ok(None);
        }

        Ok(Some(Caller::new(user_id)))
    }

    async fn issue(&self, session: Session) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(token) DO UPDATE SET
                 user_id = excluded.user_id,
                 expires_at = excluded.expires_at",
        )
        .bind(&session.token)
        .bind(&session.user_id.0)
        .bind(format_timestamp(session.created_at))
        .bind(format_timestamp(session.expires_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
