use sqlx::Row;

use matreq_core::domain::profile::{CompanyId, Profile, UserId};

use super::{format_timestamp, parse_timestamp, ProfileRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProfileRepository {
    pool: DbPool,
}

impl SqlProfileRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProfileRepository for SqlProfileRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query("SELECT id, company_id, email, created_at FROM profiles WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let created_at: String =
            row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        Ok(Some(Profile {
            id: UserId(row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?),
            company_id: CompanyId(
                row.try_get("company_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
            ),
            email: row.try_get("email").map_err(|e| RepositoryError::Decode(e.to_string()))?,
            created_at: parse_timestamp("created_at", &created_at)?,
        }))
    }

    async fn save(&self, profile: Profile) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO profiles (id, company_id, email, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 company_id = excluded.company_id,
                 email = excluded.email",
        )
        .bind(&profile.id.0)
        .bind(&profile.company_id.0)
        .bind(&profile.email)
        .bind(format_timestamp(profile.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
