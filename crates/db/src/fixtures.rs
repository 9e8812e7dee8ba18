use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_PROFILE_IDS: &[&str] = &["user-site-lead", "user-buyer", "user-foreman", "user-contoso"];

const SEED_SESSION_TOKENS: &[&str] =
    &["demo-token-site-lead", "demo-token-buyer", "demo-token-contoso"];

const SEED_REQUEST_IDS: &[&str] = &[
    "5b0d7f0e-3c1a-4f7e-9d7a-0a1f2c3d4e01",
    "5b0d7f0e-3c1a-4f7e-9d7a-0a1f2c3d4e02",
    "5b0d7f0e-3c1a-4f7e-9d7a-0a1f2c3d4e03",
    "5b0d7f0e-3c1a-4f7e-9d7a-0a1f2c3d4e04",
    "5b0d7f0e-3c1a-4f7e-9d7a-0a1f2c3d4e05",
];

/// Deterministic demo data: two companies, four users, three live sessions and
/// one request in every status.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed.sql");

    /// Token of a seeded session that belongs to the larger demo company.
    pub const SITE_LEAD_TOKEN: &str = "demo-token-site-lead";

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            profiles: SEED_PROFILE_IDS.len(),
            sessions: SEED_SESSION_TOKENS.len(),
            requests: SEED_REQUEST_IDS.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let checks = vec![
            ("profiles", count_in(pool, "profiles", "id", SEED_PROFILE_IDS).await?),
            ("sessions", count_in(pool, "sessions", "token", SEED_SESSION_TOKENS).await?),
            (
                "material_requests",
                count_in(pool, "material_requests", "id", SEED_REQUEST_IDS).await?,
            ),
        ];
        let all_present = checks.iter().all(|(_, present)| *present);

        Ok(VerificationResult { all_present, checks })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let quoted_requests = sql_array_from_ids(SEED_REQUEST_IDS);
        let quoted_tokens = sql_array_from_ids(SEED_SESSION_TOKENS);
        let quoted_profiles = sql_array_from_ids(SEED_PROFILE_IDS);

        sqlx::query(&format!("DELETE FROM material_requests WHERE id IN {quoted_requests}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM sessions WHERE token IN {quoted_tokens}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM profiles WHERE id IN {quoted_profiles}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

async fn count_in(
    pool: &DbPool,
    table: &str,
    column: &str,
    ids: &[&str],
) -> Result<bool, RepositoryError> {
    let quoted = sql_array_from_ids(ids);
    let count: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE {column} IN {quoted}"))
            .fetch_one(pool)
            .await?;
    Ok(count == ids.len() as i64)
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedResult {
    pub profiles: usize,
    pub sessions: usize,
    pub requests: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use matreq_core::domain::profile::Caller;
    use matreq_core::domain::status::RequestStatus;

    use super::DemoSeedDataset;
    use crate::repositories::{
        MaterialRequestRepository, SessionRepository, SqlMaterialRequestRepository,
        SqlSessionRepository,
    };
    use crate::{connect_with_settings, migrations};

    #[test]
    fn sql_fixture_is_valid() {
        assert!(DemoSeedDataset::SQL.contains("INSERT OR IGNORE INTO material_requests"));
    }

    #[tokio::test]
    async fn seed_is_idempotent_and_verifiable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        DemoSeedDataset::load(&pool).await.expect("first load");
        let result = DemoSeedDataset::load(&pool).await.expect("second load");
        assert_eq!(result.requests, 5);

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify");
        assert!(verification.all_present, "{:?}", verification.checks);

        DemoSeedDataset::clean(&pool).await.expect("clean");
        let verification = DemoSeedDataset::verify(&pool).await.expect("verify");
        assert!(!verification.all_present);
    }

    #[tokio::test]
    async fn seeded_session_sees_its_company_newest_first() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        DemoSeedDataset::load(&pool).await.expect("load");

        let caller = SqlSessionRepository::new(pool.clone())
            .resolve(DemoSeedDataset::SITE_LEAD_TOKEN)
            .await
            .expect("resolve")
            .expect("seeded session is live");
        assert_eq!(caller, Caller::new("user-site-lead"));

        let listed =
            SqlMaterialRequestRepository::new(pool).list(&caller, None).await.expect("list");
        let names: Vec<_> = listed.iter().map(|row| row.request.material_name.as_str()).collect();
        assert_eq!(names, vec!["Portland Cement", "Timber Beams", "Paint", "Gravel"]);
        assert_eq!(listed[1].requested_by_display, "user-foreman");
        assert_eq!(listed[0].request.status, RequestStatus::Pending);
    }
}
