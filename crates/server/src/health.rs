//! `GET /health`: readiness of the request store and the active priority suggester.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use matreq_db::{migrations, DbPool};
use serde::Serialize;
use tracing::warn;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    suggester: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    Degraded,
}

/// What the store looks like from the API's point of view. Counts are only
/// reported once the schema is current.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StoreHealth {
    pub readiness: Readiness,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_migrations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_requests: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StoreHealth {
    fn degraded(pending_migrations: Option<usize>, detail: String) -> Self {
        Self {
            readiness: Readiness::Degraded,
            pending_migrations,
            material_requests: None,
            detail: Some(detail),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: Readiness,
    pub store: StoreHealth,
    pub suggester: &'static str,
    pub checked_at: DateTime<Utc>,
}

pub fn router(db_pool: DbPool, suggester: &'static str) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool, suggester })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthReport>) {
    let store = store_health(&state.db_pool).await;
    let status = store.readiness;

    if status == Readiness::Degraded {
        warn!(
            event_name = "system.health.degraded",
            correlation_id = "health",
            detail = store.detail.as_deref().unwrap_or_default(),
            "request store is not ready"
        );
    }

    let report =
        HealthReport { status, store, suggester: state.suggester, checked_at: Utc::now() };
    let code = match status {
        Readiness::Ready => StatusCode::OK,
        Readiness::Degraded => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(report))
}

async fn store_health(pool: &DbPool) -> StoreHealth {
    let pending = match migrations::pending_count(pool).await {
        Ok(pending) => pending,
        Err(error) => return StoreHealth::degraded(None, format!("database unreachable: {error}")),
    };
    if pending > 0 {
        return StoreHealth::degraded(Some(pending), format!("{pending} migration(s) pending"));
    }

    match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM material_requests")
        .fetch_one(pool)
        .await
    {
        Ok(count) => StoreHealth {
            readiness: Readiness::Ready,
            pending_migrations: Some(0),
            material_requests: Some(count),
            detail: None,
        },
        Err(error) => {
            StoreHealth::degraded(Some(0), format!("material_requests query failed: {error}"))
        }
    }
}
