use std::sync::Arc;

use axum::Router;
use matreq_agent::build_suggester;
use matreq_core::config::{AppConfig, ConfigError, LoadOptions};
use matreq_core::priority::{PrioritySuggester, SuggestionError};
use matreq_db::repositories::{
    MaterialRequestRepository, ProfileRepository, SessionRepository, SqlMaterialRequestRepository,
    SqlProfileRepository, SqlSessionRepository,
};
use matreq_db::{
    connect_with_settings, migrations, DbPool, OptimisticMutationController, QueryCache,
};
use thiserror::Error;
use tracing::info;

use crate::{health, priority, requests};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub controller: Arc<OptimisticMutationController>,
    pub sessions: Arc<dyn SessionRepository>,
    pub suggester: Arc<dyn PrioritySuggester>,
}

impl Application {
    /// All HTTP routes: health, the request API and priority suggestions.
    pub fn router(&self) -> Router {
        let requests = requests::RequestsState::new(
            self.controller.clone(),
            self.sessions.clone(),
            self.config.requests.default_locale,
        );

        health::router(self.db_pool.clone(), self.suggester.name())
            .merge(requests::router(requests))
            .merge(priority::router(priority::PriorityState::new(self.suggester.clone())))
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("priority suggester setup failed: {0}")]
    Suggester(#[source] SuggestionError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        suggestion_mode = config.suggestion.mode.as_str(),
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let repository: Arc<dyn MaterialRequestRepository> = Arc::new(
        SqlMaterialRequestRepository::new(db_pool.clone())
            .with_transition_enforcement(config.requests.enforce_transitions),
    );
    let profiles: Arc<dyn ProfileRepository> =
        Arc::new(SqlProfileRepository::new(db_pool.clone()));
    let sessions: Arc<dyn SessionRepository> =
        Arc::new(SqlSessionRepository::new(db_pool.clone()));
    let controller = Arc::new(OptimisticMutationController::new(
        repository,
        profiles,
        Arc::new(QueryCache::new()),
    ));
    let suggester = build_suggester(&config).map_err(BootstrapError::Suggester)?;

    Ok(Application { config, db_pool, controller, sessions, suggester })
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use matreq_core::config::{ConfigOverrides, LoadOptions, SuggestionMode};
    use matreq_db::DemoSeedDataset;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::bootstrap::bootstrap;

    fn in_memory(mode: SuggestionMode) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                suggestion_mode: Some(mode),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_serves_health() {
        let app = bootstrap(in_memory(SuggestionMode::Rules)).await.expect("bootstrap");

        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('profiles', 'sessions', 'material_requests')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("schema query");
        assert_eq!(tables, 3);
        assert_eq!(app.suggester.name(), "rules");

        let response = app
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("router should respond");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn llm_mode_without_key_still_boots() {
        let app = bootstrap(in_memory(SuggestionMode::Llm)).await.expect("bootstrap");
        assert_eq!(app.suggester.name(), "llm");
    }

    #[tokio::test]
    async fn seeded_session_lists_its_company_requests() {
        let app = bootstrap(in_memory(SuggestionMode::Rules)).await.expect("bootstrap");
        DemoSeedDataset::load(&app.db_pool).await.expect("seed");

        let request = Request::builder()
            .uri("/api/v1/material-requests")
            .header(header::AUTHORIZATION, format!("Bearer {}", DemoSeedDataset::SITE_LEAD_TOKEN))
            .body(Body::empty())
            .expect("request");
        let response = app.router().oneshot(request).await.expect("router should respond");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let rows: Value = serde_json::from_slice(&bytes).expect("json");
        let rows = rows.as_array().expect("array");
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0]["material_name"], "Portland Cement");
        assert!(rows.iter().all(|row| row["company_id"] == "company-northwind"));
    }
}
