//! Material request API.
//!
//! - `GET    /api/v1/material-requests?status=&locale=`   list, newest first
//! - `POST   /api/v1/material-requests`                    create (always pending)
//! - `PATCH  /api/v1/material-requests/{id}`               partial update
//! - `PATCH  /api/v1/material-requests/{id}/status`        status transition
//! - `DELETE /api/v1/material-requests/{id}`               delete
//! - `GET    /api/v1/material-requests/stats`              dashboard counts
//! - `GET    /api/v1/material-requests/export.csv?status=&filename=`  CSV download
//!
//! Every route requires `Authorization: Bearer <session token>`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{
        header::{ACCEPT_LANGUAGE, CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderMap, StatusCode,
    },
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use matreq_core::domain::profile::Caller;
use matreq_core::domain::request::{
    EnrichedMaterialRequest, MaterialRequest, MaterialRequestId, MaterialRequestPatch,
    NewMaterialRequest,
};
use matreq_core::domain::stats::RequestStats;
use matreq_core::domain::status::RequestStatus;
use matreq_core::errors::{ApplicationError, UserAction};
use matreq_core::export::{export_csv, export_filename, CSV_CONTENT_TYPE};
use matreq_core::i18n::{Locale, Translations};
use matreq_db::repositories::SessionRepository;
use matreq_db::OptimisticMutationController;

use crate::auth::authenticate;
use crate::error::{api_failure, bad_request, new_correlation_id, ApiError, ApiFailure};

#[derive(Clone)]
pub struct RequestsState {
    controller: Arc<OptimisticMutationController>,
    sessions: Arc<dyn SessionRepository>,
    default_locale: Locale,
}

impl RequestsState {
    pub fn new(
        controller: Arc<OptimisticMutationController>,
        sessions: Arc<dyn SessionRepository>,
        default_locale: Locale,
    ) -> Self {
        Self { controller, sessions, default_locale }
    }

    fn translations(&self, headers: &HeaderMap) -> &'static Translations {
        let accept_language = headers.get(ACCEPT_LANGUAGE).and_then(|value| value.to_str().ok());
        Translations::for_locale(Locale::negotiate(accept_language, self.default_locale))
    }

    async fn caller(
        &self,
        headers: &HeaderMap,
        correlation_id: &str,
        action: UserAction,
    ) -> Result<Caller, ApiFailure> {
        authenticate(self.sessions.as_ref(), headers).await.map_err(|failure| {
            api_failure(failure, correlation_id, self.translations(headers), action)
        })
    }
}

pub fn router(state: RequestsState) -> Router {
    Router::new()
        .route("/api/v1/material-requests", get(list_requests).post(create_request))
        .route("/api/v1/material-requests/stats", get(request_stats))
        .route("/api/v1/material-requests/export.csv", get(export_requests))
        .route("/api/v1/material-requests/{id}", patch(update_request).delete(delete_request))
        .route("/api/v1/material-requests/{id}/status", patch(update_request_status))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub locale: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub status: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: RequestStatus,
}

/// A listed request with its labels in the negotiated locale.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RequestListItem {
    #[serde(flatten)]
    pub request: EnrichedMaterialRequest,
    pub status_label: String,
    pub priority_label: String,
}

impl RequestListItem {
    fn localized(request: EnrichedMaterialRequest, translations: &Translations) -> Self {
        let status_label = translations.status_label(request.request.status).to_string();
        let priority_label = translations.priority_label(request.request.priority).to_string();
        Self { request, status_label, priority_label }
    }
}

fn parse_status_filter(
    raw: Option<&str>,
    correlation_id: &str,
) -> Result<Option<RequestStatus>, ApiFailure> {
    match raw.map(str::trim).filter(|value| !value.is_empty() && *value != "all") {
        None => Ok(None),
        Some(value) => value
            .parse::<RequestStatus>()
            .map(Some)
            .map_err(|error| bad_request(error.to_string(), correlation_id)),
    }
}

/// Turns a body the extractor could not decode into the usual `400 {error}` reply.
fn decoded<T>(body: Result<Json<T>, JsonRejection>, correlation_id: &str) -> Result<T, ApiFailure> {
    body.map(|Json(value)| value).map_err(|rejection| {
        warn!(
            event_name = "api.request.rejected",
            correlation_id = %correlation_id,
            error = %rejection.body_text(),
            "request body could not be decoded"
        );
        bad_request(rejection.body_text(), correlation_id)
    })
}

pub async fn list_requests(
    State(state): State<RequestsState>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<RequestListItem>>, ApiFailure> {
    let correlation_id = new_correlation_id();
    let filter = parse_status_filter(query.status.as_deref(), &correlation_id)?;
    let translations = match query.locale.as_deref() {
        Some(raw) => Translations::for_locale(
            raw.parse::<Locale>().map_err(|error| bad_request(error, &correlation_id))?,
        ),
        None => state.translations(&headers),
    };

    let caller = state.caller(&headers, &correlation_id, UserAction::Read).await?;
    let rows = state.controller.list(&caller, filter).await.map_err(|failure| {
        api_failure(failure.into(), &correlation_id, translations, UserAction::Read)
    })?;

    Ok(Json(rows.into_iter().map(|row| RequestListItem::localized(row, translations)).collect()))
}

pub async fn create_request(
    State(state): State<RequestsState>,
    headers: HeaderMap,
    body: Result<Json<NewMaterialRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MaterialRequest>), ApiFailure> {
    let correlation_id = new_correlation_id();
    let body = decoded(body, &correlation_id)?;
    let translations = state.translations(&headers);
    let caller = state.caller(&headers, &correlation_id, UserAction::Create).await?;

    let created = state.controller.create(&caller, body).await.map_err(|failure| {
        api_failure(failure.into(), &correlation_id, translations, UserAction::Create)
    })?;

    info!(
        event_name = "material_request.created",
        correlation_id = %correlation_id,
        request_id = %created.id,
        company_id = %created.company_id.0,
        priority = created.priority.as_str(),
        "material request created"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_request(
    State(state): State<RequestsState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    patch: Result<Json<MaterialRequestPatch>, JsonRejection>,
) -> Result<Json<MaterialRequest>, ApiFailure> {
    let correlation_id = new_correlation_id();
    let patch = decoded(patch, &correlation_id)?;
    let translations = state.translations(&headers);
    let caller = state.caller(&headers, &correlation_id, UserAction::Update).await?;
    let id = MaterialRequestId(id);

    let updated = state.controller.update(&caller, &id, patch).await.map_err(|failure| {
        api_failure(failure.into(), &correlation_id, translations, UserAction::Update)
    })?;

    info!(
        event_name = "material_request.updated",
        correlation_id = %correlation_id,
        request_id = %updated.id,
        status = updated.status.as_str(),
        "material request updated"
    );
    Ok(Json(updated))
}

pub async fn update_request_status(
    State(state): State<RequestsState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    change: Result<Json<StatusChange>, JsonRejection>,
) -> Result<Json<MaterialRequest>, ApiFailure> {
    let correlation_id = new_correlation_id();
    let change = decoded(change, &correlation_id)?;
    let translations = state.translations(&headers);
    let caller = state.caller(&headers, &correlation_id, UserAction::Update).await?;
    let id = MaterialRequestId(id);
    let fail = |failure: ApplicationError| {
        api_failure(failure, &correlation_id, translations, UserAction::Update)
    };

    let current = state
        .controller
        .repository()
        .find_by_id(&caller, &id)
        .await
        .map_err(|failure| fail(failure.into()))?
        .ok_or_else(|| fail(ApplicationError::NotFound(id.0.clone())))?;

    let updated = state
        .controller
        .update_status(&caller, &id, current.status, change.status)
        .await
        .map_err(|failure| fail(failure.into()))?;

    info!(
        event_name = "material_request.status_changed",
        correlation_id = %correlation_id,
        request_id = %updated.id,
        from = current.status.as_str(),
        to = updated.status.as_str(),
        "material request status changed"
    );
    Ok(Json(updated))
}

pub async fn delete_request(
    State(state): State<RequestsState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiFailure> {
    let correlation_id = new_correlation_id();
    let translations = state.translations(&headers);
    let caller = state.caller(&headers, &correlation_id, UserAction::Delete).await?;
    let id = MaterialRequestId(id);

    state.controller.remove(&caller, &id).await.map_err(|failure| {
        api_failure(failure.into(), &correlation_id, translations, UserAction::Delete)
    })?;

    info!(
        event_name = "material_request.deleted",
        correlation_id = %correlation_id,
        request_id = %id,
        "material request deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

pub async fn request_stats(
    State(state): State<RequestsState>,
    headers: HeaderMap,
) -> Result<Json<RequestStats>, ApiFailure> {
    let correlation_id = new_correlation_id();
    let translations = state.translations(&headers);
    let caller = state.caller(&headers, &correlation_id, UserAction::Read).await?;

    let rows = state.controller.list(&caller, None).await.map_err(|failure| {
        api_failure(failure.into(), &correlation_id, translations, UserAction::Read)
    })?;

    Ok(Json(RequestStats::tally(rows.iter().map(|row| &row.request))))
}

pub async fn export_requests(
    State(state): State<RequestsState>,
    Query(query): Query<ExportQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiFailure> {
    let correlation_id = new_correlation_id();
    let filter = parse_status_filter(query.status.as_deref(), &correlation_id)?;
    let translations = state.translations(&headers);
    let caller = state.caller(&headers, &correlation_id, UserAction::Read).await?;

    let rows = state.controller.list(&caller, filter).await.map_err(|failure| {
        api_failure(failure.into(), &correlation_id, translations, UserAction::Read)
    })?;

    let body = export_csv(&rows).map_err(|failure| {
        error!(
            event_name = "material_request.export.failed",
            correlation_id = %correlation_id,
            error = %failure,
            "csv export failed"
        );
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError {
                error: translations.errors.load_failed.to_string(),
                correlation_id: correlation_id.clone(),
            }),
        )
    })?;

    let filename = export_filename(query.filename.as_deref(), Utc::now().date_naive())
        .replace(['"', '\r', '\n'], "");
    info!(
        event_name = "material_request.exported",
        correlation_id = %correlation_id,
        rows = rows.len(),
        filename = %filename,
        "material requests exported"
    );

    Ok((
        [
            (CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        body,
    ))
}
