//! `POST /api/ai/priority`: suggests a priority for a material request draft.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, warn};

use matreq_core::priority::{
    PrioritySuggester, PrioritySuggestion, SuggestionError, SuggestionInput,
};

use crate::error::{new_correlation_id, ApiError, ApiFailure};

#[derive(Clone)]
pub struct PriorityState {
    suggester: Arc<dyn PrioritySuggester>,
}

impl PriorityState {
    pub fn new(suggester: Arc<dyn PrioritySuggester>) -> Self {
        Self { suggester }
    }
}

pub fn router(state: PriorityState) -> Router {
    Router::new().route("/api/ai/priority", post(suggest_priority)).with_state(state)
}

fn suggestion_failure(error: &SuggestionError, correlation_id: &str) -> ApiFailure {
    let (status, message) = match error {
        SuggestionError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Invalid request data"),
        SuggestionError::Configuration(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "AI service is not configured")
        }
        SuggestionError::UpstreamUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "AI service unavailable")
        }
        SuggestionError::Format(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Invalid AI response format")
        }
    };
    (status, Json(ApiError { error: message.to_string(), correlation_id: correlation_id.into() }))
}

pub async fn suggest_priority(
    State(state): State<PriorityState>,
    body: Result<Json<SuggestionInput>, JsonRejection>,
) -> Result<Json<PrioritySuggestion>, ApiFailure> {
    let correlation_id = new_correlation_id();
    let input = match body {
        Ok(Json(input)) => input,
        Err(rejection) => {
            let error = SuggestionError::InvalidInput(rejection.body_text());
            warn!(
                event_name = "priority.suggestion.rejected",
                correlation_id = %correlation_id,
                error = %error,
                "priority request body rejected"
            );
            return Err(suggestion_failure(&error, &correlation_id));
        }
    };

    match state.suggester.suggest(&input).await {
        Ok(suggestion) => {
            info!(
                event_name = "priority.suggestion.completed",
                correlation_id = %correlation_id,
                suggester = state.suggester.name(),
                priority = suggestion.priority.as_str(),
                "priority suggested"
            );
            Ok(Json(suggestion))
        }
        Err(error) => {
            warn!(
                event_name = "priority.suggestion.failed",
                correlation_id = %correlation_id,
                suggester = state.suggester.name(),
                error_class = error.class(),
                error = %error,
                "priority suggestion failed"
            );
            Err(suggestion_failure(&error, &correlation_id))
        }
    }
}
