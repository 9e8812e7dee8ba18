use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use matreq_core::errors::{ApplicationError, InterfaceError, UserAction};
use matreq_core::i18n::Translations;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub correlation_id: String,
}

pub type ApiFailure = (StatusCode, Json<ApiError>);

pub fn status_code(error: &InterfaceError) -> StatusCode {
    match error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Turns an application failure into a JSON error body. Validation and
/// transition failures keep their specific message; everything else gets the
/// localised notification for `action`.
pub fn api_failure(
    failure: ApplicationError,
    correlation_id: &str,
    translations: &Translations,
    action: UserAction,
) -> ApiFailure {
    let interface = failure.into_interface(correlation_id);
    let status = status_code(&interface);

    if status.is_server_error() {
        error!(
            event_name = "api.request.failed",
            correlation_id,
            status = status.as_u16(),
            error = %interface,
            "request failed"
        );
    } else {
        warn!(
            event_name = "api.request.rejected",
            correlation_id,
            status = status.as_u16(),
            error = %interface,
            "request rejected"
        );
    }

    let message = match &interface {
        InterfaceError::BadRequest { message, .. } | InterfaceError::Conflict { message, .. } => {
            message.clone()
        }
        other => other.localized_message(translations, action).to_string(),
    };

    (status, Json(ApiError { error: message, correlation_id: correlation_id.to_string() }))
}

pub fn bad_request(message: impl Into<String>, correlation_id: &str) -> ApiFailure {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError { error: message.into(), correlation_id: correlation_id.to_string() }),
    )
}

pub fn new_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use matreq_core::domain::status::RequestStatus;
    use matreq_core::errors::{ApplicationError, DomainError, UserAction};
    use matreq_core::i18n::{Locale, Translations};

    use super::api_failure;

    #[test]
    fn transition_conflicts_keep_their_message() {
        let (status, body) = api_failure(
            ApplicationError::Domain(DomainError::InvalidStatusTransition {
                from: RequestStatus::Rejected,
                to: RequestStatus::Approved,
            }),
            "corr-1",
            Translations::for_locale(Locale::En),
            UserAction::Update,
        );

        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.error.contains("rejected"));
        assert_eq!(body.correlation_id, "corr-1");
    }

    #[test]
    fn persistence_failures_use_localised_notification() {
        let translations = Translations::for_locale(Locale::De);
        let (status, body) = api_failure(
            ApplicationError::Persistence("disk I/O error".to_string()),
            "corr-2",
            translations,
            UserAction::Delete,
        );

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.error, translations.errors.delete_failed);
        assert!(!body.error.contains("disk"));
    }

    #[test]
    fn authentication_failures_are_unauthorized() {
        let translations = Translations::for_locale(Locale::En);
        let (status, body) =
            api_failure(ApplicationError::Authentication, "corr-3", translations, UserAction::Read);

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.error, translations.errors.session_expired);
    }
}
