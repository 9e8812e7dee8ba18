use thiserror::Error;

use crate::domain::status::RequestStatus;
use crate::i18n::Translations;
use crate::priority::SuggestionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: RequestStatus, to: RequestStatus },
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },
}

impl DomainError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation { field, message: message.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("no active session")]
    Authentication,
    #[error("profile not found for user `{0}`")]
    ProfileNotFound(String),
    #[error("material request `{0}` not found")]
    NotFound(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("upstream service unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("invalid upstream response format: {0}")]
    Format(String),
}

impl From<SuggestionError> for ApplicationError {
    fn from(value: SuggestionError) -> Self {
        match value {
            SuggestionError::InvalidInput(message) => {
                Self::Domain(DomainError::Validation { field: "suggestion", message })
            }
            SuggestionError::Configuration(message) => Self::Configuration(message),
            SuggestionError::UpstreamUnavailable(message) => Self::UpstreamUnavailable(message),
            SuggestionError::Format(message) => Self::Format(message),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("unauthorized: {message}")]
    Unauthorized { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Unauthorized { .. } => "Your session has expired. Please sign in again.",
            Self::NotFound { .. } => "The material request could not be found.",
            Self::Conflict { .. } => "That status change is not allowed for this request.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    /// Localised notification text for a failed user action.
    pub fn localized_message(
        &self,
        translations: &Translations,
        action: UserAction,
    ) -> &'static str {
        match self {
            Self::Unauthorized { .. } => translations.errors.session_expired,
            _ => match action {
                UserAction::Create => translations.errors.create_failed,
                UserAction::Update => translations.errors.update_failed,
                UserAction::Delete => translations.errors.delete_failed,
                UserAction::Suggest => translations.errors.ai_suggestion_failed,
                UserAction::Read => translations.errors.load_failed,
            },
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::Unauthorized { message, .. }
            | Self::NotFound { message, .. }
            | Self::Conflict { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    /// Only an authentication failure should take the user away from the current view.
    pub fn requires_sign_in(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserAction {
    Read,
    Create,
    Update,
    Delete,
    Suggest,
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Unauthorized { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error @ DomainError::InvalidStatusTransition { .. }) => {
                Self::Conflict { message: error.to_string(), correlation_id }
            }
            ApplicationError::Domain(error @ DomainError::Validation { .. }) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            ApplicationError::Authentication => {
                Self::Unauthorized { message: "not authenticated".to_owned(), correlation_id }
            }
            ApplicationError::ProfileNotFound(user_id) => Self::NotFound {
                message: format!("profile not found for user `{user_id}`"),
                correlation_id,
            },
            ApplicationError::NotFound(id) => Self::NotFound {
                message: format!("material request `{id}` not found"),
                correlation_id,
            },
            ApplicationError::Persistence(message)
            | ApplicationError::Network(message)
            | ApplicationError::UpstreamUnavailable(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Configuration(message) | ApplicationError::Format(message) => {
                Self::Internal { message, correlation_id }
            }
        }
    }
}
