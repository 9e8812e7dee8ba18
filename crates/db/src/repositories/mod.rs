use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use matreq_core::domain::profile::{Caller, Profile, Session, UserId};
use matreq_core::domain::request::{
    EnrichedMaterialRequest, MaterialRequest, MaterialRequestId, MaterialRequestPatch,
    NewMaterialRequest,
};
use matreq_core::domain::status::RequestStatus;
use matreq_core::errors::{ApplicationError, DomainError};

pub mod material_request;
pub mod memory;
pub mod profile;
pub mod session;

pub use material_request::SqlMaterialRequestRepository;
pub use memory::{
    InMemoryMaterialRequestRepository, InMemoryProfileRepository, InMemorySessionRepository,
};
pub use profile::SqlProfileRepository;
pub use session::SqlSessionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("no active session")]
    Authentication,
    #[error("profile not found for user `{0}`")]
    ProfileNotFound(String),
    #[error("material request `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => Self::Persistence(error.to_string()),
            RepositoryError::Decode(message) => Self::Persistence(message),
            RepositoryError::Unavailable(message) => Self::Persistence(message),
            RepositoryError::Authentication => Self::Authentication,
            RepositoryError::ProfileNotFound(user_id) => Self::ProfileNotFound(user_id),
            RepositoryError::NotFound(id) => Self::NotFound(id),
            RepositoryError::Domain(error) => Self::Domain(error),
        }
    }
}

/// Tenant-scoped access to material requests. Every operation resolves the
/// caller's company from its profile; rows of other companies are invisible.
#[async_trait]
pub trait MaterialRequestRepository: Send + Sync {
    /// Newest first. A caller without a profile sees an empty list.
    async fn list(
        &self,
        caller: &Caller,
        filter: Option<RequestStatus>,
    ) -> Result<Vec<EnrichedMaterialRequest>, RepositoryError>;

    async fn find_by_id(
        &self,
        caller: &Caller,
        id: &MaterialRequestId,
    ) -> Result<Option<MaterialRequest>, RepositoryError>;

    async fn create(
        &self,
        caller: &Caller,
        fields: NewMaterialRequest,
    ) -> Result<MaterialRequest, RepositoryError>;

    async fn update(
        &self,
        caller: &Caller,
        id: &MaterialRequestId,
        patch: MaterialRequestPatch,
    ) -> Result<MaterialRequest, RepositoryError>;

    async fn remove(&self, caller: &Caller, id: &MaterialRequestId)
        -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Profile>, RepositoryError>;
    async fn save(&self, profile: Profile) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Unknown and expired tokens both resolve to `None`.
    async fn resolve(&self, token: &str) -> Result<Option<Caller>, RepositoryError>;
    async fn issue(&self, session: Session) -> Result<(), RepositoryError>;
}

/// Validates `patch` against `existing` and produces the stored row.
pub(crate) fn patched_request(
    mut existing: MaterialRequest,
    patch: &MaterialRequestPatch,
    enforce_transitions: bool,
    now: DateTime<Utc>,
) -> Result<MaterialRequest, RepositoryError> {
    patch.validate()?;
    if enforce_transitions {
        if let Some(next) = patch.status {
            existing.status.transition_to(next)?;
        }
    }
    existing.apply_patch(patch);
    existing.updated_at = now;
    Ok(existing)
}

// Fixed-width UTC timestamps keep lexical order equal to chronological order.
pub(crate) fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{field}: {error}")))
}
