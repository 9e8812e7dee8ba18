use axum::http::{header::AUTHORIZATION, HeaderMap};

use matreq_core::domain::profile::Caller;
use matreq_core::errors::ApplicationError;
use matreq_db::repositories::SessionRepository;

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolves the caller behind the request's bearer token.
pub async fn authenticate(
    sessions: &dyn SessionRepository,
    headers: &HeaderMap,
) -> Result<Caller, ApplicationError> {
    let token = bearer_token(headers).ok_or(ApplicationError::Authentication)?;
    sessions.resolve(token).await?.ok_or(ApplicationError::Authentication)
}
