use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub company_id: CompanyId,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Human-readable identity shown next to requests; the raw id when no e-mail is on file.
    pub fn display_name(&self) -> &str {
        self.email.as_deref().filter(|email| !email.trim().is_empty()).unwrap_or(&self.id.0)
    }
}

/// The authenticated principal behind a call. Tenant scope is resolved from
/// the caller's profile by the repository, never taken from client input.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Caller {
    pub user_id: UserId,
}

impl Caller {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: UserId(user_id.into()) }
    }
}

/// Bearer token issued to a signed-in user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    pub fn caller(&self) -> Caller {
        Caller { user_id: self.user_id.clone() }
    }
}
