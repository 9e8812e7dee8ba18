use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use matreq_core::domain::profile::{Caller, CompanyId, Profile, Session, UserId};
use matreq_core::domain::request::{
    EnrichedMaterialRequest, MaterialRequest, MaterialRequestId, MaterialRequestPatch,
    NewMaterialRequest,
};
use matreq_core::domain::status::RequestStatus;

use super::{
    patched_request, MaterialRequestRepository, ProfileRepository, RepositoryError,
    SessionRepository,
};

#[derive(Default)]
pub struct InMemoryProfileRepository {
    profiles: RwLock<HashMap<String, Profile>>,
}

impl InMemoryProfileRepository {
    async fn company_of(&self, user_id: &UserId) -> Option<CompanyId> {
        self.profiles.read().await.get(&user_id.0).map(|profile| profile.company_id.clone())
    }

    async fn email_of(&self, user_id: &UserId, company_id: &CompanyId) -> Option<String> {
        self.profiles
            .read()
            .await
            .get(&user_id.0)
            .filter(|profile| &profile.company_id == company_id)
            .and_then(|profile| profile.email.clone())
    }
}

#[async_trait::async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Profile>, RepositoryError> {
        Ok(self.profiles.read().await.get(&id.0).cloned())
    }

    async fn save(&self, profile: Profile) -> Result<(), RepositoryError> {
        self.profiles.write().await.insert(profile.id.0.clone(), profile);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<String, Session>>,
}

#[async_trait::async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn resolve(&self, token: &str) -> Result<Option<Caller>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(token)
            .filter(|session| session.is_active(Utc::now()))
            .map(Session::caller))
    }

    async fn issue(&self, session: Session) -> Result<(), RepositoryError> {
        self.sessions.write().await.insert(session.token.clone(), session);
        Ok(())
    }
}

/// Material requests held in process memory, sharing profiles with an
/// [`InMemoryProfileRepository`] for tenant resolution.
pub struct InMemoryMaterialRequestRepository {
    profiles: Arc<InMemoryProfileRepository>,
    requests: RwLock<HashMap<String, MaterialRequest>>,
    enforce_transitions: bool,
    offline: AtomicBool,
}

impl InMemoryMaterialRequestRepository {
    pub fn new(profiles: Arc<InMemoryProfileRepository>) -> Self {
        Self {
            profiles,
            requests: RwLock::new(HashMap::new()),
            enforce_transitions: true,
            offline: AtomicBool::new(false),
        }
    }

    pub fn with_transition_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_transitions = enforce;
        self
    }

    /// While offline every mutation fails with [`RepositoryError::Unavailable`]; reads still work.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Stores a request as-is, bypassing creation rules. Used to seed fixtures.
    pub async fn insert(&self, request: MaterialRequest) {
        self.requests.write().await.insert(request.id.0.clone(), request);
    }

    fn ensure_online(&self) -> Result<(), RepositoryError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("material request store is offline".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl MaterialRequestRepository for InMemoryMaterialRequestRepository {
    async fn list(
        &self,
        caller: &Caller,
        filter: Option<RequestStatus>,
    ) -> Result<Vec<EnrichedMaterialRequest>, RepositoryError> {
        let Some(company_id) = self.profiles.company_of(&caller.user_id).await else {
            return Ok(Vec::new());
        };

        let mut visible: Vec<MaterialRequest> = self
            .requests
            .read()
            .await
            .values()
            .filter(|request| request.company_id == company_id)
            .filter(|request| filter.map_or(true, |status| request.status == status))
            .cloned()
            .collect();
        visible.sort_by(|a, b| {
            b.requested_at.cmp(&a.requested_at).then_with(|| b.id.0.cmp(&a.id.0))
        });

        let mut enriched = Vec::with_capacity(visible.len());
        for request in visible {
            let email = self.profiles.email_of(&request.requested_by, &company_id).await;
            enriched.push(EnrichedMaterialRequest::new(request, email));
        }
        Ok(enriched)
    }

    async fn find_by_id(
        &self,
        caller: &Caller,
        id: &MaterialRequestId,
    ) -> Result<Option<MaterialRequest>, RepositoryError> {
        let Some(company_id) = self.profiles.company_of(&caller.user_id).await else {
            return Ok(None);
        };
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).filter(|request| request.company_id == company_id).cloned())
    }

    async fn create(
        &self,
        caller: &Caller,
        fields: NewMaterialRequest,
    ) -> Result<MaterialRequest, RepositoryError> {
        self.ensure_online()?;
        let company_id = self
            .profiles
            .company_of(&caller.user_id)
            .await
            .ok_or_else(|| RepositoryError::ProfileNotFound(caller.user_id.0.clone()))?;
        fields.validate()?;

        let request = fields.into_request(
            MaterialRequestId::generate(),
            caller.user_id.clone(),
            company_id,
            Utc::now(),
        );
        self.requests.write().await.insert(request.id.0.clone(), request.clone());
        Ok(request)
    }

    async fn update(
        &self,
        caller: &Caller,
        id: &MaterialRequestId,
        patch: MaterialRequestPatch,
    ) -> Result<MaterialRequest, RepositoryError> {
        self.ensure_online()?;
        let existing = self
            .find_by_id(caller, id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(id.0.clone()))?;

        let updated = patched_request(existing, &patch, self.enforce_transitions, Utc::now())?;
        self.requests.write().await.insert(id.0.clone(), updated.clone());
        Ok(updated)
    }

    async fn remove(
        &self,
        caller: &Caller,
        id: &MaterialRequestId,
    ) -> Result<(), RepositoryError> {
        self.ensure_online()?;
        if self.find_by_id(caller, id).await?.is_none() {
            return Err(RepositoryError::NotFound(id.0.clone()));
        }
        self.requests.write().await.remove(&id.0);
        Ok(())
    }
}
