use std::sync::Arc;

use tracing::{debug, warn};

use matreq_core::domain::profile::{Caller, CompanyId};
use matreq_core::domain::request::{
    EnrichedMaterialRequest, MaterialRequest, MaterialRequestId, MaterialRequestPatch,
    NewMaterialRequest,
};
use matreq_core::domain::status::RequestStatus;

use crate::cache::{CacheSnapshot, QueryCache, QueryKey};
use crate::repositories::{MaterialRequestRepository, ProfileRepository, RepositoryError};

/// Applies request mutations to the cached lists before the repository confirms
/// them, restoring the captured lists if the repository call fails. Every
/// mutation, successful or not, ends by invalidating the company's lists.
pub struct OptimisticMutationController {
    repository: Arc<dyn MaterialRequestRepository>,
    profiles: Arc<dyn ProfileRepository>,
    cache: Arc<QueryCache>,
}

impl OptimisticMutationController {
    pub fn new(
        repository: Arc<dyn MaterialRequestRepository>,
        profiles: Arc<dyn ProfileRepository>,
        cache: Arc<QueryCache>,
    ) -> Self {
        Self { repository, profiles, cache }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn repository(&self) -> &Arc<dyn MaterialRequestRepository> {
        &self.repository
    }

    async fn company_of(&self, caller: &Caller) -> Result<Option<CompanyId>, RepositoryError> {
        Ok(self.profiles.find_by_id(&caller.user_id).await?.map(|profile| profile.company_id))
    }

    /// Cache-through read of the caller's company list under `filter`.
    pub async fn list(
        &self,
        caller: &Caller,
        filter: Option<RequestStatus>,
    ) -> Result<Vec<EnrichedMaterialRequest>, RepositoryError> {
        let Some(company_id) = self.company_of(caller).await? else {
            return self.repository.list(caller, filter).await;
        };

        let key = QueryKey::new(company_id, filter);
        if let Some(cached) = self.cache.get(&key).await {
            debug!(
                event_name = "material_request.list.cache_hit",
                company_id = %key.company_id.0,
                status = key.status.map(RequestStatus::as_str).unwrap_or("all"),
                "served request list from cache"
            );
            return Ok(cached);
        }

        let fresh = self.repository.list(caller, filter).await?;
        self.cache.set(key, fresh.clone()).await;
        Ok(fresh)
    }

    /// Creation is not applied optimistically; lists are refreshed once the row exists.
    pub async fn create(
        &self,
        caller: &Caller,
        fields: NewMaterialRequest,
    ) -> Result<MaterialRequest, RepositoryError> {
        let created = self.repository.create(caller, fields).await?;
        self.cache.invalidate_company(&created.company_id).await;
        Ok(created)
    }

    /// Partial update. A status in the patch is checked against the stored
    /// status before anything is written, cache included.
    pub async fn update(
        &self,
        caller: &Caller,
        id: &MaterialRequestId,
        patch: MaterialRequestPatch,
    ) -> Result<MaterialRequest, RepositoryError> {
        if let Some(next) = patch.status {
            let current = self
                .repository
                .find_by_id(caller, id)
                .await?
                .ok_or_else(|| RepositoryError::NotFound(id.0.clone()))?;
            current.status.transition_to(next)?;
        }
        self.apply(caller, id, patch).await
    }

    /// Status change from `current` to `next`, refused locally when the table forbids it.
    pub async fn update_status(
        &self,
        caller: &Caller,
        id: &MaterialRequestId,
        current: RequestStatus,
        next: RequestStatus,
    ) -> Result<MaterialRequest, RepositoryError> {
        current.transition_to(next)?;
        self.apply(caller, id, MaterialRequestPatch::status(next)).await
    }

    async fn apply(
        &self,
        caller: &Caller,
        id: &MaterialRequestId,
        patch: MaterialRequestPatch,
    ) -> Result<MaterialRequest, RepositoryError> {
        patch.validate()?;
        let company_id = self.company_of(caller).await?;

        let snapshot = match &company_id {
            Some(company_id) => Some(self.apply_patch_optimistically(company_id, id, &patch).await),
            None => None,
        };

        let result = self.repository.update(caller, id, patch).await;
        self.settle(company_id.as_ref(), snapshot, result.as_ref().err(), id, "update").await;
        result
    }

    pub async fn remove(
        &self,
        caller: &Caller,
        id: &MaterialRequestId,
    ) -> Result<(), RepositoryError> {
        let company_id = self.company_of(caller).await?;

        let snapshot = match &company_id {
            Some(company_id) => {
                let snapshot = self.cache.snapshot_company(company_id).await;
                self.cache
                    .update_company(company_id, |_, data| data.retain(|row| &row.request.id != id))
                    .await;
                Some(snapshot)
            }
            None => None,
        };

        let result = self.repository.remove(caller, id).await;
        self.settle(company_id.as_ref(), snapshot, result.as_ref().err(), id, "remove").await;
        result
    }

    async fn apply_patch_optimistically(
        &self,
        company_id: &CompanyId,
        id: &MaterialRequestId,
        patch: &MaterialRequestPatch,
    ) -> CacheSnapshot {
        let snapshot = self.cache.snapshot_company(company_id).await;
        self.cache
            .update_company(company_id, |key, data| {
                for row in data.iter_mut().filter(|row| &row.request.id == id) {
                    row.request.apply_patch(patch);
                }
                data.retain(|row| &row.request.id != id || key.admits(row.request.status));
            })
            .await;
        snapshot
    }

    async fn settle(
        &self,
        company_id: Option<&CompanyId>,
        snapshot: Option<CacheSnapshot>,
        error: Option<&RepositoryError>,
        id: &MaterialRequestId,
        operation: &'static str,
    ) {
        let Some(company_id) = company_id else {
            return;
        };

        if let (Some(error), Some(snapshot)) = (error, snapshot) {
            warn!(
                event_name = "material_request.mutation.rolled_back",
                operation,
                request_id = %id,
                company_id = %company_id.0,
                lists_restored = snapshot.len(),
                error = %error,
                "restoring cached request lists after failed mutation"
            );
            self.cache.restore(snapshot).await;
        }

        self.cache.invalidate_company(company_id).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Mutex;

    use matreq_core::domain::profile::{Caller, CompanyId, Profile, UserId};
    use matreq_core::domain::request::{
        EnrichedMaterialRequest, MaterialRequest, MaterialRequestId, MaterialRequestPatch,
        NewMaterialRequest, Priority, Unit,
    };
    use matreq_core::domain::status::RequestStatus;
    use matreq_core::errors::DomainError;

    use super::OptimisticMutationController;
    use crate::cache::{CacheEntry, QueryCache, QueryKey};
    use crate::repositories::{
        InMemoryMaterialRequestRepository, InMemoryProfileRepository, MaterialRequestRepository,
        ProfileRepository, RepositoryError,
    };

    struct Harness {
        controller: OptimisticMutationController,
        store: Arc<InMemoryMaterialRequestRepository>,
        cache: Arc<QueryCache>,
        caller: Caller,
    }

    fn company() -> CompanyId {
        CompanyId("company-1".to_string())
    }

    fn fields(name: &str, quantity: f64) -> NewMaterialRequest {
        NewMaterialRequest {
            project_id: None,
            material_name: name.to_string(),
            quantity,
            unit: Unit::Kg,
            priority: Priority::Medium,
            notes: None,
        }
    }

    async fn harness() -> Harness {
        let profiles = Arc::new(InMemoryProfileRepository::default());
        profiles
            .save(Profile {
                id: UserId("user-a".to_string()),
                company_id: company(),
                email: Some("anna@builder.test".to_string()),
                created_at: Utc::now(),
            })
            .await
            .expect("profile");
        let store = Arc::new(InMemoryMaterialRequestRepository::new(profiles.clone()));
        let cache = Arc::new(QueryCache::new());
        let controller = OptimisticMutationController::new(store.clone(), profiles, cache.clone());
        Harness { controller, store, cache, caller: Caller::new("user-a") }
    }

    #[tokio::test]
    async fn list_is_cache_through() {
        let h = harness().await;
        h.controller.create(&h.caller, fields("Sand", 5.0)).await.expect("create");

        let first = h.controller.list(&h.caller, None).await.expect("list");
        let mut sneaky = first[0].request.clone();
        sneaky.id = MaterialRequestId("sneaky".to_string());
        h.store.insert(sneaky).await;
        let second = h.controller.list(&h.caller, None).await.expect("list");
        assert_eq!(first, second, "fresh entry should be served from cache");

        h.cache.invalidate(&QueryKey::new(company(), None)).await;
        let third = h.controller.list(&h.caller, None).await.expect("list");
        assert_eq!(third.len(), 2, "invalidated entry should be refetched");
    }

    #[tokio::test]
    async fn create_invalidates_company_lists() {
        let h = harness().await;
        h.controller.list(&h.caller, None).await.expect("prime");

        h.controller.create(&h.caller, fields("Sand", 5.0)).await.expect("create");

        assert_eq!(h.cache.get(&QueryKey::new(company(), None)).await, None);
        assert_eq!(h.controller.list(&h.caller, None).await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn failed_update_restores_exact_snapshot_then_invalidates() {
        let h = harness().await;
        let created =
            h.controller.create(&h.caller, fields("Cement", 120.0)).await.expect("create");
        h.controller.list(&h.caller, None).await.expect("prime all");
        h.controller.list(&h.caller, Some(RequestStatus::Pending)).await.expect("prime pending");

        let all_key = QueryKey::new(company(), None);
        let pending_key = QueryKey::new(company(), Some(RequestStatus::Pending));
        let all_before = h.cache.peek(&all_key).await.map(|entry| entry.data);
        let pending_before = h.cache.peek(&pending_key).await.map(|entry| entry.data);

        h.store.set_offline(true);
        let error = h
            .controller
            .update_status(&h.caller, &created.id, RequestStatus::Pending, RequestStatus::Approved)
            .await
            .expect_err("store offline");
        assert!(matches!(error, RepositoryError::Unavailable(_)));

        let all_after = h.cache.peek(&all_key).await;
        let pending_after = h.cache.peek(&pending_key).await;
        assert_eq!(all_after.clone().map(|entry| entry.data), all_before);
        assert_eq!(pending_after.clone().map(|entry| entry.data), pending_before);
        assert!(all_after.map(|entry| entry.stale).unwrap_or(false));
        assert!(pending_after.map(|entry| entry.stale).unwrap_or(false));
    }

    #[tokio::test]
    async fn successful_update_settles_with_fresh_data() {
        let h = harness().await;
        let created =
            h.controller.create(&h.caller, fields("Cement", 120.0)).await.expect("create");
        h.controller.list(&h.caller, Some(RequestStatus::Pending)).await.expect("prime");

        let updated = h
            .controller
            .update_status(&h.caller, &created.id, RequestStatus::Pending, RequestStatus::Approved)
            .await
            .expect("approve");
        assert_eq!(updated.status, RequestStatus::Approved);

        let pending = h.controller.list(&h.caller, Some(RequestStatus::Pending)).await;
        assert!(pending.expect("list").is_empty());
        let approved = h.controller.list(&h.caller, Some(RequestStatus::Approved)).await;
        assert_eq!(approved.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn forbidden_transition_is_refused_before_the_store_is_called() {
        let h = harness().await;
        let created =
            h.controller.create(&h.caller, fields("Cement", 120.0)).await.expect("create");
        h.controller.list(&h.caller, None).await.expect("prime");
        let before = h.cache.peek(&QueryKey::new(company(), None)).await;

        let error = h
            .controller
            .update_status(&h.caller, &created.id, RequestStatus::Pending, RequestStatus::Fulfilled)
            .await
            .expect_err("pending -> fulfilled is not allowed");

        assert!(matches!(
            error,
            RepositoryError::Domain(DomainError::InvalidStatusTransition {
                from: RequestStatus::Pending,
                to: RequestStatus::Fulfilled,
            })
        ));
        assert_eq!(h.cache.peek(&QueryKey::new(company(), None)).await, before);
    }

    #[tokio::test]
    async fn patch_carrying_a_forbidden_status_never_reaches_cache_or_store() {
        let profiles = Arc::new(InMemoryProfileRepository::default());
        profiles
            .save(Profile {
                id: UserId("user-a".to_string()),
                company_id: company(),
                email: None,
                created_at: Utc::now(),
            })
            .await
            .expect("profile");
        let store = Arc::new(
            InMemoryMaterialRequestRepository::new(profiles.clone())
                .with_transition_enforcement(false),
        );
        let cache = Arc::new(QueryCache::new());
        let controller = OptimisticMutationController::new(store.clone(), profiles, cache.clone());
        let caller = Caller::new("user-a");

        let created =
            controller.create(&caller, fields("Steel Rebar", 40.0)).await.expect("create");
        controller
            .update_status(&caller, &created.id, RequestStatus::Pending, RequestStatus::Approved)
            .await
            .expect("approve");
        controller
            .update_status(&caller, &created.id, RequestStatus::Approved, RequestStatus::Fulfilled)
            .await
            .expect("fulfil");
        controller.list(&caller, None).await.expect("prime");
        let before = cache.peek(&QueryKey::new(company(), None)).await;

        let error = controller
            .update(&caller, &created.id, MaterialRequestPatch::status(RequestStatus::Pending))
            .await
            .expect_err("fulfilled requests cannot be reopened");
        assert!(matches!(
            error,
            RepositoryError::Domain(DomainError::InvalidStatusTransition {
                from: RequestStatus::Fulfilled,
                to: RequestStatus::Pending,
            })
        ));
        assert_eq!(cache.peek(&QueryKey::new(company(), None)).await, before);

        let stored = store.find_by_id(&caller, &created.id).await.expect("find");
        assert_eq!(stored.map(|request| request.status), Some(RequestStatus::Fulfilled));
    }

    #[tokio::test]
    async fn patch_with_status_for_unknown_request_is_not_found() {
        let h = harness().await;
        let missing = MaterialRequestId("missing".to_string());

        let error = h
            .controller
            .update(&h.caller, &missing, MaterialRequestPatch::status(RequestStatus::Approved))
            .await
            .expect_err("unknown id");
        assert!(matches!(error, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_remove_brings_the_row_back() {
        let h = harness().await;
        let created = h.controller.create(&h.caller, fields("Rebar", 30.0)).await.expect("create");
        h.controller.list(&h.caller, None).await.expect("prime");

        h.store.set_offline(true);
        h.controller.remove(&h.caller, &created.id).await.expect_err("offline");
        h.store.set_offline(false);

        let listed = h.controller.list(&h.caller, None).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].request.id, created.id);
    }

    /// Records what the cache looked like while the mutation was in flight, then fails.
    struct ObservingRepository {
        inner: Arc<InMemoryMaterialRequestRepository>,
        cache: Arc<QueryCache>,
        observed: Mutex<Option<CacheEntry>>,
    }

    #[async_trait]
    impl MaterialRequestRepository for ObservingRepository {
        async fn list(
            &self,
            caller: &Caller,
            filter: Option<RequestStatus>,
        ) -> Result<Vec<EnrichedMaterialRequest>, RepositoryError> {
            self.inner.list(caller, filter).await
        }

        async fn find_by_id(
            &self,
            caller: &Caller,
            id: &MaterialRequestId,
        ) -> Result<Option<MaterialRequest>, RepositoryError> {
            self.inner.find_by_id(caller, id).await
        }

        async fn create(
            &self,
            caller: &Caller,
            fields: NewMaterialRequest,
        ) -> Result<MaterialRequest, RepositoryError> {
            self.inner.create(caller, fields).await
        }

        async fn update(
            &self,
            _caller: &Caller,
            _id: &MaterialRequestId,
            _patch: MaterialRequestPatch,
        ) -> Result<MaterialRequest, RepositoryError> {
            let in_flight = self.cache.peek(&QueryKey::new(company(), None)).await;
            *self.observed.lock().await = in_flight;
            Err(RepositoryError::Unavailable("connection reset".to_string()))
        }

        async fn remove(
            &self,
            caller: &Caller,
            id: &MaterialRequestId,
        ) -> Result<(), RepositoryError> {
            self.inner.remove(caller, id).await
        }
    }

    #[tokio::test]
    async fn patch_is_visible_while_in_flight_and_gone_after_failure() {
        let h = harness().await;
        let created =
            h.controller.create(&h.caller, fields("Cement", 120.0)).await.expect("create");
        let profiles = Arc::new(InMemoryProfileRepository::default());
        profiles
            .save(Profile {
                id: UserId("user-a".to_string()),
                company_id: company(),
                email: None,
                created_at: Utc::now(),
            })
            .await
            .expect("profile");
        let observing = Arc::new(ObservingRepository {
            inner: h.store.clone(),
            cache: h.cache.clone(),
            observed: Mutex::new(None),
        });
        let controller = OptimisticMutationController::new(observing.clone(), profiles, h.cache);
        controller.list(&h.caller, None).await.expect("prime");

        let patch =
            MaterialRequestPatch { quantity: Some(999.0), ..MaterialRequestPatch::default() };
        controller.update(&h.caller, &created.id, patch).await.expect_err("fails");

        let in_flight = observing.observed.lock().await.clone().expect("observed cache");
        assert_eq!(in_flight.data[0].request.quantity, 999.0);
        let settled = controller.cache().peek(&QueryKey::new(company(), None)).await;
        assert_eq!(settled.map(|entry| entry.data[0].request.quantity), Some(120.0));
    }
}
