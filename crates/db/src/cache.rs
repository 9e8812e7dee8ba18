use std::collections::HashMap;

use tokio::sync::RwLock;

use matreq_core::domain::profile::CompanyId;
use matreq_core::domain::request::EnrichedMaterialRequest;
use matreq_core::domain::status::RequestStatus;

/// Identifies one cached request list: a company's requests under one status filter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub company_id: CompanyId,
    pub status: Option<RequestStatus>,
}

impl QueryKey {
    pub fn new(company_id: CompanyId, status: Option<RequestStatus>) -> Self {
        Self { company_id, status }
    }

    pub fn admits(&self, status: RequestStatus) -> bool {
        self.status.map_or(true, |filter| filter == status)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub data: Vec<EnrichedMaterialRequest>,
    pub stale: bool,
}

/// Every cached list of one company, captured before an optimistic write.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheSnapshot {
    company_id: CompanyId,
    entries: Vec<(QueryKey, CacheEntry)>,
}

impl CacheSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Client-side view of request lists. Invalidated entries stay readable through
/// [`QueryCache::peek`] but are never served by [`QueryCache::get`].
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh data for `key`, if any.
    pub async fn get(&self, key: &QueryKey) -> Option<Vec<EnrichedMaterialRequest>> {
        let entries = self.entries.read().await;
        entries.get(key).filter(|entry| !entry.stale).map(|entry| entry.data.clone())
    }

    pub async fn peek(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn set(&self, key: QueryKey, data: Vec<EnrichedMaterialRequest>) {
        self.entries.write().await.insert(key, CacheEntry { data, stale: false });
    }

    pub async fn invalidate(&self, key: &QueryKey) {
        if let Some(entry) = self.entries.write().await.get_mut(key) {
            entry.stale = true;
        }
    }

    /// Marks every list of `company_id` stale, whatever its filter. Returns how many were hit.
    pub async fn invalidate_company(&self, company_id: &CompanyId) -> usize {
        let mut entries = self.entries.write().await;
        let mut invalidated = 0;
        for (key, entry) in entries.iter_mut() {
            if &key.company_id == company_id {
                entry.stale = true;
                invalidated += 1;
            }
        }
        invalidated
    }

    pub async fn snapshot_company(&self, company_id: &CompanyId) -> CacheSnapshot {
        let entries = self.entries.read().await;
        let mut captured: Vec<(QueryKey, CacheEntry)> = entries
            .iter()
            .filter(|(key, _)| &key.company_id == company_id)
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();
        captured.sort_by_key(|(key, _)| key.status.map(RequestStatus::as_str));
        CacheSnapshot { company_id: company_id.clone(), entries: captured }
    }

    /// Puts the company's lists back exactly as captured, dropping lists created since.
    ///
    /// This also discards another in-flight optimistic change to the same company's
    /// lists; the invalidation that follows every settled mutation refetches them.
    pub async fn restore(&self, snapshot: CacheSnapshot) {
        let mut entries = self.entries.write().await;
        entries.retain(|key, _| key.company_id != snapshot.company_id);
        entries.extend(snapshot.entries);
    }

    /// Rewrites every cached list of `company_id` in place.
    pub async fn update_company<F>(&self, company_id: &CompanyId, mut apply: F)
    where
        F: FnMut(&QueryKey, &mut Vec<EnrichedMaterialRequest>),
    {
        let mut entries = self.entries.write().await;
        for (key, entry) in entries.iter_mut() {
            if &key.company_id == company_id {
                apply(key, &mut entry.data);
            }
        }
    }
}
