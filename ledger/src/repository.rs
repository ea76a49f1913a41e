//! Offramp request storage.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use durian_common::{DurianError, OfframpRequest, OfframpRequestId, OfframpStatus, Result};

/// Persistent store for offramp requests.
///
/// Writes after creation go through [`OfframpRepository::compare_and_swap`],
/// which only succeeds while the stored status still equals the status the
/// caller read.
#[async_trait]
pub trait OfframpRepository: Send + Sync {
    /// Insert a new request.
    async fn insert(&self, request: &OfframpRequest) -> Result<()>;

    /// Fetch a request by id.
    async fn get(&self, id: OfframpRequestId) -> Result<OfframpRequest>;

    /// List requests newest first, optionally filtered by status.
    async fn list(&self, status: Option<OfframpStatus>) -> Result<Vec<OfframpRequest>>;

    /// Count requests in a status.
    async fn count(&self, status: OfframpStatus) -> Result<u64>;

    /// Overwrite the mutable fields of `updated` if the stored status is
    /// still `expected`; otherwise fail with `ConcurrentModification`.
    async fn compare_and_swap(
        &self,
        expected: OfframpStatus,
        updated: &OfframpRequest,
    ) -> Result<()>;
}

/// In-process store used in tests and when no database is configured.
#[derive(Default)]
pub struct InMemoryOfframpRepository {
    requests: Arc<DashMap<OfframpRequestId, OfframpRequest>>,
}

impl InMemoryOfframpRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[async_trait]
impl OfframpRepository for InMemoryOfframpRepository {
    async fn insert(&self, request: &OfframpRequest) -> Result<()> {
        if self.requests.contains_key(&request.id) {
            return Err(DurianError::InternalError(format!(
                "duplicate offramp request id {}",
                request.id
            )));
        }
        self.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn get(&self, id: OfframpRequestId) -> Result<OfframpRequest> {
        self.requests
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(DurianError::OfframpNotFound(id))
    }

    async fn list(&self, status: Option<OfframpStatus>) -> Result<Vec<OfframpRequest>> {
        let mut requests: Vec<OfframpRequest> = self
            .requests
            .iter()
            .filter(|entry| status.map_or(true, |s| entry.status == s))
            .map(|entry| entry.clone())
            .collect();

        requests.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(requests)
    }

    async fn count(&self, status: OfframpStatus) -> Result<u64> {
        Ok(self
            .requests
            .iter()
            .filter(|entry| entry.status == status)
            .count() as u64)
    }

    async fn compare_and_swap(
        &self,
        expected: OfframpStatus,
        updated: &OfframpRequest,
    ) -> Result<()> {
        // The shard write lock is held across the check and the write.
        let mut entry = self
            .requests
            .get_mut(&updated.id)
            .ok_or(DurianError::OfframpNotFound(updated.id))?;

        if entry.status != expected {
            debug!(
                offramp_id = %updated.id,
                expected = %expected,
                actual = %entry.status,
                "Conditional update lost"
            );
            return Err(DurianError::ConcurrentModification(updated.id));
        }

        *entry = updated.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use durian_common::{BankDetails, BusinessId};
    use rust_decimal_macros::dec;

    fn make_request(business: &str, offset_secs: i64) -> OfframpRequest {
        OfframpRequest::new(
            BusinessId::new(business),
            dec!(50),
            None,
            BankDetails::default(),
            Utc::now() + Duration::seconds(offset_secs),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = InMemoryOfframpRepository::new();
        let request = make_request("biz_1", 0);
        repo.insert(&request).await.unwrap();

        assert_eq!(repo.get(request.id).await.unwrap(), request);
        assert!(repo.insert(&request).await.is_err());
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown() {
        let repo = InMemoryOfframpRepository::new();
        let id = OfframpRequestId::new();
        assert!(matches!(
            repo.get(id).await,
            Err(DurianError::OfframpNotFound(missing)) if missing == id
        ));
    }

    #[tokio::test]
    async fn test_list_newest_first_with_filter() {
        let repo = InMemoryOfframpRepository::new();
        let older = make_request("biz_1", -60);
        let newer = make_request("biz_2", 0);
        let mut rejected = make_request("biz_3", -30);
        rejected.status = OfframpStatus::Rejected;

        for request in [&older, &newer, &rejected] {
            repo.insert(request).await.unwrap();
        }

        let all = repo.list(None).await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![newer.id, rejected.id, older.id]);

        let pending = repo.list(Some(OfframpStatus::Pending)).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(repo.count(OfframpStatus::Pending).await.unwrap(), 2);
        assert_eq!(repo.count(OfframpStatus::Fulfilled).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_compare_and_swap_checks_status() {
        let repo = InMemoryOfframpRepository::new();
        let request = make_request("biz_1", 0);
        repo.insert(&request).await.unwrap();

        let mut processing = request.clone();
        processing.status = OfframpStatus::Processing;
        repo.compare_and_swap(OfframpStatus::Pending, &processing)
            .await
            .unwrap();

        let mut stale = request.clone();
        stale.status = OfframpStatus::Rejected;
        assert!(matches!(
            repo.compare_and_swap(OfframpStatus::Pending, &stale).await,
            Err(DurianError::ConcurrentModification(_))
        ));
        assert_eq!(
            repo.get(request.id).await.unwrap().status,
            OfframpStatus::Processing
        );
    }
}
