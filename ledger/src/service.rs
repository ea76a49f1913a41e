//! Offramp request lifecycle service.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use durian_common::{
    Clock, DurianError, OfframpRequest, OfframpRequestId, OfframpStatus, Result,
};

use crate::repository::OfframpRepository;
use crate::update::{NewOfframpRequest, OfframpUpdate};

/// Offramp requests plus their pending count, as shown on the review screen.
#[derive(Debug, Clone)]
pub struct OfframpListing {
    pub requests: Vec<OfframpRequest>,
    pub pending_count: u64,
}

/// Creates offramp requests and applies admin patches with the status guard.
pub struct OfframpService {
    repository: Arc<dyn OfframpRepository>,
    clock: Arc<dyn Clock>,
}

impl OfframpService {
    /// Create a new service over a repository.
    pub fn new(repository: Arc<dyn OfframpRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Record a new pending request. `amount_thb` is the quoted net payout.
    #[instrument(skip(self, request), fields(business_id = %request.business_id))]
    pub async fn create(
        &self,
        request: NewOfframpRequest,
        amount_thb: Option<Decimal>,
    ) -> Result<OfframpRequest> {
        request.validate()?;

        let record = OfframpRequest::new(
            request.business_id,
            request.amount_usdc,
            amount_thb,
            request.bank,
            self.clock.now(),
        );
        self.repository.insert(&record).await?;

        info!(
            offramp_id = %record.id,
            amount_usdc = %record.amount_usdc,
            "Offramp request created"
        );
        Ok(record)
    }

    /// Get a request by id.
    pub async fn get(&self, id: OfframpRequestId) -> Result<OfframpRequest> {
        self.repository.get(id).await
    }

    /// List requests newest first, with the number still pending.
    pub async fn list(&self, status: Option<OfframpStatus>) -> Result<OfframpListing> {
        let requests = self.repository.list(status).await?;
        let pending_count = self.repository.count(OfframpStatus::Pending).await?;
        Ok(OfframpListing {
            requests,
            pending_count,
        })
    }

    /// Apply an admin patch.
    ///
    /// The write is conditional on the status read here; if another admin
    /// moved the record in between, nothing is written and
    /// `ConcurrentModification` is returned. Every accepted patch moves the
    /// status, so two patches issued from the same read never both land.
    #[instrument(skip(self, update), fields(offramp_id = %id, actor = %actor))]
    pub async fn update(
        &self,
        id: OfframpRequestId,
        update: &OfframpUpdate,
        actor: &str,
    ) -> Result<OfframpRequest> {
        let current = self.repository.get(id).await?;
        let expected = current.status;

        let mut updated = current;
        if let Err(e) = update.apply(&mut updated, actor, self.clock.now()) {
            if let DurianError::InvalidTransition { from, to } = &e {
                warn!(from = %from, to = %to, "Rejected offramp status transition");
            }
            return Err(e);
        }

        if let Err(e) = self.repository.compare_and_swap(expected, &updated).await {
            if matches!(e, DurianError::ConcurrentModification(_)) {
                warn!(expected = %expected, "Offramp request changed concurrently");
            }
            return Err(e);
        }

        info!(
            from = %expected,
            to = %updated.status,
            "Offramp request updated"
        );
        Ok(updated)
    }
}
