//! Offramp request types and lifecycle state machine.

use crate::{BusinessId, DurianError, OfframpRequestId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Offramp request status representing the lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfframpStatus {
    /// Requested by the business, awaiting review.
    Pending,
    /// An admin has picked the request up and is preparing the bank transfer.
    Processing,
    /// THB paid out to the business bank account.
    Fulfilled,
    /// Declined by an admin.
    Rejected,
}

impl OfframpStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OfframpStatus; 4] = [
        OfframpStatus::Pending,
        OfframpStatus::Processing,
        OfframpStatus::Fulfilled,
        OfframpStatus::Rejected,
    ];

    /// Check if this is a final state.
    pub fn is_final(&self) -> bool {
        matches!(self, OfframpStatus::Fulfilled | OfframpStatus::Rejected)
    }

    /// Get valid next states from current state.
    pub fn valid_transitions(&self) -> &[OfframpStatus] {
        match self {
            OfframpStatus::Pending => &[
                OfframpStatus::Processing,
                OfframpStatus::Fulfilled,
                OfframpStatus::Rejected,
            ],
            OfframpStatus::Processing => &[OfframpStatus::Fulfilled, OfframpStatus::Rejected],
            OfframpStatus::Fulfilled => &[],
            OfframpStatus::Rejected => &[],
        }
    }

    /// Check if transition to given state is valid.
    pub fn can_transition_to(&self, next: OfframpStatus) -> bool {
        self.valid_transitions().contains(&next)
    }

    /// Storage and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OfframpStatus::Pending => "pending",
            OfframpStatus::Processing => "processing",
            OfframpStatus::Fulfilled => "fulfilled",
            OfframpStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for OfframpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OfframpStatus {
    type Err = DurianError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OfframpStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DurianError::InvalidRequest {
                message: format!("Unknown offramp status: {s}"),
                field: Some("status".to_string()),
            })
    }
}

/// Destination bank account for the THB payout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub bank_name: Option<String>,
    pub bank_account_number: Option<String>,
    pub bank_account_name: Option<String>,
}

/// A business's request to convert a USDC balance into a THB bank payout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfframpRequest {
    /// Unique request identifier.
    pub id: OfframpRequestId,
    /// Business withdrawing funds.
    pub business_id: BusinessId,
    /// Requested withdrawal, immutable after creation.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_usdc: Decimal,
    /// Net THB payout after commission.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub amount_thb: Option<Decimal>,
    #[serde(flatten)]
    pub bank: BankDetails,
    /// Current status.
    pub status: OfframpStatus,
    pub admin_notes: Option<String>,
    pub bank_transfer_ref: Option<String>,
    pub fulfilled_at: Option<Timestamp>,
    pub fulfilled_by: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl OfframpRequest {
    /// Create a new pending request.
    pub fn new(
        business_id: BusinessId,
        amount_usdc: Decimal,
        amount_thb: Option<Decimal>,
        bank: BankDetails,
        now: Timestamp,
    ) -> Self {
        Self {
            id: OfframpRequestId::new(),
            business_id,
            amount_usdc,
            amount_thb,
            bank,
            status: OfframpStatus::Pending,
            admin_notes: None,
            bank_transfer_ref: None,
            fulfilled_at: None,
            fulfilled_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition to a new status, stamping fulfillment fields when the
    /// request becomes `fulfilled`.
    pub fn transition_to(
        &mut self,
        next: OfframpStatus,
        actor: &str,
        now: Timestamp,
    ) -> Result<(), DurianError> {
        if !self.status.can_transition_to(next) {
            return Err(DurianError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        self.updated_at = now;

        if next == OfframpStatus::Fulfilled {
            self.fulfilled_at = Some(now);
            self.fulfilled_by = Some(actor.to_string());
        }

        Ok(())
    }
}
