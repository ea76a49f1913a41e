//! Admin patches against an offramp request.

use durian_common::{
    BankDetails, BusinessId, DurianError, Money, OfframpRequest, OfframpStatus, Result, Timestamp,
    MAX_AMOUNT,
};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Partial update issued from the admin review screen.
///
/// Absent fields are left untouched. Notes, transfer reference and final
/// amount are only written together with the status change that closes the
/// request, so a patch carrying them must also carry `status`. Records that
/// are already fulfilled or rejected accept no patch at all.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OfframpUpdate {
    #[serde(default)]
    pub status: Option<OfframpStatus>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub bank_transfer_ref: Option<String>,
    /// Final THB amount actually paid out.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount_thb: Option<Decimal>,
}

impl OfframpUpdate {
    /// Patch that only moves the status.
    pub fn status(status: OfframpStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Check if the patch carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.admin_notes.is_none()
            && self.bank_transfer_ref.is_none()
            && self.amount_thb.is_none()
    }

    /// Validate the patch against the record's current status.
    pub fn validate(&self, current: OfframpStatus) -> Result<()> {
        if self.is_empty() {
            return Err(DurianError::InvalidRequest {
                message: "No valid fields to update".to_string(),
                field: None,
            });
        }

        let Some(next) = self.status else {
            let message = if current.is_final() {
                format!("Offramp request is already {current} and can no longer be edited")
            } else {
                "status is required when setting admin_notes, bank_transfer_ref or amount_thb"
                    .to_string()
            };
            return Err(field_error("status", &message));
        };

        if !current.can_transition_to(next) {
            return Err(DurianError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        if let Some(amount) = self.amount_thb {
            if amount <= Decimal::ZERO || amount > MAX_AMOUNT {
                return Err(DurianError::InvalidAmount(format!(
                    "amount_thb {amount} must be greater than zero and at most {MAX_AMOUNT}"
                )));
            }
            if !Money::thb(amount).fits_decimal_places() {
                return Err(DurianError::InvalidAmount(format!(
                    "amount_thb {amount} has more than 2 decimal places"
                )));
            }
        }

        if self.admin_notes.is_some() && !next.is_final() {
            return Err(field_error(
                "admin_notes",
                "admin_notes can only be set when fulfilling or rejecting",
            ));
        }
        if self.bank_transfer_ref.is_some() && next != OfframpStatus::Fulfilled {
            return Err(field_error(
                "bank_transfer_ref",
                "bank_transfer_ref can only be set when fulfilling",
            ));
        }
        if self.amount_thb.is_some() && next != OfframpStatus::Fulfilled {
            return Err(field_error(
                "amount_thb",
                "amount_thb can only be set when fulfilling",
            ));
        }

        Ok(())
    }

    /// Validate and apply the patch, stamping `updated_at` and, on
    /// fulfillment, `fulfilled_at`/`fulfilled_by`.
    pub fn apply(&self, request: &mut OfframpRequest, actor: &str, now: Timestamp) -> Result<()> {
        self.validate(request.status)?;

        if let Some(next) = self.status {
            request.transition_to(next, actor, now)?;
        }
        if let Some(notes) = &self.admin_notes {
            request.admin_notes = Some(notes.clone());
        }
        if let Some(reference) = &self.bank_transfer_ref {
            request.bank_transfer_ref = Some(reference.clone());
        }
        if let Some(amount) = self.amount_thb {
            request.amount_thb = Some(amount);
        }
        request.updated_at = now;

        Ok(())
    }
}

fn field_error(field: &str, message: &str) -> DurianError {
    DurianError::InvalidRequest {
        message: message.to_string(),
        field: Some(field.to_string()),
    }
}

/// A business's request to withdraw USDC into THB.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewOfframpRequest {
    pub business_id: BusinessId,
    /// Accepts a JSON number or a decimal string.
    pub amount_usdc: Decimal,
    #[serde(flatten)]
    pub bank: BankDetails,
}

impl NewOfframpRequest {
    /// Validate the business id, and the amount against the USDC range and
    /// precision.
    pub fn validate(&self) -> Result<()> {
        if !self.business_id.is_valid() {
            return Err(field_error("business_id", "business_id is not a valid identifier"));
        }
        if self.amount_usdc <= Decimal::ZERO {
            return Err(DurianError::InvalidAmount(format!(
                "amount_usdc {} must be greater than zero",
                self.amount_usdc
            )));
        }
        if self.amount_usdc > MAX_AMOUNT {
            return Err(DurianError::InvalidAmount(format!(
                "amount_usdc {} exceeds the maximum of {MAX_AMOUNT}",
                self.amount_usdc
            )));
        }
        if !Money::usdc(self.amount_usdc).fits_decimal_places() {
            return Err(DurianError::InvalidAmount(format!(
                "amount_usdc {} has more than 6 decimal places",
                self.amount_usdc
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn request_in(status: OfframpStatus) -> OfframpRequest {
        let mut request = OfframpRequest::new(
            BusinessId::new("biz_1"),
            dec!(100),
            Some(dec!(3552.15)),
            BankDetails::default(),
            Utc::now(),
        );
        request.status = status;
        request
    }

    #[test]
    fn test_empty_patch_rejected() {
        let err = OfframpUpdate::default()
            .validate(OfframpStatus::Pending)
            .unwrap_err();
        assert!(matches!(err, DurianError::InvalidRequest { field: None, .. }));
        assert_eq!(err.to_string(), "Invalid request: No valid fields to update");
    }

    #[test]
    fn test_fulfill_with_reference_and_amount() {
        let mut request = request_in(OfframpStatus::Processing);
        let now = Utc::now();
        let update = OfframpUpdate {
            status: Some(OfframpStatus::Fulfilled),
            admin_notes: Some("paid via PromptPay".into()),
            bank_transfer_ref: Some("KBANK-0042".into()),
            amount_thb: Some(dec!(3550.00)),
        };

        update.apply(&mut request, "ops@durian.cash", now).unwrap();

        assert_eq!(request.status, OfframpStatus::Fulfilled);
        assert_eq!(request.amount_thb, Some(dec!(3550.00)));
        assert_eq!(request.bank_transfer_ref.as_deref(), Some("KBANK-0042"));
        assert_eq!(request.fulfilled_by.as_deref(), Some("ops@durian.cash"));
        assert_eq!(request.fulfilled_at, Some(now));
        assert_eq!(request.updated_at, now);
    }

    #[test]
    fn test_fulfilled_rejects_processing() {
        let mut request = request_in(OfframpStatus::Fulfilled);
        let before = request.clone();

        let err = OfframpUpdate::status(OfframpStatus::Processing)
            .apply(&mut request, "ops@durian.cash", Utc::now())
            .unwrap_err();

        assert!(matches!(
            err,
            DurianError::InvalidTransition {
                from: OfframpStatus::Fulfilled,
                to: OfframpStatus::Processing,
            }
        ));
        assert_eq!(request, before);
    }

    #[test]
    fn test_same_state_is_invalid_transition() {
        let err = OfframpUpdate::status(OfframpStatus::Pending)
            .validate(OfframpStatus::Pending)
            .unwrap_err();
        assert!(matches!(err, DurianError::InvalidTransition { .. }));
    }

    #[test]
    fn test_field_rules_follow_next_status() {
        let notes_on_processing = OfframpUpdate {
            status: Some(OfframpStatus::Processing),
            admin_notes: Some("looking".into()),
            ..Default::default()
        };
        assert!(matches!(
            notes_on_processing.validate(OfframpStatus::Pending),
            Err(DurianError::InvalidRequest { field: Some(ref f), .. }) if f == "admin_notes"
        ));

        let reference_on_reject = OfframpUpdate {
            status: Some(OfframpStatus::Rejected),
            bank_transfer_ref: Some("KBANK-1".into()),
            ..Default::default()
        };
        assert!(matches!(
            reference_on_reject.validate(OfframpStatus::Pending),
            Err(DurianError::InvalidRequest { field: Some(ref f), .. }) if f == "bank_transfer_ref"
        ));

        let notes_without_status = OfframpUpdate {
            admin_notes: Some("account closed".into()),
            ..Default::default()
        };
        assert!(matches!(
            notes_without_status.validate(OfframpStatus::Pending),
            Err(DurianError::InvalidRequest { field: Some(ref f), .. }) if f == "status"
        ));
    }

    #[test]
    fn test_closed_requests_cannot_be_edited() {
        let rewrite_payout = OfframpUpdate {
            admin_notes: Some("edited".into()),
            bank_transfer_ref: Some("KBANK-9999".into()),
            amount_thb: Some(dec!(1.0)),
            ..Default::default()
        };
        let mut fulfilled = request_in(OfframpStatus::Fulfilled);
        fulfilled.amount_thb = Some(dec!(3550));
        fulfilled.bank_transfer_ref = Some("KBANK-0042".into());
        let before = fulfilled.clone();

        let err = rewrite_payout
            .apply(&mut fulfilled, "ops@durian.cash", Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            DurianError::InvalidRequest { field: Some(ref f), .. } if f == "status"
        ));
        assert_eq!(fulfilled, before);

        let rewrite_notes = OfframpUpdate {
            admin_notes: Some("rewritten".into()),
            ..Default::default()
        };
        assert!(rewrite_notes.validate(OfframpStatus::Rejected).is_err());

        for current in [OfframpStatus::Fulfilled, OfframpStatus::Rejected] {
            for next in OfframpStatus::ALL {
                assert!(matches!(
                    OfframpUpdate::status(next).validate(current),
                    Err(DurianError::InvalidTransition { .. })
                ));
            }
        }
    }

    #[test]
    fn test_non_positive_amount_thb_rejected() {
        let update = OfframpUpdate {
            status: Some(OfframpStatus::Fulfilled),
            amount_thb: Some(Decimal::ZERO),
            ..Default::default()
        };
        assert!(matches!(
            update.validate(OfframpStatus::Pending),
            Err(DurianError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_deserialize_patch() {
        let update: OfframpUpdate = serde_json::from_str(
            r#"{"status":"fulfilled","bank_transfer_ref":"SCB-9","amount_thb":3552.15}"#,
        )
        .unwrap();
        assert_eq!(update.status, Some(OfframpStatus::Fulfilled));
        assert_eq!(update.amount_thb, Some(dec!(3552.15)));
        assert!(update.admin_notes.is_none());

        let empty: OfframpUpdate = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());

        assert!(serde_json::from_str::<OfframpUpdate>(r#"{"status":"approved"}"#).is_err());
    }

    #[test]
    fn test_new_request_validation() {
        let valid = NewOfframpRequest {
            business_id: BusinessId::new("biz_1"),
            amount_usdc: dec!(25),
            bank: BankDetails::default(),
        };
        assert!(valid.validate().is_ok());

        let zero = NewOfframpRequest {
            amount_usdc: Decimal::ZERO,
            ..valid.clone()
        };
        assert!(matches!(zero.validate(), Err(DurianError::InvalidAmount(_))));

        let too_large = NewOfframpRequest {
            amount_usdc: MAX_AMOUNT + Decimal::ONE,
            ..valid.clone()
        };
        assert!(matches!(too_large.validate(), Err(DurianError::InvalidAmount(_))));

        let too_precise = NewOfframpRequest {
            amount_usdc: dec!(1.0000001),
            ..valid.clone()
        };
        assert!(matches!(too_precise.validate(), Err(DurianError::InvalidAmount(_))));

        let blank = NewOfframpRequest {
            business_id: BusinessId::new(""),
            ..valid
        };
        assert!(matches!(blank.validate(), Err(DurianError::InvalidRequest { .. })));
    }
}
