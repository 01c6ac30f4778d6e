use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Escrow,
    ProcessingRelease,
    Released,
    Refunded,
    Failed,
}

impl PaymentStatus {
    pub fn to_str(&self) -> &str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Escrow => "escrow",
            PaymentStatus::ProcessingRelease => "processing_release",
            PaymentStatus::Released => "released",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Failed => "failed",
        }
    }

    /// Authoritative edge table for payments. `Escrow -> ProcessingRelease`
    /// is the at-most-once release gate: it is taken with a conditional
    /// UPDATE, so of two racing release attempts exactly one succeeds.
    /// `Failed -> Pending` lets a client retry checkout after a gateway
    /// failure with a fresh reference.
    pub fn can_transition_to(&self, to: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, to),
            (Pending, Escrow)
                | (Pending, Failed)
                | (Pending, Refunded)
                | (Failed, Pending)
                | (Escrow, ProcessingRelease)
                | (Escrow, Refunded)
                | (ProcessingRelease, Released)
        )
    }

    /// Refunds reverse the gateway capture and are only possible before
    /// release processing has started.
    pub fn is_refundable(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Escrow)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: BigDecimal,
    pub escrow_amount: BigDecimal,
    pub platform_fee: BigDecimal,
    pub currency: String,
    pub paystack_ref: String,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payout_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl PayoutStatus {
    pub fn to_str(&self) -> &str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Processing => "processing",
            PayoutStatus::Completed => "completed",
            PayoutStatus::Failed => "failed",
        }
    }

    /// `Failed -> Pending` is the retry edge; the transfer reference is
    /// reused so the gateway deduplicates repeated dispatches.
    pub fn can_transition_to(&self, to: PayoutStatus) -> bool {
        use PayoutStatus::*;
        matches!(
            (self, to),
            (Pending, Processing) | (Processing, Completed) | (Processing, Failed) | (Failed, Pending)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payout {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub provider_id: Uuid,
    pub amount: BigDecimal,
    pub reference: String,
    pub transfer_code: Option<String>,
    pub status: PayoutStatus,
    pub attempts: i32,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escrow_lifecycle_edges() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(Escrow));
        assert!(Escrow.can_transition_to(ProcessingRelease));
        assert!(ProcessingRelease.can_transition_to(Released));
    }

    #[test]
    fn release_cannot_be_entered_twice() {
        use PaymentStatus::*;
        assert!(!ProcessingRelease.can_transition_to(ProcessingRelease));
        assert!(!Released.can_transition_to(ProcessingRelease));
        assert!(!Released.can_transition_to(Escrow));
    }

    #[test]
    fn refund_only_before_release() {
        use PaymentStatus::*;
        assert!(Pending.is_refundable());
        assert!(Escrow.is_refundable());
        assert!(!ProcessingRelease.is_refundable());
        assert!(!Released.is_refundable());
        assert!(Escrow.can_transition_to(Refunded));
        assert!(!ProcessingRelease.can_transition_to(Refunded));
    }

    #[test]
    fn failed_charge_is_retryable() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Pending));
        assert!(!Failed.can_transition_to(Escrow));
    }

    #[test]
    fn payout_retry_edge() {
        use PayoutStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Pending));
        assert!(!Failed.can_transition_to(Processing));
        assert!(!Completed.can_transition_to(Pending));
    }
}
