use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "dispute_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Pending,
    Escalated,
    Resolved,
}

impl DisputeStatus {
    pub fn to_str(&self) -> &str {
        match self {
            DisputeStatus::Pending => "pending",
            DisputeStatus::Escalated => "escalated",
            DisputeStatus::Resolved => "resolved",
        }
    }

    /// An open dispute blocks escrow release for its booking.
    pub fn is_open(&self) -> bool {
        matches!(self, DisputeStatus::Pending | DisputeStatus::Escalated)
    }
}

/// How a resolved dispute settles the escrowed funds.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "dispute_outcome", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DisputeOutcome {
    Release,
    Refund,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Dispute {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub raised_by: Uuid,
    pub reason: String,
    pub status: DisputeStatus,
    pub resolved_by: Option<Uuid>,
    pub resolution: Option<String>,
    pub outcome: Option<DisputeOutcome>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_and_escalated_block_release() {
        assert!(DisputeStatus::Pending.is_open());
        assert!(DisputeStatus::Escalated.is_open());
        assert!(!DisputeStatus::Resolved.is_open());
    }
}
