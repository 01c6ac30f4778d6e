use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    PendingExecution,
    InProgress,
    AwaitingConfirmation,
    Completed,
    Cancelled,
    Disputed,
}

impl BookingStatus {
    pub fn to_str(&self) -> &str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::PendingExecution => "pending_execution",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::AwaitingConfirmation => "awaiting_confirmation",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Disputed => "disputed",
        }
    }

    /// The single authoritative edge table for bookings. Every status write
    /// goes through a conditional UPDATE guarded by this table; nothing else
    /// may move a booking between states.
    pub fn can_transition_to(&self, to: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, to),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, PendingExecution)
                | (Confirmed, Cancelled)
                | (PendingExecution, InProgress)
                | (InProgress, AwaitingConfirmation)
                | (AwaitingConfirmation, Completed)
                | (AwaitingConfirmation, Disputed)
                | (Disputed, AwaitingConfirmation)
                | (Disputed, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Cancellation is only allowed before execution starts.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub client_id: Uuid,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub scheduled_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub total_amount: BigDecimal,
    pub platform_fee: Option<BigDecimal>,
    pub address: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::BookingStatus::*;
    use super::*;

    const ALL: [BookingStatus; 8] = [
        Pending,
        Confirmed,
        PendingExecution,
        InProgress,
        AwaitingConfirmation,
        Completed,
        Cancelled,
        Disputed,
    ];

    #[test]
    fn happy_path_edges_are_allowed() {
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(PendingExecution));
        assert!(PendingExecution.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(AwaitingConfirmation));
        assert!(AwaitingConfirmation.can_transition_to(Completed));
    }

    #[test]
    fn cancellation_only_before_execution() {
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!PendingExecution.can_transition_to(Cancelled));
        assert!(!InProgress.can_transition_to(Cancelled));
        assert!(!AwaitingConfirmation.can_transition_to(Cancelled));
    }

    #[test]
    fn dispute_edges() {
        assert!(AwaitingConfirmation.can_transition_to(Disputed));
        assert!(Disputed.can_transition_to(AwaitingConfirmation));
        assert!(Disputed.can_transition_to(Cancelled));
        assert!(!InProgress.can_transition_to(Disputed));
        assert!(!Completed.can_transition_to(Disputed));
    }

    #[test]
    fn only_completed_and_cancelled_are_terminal() {
        assert!(Completed.is_terminal());
        assert!(Cancelled.is_terminal());
        for s in [Pending, Confirmed, PendingExecution, InProgress, AwaitingConfirmation, Disputed] {
            assert!(!s.is_terminal());
        }
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        for from in [Completed, Cancelled] {
            for to in ALL {
                assert!(
                    !from.can_transition_to(to),
                    "{} -> {} should be rejected",
                    from.to_str(),
                    to.to_str()
                );
            }
        }
    }

    #[test]
    fn no_state_skipping() {
        assert!(!Pending.can_transition_to(PendingExecution));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Confirmed.can_transition_to(InProgress));
        assert!(!PendingExecution.can_transition_to(AwaitingConfirmation));
        assert!(!InProgress.can_transition_to(Completed));
    }

    #[test]
    fn self_transitions_are_rejected() {
        for s in ALL {
            assert!(!s.can_transition_to(s));
        }
    }
}
