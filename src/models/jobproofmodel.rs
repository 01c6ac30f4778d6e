use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Completion evidence submitted by the provider. Confirmation is a
/// write-once field: the conditional UPDATE that sets `client_confirmed`
/// requires it to still be NULL, which is what makes the manual confirm and
/// the auto-confirm sweep safe to race.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobProof {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub provider_id: Uuid,
    pub photo_urls: Vec<String>,
    pub notes: Option<String>,
    pub completed_at: DateTime<Utc>,
    pub client_confirmed: Option<bool>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub auto_confirm_at: DateTime<Utc>,
}

impl JobProof {
    pub fn is_confirmed(&self) -> bool {
        self.client_confirmed == Some(true)
    }

    /// Eligible for the sweep: grace period elapsed and the client never
    /// acted.
    pub fn auto_confirm_due(&self, now: DateTime<Utc>) -> bool {
        !self.is_confirmed() && self.client_confirmed.is_none() && self.auto_confirm_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn proof(completed_at: DateTime<Utc>, grace_hours: i64) -> JobProof {
        JobProof {
            id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            photo_urls: vec!["https://cdn.example.com/p1.jpg".to_string()],
            notes: None,
            completed_at,
            client_confirmed: None,
            confirmed_at: None,
            auto_confirm_at: completed_at + Duration::hours(grace_hours),
        }
    }

    #[test]
    fn not_due_inside_grace_period() {
        let t0 = Utc::now();
        let p = proof(t0, 72);
        assert!(!p.auto_confirm_due(t0 + Duration::hours(1)));
        assert!(!p.auto_confirm_due(t0 + Duration::hours(71)));
    }

    #[test]
    fn due_once_grace_period_elapses() {
        let t0 = Utc::now();
        let p = proof(t0, 72);
        assert!(p.auto_confirm_due(t0 + Duration::hours(72)));
        assert!(p.auto_confirm_due(t0 + Duration::hours(73)));
    }

    #[test]
    fn confirmed_proof_is_never_due() {
        let t0 = Utc::now();
        let mut p = proof(t0, 72);
        p.client_confirmed = Some(true);
        p.confirmed_at = Some(t0 + Duration::hours(1));
        assert!(!p.auto_confirm_due(t0 + Duration::hours(100)));
    }

    #[test]
    fn auto_confirm_never_precedes_completion() {
        let t0 = Utc::now();
        let p = proof(t0, 72);
        assert!(p.auto_confirm_at >= p.completed_at);
    }
}
