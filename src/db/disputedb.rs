// db/disputedb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::disputemodel::{Dispute, DisputeOutcome, DisputeStatus};

const DISPUTE_COLUMNS: &str = r#"
    id, booking_id, raised_by, reason, status,
    resolved_by, resolution, outcome, created_at, resolved_at
"#;

#[async_trait]
pub trait DisputeExt {
    async fn create_dispute(
        &self,
        booking_id: Uuid,
        raised_by: Uuid,
        reason: String,
    ) -> Result<Dispute, Error>;

    async fn get_dispute_by_id(&self, dispute_id: Uuid) -> Result<Option<Dispute>, Error>;

    /// The open (pending/escalated) dispute for a booking, if any. Checked
    /// before every release.
    async fn get_open_dispute_for_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<Dispute>, Error>;

    async fn escalate_dispute(&self, dispute_id: Uuid) -> Result<Option<Dispute>, Error>;

    /// Terminal resolution; conditional on the dispute still being open.
    async fn resolve_dispute(
        &self,
        dispute_id: Uuid,
        resolved_by: Uuid,
        resolution: String,
        outcome: DisputeOutcome,
    ) -> Result<Option<Dispute>, Error>;
}

#[async_trait]
impl DisputeExt for DBClient {
    async fn create_dispute(
        &self,
        booking_id: Uuid,
        raised_by: Uuid,
        reason: String,
    ) -> Result<Dispute, Error> {
        sqlx::query_as::<_, Dispute>(&format!(
            r#"
            INSERT INTO disputes (booking_id, raised_by, reason, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {DISPUTE_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(raised_by)
        .bind(reason)
        .bind(DisputeStatus::Pending)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_dispute_by_id(&self, dispute_id: Uuid) -> Result<Option<Dispute>, Error> {
        sqlx::query_as::<_, Dispute>(&format!(
            r#"SELECT {DISPUTE_COLUMNS} FROM disputes WHERE id = $1"#
        ))
        .bind(dispute_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_open_dispute_for_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<Dispute>, Error> {
        sqlx::query_as::<_, Dispute>(&format!(
            r#"
            SELECT {DISPUTE_COLUMNS} FROM disputes
            WHERE booking_id = $1 AND status IN ('pending', 'escalated')
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn escalate_dispute(&self, dispute_id: Uuid) -> Result<Option<Dispute>, Error> {
        sqlx::query_as::<_, Dispute>(&format!(
            r#"
            UPDATE disputes
            SET status = $2
            WHERE id = $1 AND status = $3
            RETURNING {DISPUTE_COLUMNS}
            "#
        ))
        .bind(dispute_id)
        .bind(DisputeStatus::Escalated)
        .bind(DisputeStatus::Pending)
        .fetch_optional(&self.pool)
        .await
    }

    async fn resolve_dispute(
        &self,
        dispute_id: Uuid,
        resolved_by: Uuid,
        resolution: String,
        outcome: DisputeOutcome,
    ) -> Result<Option<Dispute>, Error> {
        sqlx::query_as::<_, Dispute>(&format!(
            r#"
            UPDATE disputes
            SET status = $5, resolved_by = $2, resolution = $3, outcome = $4, resolved_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'escalated')
            RETURNING {DISPUTE_COLUMNS}
            "#
        ))
        .bind(dispute_id)
        .bind(resolved_by)
        .bind(resolution)
        .bind(outcome)
        .bind(DisputeStatus::Resolved)
        .fetch_optional(&self.pool)
        .await
    }
}
