// db/jobproofdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::jobproofmodel::JobProof;

const PROOF_COLUMNS: &str = r#"
    id, booking_id, provider_id, photo_urls, notes,
    completed_at, client_confirmed, confirmed_at, auto_confirm_at
"#;

#[async_trait]
pub trait JobProofExt {
    /// Insert the proof inside the caller's transaction so it commits
    /// together with the booking's move to awaiting confirmation.
    async fn create_job_proof_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        booking_id: Uuid,
        provider_id: Uuid,
        photo_urls: Vec<String>,
        notes: Option<String>,
        completed_at: DateTime<Utc>,
        auto_confirm_at: DateTime<Utc>,
    ) -> Result<JobProof, Error>;

    async fn get_proof_by_booking_id(&self, booking_id: Uuid) -> Result<Option<JobProof>, Error>;

    /// Write-once confirmation. `None` means the proof was already
    /// confirmed: the racing caller (manual confirm vs sweep) that gets
    /// `None` must not trigger release.
    async fn confirm_proof(&self, booking_id: Uuid) -> Result<Option<JobProof>, Error>;

    /// Proofs whose grace period elapsed without client action and whose
    /// booking has no open dispute.
    async fn get_auto_confirmable_proofs(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<JobProof>, Error>;

    /// Confirmed proofs whose payment never left escrow: release was
    /// interrupted after the confirmation committed. Excludes bookings with
    /// an open dispute.
    async fn get_confirmed_unreleased_proofs(&self) -> Result<Vec<JobProof>, Error>;
}

fn confirmed_unreleased_sql() -> String {
    format!(
        r#"
        SELECT {PROOF_COLUMNS} FROM job_proofs jp
        WHERE jp.client_confirmed = TRUE
          AND EXISTS (
              SELECT 1 FROM payments p
              WHERE p.booking_id = jp.booking_id
                AND p.status = 'escrow'
          )
          AND NOT EXISTS (
              SELECT 1 FROM disputes d
              WHERE d.booking_id = jp.booking_id
                AND d.status IN ('pending', 'escalated')
          )
        ORDER BY jp.confirmed_at ASC
        "#
    )
}

#[async_trait]
impl JobProofExt for DBClient {
    async fn create_job_proof_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        booking_id: Uuid,
        provider_id: Uuid,
        photo_urls: Vec<String>,
        notes: Option<String>,
        completed_at: DateTime<Utc>,
        auto_confirm_at: DateTime<Utc>,
    ) -> Result<JobProof, Error> {
        sqlx::query_as::<_, JobProof>(&format!(
            r#"
            INSERT INTO job_proofs
            (booking_id, provider_id, photo_urls, notes, completed_at, auto_confirm_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PROOF_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(provider_id)
        .bind(photo_urls)
        .bind(notes)
        .bind(completed_at)
        .bind(auto_confirm_at)
        .fetch_one(&mut **tx)
        .await
    }

    async fn get_proof_by_booking_id(&self, booking_id: Uuid) -> Result<Option<JobProof>, Error> {
        sqlx::query_as::<_, JobProof>(&format!(
            r#"SELECT {PROOF_COLUMNS} FROM job_proofs WHERE booking_id = $1"#
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn confirm_proof(&self, booking_id: Uuid) -> Result<Option<JobProof>, Error> {
        sqlx::query_as::<_, JobProof>(&format!(
            r#"
            UPDATE job_proofs
            SET client_confirmed = TRUE, confirmed_at = NOW()
            WHERE booking_id = $1 AND client_confirmed IS NULL
            RETURNING {PROOF_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_auto_confirmable_proofs(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<JobProof>, Error> {
        sqlx::query_as::<_, JobProof>(&format!(
            r#"
            SELECT {PROOF_COLUMNS} FROM job_proofs jp
            WHERE jp.auto_confirm_at <= $1
              AND jp.client_confirmed IS NULL
              AND NOT EXISTS (
                  SELECT 1 FROM disputes d
                  WHERE d.booking_id = jp.booking_id
                    AND d.status IN ('pending', 'escalated')
              )
            ORDER BY jp.auto_confirm_at ASC
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_confirmed_unreleased_proofs(&self) -> Result<Vec<JobProof>, Error> {
        sqlx::query_as::<_, JobProof>(&confirmed_unreleased_sql())
            .fetch_all(&self.pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stuck_release_query_targets_confirmed_escrowed_undisputed_bookings() {
        let sql = confirmed_unreleased_sql();
        assert!(sql.contains("jp.client_confirmed = TRUE"));
        assert!(sql.contains("p.status = 'escrow'"));
        assert!(sql.contains("NOT EXISTS"));
        assert!(sql.contains("d.status IN ('pending', 'escalated')"));
    }
}
