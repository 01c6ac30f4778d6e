// service/proof_service.rs
use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    config::Config,
    db::{bookingdb::BookingExt, db::DBClient, jobproofdb::JobProofExt, paymentdb::PaymentExt},
    dtos::bookingdtos::SubmitProofDto,
    models::{
        bookingmodel::{Booking, BookingStatus},
        jobproofmodel::JobProof,
        paymentmodel::PaymentStatus,
    },
    service::{
        error::{ensure_booking_edge, ServiceError},
        escrow_service::EscrowService,
        notification_service::NotificationService,
    },
};

/// Gate between "provider says done" and "money moves". Confirmation is
/// write-once: whichever path confirms first (client, sweep, or dispute
/// resolution) triggers release, every other path becomes a no-op.
pub struct ProofService {
    db_client: Arc<DBClient>,
    escrow_service: Arc<EscrowService>,
    notification_service: Arc<NotificationService>,
    grace_period: Duration,
}

impl ProofService {
    pub fn new(
        db_client: Arc<DBClient>,
        escrow_service: Arc<EscrowService>,
        notification_service: Arc<NotificationService>,
        config: &Config,
    ) -> Self {
        Self {
            db_client,
            escrow_service,
            notification_service,
            grace_period: Duration::hours(config.auto_confirm_grace_hours),
        }
    }

    /// Provider submits completion evidence. The proof row and the booking's
    /// move to awaiting-confirmation commit in one transaction; the
    /// auto-confirm clock starts now.
    pub async fn submit_proof(
        &self,
        booking_id: Uuid,
        provider_id: Uuid,
        dto: SubmitProofDto,
    ) -> Result<(JobProof, Booking), ServiceError> {
        let booking = self
            .db_client
            .get_booking_by_id(booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(booking_id))?;

        if booking.provider_id != provider_id {
            return Err(ServiceError::Unauthorized(provider_id, booking.id));
        }

        ensure_booking_edge(booking.status, BookingStatus::AwaitingConfirmation)?;

        if self
            .db_client
            .get_proof_by_booking_id(booking.id)
            .await?
            .is_some()
        {
            return Err(ServiceError::Precondition(format!(
                "Booking {} already has a completion proof",
                booking.id
            )));
        }

        let completed_at = Utc::now();
        let auto_confirm_at = completed_at + self.grace_period;

        let mut tx = self.db_client.pool.begin().await?;

        let proof = self
            .db_client
            .create_job_proof_tx(
                &mut tx,
                booking.id,
                provider_id,
                dto.photo_urls,
                dto.notes,
                completed_at,
                auto_confirm_at,
            )
            .await?;

        let booking = self
            .db_client
            .transition_booking_tx(
                &mut tx,
                booking.id,
                BookingStatus::InProgress,
                BookingStatus::AwaitingConfirmation,
            )
            .await?
            .ok_or_else(|| {
                // Dropping the transaction rolls the proof insert back.
                ServiceError::Precondition(format!(
                    "Booking {} left in_progress while submitting proof",
                    booking_id
                ))
            })?;

        tx.commit().await?;

        if let Err(e) = self
            .notification_service
            .notify_proof_submitted(&booking)
            .await
        {
            tracing::warn!("proof notification failed: {}", e);
        }

        Ok((proof, booking))
    }

    /// Client signs off on the work. First confirmation wins and triggers
    /// release; a repeat call returns the proof unchanged without touching
    /// the payment.
    pub async fn confirm_by_client(
        &self,
        booking_id: Uuid,
        client_id: Uuid,
    ) -> Result<JobProof, ServiceError> {
        let booking = self
            .db_client
            .get_booking_by_id(booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(booking_id))?;

        if booking.client_id != client_id {
            return Err(ServiceError::Unauthorized(client_id, booking.id));
        }

        let proof = self
            .db_client
            .get_proof_by_booking_id(booking.id)
            .await?
            .ok_or(ServiceError::ProofNotFound(booking.id))?;

        if booking.status != BookingStatus::AwaitingConfirmation {
            if proof.is_confirmed() {
                // Sweep or a previous call got here first.
                return Ok(proof);
            }
            return Err(ServiceError::Precondition(format!(
                "Booking {} is {}, confirmation requires awaiting_confirmation",
                booking.id,
                booking.status.to_str()
            )));
        }

        match self.db_client.confirm_proof(booking.id).await? {
            Some(confirmed) => {
                self.release_for_booking(booking.id).await?;
                Ok(confirmed)
            }
            None => {
                // Already confirmed. If the earlier confirmation's release
                // never went through, this retry picks it up; the claim is
                // at-most-once so a completed release is untouched.
                self.recover_unreleased(booking.id).await?;
                Ok(proof)
            }
        }
    }

    /// One pass of the auto-confirmation sweep: confirm every proof whose
    /// grace period elapsed without a client decision or an open dispute,
    /// then release its escrow. Returns how many bookings were released.
    pub async fn auto_confirm_sweep(&self) -> Result<u64, ServiceError> {
        let now = Utc::now();
        let due = self.db_client.get_auto_confirmable_proofs(now).await?;

        let mut released = 0u64;
        for proof in due {
            if !proof.auto_confirm_due(now) {
                continue;
            }
            match self.auto_confirm_one(&proof).await {
                Ok(true) => released += 1,
                Ok(false) => {}
                Err(e) => {
                    // Keep sweeping; this proof stays due and is retried on
                    // the next pass.
                    tracing::error!(
                        booking_id = %proof.booking_id,
                        "auto-confirmation failed: {}",
                        e
                    );
                }
            }
        }

        // Confirmations whose release was interrupted (crash, transient
        // failure, or a dispute that has since been resolved) leave the
        // payment in escrow; re-drive those too.
        let stuck = self.db_client.get_confirmed_unreleased_proofs().await?;
        for proof in stuck {
            if let Err(e) = self.recover_unreleased(proof.booking_id).await {
                tracing::error!(
                    booking_id = %proof.booking_id,
                    "release recovery failed: {}",
                    e
                );
            }
        }

        Ok(released)
    }

    async fn auto_confirm_one(&self, proof: &JobProof) -> Result<bool, ServiceError> {
        if self
            .db_client
            .confirm_proof(proof.booking_id)
            .await?
            .is_none()
        {
            // The client beat the sweep to it.
            return Ok(false);
        }

        tracing::info!(
            booking_id = %proof.booking_id,
            "grace period elapsed, confirming on the client's behalf"
        );

        self.release_for_booking(proof.booking_id).await?;
        Ok(true)
    }

    /// Re-attempt release for a booking whose proof is confirmed but whose
    /// payment is still in escrow. A blocked release (open dispute, state
    /// raced away) is left for a later pass rather than surfaced.
    async fn recover_unreleased(&self, booking_id: Uuid) -> Result<(), ServiceError> {
        let payment = match self.db_client.get_payment_by_booking_id(booking_id).await? {
            Some(payment) if payment.status == PaymentStatus::Escrow => payment,
            _ => return Ok(()),
        };

        match self.escrow_service.initiate_release(payment.id).await {
            Ok(_) => {
                tracing::info!(booking_id = %booking_id, "recovered an interrupted release");
                Ok(())
            }
            Err(ServiceError::Precondition(msg)) => {
                tracing::debug!(booking_id = %booking_id, "release not recoverable yet: {}", msg);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn release_for_booking(&self, booking_id: Uuid) -> Result<(), ServiceError> {
        let payment = self
            .db_client
            .get_payment_by_booking_id(booking_id)
            .await?
            .ok_or_else(|| {
                ServiceError::Consistency(format!(
                    "Booking {} was confirmed but has no payment",
                    booking_id
                ))
            })?;

        self.escrow_service.initiate_release(payment.id).await?;
        Ok(())
    }
}
