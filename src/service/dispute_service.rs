// service/dispute_service.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{
        bookingdb::BookingExt, db::DBClient, disputedb::DisputeExt, jobproofdb::JobProofExt,
        paymentdb::PaymentExt,
    },
    dtos::disputedtos::{RaiseDisputeDto, ResolveDisputeDto},
    models::{
        bookingmodel::BookingStatus,
        disputemodel::{Dispute, DisputeOutcome},
    },
    service::{
        error::{ensure_booking_edge, ServiceError},
        escrow_service::EscrowService,
        notification_service::NotificationService,
    },
};

/// Freezes a booking's funds while the parties disagree. At most one open
/// dispute per booking; while it is open neither manual confirmation nor the
/// sweep can release escrow.
pub struct DisputeService {
    db_client: Arc<DBClient>,
    escrow_service: Arc<EscrowService>,
    notification_service: Arc<NotificationService>,
}

impl DisputeService {
    pub fn new(
        db_client: Arc<DBClient>,
        escrow_service: Arc<EscrowService>,
        notification_service: Arc<NotificationService>,
    ) -> Self {
        Self {
            db_client,
            escrow_service,
            notification_service,
        }
    }

    /// Either party contests the job while it awaits confirmation. The
    /// booking's move to disputed is conditional, so a dispute cannot land
    /// after release has been claimed.
    pub async fn raise_dispute(
        &self,
        booking_id: Uuid,
        raised_by: Uuid,
        dto: RaiseDisputeDto,
    ) -> Result<Dispute, ServiceError> {
        let booking = self
            .db_client
            .get_booking_by_id(booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(booking_id))?;

        if raised_by != booking.client_id && raised_by != booking.provider_id {
            return Err(ServiceError::Unauthorized(raised_by, booking.id));
        }

        if let Some(open) = self
            .db_client
            .get_open_dispute_for_booking(booking.id)
            .await?
        {
            return Err(ServiceError::Precondition(format!(
                "Booking {} already has open dispute {}",
                booking.id, open.id
            )));
        }

        ensure_booking_edge(booking.status, BookingStatus::Disputed)?;

        self.db_client
            .transition_booking(
                booking.id,
                BookingStatus::AwaitingConfirmation,
                BookingStatus::Disputed,
            )
            .await?
            .ok_or_else(|| {
                ServiceError::Precondition(format!(
                    "Booking {} changed while raising the dispute; re-fetch and retry",
                    booking.id
                ))
            })?;

        let dispute = self
            .db_client
            .create_dispute(booking.id, raised_by, dto.reason)
            .await?;

        if let Err(e) = self
            .notification_service
            .notify_dispute_raised(&booking, &dispute)
            .await
        {
            tracing::warn!("dispute notification failed: {}", e);
        }

        Ok(dispute)
    }

    /// Bump a pending dispute to a human review queue.
    pub async fn escalate_dispute(&self, dispute_id: Uuid) -> Result<Dispute, ServiceError> {
        if self
            .db_client
            .get_dispute_by_id(dispute_id)
            .await?
            .is_none()
        {
            return Err(ServiceError::DisputeNotFound(dispute_id));
        }

        self.db_client
            .escalate_dispute(dispute_id)
            .await?
            .ok_or_else(|| {
                ServiceError::Precondition("Only a pending dispute can be escalated".to_string())
            })
    }

    /// Operator settles the dispute. The dispute row is closed first so the
    /// release guard no longer sees it, then the funds follow the outcome:
    /// release pays the provider, refund returns the money and cancels the
    /// booking.
    pub async fn resolve_dispute(
        &self,
        dispute_id: Uuid,
        resolved_by: Uuid,
        dto: ResolveDisputeDto,
    ) -> Result<Dispute, ServiceError> {
        let dispute = self
            .db_client
            .get_dispute_by_id(dispute_id)
            .await?
            .ok_or(ServiceError::DisputeNotFound(dispute_id))?;

        if !dispute.status.is_open() {
            return Err(ServiceError::Precondition(format!(
                "Dispute {} is already resolved",
                dispute.id
            )));
        }

        let booking = self
            .db_client
            .get_booking_by_id(dispute.booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(dispute.booking_id))?;

        let resolved = self
            .db_client
            .resolve_dispute(dispute.id, resolved_by, dto.resolution, dto.outcome)
            .await?
            .ok_or_else(|| {
                ServiceError::Precondition(format!(
                    "Dispute {} was resolved concurrently",
                    dispute.id
                ))
            })?;

        match dto.outcome {
            DisputeOutcome::Release => {
                let payment = self
                    .db_client
                    .get_payment_by_booking_id(booking.id)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::Consistency(format!(
                            "Disputed booking {} has no payment to release",
                            booking.id
                        ))
                    })?;

                // Back to awaiting confirmation so the release guard accepts
                // the booking, then confirm in the client's stead.
                self.db_client
                    .transition_booking(
                        booking.id,
                        BookingStatus::Disputed,
                        BookingStatus::AwaitingConfirmation,
                    )
                    .await?
                    .ok_or_else(|| {
                        ServiceError::Precondition(format!(
                            "Booking {} is no longer disputed",
                            booking.id
                        ))
                    })?;

                let _ = self.db_client.confirm_proof(booking.id).await?;
                self.escrow_service.initiate_release(payment.id).await?;
            }
            DisputeOutcome::Refund => {
                match self.db_client.get_payment_by_booking_id(booking.id).await? {
                    Some(payment) => {
                        // Refund also cancels the disputed booking.
                        self.escrow_service.refund(payment.id).await?;
                    }
                    None => {
                        self.db_client
                            .transition_booking(
                                booking.id,
                                BookingStatus::Disputed,
                                BookingStatus::Cancelled,
                            )
                            .await?;
                    }
                }
            }
        }

        if let Err(e) = self
            .notification_service
            .notify_dispute_resolved(&booking, &resolved)
            .await
        {
            tracing::warn!("dispute resolution notification failed: {}", e);
        }

        Ok(resolved)
    }

    pub async fn get_dispute(&self, dispute_id: Uuid) -> Result<Dispute, ServiceError> {
        self.db_client
            .get_dispute_by_id(dispute_id)
            .await?
            .ok_or(ServiceError::DisputeNotFound(dispute_id))
    }
}
