// service/notification_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::db::DBClient,
    models::{bookingmodel::Booking, disputemodel::Dispute, paymentmodel::Payout},
    service::error::ServiceError,
};

/// Fire-and-forget notification sink. Delivery (push/email) is an external
/// collaborator; this service records the notification row and logs.
/// Callers never let a notification failure roll back a state transition.
#[derive(Debug, Clone)]
pub struct NotificationService {
    db_client: Arc<DBClient>,
}

impl NotificationService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub async fn notify_booking_requested(&self, booking: &Booking) -> Result<(), ServiceError> {
        tracing::info!(booking_id = %booking.id, "notify: new booking request for provider {}", booking.provider_id);
        self.store_notification(
            booking.provider_id,
            "booking_requested",
            booking.id,
            format!("New booking request for {}", booking.scheduled_date),
        )
        .await
    }

    pub async fn notify_booking_accepted(&self, booking: &Booking) -> Result<(), ServiceError> {
        self.store_notification(
            booking.client_id,
            "booking_accepted",
            booking.id,
            "Your booking was accepted. You can now pay to confirm the appointment.".to_string(),
        )
        .await
    }

    pub async fn notify_payment_escrowed(&self, booking: &Booking) -> Result<(), ServiceError> {
        self.store_notification(
            booking.provider_id,
            "payment_escrowed",
            booking.id,
            "The client has paid. Funds are held in escrow until the job is confirmed.".to_string(),
        )
        .await
    }

    pub async fn notify_job_started(&self, booking: &Booking) -> Result<(), ServiceError> {
        self.store_notification(
            booking.client_id,
            "job_started",
            booking.id,
            "Your provider has started the job.".to_string(),
        )
        .await
    }

    pub async fn notify_proof_submitted(&self, booking: &Booking) -> Result<(), ServiceError> {
        self.store_notification(
            booking.client_id,
            "proof_submitted",
            booking.id,
            "The provider marked the job as done. Please confirm completion.".to_string(),
        )
        .await
    }

    pub async fn notify_booking_cancelled(&self, booking: &Booking, actor: Uuid) -> Result<(), ServiceError> {
        let other_party = if actor == booking.client_id {
            booking.provider_id
        } else {
            booking.client_id
        };
        self.store_notification(
            other_party,
            "booking_cancelled",
            booking.id,
            "The booking was cancelled.".to_string(),
        )
        .await
    }

    pub async fn notify_refund_issued(&self, booking: &Booking) -> Result<(), ServiceError> {
        self.store_notification(
            booking.client_id,
            "refund_issued",
            booking.id,
            "Your payment has been refunded.".to_string(),
        )
        .await
    }

    pub async fn notify_payout_completed(&self, booking: &Booking, payout: &Payout) -> Result<(), ServiceError> {
        tracing::info!(payout_id = %payout.id, "notify: payout completed for provider {}", payout.provider_id);
        self.store_notification(
            payout.provider_id,
            "payout_completed",
            booking.id,
            format!("Your payout of {} has been sent.", payout.amount),
        )
        .await
    }

    pub async fn notify_payout_failed(&self, booking: &Booking, payout: &Payout) -> Result<(), ServiceError> {
        self.store_notification(
            payout.provider_id,
            "payout_failed",
            booking.id,
            "Your payout could not be completed. It will be retried.".to_string(),
        )
        .await
    }

    pub async fn notify_dispute_raised(&self, booking: &Booking, dispute: &Dispute) -> Result<(), ServiceError> {
        let other_party = if dispute.raised_by == booking.client_id {
            booking.provider_id
        } else {
            booking.client_id
        };
        self.store_notification(
            other_party,
            "dispute_raised",
            booking.id,
            "A dispute has been raised on your booking. Fund release is on hold.".to_string(),
        )
        .await
    }

    pub async fn notify_dispute_resolved(&self, booking: &Booking, dispute: &Dispute) -> Result<(), ServiceError> {
        for user_id in [booking.client_id, booking.provider_id] {
            self.store_notification(
                user_id,
                "dispute_resolved",
                booking.id,
                format!(
                    "The dispute on your booking was resolved: {}",
                    dispute.resolution.as_deref().unwrap_or("resolved")
                ),
            )
            .await?;
        }
        Ok(())
    }

    async fn store_notification(
        &self,
        user_id: Uuid,
        kind: &str,
        booking_id: Uuid,
        message: String,
    ) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, kind, booking_id, message)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(booking_id)
        .bind(message)
        .execute(&self.db_client.pool)
        .await
        .map_err(|e| ServiceError::Notification(e.to_string()))?;

        Ok(())
    }
}
