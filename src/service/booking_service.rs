// service/booking_service.rs
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::{bookingdb::BookingExt, db::DBClient, marketdb::MarketExt, paymentdb::PaymentExt},
    dtos::bookingdtos::CreateBookingDto,
    models::bookingmodel::{Booking, BookingStatus},
    service::{
        error::{ensure_booking_edge, ServiceError},
        escrow_service::EscrowService,
        notification_service::NotificationService,
    },
};

/// Owns the booking lifecycle from request to terminal state. Every status
/// move goes through the central transition table and a conditional update,
/// so two writers racing on the same booking cannot both win.
pub struct BookingService {
    db_client: Arc<DBClient>,
    escrow_service: Arc<EscrowService>,
    notification_service: Arc<NotificationService>,
}

impl BookingService {
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

    /// A client requests a slot on an active listing. Price and provider come
    /// from the listing, never from the caller.
    pub async fn create_booking(&self, dto: CreateBookingDto) -> Result<Booking, ServiceError> {
        if dto.scheduled_date <= Utc::now() {
            return Err(ServiceError::Validation(
                "Scheduled date must be in the future".to_string(),
            ));
        }

        let listing = self
            .db_client
            .get_service_listing(dto.service_id)
            .await?
            .ok_or(ServiceError::ServiceListingNotFound(dto.service_id))?;

        if !listing.is_active {
            return Err(ServiceError::Validation(format!(
                "Service listing {} is no longer active",
                listing.id
            )));
        }

        let profile = self
            .db_client
            .get_provider_profile(listing.provider_id)
            .await?
            .ok_or(ServiceError::ProviderProfileNotFound(listing.provider_id))?;

        if !profile.is_available {
            return Err(ServiceError::Validation(format!(
                "Provider {} is not taking bookings right now",
                listing.provider_id
            )));
        }

        if dto.client_id == listing.provider_id {
            return Err(ServiceError::Validation(
                "Providers cannot book their own listings".to_string(),
            ));
        }

        let duration = dto.duration_minutes.unwrap_or(listing.duration_minutes);

        let booking = self
            .db_client
            .create_booking(
                dto.client_id,
                listing.provider_id,
                listing.id,
                dto.scheduled_date,
                duration,
                listing.base_price.clone(),
                dto.address,
            )
            .await?;

        if let Err(e) = self
            .notification_service
            .notify_booking_requested(&booking)
            .await
        {
            tracing::warn!("booking request notification failed: {}", e);
        }

        Ok(booking)
    }

    /// Provider accepts the request, opening the payment window.
    pub async fn accept_booking(
        &self,
        booking_id: Uuid,
        provider_id: Uuid,
    ) -> Result<Booking, ServiceError> {
        let booking = self.get_booking(booking_id).await?;

        if booking.provider_id != provider_id {
            return Err(ServiceError::Unauthorized(provider_id, booking.id));
        }

        ensure_booking_edge(booking.status, BookingStatus::Confirmed)?;

        let booking = self
            .db_client
            .transition_booking(booking.id, BookingStatus::Pending, BookingStatus::Confirmed)
            .await?
            .ok_or_else(|| {
                ServiceError::Precondition(format!(
                    "Booking {} changed while accepting; re-fetch and retry",
                    booking_id
                ))
            })?;

        if let Err(e) = self
            .notification_service
            .notify_booking_accepted(&booking)
            .await
        {
            tracing::warn!("booking accepted notification failed: {}", e);
        }

        Ok(booking)
    }

    /// Provider starts work on a paid booking.
    pub async fn start_job(
        &self,
        booking_id: Uuid,
        provider_id: Uuid,
    ) -> Result<Booking, ServiceError> {
        let booking = self.get_booking(booking_id).await?;

        if booking.provider_id != provider_id {
            return Err(ServiceError::Unauthorized(provider_id, booking.id));
        }

        ensure_booking_edge(booking.status, BookingStatus::InProgress)?;

        let booking = self
            .db_client
            .transition_booking(
                booking.id,
                BookingStatus::PendingExecution,
                BookingStatus::InProgress,
            )
            .await?
            .ok_or_else(|| {
                ServiceError::Precondition(format!(
                    "Booking {} changed while starting; re-fetch and retry",
                    booking_id
                ))
            })?;

        if let Err(e) = self.notification_service.notify_job_started(&booking).await {
            tracing::warn!("job started notification failed: {}", e);
        }

        Ok(booking)
    }

    /// Either party backs out before the job starts. If funds were captured
    /// the refund path also cancels the booking; otherwise we cancel it here.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        requested_by: Uuid,
    ) -> Result<Booking, ServiceError> {
        let booking = self.get_booking(booking_id).await?;

        if requested_by != booking.client_id && requested_by != booking.provider_id {
            return Err(ServiceError::Unauthorized(requested_by, booking.id));
        }

        if !booking.status.is_cancellable() {
            return Err(ServiceError::InvalidTransition {
                entity: "Booking",
                from: booking.status.to_str().to_string(),
                to: BookingStatus::Cancelled.to_str().to_string(),
            });
        }

        let payment = self.db_client.get_payment_by_booking_id(booking.id).await?;

        let booking = match payment {
            Some(payment) if payment.status.is_refundable() => {
                self.escrow_service.refund(payment.id).await?;
                self.get_booking(booking_id).await?
            }
            _ => self
                .db_client
                .transition_booking(booking.id, booking.status, BookingStatus::Cancelled)
                .await?
                .ok_or_else(|| {
                    ServiceError::Precondition(format!(
                        "Booking {} changed while cancelling; re-fetch and retry",
                        booking_id
                    ))
                })?,
        };

        if let Err(e) = self
            .notification_service
            .notify_booking_cancelled(&booking, requested_by)
            .await
        {
            tracing::warn!("cancellation notification failed: {}", e);
        }

        Ok(booking)
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, ServiceError> {
        self.db_client
            .get_booking_by_id(booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(booking_id))
    }

    pub async fn list_for_client(&self, client_id: Uuid) -> Result<Vec<Booking>, ServiceError> {
        Ok(self.db_client.get_bookings_for_client(client_id).await?)
    }

    pub async fn list_for_provider(&self, provider_id: Uuid) -> Result<Vec<Booking>, ServiceError> {
        Ok(self.db_client.get_bookings_for_provider(provider_id).await?)
    }
}
