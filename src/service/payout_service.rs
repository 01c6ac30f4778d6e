// service/payout_service.rs
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use crate::{
    config::Config,
    db::{bookingdb::BookingExt, db::DBClient, marketdb::MarketExt, paymentdb::PaymentExt},
    models::{
        bookingmodel::{Booking, BookingStatus},
        paymentmodel::{Payment, PaymentStatus, Payout, PayoutStatus},
    },
    service::{
        error::{ensure_payout_edge, ServiceError},
        notification_service::NotificationService,
        payment_provider::PaymentProviderService,
    },
    utils::references::payout_reference,
};

/// Moves escrowed funds to the provider once release has been approved.
/// Transfers use a payment-derived reference so the gateway deduplicates
/// retries; attempts are bounded and failures stay on the payout row for
/// the retry job and the operator queue.
pub struct PayoutService {
    db_client: Arc<DBClient>,
    provider: Arc<PaymentProviderService>,
    notification_service: Arc<NotificationService>,
    max_attempts: i32,
    retry_backoff: Duration,
}

impl PayoutService {
    pub fn new(
        db_client: Arc<DBClient>,
        provider: Arc<PaymentProviderService>,
        notification_service: Arc<NotificationService>,
        config: &Config,
    ) -> Self {
        Self {
            db_client,
            provider,
            notification_service,
            max_attempts: config.payout_max_attempts,
            retry_backoff: Duration::from_secs(config.payout_retry_backoff_secs),
        }
    }

    /// Invoked by the Escrow Manager after a payment enters
    /// processing-release. Safe to re-invoke: the payout row is unique per
    /// payment and a completed payout only re-runs finalization.
    pub async fn dispatch(&self, payment_id: Uuid) -> Result<Payout, ServiceError> {
        let payment = self
            .db_client
            .get_payment_by_id(payment_id)
            .await?
            .ok_or(ServiceError::PaymentNotFound(payment_id))?;

        if payment.status != PaymentStatus::ProcessingRelease {
            return Err(ServiceError::Precondition(format!(
                "Payment {} is {}, expected processing_release",
                payment.id,
                payment.status.to_str()
            )));
        }

        let booking = self
            .db_client
            .get_booking_by_id(payment.booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(payment.booking_id))?;

        let payout = self
            .db_client
            .create_payout(
                payment.id,
                booking.provider_id,
                payment.escrow_amount.clone(),
                payout_reference(payment.id),
            )
            .await?;

        match payout.status {
            PayoutStatus::Completed => {
                // A previous dispatch already transferred the funds; make
                // sure payment and booking caught up.
                self.finalize(&payment, &booking, &payout).await?;
                return Ok(payout);
            }
            PayoutStatus::Processing => {
                return Err(ServiceError::Precondition(format!(
                    "Payout {} is already being dispatched",
                    payout.id
                )));
            }
            PayoutStatus::Failed => {
                return Err(ServiceError::Precondition(format!(
                    "Payout {} has failed; reset it via retry",
                    payout.id
                )));
            }
            PayoutStatus::Pending => {}
        }

        let payout = self
            .db_client
            .transition_payout(payout.id, PayoutStatus::Pending, PayoutStatus::Processing)
            .await?
            .ok_or_else(|| {
                ServiceError::Precondition("Payout was picked up by another dispatcher".to_string())
            })?;

        let recipient_code = match self.ensure_recipient(&booking).await {
            Ok(code) => code,
            Err(err) => {
                self.mark_failed(&booking, &payout, err.to_string()).await?;
                return Err(err);
            }
        };

        for attempt in 1..=self.max_attempts {
            match self
                .provider
                .initiate_transfer(
                    &recipient_code,
                    &payout.amount,
                    &payout.reference,
                    "Escrow release",
                )
                .await
            {
                Ok(transfer) => {
                    let payout = self
                        .db_client
                        .complete_payout(payout.id, transfer.transfer_code)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::Consistency(format!(
                                "Payout {} left processing during transfer",
                                payout.id
                            ))
                        })?;

                    self.finalize(&payment, &booking, &payout).await?;
                    tracing::info!(
                        payout_id = %payout.id,
                        payment_id = %payment.id,
                        "payout completed after {} attempt(s)",
                        attempt
                    );
                    return Ok(payout);
                }
                Err(err) => {
                    tracing::warn!(
                        payout_id = %payout.id,
                        "transfer attempt {}/{} failed: {}",
                        attempt,
                        self.max_attempts,
                        err
                    );
                    self.db_client
                        .record_payout_attempt(payout.id, err.to_string())
                        .await?;

                    if attempt < self.max_attempts {
                        sleep(self.retry_backoff * attempt as u32).await;
                    }
                }
            }
        }

        self.mark_failed(
            &booking,
            &payout,
            format!("Transfer failed after {} attempts", self.max_attempts),
        )
        .await?;

        Err(ServiceError::ExternalService(format!(
            "Payout {} failed after {} transfer attempts",
            payout.id, self.max_attempts
        )))
    }

    /// Manual or scheduled retry of a failed payout. Re-arms the row and
    /// re-dispatches with the original transfer reference.
    pub async fn retry_failed(&self, payout_id: Uuid) -> Result<Payout, ServiceError> {
        let payout = self
            .db_client
            .get_payout_by_id(payout_id)
            .await?
            .ok_or(ServiceError::PayoutNotFound(payout_id))?;

        ensure_payout_edge(payout.status, PayoutStatus::Pending)?;

        self.db_client
            .transition_payout(payout.id, PayoutStatus::Failed, PayoutStatus::Pending)
            .await?
            .ok_or_else(|| {
                ServiceError::Precondition("Payout is no longer in a failed state".to_string())
            })?;

        self.dispatch(payout.payment_id).await
    }

    /// Resolve the provider's transfer recipient, creating and caching it on
    /// first use.
    async fn ensure_recipient(&self, booking: &Booking) -> Result<String, ServiceError> {
        let profile = self
            .db_client
            .get_provider_profile(booking.provider_id)
            .await?
            .ok_or(ServiceError::ProviderProfileNotFound(booking.provider_id))?;

        if let Some(code) = profile.recipient_code.clone() {
            return Ok(code);
        }

        if !profile.has_payout_account() {
            return Err(ServiceError::Precondition(format!(
                "Provider {} has no registered payout account",
                booking.provider_id
            )));
        }

        let account_number = profile.account_number.as_deref().unwrap_or_default();
        let bank_code = profile.bank_code.as_deref().unwrap_or_default();
        let name = profile
            .account_name
            .as_deref()
            .unwrap_or(&profile.display_name);

        let code = self
            .provider
            .create_transfer_recipient(name, account_number, bank_code)
            .await
            .map_err(|e| ServiceError::ExternalService(e.to_string()))?;

        self.db_client
            .set_provider_recipient_code(booking.provider_id, code.clone())
            .await?;

        Ok(code)
    }

    /// Promote payment and booking after the transfer went through. Each
    /// step is conditional, so a finalization replay changes nothing.
    async fn finalize(
        &self,
        payment: &Payment,
        booking: &Booking,
        payout: &Payout,
    ) -> Result<(), ServiceError> {
        if self
            .db_client
            .transition_payment(
                payment.id,
                PaymentStatus::ProcessingRelease,
                PaymentStatus::Released,
            )
            .await?
            .is_none()
        {
            tracing::debug!(payment_id = %payment.id, "payment already released");
        }

        if self
            .db_client
            .transition_booking(
                booking.id,
                BookingStatus::AwaitingConfirmation,
                BookingStatus::Completed,
            )
            .await?
            .is_none()
        {
            tracing::debug!(booking_id = %booking.id, "booking already completed");
        }

        if let Err(e) = self
            .notification_service
            .notify_payout_completed(booking, payout)
            .await
        {
            tracing::warn!("payout notification failed: {}", e);
        }

        Ok(())
    }

    async fn mark_failed(
        &self,
        booking: &Booking,
        payout: &Payout,
        reason: String,
    ) -> Result<(), ServiceError> {
        self.db_client
            .transition_payout(payout.id, PayoutStatus::Processing, PayoutStatus::Failed)
            .await?;

        // Operator queue: the payment stays in processing_release until a
        // retry succeeds or an operator intervenes.
        tracing::error!(
            payout_id = %payout.id,
            payment_id = %payout.payment_id,
            "payout marked failed: {}",
            reason
        );

        if let Err(e) = self
            .notification_service
            .notify_payout_failed(booking, payout)
            .await
        {
            tracing::warn!("payout failure notification failed: {}", e);
        }

        Ok(())
    }
}
