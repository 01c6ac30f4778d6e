// service/escrow_service.rs
use std::sync::Arc;

use bigdecimal::{BigDecimal, RoundingMode};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    config::Config,
    db::{bookingdb::BookingExt, db::DBClient, disputedb::DisputeExt, paymentdb::PaymentExt},
    models::{
        bookingmodel::BookingStatus,
        paymentmodel::{Payment, PaymentStatus},
    },
    service::{
        error::{ensure_payment_edge, ServiceError},
        notification_service::NotificationService,
        payment_provider::PaymentProviderService,
        payout_service::PayoutService,
    },
    utils::{
        fees::{split_platform_fee, to_minor_units},
        references::charge_reference,
    },
};

#[derive(Debug, Serialize)]
pub struct CheckoutSession {
    pub payment: Payment,
    pub authorization_url: String,
    pub access_code: String,
}

/// What a gateway success report means for a payment in a given state.
#[derive(Debug, PartialEq, Eq)]
enum SettlementAction {
    /// At or past escrow: the redelivered event changes nothing.
    AlreadySettled,
    /// Awaiting capture: verify and move into escrow.
    Settle,
    /// Refunded or failed locally: a capture at the gateway is a late one
    /// and must be reversed there.
    Compensate,
}

fn settlement_action(status: PaymentStatus) -> SettlementAction {
    match status {
        PaymentStatus::Escrow | PaymentStatus::ProcessingRelease | PaymentStatus::Released => {
            SettlementAction::AlreadySettled
        }
        PaymentStatus::Pending => SettlementAction::Settle,
        PaymentStatus::Refunded | PaymentStatus::Failed => SettlementAction::Compensate,
    }
}

/// Holds client funds between capture and release. One payment per booking;
/// the gateway reference is the idempotency key for charge confirmation and
/// the `Escrow -> ProcessingRelease` conditional update is the single
/// at-most-once gate in front of the payout dispatcher.
pub struct EscrowService {
    db_client: Arc<DBClient>,
    provider: Arc<PaymentProviderService>,
    payout_service: Arc<PayoutService>,
    notification_service: Arc<NotificationService>,
    fee_percent: BigDecimal,
    currency: String,
}

impl EscrowService {
    pub fn new(
        db_client: Arc<DBClient>,
        provider: Arc<PaymentProviderService>,
        payout_service: Arc<PayoutService>,
        notification_service: Arc<NotificationService>,
        config: &Config,
    ) -> Self {
        // Config::init has already rejected out-of-range percentages.
        let fee_percent = BigDecimal::try_from(config.platform_fee_percent)
            .unwrap_or_else(|_| BigDecimal::from(0))
            .with_scale_round(4, RoundingMode::HalfUp);

        Self {
            db_client,
            provider,
            payout_service,
            notification_service,
            fee_percent,
            currency: config.currency.clone(),
        }
    }

    /// Create (or re-arm) the booking's payment and open a gateway checkout
    /// session. Re-invoking for a pending payment reuses its reference, so a
    /// client that lost the first authorization URL gets the same charge.
    pub async fn initiate_charge(
        &self,
        booking_id: Uuid,
        client_id: Uuid,
        email: String,
    ) -> Result<CheckoutSession, ServiceError> {
        let booking = self
            .db_client
            .get_booking_by_id(booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(booking_id))?;

        if booking.client_id != client_id {
            return Err(ServiceError::Unauthorized(client_id, booking.id));
        }

        if booking.status.is_terminal() {
            return Err(ServiceError::Precondition(format!(
                "Booking {} is {}; no further payment is possible",
                booking.id,
                booking.status.to_str()
            )));
        }

        if let Some(existing) = self.db_client.get_payment_by_booking_id(booking.id).await? {
            return match existing.status {
                PaymentStatus::Pending => {
                    self.open_checkout(existing, email, booking.id).await
                }
                PaymentStatus::Failed => {
                    let payment = self
                        .db_client
                        .reset_failed_payment(existing.id, charge_reference())
                        .await?
                        .ok_or_else(|| {
                            ServiceError::Precondition(
                                "Payment state changed; re-fetch and retry".to_string(),
                            )
                        })?;
                    self.open_checkout(payment, email, booking.id).await
                }
                _ => Err(ServiceError::Precondition(format!(
                    "Booking {} already has a {} payment",
                    booking.id,
                    existing.status.to_str()
                ))),
            };
        }

        if booking.status != BookingStatus::Confirmed {
            return Err(ServiceError::Precondition(format!(
                "Booking {} must be accepted by the provider before payment, currently {}",
                booking.id,
                booking.status.to_str()
            )));
        }

        let amount = booking.total_amount.with_scale_round(2, RoundingMode::HalfUp);
        let fees = split_platform_fee(&amount, &self.fee_percent)
            .map_err(ServiceError::Validation)?;

        if &fees.platform_fee + &fees.escrow_amount != amount {
            return Err(ServiceError::Consistency(format!(
                "Fee split does not sum to the charge amount for booking {}",
                booking.id
            )));
        }

        let payment = self
            .db_client
            .create_payment(
                booking.id,
                amount,
                fees.escrow_amount,
                fees.platform_fee.clone(),
                self.currency.clone(),
                charge_reference(),
            )
            .await?;

        self.db_client
            .set_booking_platform_fee(booking.id, fees.platform_fee)
            .await?;

        self.open_checkout(payment, email, booking.id).await
    }

    async fn open_checkout(
        &self,
        payment: Payment,
        email: String,
        booking_id: Uuid,
    ) -> Result<CheckoutSession, ServiceError> {
        let metadata = serde_json::json!({ "booking_id": booking_id });

        match self
            .provider
            .initialize_payment(
                email,
                &payment.amount,
                payment.paystack_ref.clone(),
                Some(metadata),
            )
            .await
        {
            Ok(init) => Ok(CheckoutSession {
                payment,
                authorization_url: init.authorization_url,
                access_code: init.access_code,
            }),
            Err(err) => {
                self.db_client
                    .transition_payment(payment.id, PaymentStatus::Pending, PaymentStatus::Failed)
                    .await?;
                Err(ServiceError::ExternalService(err.to_string()))
            }
        }
    }

    /// Settle a charge reported by the gateway (webhook or verify endpoint).
    /// Verifies server-side before touching state. Idempotent on the
    /// reference: a redelivered event finds the payment escrowed and returns
    /// it unchanged.
    pub async fn confirm_charge(&self, reference: &str) -> Result<Payment, ServiceError> {
        let payment = self
            .db_client
            .get_payment_by_reference(reference)
            .await?
            .ok_or_else(|| ServiceError::PaymentReferenceNotFound(reference.to_string()))?;

        match settlement_action(payment.status) {
            // Anything at or past escrow means this charge was already
            // settled; a redelivered event changes nothing.
            SettlementAction::AlreadySettled => return Ok(payment),
            // The payment was refunded or written off locally before the
            // gateway reported; any money it captured must go back.
            SettlementAction::Compensate => return self.reverse_late_capture(payment).await,
            SettlementAction::Settle => {}
        }

        let verification = self
            .provider
            .verify_charge(reference)
            .await
            .map_err(|e| ServiceError::ExternalService(e.to_string()))?;

        let expected_minor = to_minor_units(&payment.amount).ok_or_else(|| {
            ServiceError::Consistency(format!(
                "Payment {} amount cannot be expressed in minor units",
                payment.id
            ))
        })?;
        if verification.amount_minor != expected_minor {
            return Err(ServiceError::Consistency(format!(
                "Gateway settled {} minor units for reference {reference}, expected {expected_minor}",
                verification.amount_minor
            )));
        }

        let payment = match self.db_client.confirm_payment_escrow(reference).await? {
            Some(payment) => payment,
            // Lost the race against another delivery of the same event.
            None => {
                return self
                    .db_client
                    .get_payment_by_reference(reference)
                    .await?
                    .ok_or_else(|| ServiceError::PaymentReferenceNotFound(reference.to_string()));
            }
        };

        // Funds are held: the booking moves into the execution phase.
        let booking = self
            .db_client
            .transition_booking(
                payment.booking_id,
                BookingStatus::Confirmed,
                BookingStatus::PendingExecution,
            )
            .await?;

        match booking {
            Some(booking) => {
                if let Err(e) = self.notification_service.notify_payment_escrowed(&booking).await {
                    tracing::warn!("escrow notification failed: {}", e);
                }
            }
            None => {
                tracing::warn!(
                    booking_id = %payment.booking_id,
                    "payment escrowed but booking was not in confirmed state"
                );
            }
        }

        Ok(payment)
    }

    /// A charge reported successful for a payment the ledger already closed
    /// out. If the gateway really captured it, reverse the capture; the
    /// local record stays as it is.
    async fn reverse_late_capture(&self, payment: Payment) -> Result<Payment, ServiceError> {
        match self.provider.verify_charge(&payment.paystack_ref).await {
            Ok(_) => {
                self.provider
                    .refund_charge(&payment.paystack_ref)
                    .await
                    .map_err(|e| ServiceError::ExternalService(e.to_string()))?;

                tracing::warn!(
                    payment_id = %payment.id,
                    "late gateway capture on a {} payment reversed",
                    payment.status.to_str()
                );
                Ok(payment)
            }
            // Nothing was captured; the reported success does not hold up.
            Err(_) => Err(ServiceError::InvalidTransition {
                entity: "Payment",
                from: payment.status.to_str().to_string(),
                to: PaymentStatus::Escrow.to_str().to_string(),
            }),
        }
    }

    /// Move the payment into processing-release and hand it to the payout
    /// dispatcher. The conditional `Escrow -> ProcessingRelease` update makes
    /// release at-most-once even under concurrent confirmation paths.
    pub async fn initiate_release(&self, payment_id: Uuid) -> Result<Payment, ServiceError> {
        let payment = self
            .db_client
            .get_payment_by_id(payment_id)
            .await?
            .ok_or(ServiceError::PaymentNotFound(payment_id))?;

        let booking = self
            .db_client
            .get_booking_by_id(payment.booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(payment.booking_id))?;

        if !matches!(
            booking.status,
            BookingStatus::AwaitingConfirmation | BookingStatus::Completed
        ) {
            return Err(ServiceError::Precondition(format!(
                "Booking {} is {}, release requires a confirmed job",
                booking.id,
                booking.status.to_str()
            )));
        }

        if let Some(dispute) = self
            .db_client
            .get_open_dispute_for_booking(booking.id)
            .await?
        {
            return Err(ServiceError::Precondition(format!(
                "Dispute {} is open on booking {}; release is blocked",
                dispute.id, booking.id
            )));
        }

        ensure_payment_edge(payment.status, PaymentStatus::ProcessingRelease)?;

        // The claim re-checks the open-dispute condition inside the same
        // statement, so a dispute raised after the reads above still blocks
        // it.
        let payment = self
            .db_client
            .claim_payment_release(payment.id)
            .await?
            .ok_or_else(|| {
                ServiceError::Precondition(format!(
                    "Payment {} is no longer releasable; it left escrow or a dispute was opened",
                    payment_id
                ))
            })?;

        // The transfer happens off the request path; failures land on the
        // payout row for the retry job.
        let payout_service = self.payout_service.clone();
        let dispatch_id = payment.id;
        tokio::spawn(async move {
            if let Err(e) = payout_service.dispatch(dispatch_id).await {
                tracing::error!(payment_id = %dispatch_id, "payout dispatch failed: {}", e);
            }
        });

        Ok(payment)
    }

    /// Return escrowed (or merely pending) funds to the client and close the
    /// booking. Once a payment reaches processing-release it can no longer be
    /// refunded.
    pub async fn refund(&self, payment_id: Uuid) -> Result<Payment, ServiceError> {
        let payment = self
            .db_client
            .get_payment_by_id(payment_id)
            .await?
            .ok_or(ServiceError::PaymentNotFound(payment_id))?;

        if !payment.status.is_refundable() {
            return Err(ServiceError::Precondition(format!(
                "Payment {} is {}; refunds are only possible before release starts",
                payment.id,
                payment.status.to_str()
            )));
        }

        let booking = self
            .db_client
            .get_booking_by_id(payment.booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(payment.booking_id))?;

        // Only captured funds exist at the gateway; a pending charge was
        // never taken.
        if payment.status == PaymentStatus::Escrow {
            self.provider
                .refund_charge(&payment.paystack_ref)
                .await
                .map_err(|e| ServiceError::ExternalService(e.to_string()))?;
        }

        let refunded = self
            .db_client
            .transition_payment(payment.id, payment.status, PaymentStatus::Refunded)
            .await?
            .ok_or_else(|| {
                ServiceError::Precondition(format!(
                    "Payment {} changed state during refund; verify with the gateway",
                    payment.id
                ))
            })?;

        if booking.status.can_transition_to(BookingStatus::Cancelled)
            && self
                .db_client
                .transition_booking(booking.id, booking.status, BookingStatus::Cancelled)
                .await?
                .is_none()
        {
            tracing::warn!(booking_id = %booking.id, "booking moved during refund; not cancelled here");
        }

        if let Err(e) = self.notification_service.notify_refund_issued(&booking).await {
            tracing::warn!("refund notification failed: {}", e);
        }

        Ok(refunded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redelivered_event_is_a_no_op_once_escrowed() {
        assert_eq!(
            settlement_action(PaymentStatus::Escrow),
            SettlementAction::AlreadySettled
        );
        assert_eq!(
            settlement_action(PaymentStatus::ProcessingRelease),
            SettlementAction::AlreadySettled
        );
        assert_eq!(
            settlement_action(PaymentStatus::Released),
            SettlementAction::AlreadySettled
        );
    }

    #[test]
    fn pending_payment_settles_into_escrow() {
        assert_eq!(
            settlement_action(PaymentStatus::Pending),
            SettlementAction::Settle
        );
    }

    #[test]
    fn late_capture_on_a_closed_payment_is_compensated() {
        assert_eq!(
            settlement_action(PaymentStatus::Refunded),
            SettlementAction::Compensate
        );
        assert_eq!(
            settlement_action(PaymentStatus::Failed),
            SettlementAction::Compensate
        );
    }
}
