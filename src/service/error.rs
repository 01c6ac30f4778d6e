use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::HttpError,
    models::{
        bookingmodel::BookingStatus,
        paymentmodel::{PaymentStatus, PayoutStatus},
    },
};

/// Error taxonomy for the escrow core.
///
/// Validation: bad input, caller should not retry.
/// InvalidTransition: operation not valid for the entity's current status;
///   caller must re-fetch state.
/// Precondition: cross-entity guard failed (open dispute, wrong payment
///   state for release, ...).
/// ExternalService: gateway/transfer failure after retries; surfaced and
///   recorded, never committed as a partial write.
/// Consistency: an invariant would be violated; the operation aborts with
///   nothing committed.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Booking {0} not found")]
    BookingNotFound(Uuid),

    #[error("Payment {0} not found")]
    PaymentNotFound(Uuid),

    #[error("No payment found for reference {0}")]
    PaymentReferenceNotFound(String),

    #[error("Payout {0} not found")]
    PayoutNotFound(Uuid),

    #[error("Dispute {0} not found")]
    DisputeNotFound(Uuid),

    #[error("No completion proof recorded for booking {0}")]
    ProofNotFound(Uuid),

    #[error("Service listing {0} not found")]
    ServiceListingNotFound(Uuid),

    #[error("Provider profile not found for user {0}")]
    ProviderProfileNotFound(Uuid),

    #[error("User {0} is not authorized to act on booking {1}")]
    Unauthorized(Uuid, Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity} cannot go from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Consistency violation: {0}")]
    Consistency(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Notification error: {0}")]
    Notification(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::BookingNotFound(_)
            | ServiceError::PaymentNotFound(_)
            | ServiceError::PaymentReferenceNotFound(_)
            | ServiceError::PayoutNotFound(_)
            | ServiceError::DisputeNotFound(_)
            | ServiceError::ProofNotFound(_)
            | ServiceError::ServiceListingNotFound(_)
            | ServiceError::ProviderProfileNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::InvalidTransition { .. } | ServiceError::Precondition(_) => {
                StatusCode::CONFLICT
            }

            ServiceError::Unauthorized(_, _) => StatusCode::UNAUTHORIZED,

            ServiceError::ExternalService(_) => StatusCode::BAD_GATEWAY,

            ServiceError::Consistency(_)
            | ServiceError::Database(_)
            | ServiceError::Notification(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        HttpError::new(error.to_string(), status)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for ServiceError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        ServiceError::ExternalService(err.to_string())
    }
}

/// Guard a booking edge against the central transition table before issuing
/// the conditional UPDATE.
pub fn ensure_booking_edge(from: BookingStatus, to: BookingStatus) -> Result<(), ServiceError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidTransition {
            entity: "Booking",
            from: from.to_str().to_string(),
            to: to.to_str().to_string(),
        })
    }
}

pub fn ensure_payment_edge(from: PaymentStatus, to: PaymentStatus) -> Result<(), ServiceError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidTransition {
            entity: "Payment",
            from: from.to_str().to_string(),
            to: to.to_str().to_string(),
        })
    }
}

pub fn ensure_payout_edge(from: PayoutStatus, to: PayoutStatus) -> Result<(), ServiceError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidTransition {
            entity: "Payout",
            from: from.to_str().to_string(),
            to: to.to_str().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_edges_map_to_conflict() {
        let err = ensure_booking_edge(BookingStatus::Pending, BookingStatus::Completed).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn valid_edges_pass() {
        assert!(ensure_payment_edge(PaymentStatus::Escrow, PaymentStatus::ProcessingRelease).is_ok());
        assert!(ensure_payout_edge(PayoutStatus::Failed, PayoutStatus::Pending).is_ok());
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = ServiceError::BookingNotFound(Uuid::new_v4());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
