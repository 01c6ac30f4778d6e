// handler/payments.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha512;
use subtle::ConstantTimeEq;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{paymentdtos::CheckoutDto, ApiResponse},
    error::HttpError,
    AppState,
};

pub fn payment_handler() -> Router {
    Router::new()
        .route("/bookings/:booking_id/checkout", post(checkout))
        .route("/verify/:reference", get(verify_payment))
        .route("/payouts/:payout_id/retry", post(retry_payout))
        .route("/webhook/paystack", post(paystack_webhook))
}

/// Open a gateway checkout session for a confirmed booking.
pub async fn checkout(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<CheckoutDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let session = app_state
        .escrow_service
        .initiate_charge(booking_id, body.client_id, body.email)
        .await?;

    Ok(Json(ApiResponse::success(
        "Checkout session created",
        session,
    )))
}

/// Client-side return URL: verify with the gateway and settle the charge.
pub async fn verify_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state.escrow_service.confirm_charge(&reference).await?;

    Ok(Json(ApiResponse::success(
        "Payment verified and held in escrow",
        payment,
    )))
}

/// Operator endpoint: re-arm a failed payout and dispatch it again.
pub async fn retry_payout(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(payout_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let payout = app_state.payout_service.retry_failed(payout_id).await?;

    Ok(Json(ApiResponse::success("Payout dispatched", payout)))
}

pub async fn paystack_webhook(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, HttpError> {
    let signature = headers
        .get("x-paystack-signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            HttpError::new(
                "Missing or invalid Paystack signature".to_string(),
                StatusCode::BAD_REQUEST,
            )
        })?;

    if !verify_paystack_signature(&body, signature, &app_state.env.paystack_secret_key) {
        tracing::warn!("Invalid Paystack webhook signature received");
        return Err(HttpError::new(
            "Invalid webhook signature".to_string(),
            StatusCode::UNAUTHORIZED,
        ));
    }

    let event_type = body["event"].as_str().ok_or_else(|| {
        HttpError::new(
            "Missing event type in webhook payload".to_string(),
            StatusCode::BAD_REQUEST,
        )
    })?;

    let data = &body["data"];

    match event_type {
        "charge.success" => {
            let reference = data["reference"]
                .as_str()
                .ok_or_else(|| HttpError::bad_request("Missing reference in webhook data"))?;

            // Settlement verifies server-side and is idempotent on the
            // reference, so a redelivered event is harmless.
            app_state.escrow_service.confirm_charge(reference).await?;
        }
        "transfer.success" | "transfer.failed" | "transfer.reversed" => {
            // Transfer outcomes are tracked by the dispatcher itself; log
            // for reconciliation.
            tracing::info!(
                "Paystack transfer event {}: {}",
                event_type,
                data["reference"].as_str().unwrap_or("unknown")
            );
        }
        _ => {
            tracing::info!("Unhandled Paystack webhook event: {}", event_type);
        }
    }

    Ok(Json(serde_json::json!({"status": "success"})))
}

// Compare signatures in constant time to prevent timing attacks.
fn verify_paystack_signature(payload: &Value, signature: &str, secret: &str) -> bool {
    let payload_string = payload.to_string();

    let mut mac = match Hmac::<Sha512>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload_string.as_bytes());

    let expected_signature = mac.finalize().into_bytes();
    let expected_signature_hex = hex::encode(expected_signature);

    ConstantTimeEq::ct_eq(signature.as_bytes(), expected_signature_hex.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &Value, secret: &str) -> String {
        let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload.to_string().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_correctly_signed_payload() {
        let payload = serde_json::json!({
            "event": "charge.success",
            "data": { "reference": "SVH-CHG-ABC123XYZ0" }
        });
        let signature = sign(&payload, "secret");
        assert!(verify_paystack_signature(&payload, &signature, "secret"));
    }

    #[test]
    fn rejects_wrong_secret() {
        let payload = serde_json::json!({ "event": "charge.success" });
        let signature = sign(&payload, "secret");
        assert!(!verify_paystack_signature(&payload, &signature, "other"));
    }

    #[test]
    fn rejects_tampered_payload() {
        let payload = serde_json::json!({ "data": { "amount": 100_00 } });
        let signature = sign(&payload, "secret");
        let tampered = serde_json::json!({ "data": { "amount": 999_00 } });
        assert!(!verify_paystack_signature(&tampered, &signature, "secret"));
    }
}
