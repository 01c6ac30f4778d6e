// handler/bookings.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        bookingdtos::{
            CancelBookingDto, ConfirmCompletionDto, CreateBookingDto, ProviderActionDto,
            SubmitProofDto,
        },
        ApiResponse,
    },
    error::HttpError,
    AppState,
};

pub fn booking_handler() -> Router {
    Router::new()
        .route("/", post(create_booking))
        .route("/", get(list_bookings))
        .route("/:booking_id", get(get_booking))
        .route("/:booking_id/accept", put(accept_booking))
        .route("/:booking_id/start", put(start_job))
        .route("/:booking_id/cancel", put(cancel_booking))
        .route("/:booking_id/proof", post(submit_proof))
        .route("/:booking_id/confirm", put(confirm_completion))
}

pub async fn create_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<CreateBookingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let booking = app_state.booking_service.create_booking(body).await?;

    Ok(Json(ApiResponse::success(
        "Booking requested successfully",
        booking,
    )))
}

#[derive(Debug, Deserialize)]
pub struct ListBookingsQuery {
    pub client_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
}

pub async fn list_bookings(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let bookings = match (query.client_id, query.provider_id) {
        (Some(client_id), None) => app_state.booking_service.list_for_client(client_id).await?,
        (None, Some(provider_id)) => {
            app_state
                .booking_service
                .list_for_provider(provider_id)
                .await?
        }
        _ => {
            return Err(HttpError::bad_request(
                "Provide exactly one of client_id or provider_id",
            ))
        }
    };

    Ok(Json(ApiResponse::success("Bookings retrieved", bookings)))
}

pub async fn get_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = app_state.booking_service.get_booking(booking_id).await?;

    Ok(Json(ApiResponse::success("Booking retrieved", booking)))
}

pub async fn accept_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<ProviderActionDto>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = app_state
        .booking_service
        .accept_booking(booking_id, body.provider_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Booking accepted; awaiting payment",
        booking,
    )))
}

pub async fn start_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<ProviderActionDto>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = app_state
        .booking_service
        .start_job(booking_id, body.provider_id)
        .await?;

    Ok(Json(ApiResponse::success("Job started", booking)))
}

pub async fn cancel_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<CancelBookingDto>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = app_state
        .booking_service
        .cancel_booking(booking_id, body.requested_by)
        .await?;

    Ok(Json(ApiResponse::success("Booking cancelled", booking)))
}

pub async fn submit_proof(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<SubmitProofDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let provider_id = body.provider_id;
    let (proof, _booking) = app_state
        .proof_service
        .submit_proof(booking_id, provider_id, body)
        .await?;

    Ok(Json(ApiResponse::success(
        "Completion proof submitted; awaiting client confirmation",
        proof,
    )))
}

pub async fn confirm_completion(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<ConfirmCompletionDto>,
) -> Result<impl IntoResponse, HttpError> {
    let proof = app_state
        .proof_service
        .confirm_by_client(booking_id, body.client_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Job confirmed; payout is on its way",
        proof,
    )))
}
