// handler/disputes.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        disputedtos::{RaiseDisputeDto, ResolveDisputeDto},
        ApiResponse,
    },
    error::HttpError,
    AppState,
};

pub fn dispute_handler() -> Router {
    Router::new()
        .route("/bookings/:booking_id", post(raise_dispute))
        .route("/:dispute_id", get(get_dispute))
        .route("/:dispute_id/escalate", put(escalate_dispute))
        .route("/:dispute_id/resolve", put(resolve_dispute))
}

pub async fn raise_dispute(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<RaiseDisputeDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let raised_by = body.raised_by;
    let dispute = app_state
        .dispute_service
        .raise_dispute(booking_id, raised_by, body)
        .await?;

    Ok(Json(ApiResponse::success(
        "Dispute raised; fund release is on hold",
        dispute,
    )))
}

pub async fn get_dispute(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(dispute_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let dispute = app_state.dispute_service.get_dispute(dispute_id).await?;

    Ok(Json(ApiResponse::success("Dispute retrieved", dispute)))
}

pub async fn escalate_dispute(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(dispute_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let dispute = app_state
        .dispute_service
        .escalate_dispute(dispute_id)
        .await?;

    Ok(Json(ApiResponse::success("Dispute escalated", dispute)))
}

pub async fn resolve_dispute(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(dispute_id): Path<Uuid>,
    Json(body): Json<ResolveDisputeDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let resolved_by = body.resolved_by;
    let dispute = app_state
        .dispute_service
        .resolve_dispute(dispute_id, resolved_by, body)
        .await?;

    Ok(Json(ApiResponse::success("Dispute resolved", dispute)))
}
