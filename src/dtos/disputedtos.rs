// dtos/disputedtos.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::disputemodel::DisputeOutcome;

#[derive(Debug, Validate, Serialize, Deserialize, Clone)]
pub struct RaiseDisputeDto {
    pub raised_by: Uuid,

    #[validate(length(min = 10, max = 2000, message = "Reason must be between 10 and 2000 characters"))]
    pub reason: String,
}

#[derive(Debug, Validate, Serialize, Deserialize, Clone)]
pub struct ResolveDisputeDto {
    pub resolved_by: Uuid,

    #[validate(length(min = 10, max = 2000, message = "Resolution must be between 10 and 2000 characters"))]
    pub resolution: String,

    pub outcome: DisputeOutcome,
}
