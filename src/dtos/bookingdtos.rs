// dtos/bookingdtos.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Validate, Serialize, Deserialize, Clone)]
pub struct CreateBookingDto {
    pub client_id: Uuid,

    pub service_id: Uuid,

    pub scheduled_date: DateTime<Utc>,

    #[validate(range(min = 15, max = 1440, message = "Duration must be between 15 minutes and a day"))]
    pub duration_minutes: Option<i32>,

    #[validate(length(min = 5, max = 500, message = "Address must be between 5 and 500 characters"))]
    pub address: String,
}

/// Accept / start-job requests carry the acting provider.
#[derive(Debug, Validate, Serialize, Deserialize, Clone)]
pub struct ProviderActionDto {
    pub provider_id: Uuid,
}

#[derive(Debug, Validate, Serialize, Deserialize, Clone)]
pub struct CancelBookingDto {
    pub requested_by: Uuid,
}

#[derive(Debug, Validate, Serialize, Deserialize, Clone)]
pub struct SubmitProofDto {
    pub provider_id: Uuid,

    #[validate(length(min = 1, max = 10, message = "Provide between 1 and 10 photos"))]
    pub photo_urls: Vec<String>,

    #[validate(length(max = 2000, message = "Notes cannot exceed 2000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Validate, Serialize, Deserialize, Clone)]
pub struct ConfirmCompletionDto {
    pub client_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn create_booking_dto_rejects_short_address() {
        let dto = CreateBookingDto {
            client_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            scheduled_date: Utc::now() + Duration::days(1),
            duration_minutes: Some(60),
            address: "x".to_string(),
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn submit_proof_dto_requires_a_photo() {
        let dto = SubmitProofDto {
            provider_id: Uuid::new_v4(),
            photo_urls: vec![],
            notes: None,
        };
        assert!(dto.validate().is_err());

        let dto = SubmitProofDto {
            photo_urls: vec!["https://cdn.example.com/done.jpg".to_string()],
            ..dto
        };
        assert!(dto.validate().is_ok());
    }
}
