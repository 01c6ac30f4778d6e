// dtos/paymentdtos.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Validate, Serialize, Deserialize, Clone)]
pub struct CheckoutDto {
    pub client_id: Uuid,

    #[validate(email(message = "A valid email is required for the payment receipt"))]
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_dto_rejects_bad_email() {
        let dto = CheckoutDto {
            client_id: Uuid::new_v4(),
            email: "not-an-email".to_string(),
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn checkout_dto_accepts_valid_email() {
        let dto = CheckoutDto {
            client_id: Uuid::new_v4(),
            email: "client@example.com".to_string(),
        };
        assert!(dto.validate().is_ok());
    }
}
