use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

/// A bookable service offering (home cleaning, hair styling, ...). Managed
/// through an admin surface that lives outside this crate; bookings only
/// read the active flag and the price.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ServiceListing {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub title: String,
    pub description: String,
    pub base_price: BigDecimal,
    pub duration_minutes: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Provider-side profile: availability for new bookings plus the registered
/// payout account. `recipient_code` caches the gateway's transfer recipient
/// so repeat payouts skip recipient creation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProviderProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub display_name: String,
    pub is_available: bool,
    pub bank_code: Option<String>,
    pub account_number: Option<String>,
    pub account_name: Option<String>,
    pub recipient_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProviderProfile {
    pub fn has_payout_account(&self) -> bool {
        self.bank_code.is_some() && self.account_number.is_some()
    }
}
