// db/marketdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::marketmodel::{ProviderProfile, ServiceListing};

const PROVIDER_COLUMNS: &str = r#"
    id, user_id, display_name, is_available,
    bank_code, account_number, account_name, recipient_code,
    created_at, updated_at
"#;

#[async_trait]
pub trait MarketExt {
    async fn get_service_listing(&self, service_id: Uuid) -> Result<Option<ServiceListing>, Error>;

    async fn get_provider_profile(&self, user_id: Uuid) -> Result<Option<ProviderProfile>, Error>;

    /// Cache the gateway transfer-recipient code once created.
    async fn set_provider_recipient_code(
        &self,
        user_id: Uuid,
        recipient_code: String,
    ) -> Result<ProviderProfile, Error>;
}

#[async_trait]
impl MarketExt for DBClient {
    async fn get_service_listing(&self, service_id: Uuid) -> Result<Option<ServiceListing>, Error> {
        sqlx::query_as::<_, ServiceListing>(
            r#"
            SELECT id, provider_id, title, description, base_price, duration_minutes, is_active, created_at
            FROM service_listings
            WHERE id = $1
            "#,
        )
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_provider_profile(&self, user_id: Uuid) -> Result<Option<ProviderProfile>, Error> {
        sqlx::query_as::<_, ProviderProfile>(&format!(
            r#"SELECT {PROVIDER_COLUMNS} FROM provider_profiles WHERE user_id = $1"#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_provider_recipient_code(
        &self,
        user_id: Uuid,
        recipient_code: String,
    ) -> Result<ProviderProfile, Error> {
        sqlx::query_as::<_, ProviderProfile>(&format!(
            r#"
            UPDATE provider_profiles
            SET recipient_code = $2, updated_at = NOW()
            WHERE user_id = $1
            RETURNING {PROVIDER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(recipient_code)
        .fetch_one(&self.pool)
        .await
    }
}
