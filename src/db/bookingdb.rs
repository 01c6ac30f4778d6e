// db/bookingdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::BigDecimal, Error};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::bookingmodel::{Booking, BookingStatus};

const BOOKING_COLUMNS: &str = r#"
    id, client_id, provider_id, service_id,
    scheduled_date, duration_minutes,
    total_amount, platform_fee, address,
    status, created_at, updated_at
"#;

#[async_trait]
pub trait BookingExt {
    async fn create_booking(
        &self,
        client_id: Uuid,
        provider_id: Uuid,
        service_id: Uuid,
        scheduled_date: DateTime<Utc>,
        duration_minutes: i32,
        total_amount: BigDecimal,
        address: String,
    ) -> Result<Booking, Error>;

    async fn get_booking_by_id(&self, booking_id: Uuid) -> Result<Option<Booking>, Error>;

    async fn get_bookings_for_client(&self, client_id: Uuid) -> Result<Vec<Booking>, Error>;

    async fn get_bookings_for_provider(&self, provider_id: Uuid) -> Result<Vec<Booking>, Error>;

    /// Conditional status move: affects the row only if it is still in
    /// `from`. `None` means another writer got there first (or the caller's
    /// view is stale) and nothing was changed.
    async fn transition_booking(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<Booking>, Error>;

    /// Same conditional move inside an open transaction, for operations that
    /// must commit together with other writes (proof submission).
    async fn transition_booking_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<Booking>, Error>;

    /// Persist the fee split computed at charge time.
    async fn set_booking_platform_fee(
        &self,
        booking_id: Uuid,
        platform_fee: BigDecimal,
    ) -> Result<Booking, Error>;
}

#[async_trait]
impl BookingExt for DBClient {
    async fn create_booking(
        &self,
        client_id: Uuid,
        provider_id: Uuid,
        service_id: Uuid,
        scheduled_date: DateTime<Utc>,
        duration_minutes: i32,
        total_amount: BigDecimal,
        address: String,
    ) -> Result<Booking, Error> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"
            INSERT INTO bookings
            (client_id, provider_id, service_id, scheduled_date, duration_minutes, total_amount, address, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(client_id)
        .bind(provider_id)
        .bind(service_id)
        .bind(scheduled_date)
        .bind(duration_minutes)
        .bind(total_amount)
        .bind(address)
        .bind(BookingStatus::Pending)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_booking_by_id(&self, booking_id: Uuid) -> Result<Option<Booking>, Error> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"#
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_bookings_for_client(&self, client_id: Uuid) -> Result<Vec<Booking>, Error> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE client_id = $1
            ORDER BY scheduled_date DESC
            "#
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_bookings_for_provider(&self, provider_id: Uuid) -> Result<Vec<Booking>, Error> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE provider_id = $1
            ORDER BY scheduled_date DESC
            "#
        ))
        .bind(provider_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn transition_booking(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<Booking>, Error> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"
            UPDATE bookings
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await
    }

    async fn transition_booking_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<Booking>, Error> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"
            UPDATE bookings
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&mut **tx)
        .await
    }

    async fn set_booking_platform_fee(
        &self,
        booking_id: Uuid,
        platform_fee: BigDecimal,
    ) -> Result<Booking, Error> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"
            UPDATE bookings
            SET platform_fee = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(platform_fee)
        .fetch_one(&self.pool)
        .await
    }
}
