// db/paymentdb.rs
use async_trait::async_trait;
use sqlx::{types::BigDecimal, Error};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::paymentmodel::{Payment, PaymentStatus, Payout, PayoutStatus};

const PAYMENT_COLUMNS: &str = r#"
    id, booking_id, amount, escrow_amount, platform_fee,
    currency, paystack_ref, status, paid_at, created_at, updated_at
"#;

const PAYOUT_COLUMNS: &str = r#"
    id, payment_id, provider_id, amount, reference, transfer_code,
    status, attempts, failure_reason, created_at, completed_at
"#;

#[async_trait]
pub trait PaymentExt {
    async fn create_payment(
        &self,
        booking_id: Uuid,
        amount: BigDecimal,
        escrow_amount: BigDecimal,
        platform_fee: BigDecimal,
        currency: String,
        paystack_ref: String,
    ) -> Result<Payment, Error>;

    async fn get_payment_by_id(&self, payment_id: Uuid) -> Result<Option<Payment>, Error>;

    async fn get_payment_by_booking_id(&self, booking_id: Uuid) -> Result<Option<Payment>, Error>;

    async fn get_payment_by_reference(&self, reference: &str) -> Result<Option<Payment>, Error>;

    /// Conditional status move; `None` when the row is no longer in `from`.
    async fn transition_payment(
        &self,
        payment_id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<Option<Payment>, Error>;

    /// The at-most-once release gate: `Escrow -> ProcessingRelease`, refused
    /// in the same statement when the payment's booking has an open dispute.
    /// The dispute check and the claim commit atomically, so a dispute
    /// raised after a caller's read still blocks the release.
    async fn claim_payment_release(&self, payment_id: Uuid) -> Result<Option<Payment>, Error>;

    /// Pending -> Escrow keyed on the gateway reference, recording paid_at.
    /// A redelivered webhook finds the row already escrowed and changes
    /// nothing.
    async fn confirm_payment_escrow(&self, reference: &str) -> Result<Option<Payment>, Error>;

    /// Re-arm a failed charge with a fresh gateway reference.
    async fn reset_failed_payment(
        &self,
        payment_id: Uuid,
        new_reference: String,
    ) -> Result<Option<Payment>, Error>;

    async fn create_payout(
        &self,
        payment_id: Uuid,
        provider_id: Uuid,
        amount: BigDecimal,
        reference: String,
    ) -> Result<Payout, Error>;

    async fn get_payout_by_id(&self, payout_id: Uuid) -> Result<Option<Payout>, Error>;

    async fn get_payout_by_payment_id(&self, payment_id: Uuid) -> Result<Option<Payout>, Error>;

    async fn transition_payout(
        &self,
        payout_id: Uuid,
        from: PayoutStatus,
        to: PayoutStatus,
    ) -> Result<Option<Payout>, Error>;

    async fn record_payout_attempt(
        &self,
        payout_id: Uuid,
        failure_reason: String,
    ) -> Result<Payout, Error>;

    async fn complete_payout(
        &self,
        payout_id: Uuid,
        transfer_code: String,
    ) -> Result<Option<Payout>, Error>;

    /// Failed payouts still under the automatic retry cap.
    async fn get_failed_payouts_below(&self, max_attempts: i32) -> Result<Vec<Payout>, Error>;
}

fn release_claim_sql() -> String {
    format!(
        r#"
        UPDATE payments
        SET status = $3, updated_at = NOW()
        WHERE id = $1 AND status = $2
          AND NOT EXISTS (
              SELECT 1 FROM disputes d
              WHERE d.booking_id = payments.booking_id
                AND d.status IN ('pending', 'escalated')
          )
        RETURNING {PAYMENT_COLUMNS}
        "#
    )
}

#[async_trait]
impl PaymentExt for DBClient {
    async fn create_payment(
        &self,
        booking_id: Uuid,
        amount: BigDecimal,
        escrow_amount: BigDecimal,
        platform_fee: BigDecimal,
        currency: String,
        paystack_ref: String,
    ) -> Result<Payment, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments
            (booking_id, amount, escrow_amount, platform_fee, currency, paystack_ref, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(amount)
        .bind(escrow_amount)
        .bind(platform_fee)
        .bind(currency)
        .bind(paystack_ref)
        .bind(PaymentStatus::Pending)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_payment_by_id(&self, payment_id: Uuid) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"#
        ))
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_payment_by_booking_id(&self, booking_id: Uuid) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"SELECT {PAYMENT_COLUMNS} FROM payments WHERE booking_id = $1"#
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_payment_by_reference(&self, reference: &str) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"SELECT {PAYMENT_COLUMNS} FROM payments WHERE paystack_ref = $1"#
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
    }

    async fn transition_payment(
        &self,
        payment_id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(payment_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await
    }

    async fn claim_payment_release(&self, payment_id: Uuid) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(&release_claim_sql())
            .bind(payment_id)
            .bind(PaymentStatus::Escrow)
            .bind(PaymentStatus::ProcessingRelease)
            .fetch_optional(&self.pool)
            .await
    }

    async fn confirm_payment_escrow(&self, reference: &str) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments
            SET status = $3, paid_at = NOW(), updated_at = NOW()
            WHERE paystack_ref = $1 AND status = $2
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(reference)
        .bind(PaymentStatus::Pending)
        .bind(PaymentStatus::Escrow)
        .fetch_optional(&self.pool)
        .await
    }

    async fn reset_failed_payment(
        &self,
        payment_id: Uuid,
        new_reference: String,
    ) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments
            SET status = $3, paystack_ref = $2, updated_at = NOW()
            WHERE id = $1 AND status = $4
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(payment_id)
        .bind(new_reference)
        .bind(PaymentStatus::Pending)
        .bind(PaymentStatus::Failed)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_payout(
        &self,
        payment_id: Uuid,
        provider_id: Uuid,
        amount: BigDecimal,
        reference: String,
    ) -> Result<Payout, Error> {
        // payment_id is unique: a concurrent dispatcher loses the insert and
        // picks up the existing row instead.
        let inserted = sqlx::query_as::<_, Payout>(&format!(
            r#"
            INSERT INTO payouts (payment_id, provider_id, amount, reference, status)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (payment_id) DO NOTHING
            RETURNING {PAYOUT_COLUMNS}
            "#
        ))
        .bind(payment_id)
        .bind(provider_id)
        .bind(amount)
        .bind(reference)
        .bind(PayoutStatus::Pending)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(payout) => Ok(payout),
            None => self
                .get_payout_by_payment_id(payment_id)
                .await?
                .ok_or(Error::RowNotFound),
        }
    }

    async fn get_payout_by_id(&self, payout_id: Uuid) -> Result<Option<Payout>, Error> {
        sqlx::query_as::<_, Payout>(&format!(
            r#"SELECT {PAYOUT_COLUMNS} FROM payouts WHERE id = $1"#
        ))
        .bind(payout_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_payout_by_payment_id(&self, payment_id: Uuid) -> Result<Option<Payout>, Error> {
        sqlx::query_as::<_, Payout>(&format!(
            r#"SELECT {PAYOUT_COLUMNS} FROM payouts WHERE payment_id = $1"#
        ))
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn transition_payout(
        &self,
        payout_id: Uuid,
        from: PayoutStatus,
        to: PayoutStatus,
    ) -> Result<Option<Payout>, Error> {
        sqlx::query_as::<_, Payout>(&format!(
            r#"
            UPDATE payouts
            SET status = $3
            WHERE id = $1 AND status = $2
            RETURNING {PAYOUT_COLUMNS}
            "#
        ))
        .bind(payout_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await
    }

    async fn record_payout_attempt(
        &self,
        payout_id: Uuid,
        failure_reason: String,
    ) -> Result<Payout, Error> {
        sqlx::query_as::<_, Payout>(&format!(
            r#"
            UPDATE payouts
            SET attempts = attempts + 1, failure_reason = $2
            WHERE id = $1
            RETURNING {PAYOUT_COLUMNS}
            "#
        ))
        .bind(payout_id)
        .bind(failure_reason)
        .fetch_one(&self.pool)
        .await
    }

    async fn complete_payout(
        &self,
        payout_id: Uuid,
        transfer_code: String,
    ) -> Result<Option<Payout>, Error> {
        sqlx::query_as::<_, Payout>(&format!(
            r#"
            UPDATE payouts
            SET status = $3, transfer_code = $2, failure_reason = NULL, completed_at = NOW()
            WHERE id = $1 AND status = $4
            RETURNING {PAYOUT_COLUMNS}
            "#
        ))
        .bind(payout_id)
        .bind(transfer_code)
        .bind(PayoutStatus::Completed)
        .bind(PayoutStatus::Processing)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_failed_payouts_below(&self, max_attempts: i32) -> Result<Vec<Payout>, Error> {
        sqlx::query_as::<_, Payout>(&format!(
            r#"
            SELECT {PAYOUT_COLUMNS} FROM payouts
            WHERE status = $1 AND attempts < $2
            ORDER BY created_at ASC
            "#
        ))
        .bind(PayoutStatus::Failed)
        .bind(max_attempts)
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_claim_checks_status_and_open_disputes_in_one_statement() {
        let sql = release_claim_sql();
        assert!(sql.contains("WHERE id = $1 AND status = $2"));
        assert!(sql.contains("NOT EXISTS"));
        assert!(sql.contains("d.booking_id = payments.booking_id"));
        assert!(sql.contains("d.status IN ('pending', 'escalated')"));
    }
}
