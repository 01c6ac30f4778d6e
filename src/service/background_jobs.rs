// service/background_jobs.rs
use std::sync::Arc;

use tokio::time::{interval, Duration};

use crate::{db::paymentdb::PaymentExt, AppState};

// A payout accrues `payout_max_attempts` transfer attempts per dispatch;
// the retry job gives up after this many dispatch rounds.
const AUTO_RETRY_ROUNDS: i32 = 3;

/// Confirms overdue job proofs on the client's behalf and releases their
/// escrow. Runs forever on the configured cadence.
pub async fn start_auto_confirm_job(app_state: Arc<AppState>) {
    let mut ticker = interval(Duration::from_secs(app_state.env.sweep_interval_secs));

    loop {
        ticker.tick().await;

        match app_state.proof_service.auto_confirm_sweep().await {
            Ok(released) if released > 0 => {
                tracing::info!("auto-confirmation sweep released {} booking(s)", released);
            }
            Ok(_) => {
                tracing::debug!("auto-confirmation sweep found nothing due");
            }
            Err(e) => {
                tracing::error!("auto-confirmation sweep failed: {}", e);
            }
        }
    }
}

/// Re-dispatches failed payouts that are still under the automatic retry
/// cap. Anything past the cap stays failed until an operator retries it.
pub async fn start_payout_retry_job(app_state: Arc<AppState>) {
    let mut ticker = interval(Duration::from_secs(app_state.env.payout_retry_interval_secs));
    let attempt_cap = app_state.env.payout_max_attempts * AUTO_RETRY_ROUNDS;

    loop {
        ticker.tick().await;

        let failed = match app_state.db_client.get_failed_payouts_below(attempt_cap).await {
            Ok(failed) => failed,
            Err(e) => {
                tracing::error!("failed to load retryable payouts: {}", e);
                continue;
            }
        };

        for payout in failed {
            match app_state.payout_service.retry_failed(payout.id).await {
                Ok(done) => {
                    tracing::info!(payout_id = %done.id, "payout retry succeeded");
                }
                Err(e) => {
                    tracing::warn!(payout_id = %payout.id, "payout retry failed: {}", e);
                }
            }
        }
    }
}
