// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub app_url: String,
    pub port: u16,
    // Payment gateway
    pub paystack_secret_key: String,
    pub currency: String,
    // Escrow policy
    pub platform_fee_percent: f64,
    pub auto_confirm_grace_hours: i64,
    // Payout retry policy
    pub payout_max_attempts: i32,
    pub payout_retry_backoff_secs: u64,
    // Background job cadence
    pub sweep_interval_secs: u64,
    pub payout_retry_interval_secs: u64,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let app_url = std::env::var("APP_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8000);

        let paystack_secret_key = std::env::var("PAYSTACK_SECRET_KEY")
            .unwrap_or_else(|_| "test_secret_key".to_string());
        let currency = std::env::var("CURRENCY").unwrap_or_else(|_| "NGN".to_string());

        let platform_fee_percent = std::env::var("PLATFORM_FEE_PERCENT")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(10.0);
        let auto_confirm_grace_hours = std::env::var("AUTO_CONFIRM_GRACE_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(72);

        let payout_max_attempts = std::env::var("PAYOUT_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or(3);
        let payout_retry_backoff_secs = std::env::var("PAYOUT_RETRY_BACKOFF_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let sweep_interval_secs = std::env::var("SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(300);
        let payout_retry_interval_secs = std::env::var("PAYOUT_RETRY_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(900);

        if !(0.0..100.0).contains(&platform_fee_percent) {
            panic!("PLATFORM_FEE_PERCENT must be in [0, 100)");
        }
        if auto_confirm_grace_hours < 0 {
            panic!("AUTO_CONFIRM_GRACE_HOURS must not be negative");
        }

        Config {
            database_url,
            app_url,
            port,
            paystack_secret_key,
            currency,
            platform_fee_percent,
            auto_confirm_grace_hours,
            payout_max_attempts,
            payout_retry_backoff_secs,
            sweep_interval_secs,
            payout_retry_interval_secs,
        }
    }
}
