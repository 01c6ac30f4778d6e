mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::Config;
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use crate::db::db::DBClient;
use service::{
    background_jobs::{start_auto_confirm_job, start_payout_retry_job},
    booking_service::BookingService,
    dispute_service::DisputeService,
    escrow_service::EscrowService,
    notification_service::NotificationService,
    payment_provider::PaymentProviderService,
    payout_service::PayoutService,
    proof_service::ProofService,
};

pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    // Services
    pub booking_service: Arc<BookingService>,
    pub escrow_service: Arc<EscrowService>,
    pub proof_service: Arc<ProofService>,
    pub payout_service: Arc<PayoutService>,
    pub dispute_service: Arc<DisputeService>,
    pub notification_service: Arc<NotificationService>,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config) -> Self {
        let db_client_arc = Arc::new(db_client);

        let notification_service = Arc::new(NotificationService::new(db_client_arc.clone()));
        let provider = Arc::new(PaymentProviderService::new(&config));

        let payout_service = Arc::new(PayoutService::new(
            db_client_arc.clone(),
            provider.clone(),
            notification_service.clone(),
            &config,
        ));

        let escrow_service = Arc::new(EscrowService::new(
            db_client_arc.clone(),
            provider,
            payout_service.clone(),
            notification_service.clone(),
            &config,
        ));

        let booking_service = Arc::new(BookingService::new(
            db_client_arc.clone(),
            escrow_service.clone(),
            notification_service.clone(),
        ));

        let proof_service = Arc::new(ProofService::new(
            db_client_arc.clone(),
            escrow_service.clone(),
            notification_service.clone(),
            &config,
        ));

        let dispute_service = Arc::new(DisputeService::new(
            db_client_arc.clone(),
            escrow_service.clone(),
            notification_service.clone(),
        ));

        Self {
            env: config,
            db_client: db_client_arc,
            booking_service,
            escrow_service,
            proof_service,
            payout_service,
            dispute_service,
            notification_service,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("connected to the database");
            pool
        }
        Err(err) => {
            tracing::error!("failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let db_client = DBClient::new(pool);

    let allowed_origins = vec![
        config
            .app_url
            .parse::<HeaderValue>()
            .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:5173")),
        HeaderValue::from_static("http://localhost:5173"),
        HeaderValue::from_static("http://localhost:8000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let app_state = Arc::new(AppState::new(db_client, config.clone()));

    // Background workers: overdue-confirmation sweep and payout retries.
    let sweep_state = app_state.clone();
    tokio::spawn(async move {
        start_auto_confirm_job(sweep_state).await;
    });

    let retry_state = app_state.clone();
    tokio::spawn(async move {
        start_payout_retry_job(retry_state).await;
    });

    let app = create_router(app_state).layer(cors);

    tracing::info!("server is running on http://localhost:{}", config.port);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind port {}: {:?}", config.port, err);
            std::process::exit(1);
        }
    };

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("server error: {:?}", err);
        std::process::exit(1);
    }
}
