pub mod background_jobs;
pub mod booking_service;
pub mod dispute_service;
pub mod error;
pub mod escrow_service;
pub mod notification_service;
pub mod payment_provider;
pub mod payout_service;
pub mod proof_service;
