pub mod bookingdb;
pub mod db;
pub mod disputedb;
pub mod jobproofdb;
pub mod marketdb;
pub mod paymentdb;
