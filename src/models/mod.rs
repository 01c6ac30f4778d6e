pub mod bookingmodel;
pub mod disputemodel;
pub mod jobproofmodel;
pub mod marketmodel;
pub mod paymentmodel;
