pub mod bookings;
pub mod disputes;
pub mod payments;
