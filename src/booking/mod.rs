//! Booking records and the reservation manager.

mod manager;
mod types;

pub use manager::ReservationManager;
pub use types::{Booking, BookingStatus, NewBooking};
