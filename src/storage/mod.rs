//! Storage backends for slots, bookings, payments and schedules.

mod memory;
mod traits;

pub use memory::MemoryStore;
pub use traits::{BookingStore, PaymentStore, ScheduleStore, SlotStore};
