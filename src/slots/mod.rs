//! Slot catalog: bookable (date, time, service) units and their generation.

mod catalog;
mod types;

pub use catalog::{DayAvailability, GenerateOutcome, GenerateRequest, SlotCatalog};
pub use types::{ScheduleEntry, Slot, SlotKey};
