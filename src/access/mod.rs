//! Subscription access windows derived from payment records.

mod tracker;
mod types;

pub use tracker::AccessTracker;
pub use types::{
    AccessWindow, NotificationCandidate, NotificationKind, PaymentAnomaly, PaymentMetadata,
    PaymentRecord, PaymentStatus, PaymentUpdate, RenewalPolicy,
};
