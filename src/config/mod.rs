//! Configuration loading and validation.

mod settings;

pub use settings::{AccessConfig, BookingConfig, CacheConfig, Config, ServerConfig};
