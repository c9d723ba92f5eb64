//! Property source types and acquisition helpers.

mod env;
mod property_source;

pub use env::environment_snapshot;
pub use property_source::{PropertyConvention, PropertySource};
