//! # layered-config
//!
//! Hierarchical property resolution with convention-aware lookup, placeholder
//! interpolation, and randomized values.
//!
//! ## Overview
//!
//! `layered-config` merges many named sources of key/value data — files you
//! parsed, environment variables, command-line arguments — into a single
//! consistent view that answers "what is the effective value of property X":
//! - Deterministic precedence: later sources win for overlapping keys
//! - One addressable namespace across naming conventions: `FOO_BAR`,
//!   `foo.bar`, `foo-bar`, and `fooBar` all reach the same property
//! - Structural access into nested data (`server.hosts[0].name`) and
//!   wildcard path queries (`server.hosts[*].name`)
//! - Recursive `${...}` placeholder substitution with defaults
//! - `${random.*}` expressions generating ports, numbers, and UUIDs at
//!   ingestion time
//!
//! ## Quick Start
//!
//! ```rust
//! use layered_config::prelude::*;
//!
//! # fn main() -> layered_config::error::Result<()> {
//! let config = LayeredConfig::builder()
//!     .with_map("defaults", [
//!         ("server.port", PropertyValue::from(8080)),
//!         ("server.host", PropertyValue::from("localhost")),
//!     ])
//!     .with_map("overrides", [("server.port", PropertyValue::from(9090))])
//!     .build()?;
//!
//! let port: Option<u16> = config.get_property("server.port")?;
//! let host: Option<String> = config.get_property("server.host")?;
//! assert_eq!(port, Some(9090));
//! assert_eq!(host.as_deref(), Some("localhost"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Lock-free reads
//!
//! The catalog is an atomically published snapshot (`arc-swap`): lookups
//! never take a lock, ingestion is serialized behind a mutex, and a single
//! resolver can be shared freely across threads.
//!
//! ## Scope
//!
//! Source acquisition is the caller's concern — parse your files, collect
//! your CLI arguments, and hand the resulting key/value maps to the resolver
//! (only a process-environment snapshot helper ships in
//! [`sources::environment_snapshot`]). File watching, reload, and distributed
//! propagation are out of scope.

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod sources;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{
        ConversionService, EnvironmentProperties, KeyFormat, LayeredConfig, LayeredConfigBuilder,
        MapTransformation, Properties, PropertyMap, PropertyValue, Scalar, SerdeConversion,
    };
    pub use crate::error::{ConfigError, Result};
    pub use crate::sources::{PropertyConvention, PropertySource};
}
