//! Environment snapshot source.

use super::{PropertyConvention, PropertySource};
use crate::core::PropertyValue;

/// Snapshot the process environment as an immutable property source.
///
/// Keys keep their environment-variable form (`FOO_BAR`); ingestion expands
/// them into every plausible dotted/hyphenated segmentation, so `FOO_BAR=baz`
/// answers lookups for `foo.bar` and `foo-bar`. Variables are captured sorted
/// by name for a deterministic entry order.
///
/// # Examples
///
/// ```rust,no_run
/// use layered_config::prelude::*;
/// use layered_config::sources::environment_snapshot;
///
/// # fn main() -> layered_config::error::Result<()> {
/// let config = LayeredConfig::builder()
///     .with_source(environment_snapshot("env", Some("APP_")))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub fn environment_snapshot(name: &str, prefix: Option<&str>) -> PropertySource {
    let mut vars: Vec<(String, String)> = std::env::vars()
        .filter(|(key, _)| prefix.is_none_or(|p| key.starts_with(p)))
        .collect();
    vars.sort();
    PropertySource::with_convention(
        name,
        vars.into_iter()
            .map(|(key, value)| (key, PropertyValue::from(value))),
        PropertyConvention::EnvironmentVariable,
    )
}
