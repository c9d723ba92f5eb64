//! Builder for constructing [`LayeredConfig`] instances.

use crate::core::conversion::{ConversionService, SerdeConversion};
use crate::core::env_properties::EnvironmentProperties;
use crate::core::placeholder::{DefaultPlaceholderResolver, PlaceholderResolver};
use crate::core::random::{LocalPortScanner, PortScanner};
use crate::core::resolver::LayeredConfig;
use crate::core::value::PropertyValue;
use crate::error::Result;
use crate::sources::PropertySource;
use std::sync::Arc;

/// Builder for a [`LayeredConfig`].
///
/// Collects sources and collaborators fluently; `build` ingests the queued
/// sources in the order they were added (later sources win for overlapping
/// keys).
///
/// # Examples
///
/// ```rust
/// use layered_config::prelude::*;
///
/// # fn main() -> layered_config::error::Result<()> {
/// let config = LayeredConfig::builder()
///     .with_map("defaults", [("db.url", PropertyValue::from("postgres://localhost/db"))])
///     .build()?;
///
/// let url: Option<String> = config.get_property("db.url")?;
/// assert_eq!(url.as_deref(), Some("postgres://localhost/db"));
/// # Ok(())
/// # }
/// ```
pub struct LayeredConfigBuilder<C: ConversionService = SerdeConversion> {
    conversion: C,
    placeholder_resolver: Arc<dyn PlaceholderResolver>,
    port_scanner: Arc<dyn PortScanner>,
    environment: Arc<EnvironmentProperties>,
    sources: Vec<PropertySource>,
}

impl LayeredConfigBuilder<SerdeConversion> {
    /// Create a builder with default collaborators.
    pub fn new() -> Self {
        Self {
            conversion: SerdeConversion,
            placeholder_resolver: Arc::new(DefaultPlaceholderResolver::new()),
            port_scanner: Arc::new(LocalPortScanner),
            environment: EnvironmentProperties::empty(),
            sources: Vec::new(),
        }
    }
}

impl Default for LayeredConfigBuilder<SerdeConversion> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ConversionService> LayeredConfigBuilder<C> {
    /// Queue a property source. Sources are ingested in queue order.
    pub fn with_source(mut self, source: PropertySource) -> Self {
        self.sources.push(source);
        self
    }

    /// Queue a map of values as a raw-convention source named `name`.
    pub fn with_map<K, V>(
        self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        self.with_source(PropertySource::of(name, values))
    }

    /// Use a specific environment-properties instance for env-var key
    /// segmentation.
    pub fn with_environment(mut self, environment: Arc<EnvironmentProperties>) -> Self {
        self.environment = environment;
        self
    }

    /// Use a custom placeholder resolver.
    pub fn with_placeholder_resolver(mut self, resolver: Arc<dyn PlaceholderResolver>) -> Self {
        self.placeholder_resolver = resolver;
        self
    }

    /// Use a custom port scanner for `${random.port}`.
    pub fn with_port_scanner(mut self, scanner: Arc<dyn PortScanner>) -> Self {
        self.port_scanner = scanner;
        self
    }

    /// Use a custom conversion service.
    pub fn with_conversion<C2: ConversionService>(self, conversion: C2) -> LayeredConfigBuilder<C2> {
        LayeredConfigBuilder {
            conversion,
            placeholder_resolver: self.placeholder_resolver,
            port_scanner: self.port_scanner,
            environment: self.environment,
            sources: self.sources,
        }
    }

    /// Build the resolver, ingesting every queued source.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed `${random.*}` expression encountered
    /// while ingesting.
    pub fn build(self) -> Result<LayeredConfig<C>> {
        let config = LayeredConfig::with_parts(
            self.conversion,
            self.placeholder_resolver,
            self.port_scanner,
            self.environment,
        );
        for source in self.sources {
            config.add_property_source(source)?;
        }
        Ok(config)
    }
}
