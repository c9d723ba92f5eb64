//! Named, ordered property sources.

use crate::core::PropertyValue;
use indexmap::IndexMap;

/// The naming convention a source's keys follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyConvention {
    /// Keys as authored: dotted, hyphenated, or camelCase.
    Raw,
    /// Upper-snake-case keys with ambiguous `_` segmentation (`FOO_BAR_BAZ`).
    EnvironmentVariable,
}

/// A named, insertion-ordered collection of property entries.
///
/// Sources are immutable snapshots: entries are owned at construction and
/// never change afterwards, so a registered source cannot drift under the
/// resolver. Adding a source with the name of an existing one replaces it in
/// the registry.
///
/// # Examples
///
/// ```rust
/// use layered_config::prelude::*;
///
/// let source = PropertySource::of("cli", [("server.port", PropertyValue::from(8080))]);
/// assert_eq!(source.name(), "cli");
/// assert_eq!(source.convention(), PropertyConvention::Raw);
/// ```
#[derive(Debug, Clone)]
pub struct PropertySource {
    name: String,
    convention: PropertyConvention,
    entries: IndexMap<String, PropertyValue>,
}

impl PropertySource {
    /// Create a raw-convention source from ordered key/value entries.
    pub fn of<K, V, I>(name: impl Into<String>, values: I) -> Self
    where
        K: Into<String>,
        V: Into<PropertyValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::with_convention(name, values, PropertyConvention::Raw)
    }

    /// Create a source with an explicit naming convention.
    pub fn with_convention<K, V, I>(
        name: impl Into<String>,
        values: I,
        convention: PropertyConvention,
    ) -> Self
    where
        K: Into<String>,
        V: Into<PropertyValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            name: name.into(),
            convention,
            entries: values
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// The source name; the registry key inside the resolver.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The naming convention this source's keys follow.
    pub fn convention(&self) -> PropertyConvention {
        self.convention
    }

    /// The value stored for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.get(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the source holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}
