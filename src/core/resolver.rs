//! The property resolution engine.

use crate::core::builder::LayeredConfigBuilder;
use crate::core::catalog::{Catalog, PropertyCatalog};
use crate::core::conversion::{ConversionService, SerdeConversion};
use crate::core::env_properties::EnvironmentProperties;
use crate::core::name_utils::{KeyFormat, hyphenate};
use crate::core::placeholder::{DefaultPlaceholderResolver, PlaceholderResolver, PropertyLookup};
use crate::core::random::{LocalPortScanner, PortScanner, RandomValueExpander};
use crate::core::value::{Properties, PropertyMap, PropertyValue, Scalar};
use crate::error::Result;
use crate::sources::{PropertyConvention, PropertySource};
use arc_swap::ArcSwap;
use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::Mutex;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::trace;

/// How sub-map keys are assembled when extracting the properties beneath a
/// prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapTransformation {
    /// One flat mapping from remaining key to value.
    Flat,
    /// Nested mappings rebuilt by splitting remaining keys on `.`.
    Nested,
}

/// A cached resolution outcome; `None` is the cached-absent sentinel.
type CachedValue = Option<Arc<dyn Any + Send + Sync>>;

/// Resolves properties from one or many [`PropertySource`] instances.
///
/// Sources are ingested into a partitioned catalog under every naming
/// convention they can be addressed by, so `FOO_BAR=baz` from an
/// environment-variable source answers lookups for `foo.bar` and `foo-bar`
/// alike. Later sources win over earlier ones for overlapping keys.
///
/// Reads are lock-free: the catalog is an atomically published snapshot and
/// ingestion is serialized behind a mutex. A single instance can be shared
/// freely across threads.
///
/// # Examples
///
/// ```rust
/// use layered_config::prelude::*;
///
/// # fn main() -> layered_config::error::Result<()> {
/// let config = LayeredConfig::builder()
///     .with_map("defaults", [("server.port", PropertyValue::from(8080))])
///     .with_map("overrides", [("server.port", PropertyValue::from(9090))])
///     .build()?;
///
/// let port: Option<u16> = config.get_property("server.port")?;
/// assert_eq!(port, Some(9090));
/// # Ok(())
/// # }
/// ```
pub struct LayeredConfig<C: ConversionService = SerdeConversion> {
    conversion: C,
    placeholder_resolver: Arc<dyn PlaceholderResolver>,
    random_expander: RandomValueExpander,
    environment: Arc<EnvironmentProperties>,
    sources: DashMap<String, Arc<PropertySource>>,
    catalog: ArcSwap<Catalog>,
    ingest_lock: Mutex<()>,
    contains_cache: DashMap<String, bool>,
    resolved_value_cache: DashMap<(String, TypeId), CachedValue>,
}

impl LayeredConfig<SerdeConversion> {
    /// Create an empty resolver with default collaborators.
    pub fn new() -> Self {
        Self::with_parts(
            SerdeConversion,
            Arc::new(DefaultPlaceholderResolver::new()),
            Arc::new(LocalPortScanner),
            EnvironmentProperties::empty(),
        )
    }

    /// Create a builder for assembling a resolver with custom collaborators.
    pub fn builder() -> LayeredConfigBuilder<SerdeConversion> {
        LayeredConfigBuilder::new()
    }

    /// Create a resolver and ingest the given sources in order.
    pub fn with_sources(sources: impl IntoIterator<Item = PropertySource>) -> Result<Self> {
        let config = Self::new();
        for source in sources {
            config.add_property_source(source)?;
        }
        Ok(config)
    }
}

impl Default for LayeredConfig<SerdeConversion> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ConversionService> LayeredConfig<C> {
    pub(crate) fn with_parts(
        conversion: C,
        placeholder_resolver: Arc<dyn PlaceholderResolver>,
        port_scanner: Arc<dyn PortScanner>,
        environment: Arc<EnvironmentProperties>,
    ) -> Self {
        Self {
            conversion,
            placeholder_resolver,
            random_expander: RandomValueExpander::new(port_scanner),
            environment,
            sources: DashMap::new(),
            catalog: ArcSwap::from_pointee(Catalog::default()),
            ingest_lock: Mutex::new(()),
            contains_cache: DashMap::new(),
            resolved_value_cache: DashMap::new(),
        }
    }

    /// Ingest a property source, replacing any prior source of the same name
    /// in the registry. Caches are reset.
    ///
    /// # Errors
    ///
    /// Fails eagerly on the first malformed `${random.*}` expression in the
    /// source; entries processed before the failure remain in the catalog.
    pub fn add_property_source(&self, source: PropertySource) -> Result<()> {
        let convention = source.convention();
        self.process_property_source(Arc::new(source), convention)
    }

    /// Ingest a map of values as a source named `name`, with raw-convention
    /// keys.
    pub fn add_map<K, V>(
        &self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> Result<()>
    where
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        self.add_property_source(PropertySource::of(name, values))
    }

    /// Whether an entry exists for exactly `name` under any convention.
    pub fn contains_property(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        if let Some(cached) = self.contains_cache.get(name) {
            return *cached;
        }
        let catalog = self.catalog.load();
        let result = [PropertyCatalog::Generated, PropertyCatalog::Raw]
            .iter()
            .any(|partition| catalog.partition(*partition).contains_key(name));
        self.contains_cache.insert(name.to_string(), result);
        result
    }

    /// Whether `name` itself or any property beneath `name.` exists.
    pub fn contains_properties(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        let catalog = self.catalog.load();
        let prefix = format!("{name}.");
        [PropertyCatalog::Generated, PropertyCatalog::Raw]
            .iter()
            .any(|partition| {
                let entries = catalog.partition(*partition);
                entries.contains_key(name) || entries.keys().any(|key| key.starts_with(&prefix))
            })
    }

    /// Resolve `name` to a typed value.
    ///
    /// Lookup tries the generated catalog, the hyphen-normalized key, the raw
    /// catalog, and finally structural access for an `[idx]` suffix (sequence
    /// index, mapping key, or the compound `base.idx` key). A found value has
    /// its placeholders resolved and is then converted to `T`.
    ///
    /// A missing key requested as [`Properties`] or [`PropertyMap`] yields
    /// the synthesized (possibly empty) sub-structure instead of `None`.
    ///
    /// # Errors
    ///
    /// Only placeholder resolution can fail; a value that merely cannot be
    /// converted to `T` is `Ok(None)`.
    pub fn get_property<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        if name.is_empty() {
            return Ok(None);
        }
        let cacheable = is_cacheable::<T>();
        if cacheable {
            if let Some(cached) = self
                .resolved_value_cache
                .get(&(name.to_string(), TypeId::of::<T>()))
            {
                return Ok(cached
                    .as_ref()
                    .and_then(|value| value.downcast_ref::<T>().cloned()));
            }
        }

        let catalog = self.catalog.load();
        let generated = catalog.partition(PropertyCatalog::Generated);
        let raw = catalog.partition(PropertyCatalog::Raw);

        let mut value = generated.get(name);
        if value.is_none() {
            value = generated.get(normalize_name(name).as_str());
            if value.is_none() && !name.contains('[') {
                // last chance lookup against the source-exact keys
                value = raw.get(name);
            }
        }
        if value.is_none() {
            if let Some(bracket) = name.find('[') {
                if name.ends_with(']') {
                    let base = &name[..bracket];
                    let index = &name[bracket + 1..name.len() - 1];
                    if let Some(container) = generated.get(base) {
                        if !index.is_empty() {
                            value = match container {
                                PropertyValue::Sequence(items) => match index.parse::<usize>() {
                                    Ok(position) => items.get(position),
                                    Err(_) => Some(container),
                                },
                                PropertyValue::Mapping(map) => map.get(index),
                                other => Some(other),
                            };
                        }
                    } else if !index.is_empty() {
                        value = generated.get(format!("{base}.{index}").as_str());
                    }
                }
            }
        }

        if let Some(found) = value {
            let resolved = self.resolve_placeholders_in(found)?;
            let converted = self.conversion.convert::<T>(&resolved);
            if converted.is_some() {
                trace!("resolved value for property: {name}");
            } else {
                trace!("resolved value cannot be converted to the requested type for property: {name}");
            }
            if cacheable {
                self.resolved_value_cache.insert(
                    (name.to_string(), TypeId::of::<T>()),
                    converted
                        .clone()
                        .map(|value| Arc::new(value) as Arc<dyn Any + Send + Sync>),
                );
            }
            return Ok(converted);
        }

        trace!("no value found for property: {name}");
        if let Some(synthesized) = self.synthesize_missing::<T>(name, generated)? {
            return Ok(Some(synthesized));
        }
        if cacheable {
            self.resolved_value_cache
                .insert((name.to_string(), TypeId::of::<T>()), None);
        }
        Ok(None)
    }

    /// The flat mapping of properties beneath `prefix.`, keys reformatted per
    /// `key_format`.
    ///
    /// # Errors
    ///
    /// Fails only if placeholder resolution inside a value fails.
    pub fn get_properties(&self, prefix: &str, key_format: KeyFormat) -> Result<PropertyMap> {
        self.get_properties_with(prefix, key_format, MapTransformation::Flat)
    }

    /// The properties beneath `prefix.` with an explicit flat/nested
    /// transformation.
    ///
    /// # Errors
    ///
    /// Fails only if placeholder resolution inside a value fails.
    pub fn get_properties_with(
        &self,
        prefix: &str,
        key_format: KeyFormat,
        transformation: MapTransformation,
    ) -> Result<PropertyMap> {
        if prefix.is_empty() {
            return Ok(PropertyMap::new());
        }
        let catalog = self.catalog.load();
        let entries = catalog.partition(partition_for(key_format));
        self.resolve_sub_map(prefix, entries, Some(key_format), transformation, false)
    }

    /// The flat mapping of properties beneath `prefix.` with values converted
    /// to `V`; entries that cannot be converted are skipped.
    ///
    /// When `V` is itself a list type, indexed element keys (`key[0]`) are
    /// skipped so the whole-list entry is not double-counted.
    ///
    /// # Errors
    ///
    /// Fails only if placeholder resolution inside a value fails.
    pub fn get_properties_of<V>(
        &self,
        prefix: &str,
        key_format: KeyFormat,
    ) -> Result<IndexMap<String, V>>
    where
        V: DeserializeOwned,
    {
        if prefix.is_empty() {
            return Ok(IndexMap::new());
        }
        // probe: a type that accepts an empty sequence is list-shaped
        let value_type_is_list = self
            .conversion
            .convert::<V>(&PropertyValue::Sequence(Vec::new()))
            .is_some();
        let catalog = self.catalog.load();
        let entries = catalog.partition(partition_for(key_format));
        let flat = self.resolve_sub_map(
            prefix,
            entries,
            Some(key_format),
            MapTransformation::Flat,
            value_type_is_list,
        )?;
        let mut converted = IndexMap::with_capacity(flat.len());
        for (key, value) in flat {
            if let Some(value) = self.conversion.convert::<V>(&value) {
                converted.insert(key, value);
            }
        }
        Ok(converted)
    }

    /// The immediate child segment names beneath `prefix.`.
    pub fn get_property_entries(&self, prefix: &str) -> HashSet<String> {
        if prefix.is_empty() {
            return HashSet::new();
        }
        let catalog = self.catalog.load();
        let dotted = format!("{prefix}.");
        catalog
            .partition(PropertyCatalog::Normalized)
            .keys()
            .filter_map(|key| key.strip_prefix(dotted.as_str()))
            .map(|rest| match rest.find('.') {
                Some(dot) => rest[..dot].to_string(),
                None => rest.to_string(),
            })
            .collect()
    }

    /// Keys matching a wildcard path pattern, as tuples of captured wildcard
    /// values.
    ///
    /// `[*]` matches any array index, `.*.` any single path segment, and a
    /// trailing `.*` any suffix. For `server.hosts[*].name` over keys
    /// `server.hosts[0].name` and `server.hosts[1].name` the result captures
    /// `["0"]` and `["1"]`.
    pub fn get_property_path_matches(&self, path_pattern: &str) -> HashSet<Vec<String>> {
        let mut results = HashSet::new();
        if path_pattern.is_empty() {
            return results;
        }
        let ends_with_wildcard = path_pattern.ends_with(".*");
        let mut resolved = path_pattern
            .replace("[*]", r"\[([\w\d-]+?)\]")
            .replace(".*.", r"\.([\w\d-]+?)\.");
        if ends_with_wildcard {
            resolved = resolved.replace(".*", r"\S*");
        } else {
            resolved.push_str(r"\S*");
        }
        let Ok(pattern) = Regex::new(&format!("^{resolved}$")) else {
            trace!("unusable path pattern: {path_pattern}");
            return results;
        };
        let catalog = self.catalog.load();
        for key in catalog.partition(PropertyCatalog::Generated).keys() {
            if let Some(captures) = pattern.captures(key) {
                if captures.len() > 1 {
                    let groups = (1..captures.len())
                        .map(|group| {
                            captures
                                .get(group)
                                .map(|m| m.as_str().to_string())
                                .unwrap_or_default()
                        })
                        .collect();
                    results.insert(groups);
                }
            }
        }
        results
    }

    /// Every property in the catalog, keys reformatted per `key_convention`,
    /// flat or rebuilt into nested mappings.
    ///
    /// # Errors
    ///
    /// Fails only if placeholder resolution inside a value fails.
    pub fn get_all_properties(
        &self,
        key_convention: KeyFormat,
        transformation: MapTransformation,
    ) -> Result<PropertyMap> {
        let catalog = self.catalog.load();
        let entries = catalog.partition(partition_for(key_convention));
        let mut map = PropertyMap::new();
        for (key, value) in entries {
            let key = key_convention.format(key);
            let value = self.resolve_placeholders_in(value)?;
            if transformation == MapTransformation::Nested && key.contains('.') {
                insert_nested(&mut map, &key, value);
            } else {
                map.insert(key, value);
            }
        }
        Ok(map)
    }

    /// Names of the currently registered property sources.
    pub fn property_source_names(&self) -> Vec<String> {
        self.sources.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Drop all cached resolution outcomes. Subsequent lookups re-derive
    /// results from the catalog.
    pub fn reset_caches(&self) {
        self.contains_cache.clear();
        self.resolved_value_cache.clear();
    }

    /// Release resources held by the placeholder resolver.
    pub fn close(&self) {
        self.placeholder_resolver.close();
    }

    fn process_property_source(
        &self,
        source: Arc<PropertySource>,
        convention: PropertyConvention,
    ) -> Result<()> {
        // registry update stays outside the ingest lock: last writer wins,
        // and sources are immutable snapshots
        self.sources
            .insert(source.name().to_string(), Arc::clone(&source));
        let _ingest = self.ingest_lock.lock();
        let mut catalog = Catalog::clone(&self.catalog.load());
        for (property, raw_value) in source.iter() {
            trace!("processing property key: {property}");
            let value = self.expand_random_expressions(convention, property, raw_value)?;

            let resolved_names = self.resolve_names_for_convention(property, convention);
            let mut first = true;
            for resolved_name in resolved_names.iter() {
                if let Some(bracket) = resolved_name.find('[') {
                    let base = &resolved_name[..bracket];
                    let entries = catalog.partition_mut(PropertyCatalog::Generated);
                    entries.insert(resolved_name.clone(), value.clone());
                    entries
                        .entry(base.to_string())
                        .or_insert(PropertyValue::Scalar(Scalar::Null))
                        .expand(&resolved_name[bracket..], &value);
                    if first {
                        catalog
                            .partition_mut(PropertyCatalog::Normalized)
                            .insert(base.to_string(), value.clone());
                        first = false;
                    }
                } else {
                    let entries = catalog.partition_mut(PropertyCatalog::Generated);
                    if value.is_container() {
                        value.collapse_into(resolved_name, entries);
                    }
                    entries.insert(resolved_name.clone(), value.clone());
                    if first {
                        catalog
                            .partition_mut(PropertyCatalog::Normalized)
                            .insert(resolved_name.clone(), value.clone());
                        first = false;
                    }
                }
            }

            catalog
                .partition_mut(PropertyCatalog::Raw)
                .insert(property.to_string(), value);
        }
        self.catalog.store(Arc::new(catalog));
        self.reset_caches();
        Ok(())
    }

    fn expand_random_expressions(
        &self,
        convention: PropertyConvention,
        property: &str,
        value: &PropertyValue,
    ) -> Result<PropertyValue> {
        let prefix = self.placeholder_resolver.prefix();
        match value {
            PropertyValue::Scalar(Scalar::Str(s)) => {
                match self.random_expander.expand(convention, property, s, prefix)? {
                    Some(replaced) => Ok(PropertyValue::Scalar(Scalar::Str(replaced))),
                    None => Ok(value.clone()),
                }
            }
            PropertyValue::Sequence(items) => {
                let mut replaced = items.clone();
                for item in &mut replaced {
                    if let PropertyValue::Scalar(Scalar::Str(s)) = item {
                        if let Some(expanded) =
                            self.random_expander.expand(convention, property, s, prefix)?
                        {
                            *item = PropertyValue::Scalar(Scalar::Str(expanded));
                        }
                    }
                }
                Ok(PropertyValue::Sequence(replaced))
            }
            other => Ok(other.clone()),
        }
    }

    fn resolve_names_for_convention(
        &self,
        property: &str,
        convention: PropertyConvention,
    ) -> Vec<String> {
        match convention {
            PropertyConvention::EnvironmentVariable => (*self
                .environment
                .find_property_names_for_environment_variable(property))
            .clone(),
            PropertyConvention::Raw => vec![hyphenate(property, true)],
        }
    }

    fn resolve_placeholders_in(&self, value: &PropertyValue) -> Result<PropertyValue> {
        match value {
            PropertyValue::Scalar(Scalar::Str(s)) => {
                let resolved = self
                    .placeholder_resolver
                    .resolve_required_placeholders(s, self)?;
                Ok(PropertyValue::Scalar(Scalar::Str(resolved)))
            }
            PropertyValue::Sequence(items) => items
                .iter()
                .map(|item| self.resolve_placeholders_in(item))
                .collect::<Result<Vec<_>>>()
                .map(PropertyValue::Sequence),
            PropertyValue::Mapping(map) => map
                .iter()
                .map(|(key, item)| Ok((key.clone(), self.resolve_placeholders_in(item)?)))
                .collect::<Result<PropertyMap>>()
                .map(PropertyValue::Mapping),
            other => Ok(other.clone()),
        }
    }

    fn resolve_sub_map(
        &self,
        name: &str,
        entries: &PropertyMap,
        key_format: Option<KeyFormat>,
        transformation: MapTransformation,
        value_type_is_list: bool,
    ) -> Result<PropertyMap> {
        let prefix = format!("{name}.");
        let mut sub_map = PropertyMap::new();
        for (key, entry_value) in entries {
            if value_type_is_list && key.contains('[') && key.ends_with(']') {
                continue;
            }
            let Some(sub_key) = key.strip_prefix(prefix.as_str()) else {
                continue;
            };
            let value = self.resolve_placeholders_in(entry_value)?;
            match transformation {
                MapTransformation::Flat => {
                    let sub_key = match key_format {
                        Some(format) => format.format(sub_key),
                        None => sub_key.to_string(),
                    };
                    sub_map.insert(sub_key, value);
                }
                MapTransformation::Nested => {
                    process_submap_key(&mut sub_map, sub_key, value, key_format);
                }
            }
        }
        Ok(sub_map)
    }

    fn resolve_sub_properties(&self, name: &str, entries: &PropertyMap) -> Result<Properties> {
        let prefix = format!("{name}.");
        let mut properties = Properties::new();
        for (key, value) in entries {
            let Some(sub_key) = key.strip_prefix(prefix.as_str()) else {
                continue;
            };
            let resolved = self.resolve_placeholders_in(value)?;
            properties.insert(sub_key, resolved.to_string());
        }
        Ok(properties)
    }

    fn synthesize_missing<T>(&self, name: &str, entries: &PropertyMap) -> Result<Option<T>>
    where
        T: DeserializeOwned + 'static,
    {
        let requested = TypeId::of::<T>();
        if requested == TypeId::of::<Properties>() {
            let properties = self.resolve_sub_properties(name, entries)?;
            return Ok(downcast_value(properties));
        }
        if requested == TypeId::of::<PropertyMap>() {
            let sub_map =
                self.resolve_sub_map(name, entries, None, MapTransformation::Nested, false)?;
            return Ok(downcast_value(sub_map));
        }
        Ok(None)
    }
}

impl<C: ConversionService> PropertyLookup for LayeredConfig<C> {
    fn string_value(&self, name: &str) -> Result<Option<String>> {
        self.get_property::<String>(name)
    }
}

fn partition_for(key_format: KeyFormat) -> PropertyCatalog {
    if key_format == KeyFormat::Raw {
        PropertyCatalog::Raw
    } else {
        PropertyCatalog::Generated
    }
}

fn normalize_name(name: &str) -> String {
    name.replace('-', ".")
}

fn is_cacheable<T: 'static>() -> bool {
    let id = TypeId::of::<T>();
    id == TypeId::of::<String>()
        || id == TypeId::of::<bool>()
        || id == TypeId::of::<char>()
        || id == TypeId::of::<i8>()
        || id == TypeId::of::<i16>()
        || id == TypeId::of::<i32>()
        || id == TypeId::of::<i64>()
        || id == TypeId::of::<i128>()
        || id == TypeId::of::<isize>()
        || id == TypeId::of::<u8>()
        || id == TypeId::of::<u16>()
        || id == TypeId::of::<u32>()
        || id == TypeId::of::<u64>()
        || id == TypeId::of::<u128>()
        || id == TypeId::of::<usize>()
        || id == TypeId::of::<f32>()
        || id == TypeId::of::<f64>()
}

fn downcast_value<S: 'static, T: 'static>(value: S) -> Option<T> {
    let boxed: Box<dyn Any> = Box::new(value);
    boxed.downcast::<T>().ok().map(|value| *value)
}

fn process_submap_key(
    map: &mut PropertyMap,
    key: &str,
    value: PropertyValue,
    key_format: Option<KeyFormat>,
) {
    let format = |segment: &str| match key_format {
        Some(format) => format.format(segment),
        None => segment.to_string(),
    };
    match key.split_once('.') {
        None => {
            map.insert(format(key), value);
        }
        Some((head, rest)) => {
            let head = format(head);
            let slot = map
                .entry(head)
                .or_insert_with(|| PropertyValue::Mapping(PropertyMap::new()));
            if let PropertyValue::Mapping(nested) = slot {
                process_submap_key(nested, rest, value, key_format);
            }
        }
    }
}

fn insert_nested(map: &mut PropertyMap, key: &str, value: PropertyValue) {
    let Some((head, rest)) = key.split_once('.') else {
        map.insert(key.to_string(), value);
        return;
    };
    let descends = matches!(map.get(head), None | Some(PropertyValue::Mapping(_)));
    if !descends {
        // a scalar already occupies the intermediate key; the leaf lands at
        // this level under its final segment
        if let Some(last) = rest.rsplit('.').next() {
            map.insert(last.to_string(), value);
        }
        return;
    }
    let slot = map
        .entry(head.to_string())
        .or_insert_with(|| PropertyValue::Mapping(PropertyMap::new()));
    if let PropertyValue::Mapping(nested) = slot {
        insert_nested(nested, rest, value);
    }
}
