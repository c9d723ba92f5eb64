//! Integration tests for property resolution across sources and conventions.

use layered_config::prelude::*;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn environment_variable_keys_answer_every_convention() {
    let config = LayeredConfig::builder()
        .with_source(PropertySource::with_convention(
            "env",
            [("FOO_BAR", PropertyValue::from("baz"))],
            PropertyConvention::EnvironmentVariable,
        ))
        .build()
        .unwrap();

    let dotted: Option<String> = config.get_property("foo.bar").unwrap();
    let hyphenated: Option<String> = config.get_property("foo-bar").unwrap();
    assert_eq!(dotted.as_deref(), Some("baz"));
    assert_eq!(hyphenated.as_deref(), Some("baz"));
    assert!(config.contains_property("foo.bar"));
    assert!(config.contains_property("foo-bar"));
}

#[test]
fn ambiguous_env_segmentations_all_resolve() {
    let config = LayeredConfig::builder()
        .with_source(PropertySource::with_convention(
            "env",
            [("FOO_BAR_BAZ", PropertyValue::from("qux"))],
            PropertyConvention::EnvironmentVariable,
        ))
        .build()
        .unwrap();

    for name in ["foo.bar.baz", "foo.bar-baz", "foo-bar.baz"] {
        let value: Option<String> = config.get_property(name).unwrap();
        assert_eq!(value.as_deref(), Some("qux"), "lookup failed for {name}");
    }
}

#[test]
fn camel_case_keys_are_addressable_hyphenated() {
    let config = LayeredConfig::new();
    config
        .add_map("app", [("db.maxConnections", PropertyValue::from(25))])
        .unwrap();

    let hyphenated: Option<u32> = config.get_property("db.max-connections").unwrap();
    assert_eq!(hyphenated, Some(25));
    // the exact authored key survives in the raw catalog
    let raw: Option<u32> = config.get_property("db.maxConnections").unwrap();
    assert_eq!(raw, Some(25));
}

#[test]
fn hyphenated_lookups_normalize_to_dotted_entries() {
    let config = LayeredConfig::new();
    config.add_map("app", [("db.url", PropertyValue::from("x"))]).unwrap();

    let value: Option<String> = config.get_property("db-url").unwrap();
    assert_eq!(value.as_deref(), Some("x"));
}

#[test]
fn later_sources_take_precedence() {
    let config = LayeredConfig::new();
    config
        .add_map(
            "a",
            [
                ("shared", PropertyValue::from("one")),
                ("only-a", PropertyValue::from("kept")),
            ],
        )
        .unwrap();
    config.add_map("b", [("shared", PropertyValue::from("two"))]).unwrap();

    let shared: Option<String> = config.get_property("shared").unwrap();
    let only_a: Option<String> = config.get_property("only-a").unwrap();
    assert_eq!(shared.as_deref(), Some("two"));
    assert_eq!(only_a.as_deref(), Some("kept"));
}

#[test]
fn re_adding_a_source_by_name_supersedes_it() {
    let config = LayeredConfig::new();
    config.add_map("app", [("shared", PropertyValue::from("old"))]).unwrap();
    config.add_map("other", [("shared", PropertyValue::from("middle"))]).unwrap();
    config.add_map("app", [("shared", PropertyValue::from("new"))]).unwrap();

    let shared: Option<String> = config.get_property("shared").unwrap();
    assert_eq!(shared.as_deref(), Some("new"));

    let mut names = config.property_source_names();
    names.sort();
    assert_eq!(names, vec!["app".to_string(), "other".to_string()]);
}

#[test]
fn indexed_entries_build_a_whole_list() {
    let config = LayeredConfig::new();
    config
        .add_map(
            "list",
            [
                ("a[0]", PropertyValue::from("x")),
                ("a[1]", PropertyValue::from("y")),
            ],
        )
        .unwrap();

    let list: Option<Vec<String>> = config.get_property("a").unwrap();
    assert_eq!(list, Some(vec!["x".to_string(), "y".to_string()]));
}

#[test]
fn whole_list_answers_indexed_lookups() {
    let config = LayeredConfig::new();
    config
        .add_map("list", [("a", PropertyValue::from(vec!["x", "y"]))])
        .unwrap();

    let first: Option<String> = config.get_property("a[0]").unwrap();
    let second: Option<String> = config.get_property("a[1]").unwrap();
    let missing: Option<String> = config.get_property("a[9]").unwrap();
    assert_eq!(first.as_deref(), Some("x"));
    assert_eq!(second.as_deref(), Some("y"));
    assert_eq!(missing, None);
}

#[test]
fn nested_indexed_paths_expand_into_structures() {
    let config = LayeredConfig::new();
    config
        .add_map(
            "hosts",
            [
                ("server.hosts[0].name", PropertyValue::from("a")),
                ("server.hosts[1].name", PropertyValue::from("b")),
            ],
        )
        .unwrap();

    let hosts: Option<PropertyMap> = config.get_property("server").unwrap();
    let hosts = hosts.unwrap();
    let PropertyValue::Sequence(entries) = hosts.get("hosts").unwrap() else {
        panic!("expected a sequence under server.hosts");
    };
    assert_eq!(entries.len(), 2);
}

/// Conversion wrapper that counts how often it is consulted.
#[derive(Clone, Default)]
struct CountingConversion {
    calls: Arc<AtomicUsize>,
}

impl ConversionService for CountingConversion {
    fn convert<T: DeserializeOwned>(&self, value: &PropertyValue) -> Option<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        SerdeConversion.convert(value)
    }
}

#[test]
fn repeated_lookups_are_served_from_cache() {
    let counting = CountingConversion::default();
    let calls = Arc::clone(&counting.calls);
    let config = LayeredConfig::builder()
        .with_map("src", [("answer", PropertyValue::from("42"))])
        .with_conversion(counting)
        .build()
        .unwrap();

    let first: Option<i64> = config.get_property("answer").unwrap();
    let after_first = calls.load(Ordering::SeqCst);
    let second: Option<i64> = config.get_property("answer").unwrap();

    assert_eq!(first, Some(42));
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), after_first);
}

#[test]
fn absent_lookups_are_cached_too() {
    let counting = CountingConversion::default();
    let calls = Arc::clone(&counting.calls);
    let config = LayeredConfig::builder()
        .with_map("src", [("present", PropertyValue::from("x"))])
        .with_conversion(counting)
        .build()
        .unwrap();

    let miss: Option<String> = config.get_property("absent").unwrap();
    let after_first = calls.load(Ordering::SeqCst);
    let again: Option<String> = config.get_property("absent").unwrap();

    assert_eq!(miss, None);
    assert_eq!(again, None);
    assert_eq!(calls.load(Ordering::SeqCst), after_first);
}

#[test]
fn wildcard_pattern_captures_array_indices() {
    let config = LayeredConfig::new();
    config
        .add_map(
            "hosts",
            [
                ("server.hosts[0].name", PropertyValue::from("a")),
                ("server.hosts[1].name", PropertyValue::from("b")),
            ],
        )
        .unwrap();

    let matches = config.get_property_path_matches("server.hosts[*].name");
    let expected: HashSet<Vec<String>> =
        [vec!["0".to_string()], vec!["1".to_string()]].into_iter().collect();
    assert_eq!(matches, expected);
}

#[test]
fn wildcard_pattern_captures_path_segments() {
    let config = LayeredConfig::new();
    config
        .add_map(
            "dbs",
            [
                ("datasources.default.url", PropertyValue::from("one")),
                ("datasources.backup.url", PropertyValue::from("two")),
            ],
        )
        .unwrap();

    let matches = config.get_property_path_matches("datasources.*.url");
    let expected: HashSet<Vec<String>> =
        [vec!["default".to_string()], vec!["backup".to_string()]].into_iter().collect();
    assert_eq!(matches, expected);
}

#[test]
fn sub_map_extraction_nested_and_flat() {
    let config = LayeredConfig::new();
    config
        .add_map(
            "db",
            [
                ("db.url", PropertyValue::from("x")),
                ("db.user", PropertyValue::from("y")),
            ],
        )
        .unwrap();

    let nested = config
        .get_properties_with("db", KeyFormat::Raw, MapTransformation::Nested)
        .unwrap();
    assert_eq!(nested.get("url"), Some(&PropertyValue::from("x")));
    assert_eq!(nested.get("user"), Some(&PropertyValue::from("y")));

    let flat = config.get_properties("db", KeyFormat::Raw).unwrap();
    assert_eq!(flat.get("url"), Some(&PropertyValue::from("x")));
    assert_eq!(flat.get("user"), Some(&PropertyValue::from("y")));
}

#[test]
fn sub_map_keys_follow_the_requested_format() {
    let config = LayeredConfig::new();
    config
        .add_map("db", [("db.maxConnections", PropertyValue::from(10))])
        .unwrap();

    let camel = config.get_properties("db", KeyFormat::CamelCase).unwrap();
    assert!(camel.contains_key("maxConnections"), "keys: {:?}", camel.keys().collect::<Vec<_>>());

    let hyphenated = config.get_properties("db", KeyFormat::Hyphenated).unwrap();
    assert!(hyphenated.contains_key("max-connections"));
}

#[test]
fn deep_sub_maps_nest_on_dots() {
    let config = LayeredConfig::new();
    config
        .add_map(
            "app",
            [
                ("app.db.url", PropertyValue::from("u")),
                ("app.db.pool.size", PropertyValue::from(5)),
            ],
        )
        .unwrap();

    let nested = config
        .get_properties_with("app", KeyFormat::Raw, MapTransformation::Nested)
        .unwrap();
    let PropertyValue::Mapping(db) = nested.get("db").unwrap() else {
        panic!("expected nested mapping under db");
    };
    assert_eq!(db.get("url"), Some(&PropertyValue::from("u")));
    let PropertyValue::Mapping(pool) = db.get("pool").unwrap() else {
        panic!("expected nested mapping under pool");
    };
    assert_eq!(pool.get("size"), Some(&PropertyValue::from(5)));
}

#[test]
fn list_valued_sub_maps_skip_element_keys() {
    let config = LayeredConfig::new();
    config
        .add_map("svc", [("svc.tags", PropertyValue::from(vec!["a", "b"]))])
        .unwrap();

    let maps: indexmap::IndexMap<String, Vec<String>> =
        config.get_properties_of("svc", KeyFormat::Hyphenated).unwrap();
    assert_eq!(maps.len(), 1);
    assert_eq!(
        maps.get("tags"),
        Some(&vec!["a".to_string(), "b".to_string()])
    );
}

#[test]
fn missing_key_as_properties_bag_is_empty_not_absent() {
    let config = LayeredConfig::new();
    config.add_map("src", [("present", PropertyValue::from("x"))]).unwrap();

    let bag: Option<Properties> = config.get_property("missing").unwrap();
    assert_eq!(bag, Some(Properties::new()));

    let map: Option<PropertyMap> = config.get_property("missing").unwrap();
    assert_eq!(map, Some(PropertyMap::new()));

    let plain: Option<String> = config.get_property("missing").unwrap();
    assert_eq!(plain, None);
}

#[test]
fn prefix_lookup_synthesizes_populated_properties_bag() {
    let config = LayeredConfig::new();
    config
        .add_map(
            "db",
            [
                ("db.url", PropertyValue::from("x")),
                ("db.user", PropertyValue::from("y")),
            ],
        )
        .unwrap();

    let bag: Option<Properties> = config.get_property("db").unwrap();
    let bag = bag.unwrap();
    assert_eq!(bag.get("url"), Some("x"));
    assert_eq!(bag.get("user"), Some("y"));
}

#[test]
fn placeholders_resolve_recursively_through_properties() {
    let config = LayeredConfig::new();
    config
        .add_map(
            "p",
            [
                ("greeting", PropertyValue::from("hello")),
                ("audience", PropertyValue::from("${greeting} world")),
                ("message", PropertyValue::from("say: ${audience}")),
            ],
        )
        .unwrap();

    let message: Option<String> = config.get_property("message").unwrap();
    assert_eq!(message.as_deref(), Some("say: hello world"));
}

#[test]
fn placeholder_defaults_apply_when_reference_is_missing() {
    let config = LayeredConfig::new();
    config
        .add_map("p", [("url", PropertyValue::from("${db.host:localhost}:5432"))])
        .unwrap();

    let url: Option<String> = config.get_property("url").unwrap();
    assert_eq!(url.as_deref(), Some("localhost:5432"));
}

#[test]
fn unresolved_required_placeholder_is_an_error() {
    let config = LayeredConfig::new();
    config.add_map("p", [("broken", PropertyValue::from("${nope}"))]).unwrap();

    let err = config.get_property::<String>("broken").unwrap_err();
    assert!(matches!(err, ConfigError::UnresolvedPlaceholder { .. }));
}

#[test]
fn contains_properties_matches_prefixes() {
    let config = LayeredConfig::new();
    config.add_map("db", [("db.url", PropertyValue::from("x"))]).unwrap();

    assert!(config.contains_properties("db"));
    assert!(config.contains_properties("db.url"));
    assert!(!config.contains_properties("server"));
}

#[test]
fn property_entries_list_immediate_children() {
    let config = LayeredConfig::new();
    config
        .add_map(
            "app",
            [
                ("app.db.url", PropertyValue::from("u")),
                ("app.db.user", PropertyValue::from("s")),
                ("app.name", PropertyValue::from("n")),
            ],
        )
        .unwrap();

    let entries = config.get_property_entries("app");
    let expected: HashSet<String> =
        ["db".to_string(), "name".to_string()].into_iter().collect();
    assert_eq!(entries, expected);
}

#[test]
fn get_all_properties_nested_rebuilds_structure() {
    let config = LayeredConfig::new();
    config
        .add_map(
            "src",
            [
                ("db.url", PropertyValue::from("x")),
                ("db.user", PropertyValue::from("y")),
            ],
        )
        .unwrap();

    let all = config
        .get_all_properties(KeyFormat::Raw, MapTransformation::Nested)
        .unwrap();
    let PropertyValue::Mapping(db) = all.get("db").unwrap() else {
        panic!("expected nested mapping under db");
    };
    assert_eq!(db.get("url"), Some(&PropertyValue::from("x")));
    assert_eq!(db.get("user"), Some(&PropertyValue::from("y")));
}

#[test]
fn get_all_properties_flat_keeps_dotted_keys() {
    let config = LayeredConfig::new();
    config.add_map("src", [("db.url", PropertyValue::from("x"))]).unwrap();

    let all = config
        .get_all_properties(KeyFormat::Raw, MapTransformation::Flat)
        .unwrap();
    assert_eq!(all.get("db.url"), Some(&PropertyValue::from("x")));
}

#[test]
fn shared_across_threads_while_ingesting() {
    let config = Arc::new(LayeredConfig::new());
    config.add_map("base", [("stable.key", PropertyValue::from("v"))]).unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let config = Arc::clone(&config);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    let value: Option<String> = config.get_property("stable.key").unwrap();
                    assert_eq!(value.as_deref(), Some("v"));
                }
            })
        })
        .collect();

    for round in 0..20 {
        config
            .add_map("churn", [(format!("churn.key{round}"), PropertyValue::from(round))])
            .unwrap();
    }

    for reader in readers {
        reader.join().unwrap();
    }
}
