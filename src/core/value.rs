//! The property value model.
//!
//! Values flowing through the resolver are a small closed set of shapes:
//! scalars, ordered sequences, and string-keyed mappings. Structural
//! expansion (an indexed path like `[0].name` growing nested containers) and
//! collapsing (a container flattening into `prefix[0]`, `prefix.key` entries)
//! are methods on the variant rather than type checks scattered through the
//! ingestion pipeline.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An insertion-ordered mapping from property key to value.
pub type PropertyMap = IndexMap<String, PropertyValue>;

/// A scalar property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Absent value; also pads sequence slots created by indexed expansion.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A string.
    Str(String),
}

/// A property value: scalar, ordered sequence, or string-keyed mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// A single scalar value.
    Scalar(Scalar),
    /// An ordered sequence of values.
    Sequence(Vec<PropertyValue>),
    /// A nested string-keyed mapping.
    Mapping(PropertyMap),
}

impl PropertyValue {
    /// Whether this value is the null scalar.
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Scalar(Scalar::Null))
    }

    /// Whether this value is a sequence or mapping.
    pub fn is_container(&self) -> bool {
        matches!(self, PropertyValue::Sequence(_) | PropertyValue::Mapping(_))
    }

    /// The string content, if this value is a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Scalar(Scalar::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Expand a structural path into this value, growing containers as the
    /// path implies and assigning `value` at the terminal position.
    ///
    /// The path grammar, consumed left to right until exhausted:
    /// - `[N]` with N decimal: this value becomes an ordered sequence (padded
    ///   with nulls up to index N); descend into index N. A non-numeric index
    ///   descends into a mapping keyed by the literal index text.
    /// - `.name` (name runs to the next `[` or the end): this value becomes a
    ///   mapping; descend into `name`.
    /// - empty path: assign `value` here.
    pub fn expand(&mut self, path: &str, value: &PropertyValue) {
        if path.is_empty() {
            *self = value.clone();
            return;
        }
        if let Some(rest) = path.strip_prefix('[') {
            let Some(close) = rest.find(']') else { return };
            let index = &rest[..close];
            let remainder = &rest[close + 1..];
            if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(position) = index.parse::<usize>() {
                    let items = self.make_sequence();
                    if items.len() <= position {
                        items.resize(position + 1, PropertyValue::Scalar(Scalar::Null));
                    }
                    items[position].expand(remainder, value);
                }
            } else {
                self.make_mapping()
                    .entry(index.to_string())
                    .or_insert(PropertyValue::Scalar(Scalar::Null))
                    .expand(remainder, value);
            }
        } else if let Some(rest) = path.strip_prefix('.') {
            let (name, remainder) = match rest.find('[') {
                Some(bracket) => (&rest[..bracket], &rest[bracket..]),
                None => (rest, ""),
            };
            self.make_mapping()
                .entry(name.to_string())
                .or_insert(PropertyValue::Scalar(Scalar::Null))
                .expand(remainder, value);
        }
    }

    /// Collapse this value into flattened dotted/indexed keys under `prefix`.
    ///
    /// Sequences produce `prefix[i]` entries for each non-null element and
    /// also store the whole sequence at `prefix` (both representations
    /// coexist). Mappings recurse with `prefix.key`. Scalars store directly.
    pub fn collapse_into(&self, prefix: &str, entries: &mut PropertyMap) {
        match self {
            PropertyValue::Sequence(items) => {
                for (position, item) in items.iter().enumerate() {
                    if !item.is_null() {
                        item.collapse_into(&format!("{prefix}[{position}]"), entries);
                    }
                }
                entries.insert(prefix.to_string(), self.clone());
            }
            PropertyValue::Mapping(map) => {
                for (key, item) in map {
                    item.collapse_into(&format!("{prefix}.{key}"), entries);
                }
            }
            PropertyValue::Scalar(_) => {
                entries.insert(prefix.to_string(), self.clone());
            }
        }
    }

    fn make_sequence(&mut self) -> &mut Vec<PropertyValue> {
        if !matches!(self, PropertyValue::Sequence(_)) {
            *self = PropertyValue::Sequence(Vec::new());
        }
        let PropertyValue::Sequence(items) = self else {
            unreachable!()
        };
        items
    }

    fn make_mapping(&mut self) -> &mut PropertyMap {
        if !matches!(self, PropertyValue::Mapping(_)) {
            *self = PropertyValue::Mapping(PropertyMap::new());
        }
        let PropertyValue::Mapping(map) = self else {
            unreachable!()
        };
        map
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Scalar(Scalar::Str(s)) => f.write_str(s),
            other => write!(f, "{}", serde_json::Value::from(other)),
        }
    }
}

impl From<Scalar> for PropertyValue {
    fn from(value: Scalar) -> Self {
        PropertyValue::Scalar(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string()).into()
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Scalar::Str(value).into()
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Scalar::Bool(value).into()
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Scalar::Int(i64::from(value)).into()
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Scalar::Int(value).into()
    }
}

impl From<u16> for PropertyValue {
    fn from(value: u16) -> Self {
        Scalar::Int(i64::from(value)).into()
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Scalar::Float(value).into()
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(values: Vec<T>) -> Self {
        PropertyValue::Sequence(values.into_iter().map(Into::into).collect())
    }
}

impl From<&PropertyValue> for serde_json::Value {
    fn from(value: &PropertyValue) -> Self {
        match value {
            PropertyValue::Scalar(Scalar::Null) => serde_json::Value::Null,
            PropertyValue::Scalar(Scalar::Bool(b)) => (*b).into(),
            PropertyValue::Scalar(Scalar::Int(i)) => (*i).into(),
            PropertyValue::Scalar(Scalar::Float(f)) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            PropertyValue::Scalar(Scalar::Str(s)) => s.clone().into(),
            PropertyValue::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Into::into).collect())
            }
            PropertyValue::Mapping(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.into())).collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Scalar::Null.into(),
            serde_json::Value::Bool(b) => Scalar::Bool(b).into(),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Scalar::Int(i).into(),
                None => n.as_f64().map_or(Scalar::Null, Scalar::Float).into(),
            },
            serde_json::Value::String(s) => Scalar::Str(s).into(),
            serde_json::Value::Array(items) => {
                PropertyValue::Sequence(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => PropertyValue::Mapping(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::Value::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PropertyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(PropertyValue::from)
    }
}

/// A flat string-to-string properties bag, the synthesized result of
/// requesting a missing key as a bag of sub-properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
    entries: IndexMap<String, String>,
}

impl Properties {
    /// Create an empty properties bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any existing value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// The value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
