//! Typed conversion of property values.

use crate::core::value::{PropertyValue, Scalar};
use serde::de::DeserializeOwned;

/// Converts raw property values into requested target types.
///
/// Conversion is fallible but never an error: a value that cannot be
/// converted resolves to `None`, keeping the lookup path exception-free.
pub trait ConversionService: Send + Sync {
    /// Convert `value` into `T`, or `None` if no conversion applies.
    fn convert<T: DeserializeOwned>(&self, value: &PropertyValue) -> Option<T>;
}

/// The default serde-backed conversion service.
///
/// Direct deserialization is tried first. String scalars additionally fall
/// back to JSON-scalar parsing (`"8080"` converts to an integer, `"true"` to
/// a bool) and to comma-separated list splitting, which is what stringly
/// typed sources such as environment variables need. Non-string scalars fall
/// back to their string rendering so an integer can satisfy a string target.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerdeConversion;

impl ConversionService for SerdeConversion {
    fn convert<T: DeserializeOwned>(&self, value: &PropertyValue) -> Option<T> {
        if let Ok(converted) = serde_json::from_value::<T>(serde_json::Value::from(value)) {
            return Some(converted);
        }
        match value {
            PropertyValue::Scalar(Scalar::Str(raw)) => {
                if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(raw.trim()) {
                    if let Ok(converted) = serde_json::from_value::<T>(parsed) {
                        return Some(converted);
                    }
                }
                if raw.contains(',') {
                    let items = raw
                        .split(',')
                        .map(|item| serde_json::Value::String(item.trim().to_string()))
                        .collect();
                    if let Ok(converted) = serde_json::from_value::<T>(serde_json::Value::Array(items)) {
                        return Some(converted);
                    }
                }
                None
            }
            PropertyValue::Scalar(Scalar::Null) => None,
            PropertyValue::Scalar(_) => {
                serde_json::from_value::<T>(serde_json::Value::String(value.to_string())).ok()
            }
            _ => None,
        }
    }
}
