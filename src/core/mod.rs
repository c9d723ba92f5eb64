//! Core property resolution types.

mod builder;
mod catalog;
mod conversion;
mod env_properties;
mod name_utils;
mod placeholder;
mod random;
mod resolver;
mod value;

pub use builder::LayeredConfigBuilder;
pub use conversion::{ConversionService, SerdeConversion};
pub use env_properties::EnvironmentProperties;
pub use name_utils::{KeyFormat, hyphenate};
pub use placeholder::{DefaultPlaceholderResolver, PlaceholderResolver, PropertyLookup};
pub use random::{LocalPortScanner, PortScanner};
pub use resolver::{LayeredConfig, MapTransformation};
pub use value::{Properties, PropertyMap, PropertyValue, Scalar};
