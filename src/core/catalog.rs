//! The partitioned property catalog.

use crate::core::value::PropertyMap;

/// Which partition of the catalog a lookup or write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PropertyCatalog {
    /// Source-exact keys, kept for fallback lookup.
    Raw,
    /// One canonical key per logical property. An environment variable
    /// `FOO_BAR` is normalized to `foo.bar`.
    Normalized,
    /// Every convention variant of a key, so a lookup succeeds regardless of
    /// the caller's naming style. `FOO_BAR_BAZ` produces `foo.bar.baz`,
    /// `foo.bar-baz`, and `foo-bar.baz`.
    Generated,
}

/// The resolver's internal index of property entries, one insertion-ordered
/// map per partition.
///
/// A catalog snapshot is immutable once published; ingestion clones, mutates,
/// and republishes atomically.
#[derive(Debug, Clone, Default)]
pub(crate) struct Catalog {
    raw: PropertyMap,
    normalized: PropertyMap,
    generated: PropertyMap,
}

impl Catalog {
    pub(crate) fn partition(&self, which: PropertyCatalog) -> &PropertyMap {
        match which {
            PropertyCatalog::Raw => &self.raw,
            PropertyCatalog::Normalized => &self.normalized,
            PropertyCatalog::Generated => &self.generated,
        }
    }

    pub(crate) fn partition_mut(&mut self, which: PropertyCatalog) -> &mut PropertyMap {
        match which {
            PropertyCatalog::Raw => &mut self.raw,
            PropertyCatalog::Normalized => &mut self.normalized,
            PropertyCatalog::Generated => &mut self.generated,
        }
    }
}
