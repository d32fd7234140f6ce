//! Record categories, layouts and logical addresses.

use std::fmt;

/// One of the four disjoint record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Own-property value of a single object, keyed `ownerId[/path]`.
    Direct,
    /// Memoized value of a computed property, keyed by property then owner.
    Computed,
    /// Cross-object aggregate keyed by a namespace.
    Reduced,
    /// Opaque blob outside the record model. Carries no stamp.
    Custom,
}

impl Category {
    /// All categories, in export order.
    pub const ALL: [Category; 4] = [
        Category::Direct,
        Category::Computed,
        Category::Reduced,
        Category::Custom,
    ];

    /// Returns true if records of this category carry a stamp.
    #[must_use]
    pub const fn is_stamped(self) -> bool {
        !matches!(self, Category::Custom)
    }

    /// Returns true if payloads of this category may be arrays. Direct and
    /// reduced payloads are scalar text even when they begin with `[`.
    #[must_use]
    pub const fn holds_arrays(self) -> bool {
        matches!(self, Category::Computed)
    }

    /// Returns the lowercase category name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Category::Direct => "direct",
            Category::Computed => "computed",
            Category::Reduced => "reduced",
            Category::Custom => "custom",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A physical partition (one store directory) under the storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Partition {
    /// Shared direct/computed/reduced namespace of the canonical layout.
    Records,
    /// Direct records of the partitioned layout.
    Direct,
    /// Computed records of the partitioned layout.
    Computed,
    /// Reduced records of the partitioned layout.
    Reduced,
    /// Custom blobs (both layouts).
    Custom,
}

impl Partition {
    /// Directory name of the partition below the storage root.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Partition::Records => "records",
            Partition::Direct => "direct",
            Partition::Computed => "computed",
            Partition::Reduced => "reduced",
            Partition::Custom => "custom",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// How categories are mapped onto partitions and keys.
///
/// `Shared` is the canonical layout. `Partitioned` is the historical layout
/// with one store per category; it is supported so that old stores can be
/// read and exported into a `Shared` destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordLayout {
    /// Direct, computed and reduced records share one namespace and are
    /// told apart by a sentinel prefix.
    #[default]
    Shared,
    /// Each category lives in its own partition and keys carry no sentinel.
    Partitioned,
}

impl RecordLayout {
    /// Returns the partition holding records of `category`.
    #[must_use]
    pub const fn partition(self, category: Category) -> Partition {
        match (self, category) {
            (_, Category::Custom) => Partition::Custom,
            (RecordLayout::Shared, _) => Partition::Records,
            (RecordLayout::Partitioned, Category::Direct) => Partition::Direct,
            (RecordLayout::Partitioned, Category::Computed) => Partition::Computed,
            (RecordLayout::Partitioned, Category::Reduced) => Partition::Reduced,
        }
    }

    /// Returns every partition this layout uses.
    #[must_use]
    pub fn partitions(self) -> &'static [Partition] {
        match self {
            RecordLayout::Shared => &[Partition::Records, Partition::Custom],
            RecordLayout::Partitioned => &[
                Partition::Direct,
                Partition::Computed,
                Partition::Reduced,
                Partition::Custom,
            ],
        }
    }

    /// Returns true if keys in `partition` are prefixed by a sentinel.
    #[must_use]
    pub const fn uses_sentinels(self) -> bool {
        matches!(self, RecordLayout::Shared)
    }
}

/// A logical record address: `(category, ns, path)`.
///
/// For computed records `ns` is the owning object and `path` the computed
/// property id. For custom records `ns` holds the user key and `path` is
/// always `None`. An empty path is normalized to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    /// Record category.
    pub category: Category,
    /// Object identity, reduced namespace or custom key.
    pub ns: String,
    /// Property path below `ns`, if any.
    pub path: Option<String>,
}

impl Address {
    /// Creates an address, normalizing an empty path to `None`.
    pub fn new(category: Category, ns: impl Into<String>, path: Option<&str>) -> Self {
        let path = match category {
            Category::Custom => None,
            _ => path.filter(|p| !p.is_empty()).map(str::to_owned),
        };
        Self {
            category,
            ns: ns.into(),
            path,
        }
    }

    /// Address of a direct record.
    pub fn direct(owner: impl Into<String>, path: Option<&str>) -> Self {
        Self::new(Category::Direct, owner, path)
    }

    /// Address of a computed record of `owner` for property `key_path`.
    pub fn computed(owner: impl Into<String>, key_path: &str) -> Self {
        Self::new(Category::Computed, owner, Some(key_path))
    }

    /// Address of a reduced record.
    pub fn reduced(ns: impl Into<String>, path: Option<&str>) -> Self {
        Self::new(Category::Reduced, ns, path)
    }

    /// Address of a custom blob.
    pub fn custom(key: impl Into<String>) -> Self {
        Self::new(Category::Custom, key, None)
    }

    /// Returns the path, or `None` for a root record.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns `ns` joined with the path by `/`, as used by key-path
    /// resolution.
    #[must_use]
    pub fn joined(&self) -> String {
        match &self.path {
            Some(path) => format!("{}/{}", self.ns, path),
            None => self.ns.clone(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.joined())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_is_root() {
        let addr = Address::direct("obj1", Some(""));
        assert_eq!(addr.path, None);
        assert_eq!(addr.joined(), "obj1");
    }

    #[test]
    fn custom_drops_path() {
        let addr = Address::new(Category::Custom, "blob", Some("x"));
        assert_eq!(addr.path, None);
    }

    #[test]
    fn shared_layout_routes_to_records() {
        let layout = RecordLayout::Shared;
        assert_eq!(layout.partition(Category::Direct), Partition::Records);
        assert_eq!(layout.partition(Category::Computed), Partition::Records);
        assert_eq!(layout.partition(Category::Reduced), Partition::Records);
        assert_eq!(layout.partition(Category::Custom), Partition::Custom);
        assert_eq!(layout.partitions().len(), 2);
    }

    #[test]
    fn partitioned_layout_separates_categories() {
        let layout = RecordLayout::Partitioned;
        for category in Category::ALL {
            assert_eq!(
                layout.partition(category).dir_name(),
                category.as_str(),
                "{category}"
            );
        }
        assert_eq!(layout.partitions().len(), 4);
    }

    #[test]
    fn display() {
        assert_eq!(Address::computed("obj1", "total").to_string(), "computed:obj1/total");
        assert_eq!(Partition::Records.to_string(), "records");
    }
}
