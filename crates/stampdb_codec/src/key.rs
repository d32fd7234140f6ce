//! Composite key encoding.
//!
//! Key shapes in the shared layout:
//!
//! | Category | Key |
//! |----------|-----|
//! | direct   | `ownerId[/path]` |
//! | computed | `=keyPath:ownerId` |
//! | reduced  | `_ns[/path]` |
//! | custom   | `_key` (custom partition) |
//!
//! The partitioned layout uses the same shapes without the leading sentinel.
//! A root record never carries a trailing `/`, so the range
//! `[id, id/\u{10FFFF}]` covers an object and everything nested under it.
//! Keys compare bytewise as UTF-8, so the sentinel must be the greatest
//! scalar value; `\u{FFFF}` would sort below every supplementary-plane
//! character.

use crate::category::{Address, Category, Partition, RecordLayout};
use crate::error::{CodecError, CodecResult};

/// Upper bound sentinel for range scans. Identifiers may not contain it.
pub const MAX_SENTINEL: char = char::MAX;

/// Prefix of computed keys in the shared layout.
pub const COMPUTED_SENTINEL: char = '=';

/// Prefix of reduced and custom keys in the shared layout.
pub const REDUCED_SENTINEL: char = '_';

/// Separates an identity from its nested path.
pub const PATH_SEPARATOR: char = '/';

/// Separates a computed property id from its owner.
pub const OWNER_SEPARATOR: char = ':';

/// Inclusive key bounds of a range scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBounds {
    /// Lower bound.
    pub gte: String,
    /// Upper bound.
    pub lte: String,
}

impl KeyBounds {
    fn new(gte: String, lte: String) -> Self {
        Self { gte, lte }
    }

    /// `[prefix, prefix/\u{10FFFF}]`.
    fn nested(prefix: String) -> Self {
        let lte = format!("{prefix}{PATH_SEPARATOR}{MAX_SENTINEL}");
        Self::new(prefix, lte)
    }

    /// `[prefix, prefix\u{10FFFF}]`.
    fn prefixed(prefix: String) -> Self {
        let lte = format!("{prefix}{MAX_SENTINEL}");
        Self::new(prefix, lte)
    }

    /// Returns true if `key` lies within the bounds.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        key >= self.gte.as_str() && key <= self.lte.as_str()
    }
}

/// Encodes and decodes keys for one [`RecordLayout`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyCodec {
    layout: RecordLayout,
}

impl KeyCodec {
    /// Creates a codec for `layout`.
    #[must_use]
    pub const fn new(layout: RecordLayout) -> Self {
        Self { layout }
    }

    /// Returns the layout.
    #[must_use]
    pub const fn layout(&self) -> RecordLayout {
        self.layout
    }

    /// Returns the partition holding records of `category`.
    #[must_use]
    pub const fn partition(&self, category: Category) -> Partition {
        self.layout.partition(category)
    }

    /// Checks the identifier preconditions of `address`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` naming the violated rule.
    pub fn validate(&self, address: &Address) -> CodecResult<()> {
        match address.category {
            Category::Custom => validate_custom_key(&address.ns),
            Category::Direct | Category::Reduced => {
                validate_identity(&address.ns)?;
                if let Some(path) = address.path() {
                    validate_path(path)?;
                }
                Ok(())
            }
            Category::Computed => {
                validate_identity(&address.ns)?;
                if address.ns.contains(OWNER_SEPARATOR) {
                    return Err(CodecError::invalid_address(format!(
                        "computed owner {:?} contains ':'",
                        address.ns
                    )));
                }
                let path = address.path().ok_or_else(|| {
                    CodecError::invalid_address("computed record requires a key path")
                })?;
                validate_path(path)?;
                if path.contains(OWNER_SEPARATOR) {
                    return Err(CodecError::invalid_address(format!(
                        "computed key path {path:?} contains ':'"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Encodes `address` into a raw key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` if the address fails validation.
    pub fn encode(&self, address: &Address) -> CodecResult<String> {
        self.validate(address)?;
        let sentinel = self.layout.uses_sentinels();
        let key = match address.category {
            Category::Direct => address.joined(),
            Category::Reduced if sentinel => format!("{REDUCED_SENTINEL}{}", address.joined()),
            Category::Reduced => address.joined(),
            Category::Computed => {
                let path = address.path().unwrap_or_default();
                if sentinel {
                    format!("{COMPUTED_SENTINEL}{path}{OWNER_SEPARATOR}{}", address.ns)
                } else {
                    format!("{path}{OWNER_SEPARATOR}{}", address.ns)
                }
            }
            Category::Custom if sentinel => format!("{REDUCED_SENTINEL}{}", address.ns),
            Category::Custom => address.ns.clone(),
        };
        Ok(key)
    }

    /// Classifies a raw key found in `partition`.
    ///
    /// In the shared `records` partition a leading `=` marks a computed
    /// record, a leading `_` a reduced one, anything else is direct. In every
    /// other partition the partition alone decides.
    #[must_use]
    pub fn classify(&self, partition: Partition, key: &str) -> Category {
        match partition {
            Partition::Records => match key.chars().next() {
                Some(COMPUTED_SENTINEL) => Category::Computed,
                Some(REDUCED_SENTINEL) => Category::Reduced,
                _ => Category::Direct,
            },
            Partition::Direct => Category::Direct,
            Partition::Computed => Category::Computed,
            Partition::Reduced => Category::Reduced,
            Partition::Custom => Category::Custom,
        }
    }

    /// Decodes a raw key found in `partition` back into its address.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKey` if the key does not have the shape its category
    /// requires.
    pub fn decode(&self, partition: Partition, key: &str) -> CodecResult<Address> {
        let category = self.classify(partition, key);
        let body = if self.layout.uses_sentinels() {
            match category {
                Category::Direct => key,
                Category::Computed => strip(key, COMPUTED_SENTINEL)?,
                Category::Reduced | Category::Custom => strip(key, REDUCED_SENTINEL)?,
            }
        } else {
            key
        };

        let address = match category {
            Category::Direct | Category::Reduced => {
                let (ns, path) = match body.split_once(PATH_SEPARATOR) {
                    Some((ns, path)) => (ns, Some(path)),
                    None => (body, None),
                };
                Address::new(category, ns, path)
            }
            Category::Computed => {
                let (path, ns) = body
                    .rsplit_once(OWNER_SEPARATOR)
                    .ok_or_else(|| CodecError::unknown_key(key, "computed key has no ':'"))?;
                Address::computed(ns, path)
            }
            Category::Custom => Address::custom(body),
        };

        if address.ns.is_empty() {
            return Err(CodecError::unknown_key(key, "empty identity"));
        }
        Ok(address)
    }

    /// Raw key prefix of the record tree rooted at `(category, ns)`.
    fn tree_root(&self, category: Category, ns: &str) -> String {
        match category {
            Category::Reduced if self.layout.uses_sentinels() => format!("{REDUCED_SENTINEL}{ns}"),
            _ => ns.to_owned(),
        }
    }

    /// Scan bounds for an object's direct records.
    #[must_use]
    pub fn object_bounds(&self, owner: &str) -> KeyBounds {
        KeyBounds::nested(self.tree_root(Category::Direct, owner))
    }

    /// Scan bounds for a reduced namespace.
    #[must_use]
    pub fn reduced_bounds(&self, ns: &str) -> KeyBounds {
        KeyBounds::nested(self.tree_root(Category::Reduced, ns))
    }

    /// Scan bounds for computed records, optionally restricted to one
    /// property. Because computed keys order property before owner, all
    /// owners of one property form a contiguous range.
    ///
    /// Returns `None` when the scan covers a whole partition.
    #[must_use]
    pub fn computed_bounds(&self, key_path: Option<&str>) -> Option<KeyBounds> {
        let sentinel = if self.layout.uses_sentinels() {
            COMPUTED_SENTINEL.to_string()
        } else {
            String::new()
        };
        match key_path {
            Some(path) => Some(KeyBounds::prefixed(format!(
                "{sentinel}{path}{OWNER_SEPARATOR}"
            ))),
            None if self.layout.uses_sentinels() => Some(KeyBounds::prefixed(sentinel)),
            None => None,
        }
    }

    /// Scan bounds covering every record of `category`.
    ///
    /// Returns `None` when the category owns its whole partition. Direct
    /// records in the shared layout are not contiguous and also yield
    /// `None`; callers filter them with [`KeyCodec::classify`].
    #[must_use]
    pub fn category_bounds(&self, category: Category) -> Option<KeyBounds> {
        if !self.layout.uses_sentinels() {
            return None;
        }
        match category {
            Category::Computed => self.computed_bounds(None),
            Category::Reduced => Some(KeyBounds::prefixed(REDUCED_SENTINEL.to_string())),
            Category::Direct | Category::Custom => None,
        }
    }

    /// Returns true if `key` belongs to the tree rooted at `(category, ns)`:
    /// the root key itself or anything below `root/`.
    ///
    /// Scan bounds alone over-match siblings such as `obj1.x` for `obj1`.
    #[must_use]
    pub fn is_within(&self, category: Category, ns: &str, key: &str) -> bool {
        let root = self.tree_root(category, ns);
        match key.strip_prefix(root.as_str()) {
            Some("") => true,
            Some(rest) => rest.starts_with(PATH_SEPARATOR),
            None => false,
        }
    }
}

fn strip(key: &str, sentinel: char) -> CodecResult<&str> {
    key.strip_prefix(sentinel)
        .ok_or_else(|| CodecError::unknown_key(key, format!("missing '{sentinel}' prefix")))
}

fn validate_identity(ns: &str) -> CodecResult<()> {
    if ns.is_empty() {
        return Err(CodecError::invalid_address("identity is empty"));
    }
    if ns.starts_with(COMPUTED_SENTINEL) || ns.starts_with(REDUCED_SENTINEL) {
        return Err(CodecError::invalid_address(format!(
            "identity {ns:?} begins with a sentinel"
        )));
    }
    if ns.contains(PATH_SEPARATOR) {
        return Err(CodecError::invalid_address(format!(
            "identity {ns:?} contains '/'"
        )));
    }
    if ns.contains(MAX_SENTINEL) {
        return Err(CodecError::invalid_address(format!(
            "identity {ns:?} contains the range sentinel"
        )));
    }
    Ok(())
}

fn validate_path(path: &str) -> CodecResult<()> {
    if path.contains(MAX_SENTINEL) {
        return Err(CodecError::invalid_address(format!(
            "path {path:?} contains the range sentinel"
        )));
    }
    Ok(())
}

fn validate_custom_key(key: &str) -> CodecResult<()> {
    if key.is_empty() {
        return Err(CodecError::invalid_address("custom key is empty"));
    }
    if key.starts_with(COMPUTED_SENTINEL) || key.starts_with(REDUCED_SENTINEL) {
        return Err(CodecError::invalid_address(format!(
            "custom key {key:?} begins with a sentinel"
        )));
    }
    if key.contains(PATH_SEPARATOR) || key.contains(MAX_SENTINEL) {
        return Err(CodecError::invalid_address(format!(
            "custom key {key:?} contains a reserved character"
        )));
    }
    Ok(())
}
