//! Hooks into the object-graph model.
//!
//! Key-path resolution and value matching are model-specific. The storage
//! consumes them through these traits and ships plain defaults.

use serde_json::Value;
use stampdb_codec::{Payload, PATH_SEPARATOR};

/// Maps a raw direct key to the model property it stores.
pub trait KeyPathResolver: Send + Sync {
    /// Returns the key path of `key`, or `None` for an object root record.
    fn resolve_key_path(&self, key: &str) -> Option<String>;
}

/// Resolves `owner/path` to `path`, cutting any multi-item suffix after `*`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathResolver;

impl KeyPathResolver for PathResolver {
    fn resolve_key_path(&self, key: &str) -> Option<String> {
        let (_, path) = key.split_once(PATH_SEPARATOR)?;
        let path = path.split_once('*').map_or(path, |(head, _)| head);
        if path.is_empty() {
            None
        } else {
            Some(path.to_owned())
        }
    }
}

/// Compares stored payloads against a searched value.
pub trait ValueMatcher: Send + Sync {
    /// Returns true if the direct record `owner[/path]` holds `expected`.
    fn matches_direct(
        &self,
        owner: &str,
        path: Option<&str>,
        payload: &Payload,
        expected: &str,
    ) -> bool;

    /// Returns true if a computed payload matches `expected`.
    fn matches_computed(&self, payload: &Payload, expected: &str) -> bool;
}

/// Textual equality. Computed arrays match when any element equals
/// `expected`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl ValueMatcher for ExactMatcher {
    fn matches_direct(
        &self,
        _owner: &str,
        _path: Option<&str>,
        payload: &Payload,
        expected: &str,
    ) -> bool {
        payload.as_scalar() == Some(expected)
    }

    fn matches_computed(&self, payload: &Payload, expected: &str) -> bool {
        match payload {
            Payload::Scalar(text) => text == expected,
            Payload::Array(items) => items.iter().any(|item| match item {
                Value::String(text) => text == expected,
                other => other.to_string() == expected,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_paths() {
        let resolver = PathResolver;
        assert_eq!(resolver.resolve_key_path("obj1"), None);
        assert_eq!(resolver.resolve_key_path("obj1/name"), Some("name".into()));
        assert_eq!(
            resolver.resolve_key_path("obj1/address/city"),
            Some("address/city".into())
        );
        assert_eq!(resolver.resolve_key_path("obj1/tags*red"), Some("tags".into()));
    }

    #[test]
    fn exact_matching() {
        let matcher = ExactMatcher;
        assert!(matcher.matches_direct("obj1", None, &Payload::scalar("x"), "x"));
        assert!(!matcher.matches_direct("obj1", None, &Payload::scalar("x"), "y"));

        let array = Payload::Array(vec![json!("a"), json!(2)]);
        assert!(matcher.matches_computed(&array, "a"));
        assert!(matcher.matches_computed(&array, "2"));
        assert!(!matcher.matches_computed(&array, "b"));
        assert!(!matcher.matches_direct("obj1", None, &array, "a"));
    }
}
