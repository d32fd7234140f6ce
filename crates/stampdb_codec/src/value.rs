//! Stamped value encoding.
//!
//! A stored value is `stamp '.' payload` where `stamp` is the decimal
//! rendering of a `u64`. Stamps never contain `.`, so the first `.`
//! terminates the stamp and the payload may contain any further dots.
//!
//! A computed payload whose first character is `[` is a JSON array. Direct
//! and reduced payloads are always scalar text.

use crate::category::Category;
use crate::error::{CodecError, CodecResult};
use serde_json::Value;
use std::fmt;

/// Separates the stamp from the payload.
pub const STAMP_SEPARATOR: char = '.';

const ARRAY_OPEN: char = '[';

/// Logical version of a record, used for last-writer-wins resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Stamp(pub u64);

impl Stamp {
    /// Returns the raw stamp.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for Stamp {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Record payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Opaque scalar token.
    Scalar(String),
    /// Sequence value, stored as JSON array text.
    Array(Vec<Value>),
}

impl Payload {
    /// Creates a scalar payload.
    pub fn scalar(text: impl Into<String>) -> Self {
        Payload::Scalar(text.into())
    }

    /// Parses payload text, interpreting a leading `[` as an array.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArray` if array text is not a JSON array.
    pub fn parse(text: &str) -> CodecResult<Self> {
        if !text.starts_with(ARRAY_OPEN) {
            return Ok(Payload::Scalar(text.to_owned()));
        }
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => Ok(Payload::Array(items)),
            Ok(other) => Err(CodecError::InvalidArray {
                message: format!("expected array, found {other}"),
            }),
            Err(err) => Err(CodecError::InvalidArray {
                message: err.to_string(),
            }),
        }
    }

    /// Renders the payload as stored text.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Payload::Scalar(text) => text.clone(),
            Payload::Array(items) => Value::Array(items.clone()).to_string(),
        }
    }

    /// Returns true for array payloads.
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, Payload::Array(_))
    }

    /// Returns the scalar text, if this is a scalar.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Payload::Scalar(text) => Some(text),
            Payload::Array(_) => None,
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::scalar(text)
    }
}

impl From<Vec<Value>> for Payload {
    fn from(items: Vec<Value>) -> Self {
        Payload::Array(items)
    }
}

/// A `(stamp, payload)` pair as held by one record.
#[derive(Debug, Clone, PartialEq)]
pub struct StampedValue {
    /// Record version.
    pub stamp: Stamp,
    /// Record payload.
    pub payload: Payload,
}

impl StampedValue {
    /// Creates a stamped value.
    pub fn new(stamp: impl Into<Stamp>, payload: impl Into<Payload>) -> Self {
        Self {
            stamp: stamp.into(),
            payload: payload.into(),
        }
    }

    /// Encodes to stored text.
    #[must_use]
    pub fn encode(&self) -> String {
        encode_raw(self.stamp, &self.payload.to_text())
    }

    /// Decodes stored text.
    ///
    /// # Errors
    ///
    /// Fails if the separator is missing, the stamp is not decimal, or an
    /// array payload does not parse.
    pub fn decode(text: &str) -> CodecResult<Self> {
        let (stamp, payload) = split_stamped(text)?;
        Ok(Self {
            stamp,
            payload: Payload::parse(payload)?,
        })
    }

    /// Decodes a stored byte value.
    ///
    /// # Errors
    ///
    /// As [`StampedValue::decode`], plus `InvalidUtf8`.
    pub fn decode_bytes(bytes: &[u8]) -> CodecResult<Self> {
        let text = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
        Self::decode(text)
    }

    /// Decodes a stored byte value of `category`. Only categories that
    /// [hold arrays](Category::holds_arrays) interpret a leading `[`.
    ///
    /// # Errors
    ///
    /// As [`StampedValue::decode_bytes`].
    pub fn decode_for(category: Category, bytes: &[u8]) -> CodecResult<Self> {
        let (stamp, payload) = decode_raw(bytes)?;
        let payload = if category.holds_arrays() {
            Payload::parse(payload)?
        } else {
            Payload::scalar(payload)
        };
        Ok(Self { stamp, payload })
    }
}

/// Joins a stamp with already-rendered payload text.
#[must_use]
pub fn encode_raw(stamp: Stamp, payload: &str) -> String {
    let mut out = String::with_capacity(payload.len() + 21);
    out.push_str(&stamp.to_string());
    out.push(STAMP_SEPARATOR);
    out.push_str(payload);
    out
}

/// Splits stored text into stamp and raw payload text on the first `.`.
///
/// # Errors
///
/// Returns `MissingSeparator` or `InvalidStamp`.
pub fn split_stamped(text: &str) -> CodecResult<(Stamp, &str)> {
    let (stamp, payload) = text
        .split_once(STAMP_SEPARATOR)
        .ok_or(CodecError::MissingSeparator)?;
    if stamp.is_empty() || !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::InvalidStamp {
            text: stamp.to_owned(),
        });
    }
    let stamp = stamp.parse::<u64>().map_err(|_| CodecError::InvalidStamp {
        text: stamp.to_owned(),
    })?;
    Ok((Stamp(stamp), payload))
}

/// Splits a stored byte value without interpreting the payload.
///
/// # Errors
///
/// As [`split_stamped`], plus `InvalidUtf8`.
pub fn decode_raw(bytes: &[u8]) -> CodecResult<(Stamp, &str)> {
    let text = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
    split_stamped(text)
}
