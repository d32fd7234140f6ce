//! # stampdb Codec
//!
//! Key and value encoding for stampdb records.
//!
//! Every record lives at a text key in an ordered store and holds a text
//! value. This crate owns both encodings:
//!
//! - [`KeyCodec`] maps a logical [`Address`] to a raw key and back, and
//!   classifies raw keys into a [`Category`] for a given [`RecordLayout`]
//! - [`StampedValue`] joins a [`Stamp`] and a [`Payload`] into
//!   `stamp.payload` text
//!
//! The crate performs no I/O.
//!
//! ## Usage
//!
//! ```
//! use stampdb_codec::{Address, KeyCodec, Partition, RecordLayout, StampedValue};
//!
//! let codec = KeyCodec::new(RecordLayout::Shared);
//! let key = codec.encode(&Address::computed("obj1", "total")).unwrap();
//! assert_eq!(key, "=total:obj1");
//! assert_eq!(codec.decode(Partition::Records, &key).unwrap(), Address::computed("obj1", "total"));
//!
//! let text = StampedValue::new(12u64, "42").encode();
//! assert_eq!(StampedValue::decode(&text).unwrap().stamp.as_u64(), 12);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod category;
mod error;
mod key;
mod value;

pub use category::{Address, Category, Partition, RecordLayout};
pub use error::{CodecError, CodecResult};
pub use key::{
    KeyBounds, KeyCodec, COMPUTED_SENTINEL, MAX_SENTINEL, OWNER_SEPARATOR, PATH_SEPARATOR,
    REDUCED_SENTINEL,
};
pub use value::{
    decode_raw, encode_raw, split_stamped, Payload, Stamp, StampedValue, STAMP_SEPARATOR,
};
