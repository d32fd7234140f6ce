//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data that respects the
//! identifier preconditions of the key codec.

use proptest::prelude::*;
use serde_json::Value;
use stampdb_codec::{Address, Payload, Stamp, StampedValue};

/// Strategy for object ids, reduced namespaces and custom keys.
pub fn identity_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9][a-zA-Z0-9.-]{0,15}").expect("Invalid regex")
}

/// Strategy for nested property paths (may contain `/`).
pub fn path_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9]{1,8}(/[a-zA-Z0-9]{1,8}){0,2}").expect("Invalid regex")
}

/// Strategy for computed property ids (no `:`).
pub fn key_path_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9/]{0,11}").expect("Invalid regex")
}

/// Strategy for stamps.
pub fn stamp_strategy() -> impl Strategy<Value = Stamp> {
    any::<u64>().prop_map(Stamp)
}

/// Strategy for scalar payloads. Scalars never begin with `[`.
pub fn scalar_payload_strategy() -> impl Strategy<Value = Payload> {
    prop::string::string_regex("([^\\[][^\\n]{0,31})?")
        .expect("Invalid regex")
        .prop_map(Payload::Scalar)
}

/// Strategy for array payloads of JSON values that round-trip exactly.
pub fn array_payload_strategy() -> impl Strategy<Value = Payload> {
    let item = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        prop::string::string_regex("[a-zA-Z0-9 .\\[\\]]{0,12}")
            .expect("Invalid regex")
            .prop_map(Value::String),
    ];
    prop::collection::vec(item, 0..6).prop_map(Payload::Array)
}

/// Strategy for stamped values with scalar or array payloads.
pub fn stamped_value_strategy() -> impl Strategy<Value = StampedValue> {
    let payload = prop_oneof![scalar_payload_strategy(), array_payload_strategy()];
    (stamp_strategy(), payload).prop_map(|(stamp, payload)| StampedValue { stamp, payload })
}

/// Strategy for well-formed addresses of every stamped category.
pub fn stamped_address_strategy() -> impl Strategy<Value = Address> {
    let path = prop::option::of(path_strategy());
    prop_oneof![
        (identity_strategy(), prop::option::of(path_strategy()))
            .prop_map(|(ns, path)| Address::direct(ns, path.as_deref())),
        (identity_strategy(), key_path_strategy())
            .prop_map(|(ns, key_path)| Address::computed(ns, &key_path)),
        (identity_strategy(), path).prop_map(|(ns, path)| Address::reduced(ns, path.as_deref())),
    ]
}

/// Strategy for a batch of records. Array payloads go to computed
/// addresses only, since other categories read back scalar text.
pub fn records_strategy(max: usize) -> impl Strategy<Value = Vec<(Address, StampedValue)>> {
    let record = stamped_address_strategy().prop_flat_map(|address| {
        let value = if address.category.holds_arrays() {
            stamped_value_strategy().boxed()
        } else {
            (stamp_strategy(), scalar_payload_strategy())
                .prop_map(|(stamp, payload)| StampedValue { stamp, payload })
                .boxed()
        };
        (Just(address), value)
    });
    prop::collection::vec(record, 0..max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stampdb_codec::{KeyCodec, RecordLayout};

    proptest! {
        #[test]
        fn generated_addresses_are_valid(addr in stamped_address_strategy()) {
            for layout in [RecordLayout::Shared, RecordLayout::Partitioned] {
                prop_assert!(KeyCodec::new(layout).validate(&addr).is_ok());
            }
        }

        #[test]
        fn generated_values_roundtrip(value in stamped_value_strategy()) {
            let decoded = StampedValue::decode(&value.encode()).unwrap();
            prop_assert_eq!(decoded, value);
        }
    }
}
