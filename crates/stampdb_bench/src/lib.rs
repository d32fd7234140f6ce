//! Benchmark utilities.

use stampdb_codec::{Address, StampedValue};

/// Generate a deterministic payload of the specified size.
pub fn payload(size: usize) -> String {
    (0..size).map(|i| (b'a' + (i % 26) as u8) as char).collect()
}

/// Generate `objects` objects with `fields` nested fields each, every value
/// carrying a `payload_size` byte payload.
pub fn generate_objects(
    objects: usize,
    fields: usize,
    payload_size: usize,
) -> Vec<(Address, StampedValue)> {
    let body = payload(payload_size);
    let mut stamp = 0u64;
    let mut records = Vec::with_capacity(objects * (fields + 1));
    for o in 0..objects {
        let owner = format!("obj{o:06}");
        stamp += 1;
        records.push((
            Address::direct(owner.clone(), None),
            StampedValue::new(stamp, "Object"),
        ));
        for f in 0..fields {
            stamp += 1;
            records.push((
                Address::direct(owner.clone(), Some(&format!("field{f}"))),
                StampedValue::new(stamp, body.as_str()),
            ));
        }
    }
    records
}
