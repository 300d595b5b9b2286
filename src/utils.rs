//! Utilities to help working with kdbx3-rs

use uuid::Uuid;

pub(crate) fn value_from_uuid_table<T: Clone>(
    table: &[(&str, T)],
    lookup: uuid::Uuid,
) -> Option<T> {
    for (uuid_str, ref value) in table.iter() {
        let item_uuid = Uuid::parse_str(uuid_str).ok()?;
        if item_uuid == lookup {
            return Some(value.clone());
        }
    }
    None
}

/// Zero filled buffer of `len` bytes
pub(crate) fn buffer(len: usize) -> Vec<u8> {
    vec![0; len]
}
