//! Turn the parsed group tree into flat credential records
//!
//! Protected values share one keystream, so they must be decrypted in
//! exactly the order they were encrypted: depth first through the groups,
//! each entry's own fields first and then the fields of its history.

use std::collections::HashMap;

use zeroize::Zeroizing;

use super::types::{Entry, Group, GroupChild, Value, XmlDatabase};
use crate::binary::errors::CryptoError;
use crate::stream::random::ProtectedStream;
use crate::types::CredentialRecord;

const PASSWORD_FIELD: &str = "Password";

/// Build one record per entry, decrypting every protected value in document order
pub fn flatten(
    database: &XmlDatabase,
    stream: &mut ProtectedStream,
) -> Result<Vec<CredentialRecord>, CryptoError> {
    let mut records = Vec::new();
    for group in &database.groups {
        flatten_group(group, stream, &mut records)?;
    }
    log::debug!("Extracted {} credential records", records.len());
    Ok(records)
}

fn flatten_group(
    group: &Group,
    stream: &mut ProtectedStream,
    records: &mut Vec<CredentialRecord>,
) -> Result<(), CryptoError> {
    for child in &group.children {
        match child {
            GroupChild::Entry(entry) => records.push(flatten_entry(entry, stream)?),
            GroupChild::Group(group) => flatten_group(group, stream, records)?,
        }
    }
    Ok(())
}

fn flatten_entry(
    entry: &Entry,
    stream: &mut ProtectedStream,
) -> Result<CredentialRecord, CryptoError> {
    let mut fields = HashMap::new();
    let mut password: Option<Zeroizing<Vec<u8>>> = None;

    for field in &entry.fields {
        match &field.value {
            Value::Protected(payload) => {
                // Protected values other than the password are decrypted and dropped
                let plain = Zeroizing::new(stream.unpack(payload)?);
                if field.key == PASSWORD_FIELD && password.is_none() && !plain.is_empty() {
                    password = Some(plain);
                }
            }
            Value::Standard(_) | Value::Empty if field.key == PASSWORD_FIELD => {}
            Value::Standard(text) => {
                fields.insert(field.key.clone(), text.clone());
            }
            Value::Empty => {
                fields.insert(field.key.clone(), String::new());
            }
        }
    }

    for old in &entry.history {
        for field in &old.fields {
            if let Value::Protected(payload) = &field.value {
                // Only advances the keystream
                drop(Zeroizing::new(stream.unpack(payload)?));
            }
        }
    }

    Ok(CredentialRecord::new(fields, password))
}
