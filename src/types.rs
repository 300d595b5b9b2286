//! Credential records extracted from a database

use std::collections::HashMap;
use std::fmt;

use zeroize::Zeroizing;

/// Fields searched by [`CredentialRecord::matches`]
pub const SEARCHABLE_FIELDS: [&str; 4] = ["Notes", "Title", "URL", "UserName"];

/// One password entry, flattened out of the group tree
///
/// The secret is kept apart from the other fields so it is never printed
/// along with them, and is wiped from memory when the record is dropped.
#[derive(Clone, Default)]
pub struct CredentialRecord {
    fields: HashMap<String, String>,
    password: Option<Zeroizing<Vec<u8>>>,
}

impl CredentialRecord {
    pub(crate) fn new(
        fields: HashMap<String, String>,
        password: Option<Zeroizing<Vec<u8>>>,
    ) -> CredentialRecord {
        CredentialRecord { fields, password }
    }

    /// All non-secret fields of this entry
    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }

    /// Look up a non-secret field by its exact key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Return the title of this item
    pub fn title(&self) -> Option<&str> {
        self.get("Title")
    }

    /// Return the username of this item
    pub fn username(&self) -> Option<&str> {
        self.get("UserName")
    }

    /// Return the URL of this item
    pub fn url(&self) -> Option<&str> {
        self.get("URL")
    }

    /// Return the secret bytes of this item, if it has one
    pub fn password(&self) -> Option<&[u8]> {
        self.password.as_deref().map(Vec::as_slice)
    }

    /// Case-insensitive substring search over the notes, title, URL and username
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        SEARCHABLE_FIELDS.iter().any(|key| {
            self.get(key)
                .filter(|value| !value.is_empty())
                .map_or(false, |value| value.to_lowercase().contains(&needle))
        })
    }
}

impl fmt::Display for CredentialRecord {
    /// Writes `key : value` pairs separated by `"; "`, sorted by key,
    /// skipping empty values. The secret is never written.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self
            .fields
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, _)| key)
            .collect();
        keys.sort();

        for (i, key) in keys.into_iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} : {}", key, self.fields[key])?;
        }
        Ok(())
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("fields", &self.fields)
            .field("has_password", &self.password.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)], password: Option<&[u8]>) -> CredentialRecord {
        let fields = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CredentialRecord::new(fields, password.map(|p| Zeroizing::new(p.to_vec())))
    }

    #[test]
    fn search_is_case_insensitive() {
        let item = record(
            &[("Title", "My Bank"), ("URL", "https://Example.com"), ("Other", "hidden")],
            None,
        );
        assert!(item.matches("bank"));
        assert!(item.matches("EXAMPLE"));
        assert!(!item.matches("hidden"));
        assert!(!item.matches("missing"));
    }

    #[test]
    fn search_ignores_secret() {
        let item = record(&[("UserName", "alice")], Some(b"topsecret"));
        assert!(!item.matches("topsecret"));
        assert!(item.matches("ALI"));
    }

    #[test]
    fn display_skips_empty_and_secret() {
        let item = record(
            &[("UserName", "alice"), ("Notes", ""), ("Title", "Mail")],
            Some(b"topsecret"),
        );
        assert_eq!(item.to_string(), "Title : Mail; UserName : alice");
        assert!(!format!("{:?}", item).contains("topsecret"));
    }

    #[test]
    fn accessors() {
        let item = record(&[("Title", "Mail"), ("URL", "imap://mail")], Some(b"pw"));
        assert_eq!(item.title(), Some("Mail"));
        assert_eq!(item.url(), Some("imap://mail"));
        assert_eq!(item.username(), None);
        assert_eq!(item.password(), Some(&b"pw"[..]));
        assert_eq!(item.fields().len(), 2);
    }
}
