//! Types describing the decrypted XML tree

/// A value for a entry's field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A base64 value encrypted with the protected value stream
    Protected(String),
    /// A value that's unencrypted in the database
    Standard(String),
    /// A empty value
    Empty,
}

impl Default for Value {
    fn default() -> Value {
        Value::Empty
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
/// A key value pair
pub struct Field {
    /// The name of this field
    pub key: String,
    /// The (optionally encrypted) value of this field
    pub value: Value,
}

impl Field {
    /// Create a new field without memory protection
    pub fn new(key: &str, value: &str) -> Field {
        Field {
            key: key.to_string(),
            value: Value::Standard(value.to_string()),
        }
    }

    /// Create a new field holding an encrypted base64 value
    pub fn protected(key: &str, value: &str) -> Field {
        Field {
            key: key.to_string(),
            value: Value::Protected(value.to_string()),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
/// A single password entry
pub struct Entry {
    /// Key-value pairs of current data for this entry, in document order
    pub fields: Vec<Field>,
    /// Previous versions of this entry
    pub history: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// An item directly inside a group
pub enum GroupChild {
    /// A password entry
    Entry(Entry),
    /// A nested group
    Group(Group),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
/// A group or folder of password entries
pub struct Group {
    /// Entries and subgroups, in the order they appear in the document
    pub children: Vec<GroupChild>,
}

impl Group {
    /// Iterate over the entries directly inside this group
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.children.iter().filter_map(|child| match child {
            GroupChild::Entry(entry) => Some(entry),
            GroupChild::Group(_) => None,
        })
    }

    /// Iterate over the subgroups directly inside this group
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.children.iter().filter_map(|child| match child {
            GroupChild::Group(group) => Some(group),
            GroupChild::Entry(_) => None,
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
/// Decrypted database structure
pub struct XmlDatabase {
    /// Trees of items in this database
    pub groups: Vec<Group>,
}
