use super::types::{Entry, Field, Group, GroupChild, Value, XmlDatabase};
use std::io::Read;
use thiserror::Error;
use xml::attribute::OwnedAttribute;
use xml::reader::{EventReader, XmlEvent};

#[derive(Debug, Error)]
/// Error encountered parsing XML
pub enum Error {
    /// Error from the underlying XML parser
    #[error("Error parsing database XML: {0}")]
    Xml(String),
    /// The document has no `KeePassFile/Root` element
    #[error("Database XML has no Root element")]
    MissingRoot,
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<xml::reader::Error> for Error {
    fn from(e: xml::reader::Error) -> Error {
        Error::Xml(e.msg().to_string())
    }
}

trait XmlState {
    fn finish(self: Box<Self>) -> Result<XmlDatabase>;
    fn handle_xml_event(self: Box<Self>, event: XmlEvent) -> Box<dyn XmlState>;
}

struct InitialState {
    database: XmlDatabase,
    found_root: bool,
}

impl XmlState for InitialState {
    fn finish(self: Box<Self>) -> Result<XmlDatabase> {
        if self.found_root {
            Ok(self.database)
        } else {
            Err(Error::MissingRoot)
        }
    }

    fn handle_xml_event(self: Box<Self>, event: XmlEvent) -> Box<dyn XmlState> {
        if let XmlEvent::StartElement { name, .. } = event {
            if name.local_name == "KeePassFile" {
                return Box::new(FileState { parent: self });
            }
        }
        self
    }
}

struct FileState {
    parent: Box<InitialState>,
}

impl XmlState for FileState {
    fn finish(self: Box<Self>) -> Result<XmlDatabase> {
        self.parent.finish()
    }

    fn handle_xml_event(self: Box<Self>, event: XmlEvent) -> Box<dyn XmlState> {
        if let XmlEvent::StartElement { name, .. } = event {
            if name.local_name == "Root" {
                return Box::new(RootState::new(self));
            }
        } else if let XmlEvent::EndElement { name, .. } = event {
            if name.local_name == "KeePassFile" {
                return self.parent;
            }
        }
        self
    }
}

struct RootState {
    parent: Box<FileState>,
    groups: Vec<Group>,
}

impl RootState {
    fn new(parent: Box<FileState>) -> RootState {
        RootState {
            parent,
            groups: Vec::new(),
        }
    }
}

impl XmlState for RootState {
    fn finish(self: Box<Self>) -> Result<XmlDatabase> {
        self.parent.finish()
    }

    fn handle_xml_event(mut self: Box<Self>, event: XmlEvent) -> Box<dyn XmlState> {
        if let XmlEvent::StartElement { name, .. } = event {
            if name.local_name == "Group" {
                return Box::new(GroupState::new(self));
            }
        } else if let XmlEvent::EndElement { name, .. } = event {
            if name.local_name == "Root" {
                self.parent.parent.database.groups = self.groups;
                self.parent.parent.found_root = true;
                return self.parent;
            }
        }
        self
    }
}

trait GroupStateParent: XmlState {
    fn add_group(&mut self, group: Group);
}

impl XmlState for Box<dyn GroupStateParent> {
    fn finish(self: Box<Self>) -> Result<XmlDatabase> {
        (*self).finish()
    }

    fn handle_xml_event(self: Box<Self>, event: XmlEvent) -> Box<dyn XmlState> {
        (*self).handle_xml_event(event)
    }
}

impl GroupStateParent for RootState {
    fn add_group(&mut self, group: Group) {
        self.groups.push(group);
    }
}

struct GroupState {
    parent: Box<dyn GroupStateParent>,
    group: Group,
}

impl GroupState {
    fn new(parent: Box<dyn GroupStateParent>) -> GroupState {
        GroupState {
            parent,
            group: Group::default(),
        }
    }
}

impl XmlState for GroupState {
    fn finish(self: Box<Self>) -> Result<XmlDatabase> {
        self.parent.finish()
    }

    fn handle_xml_event(mut self: Box<Self>, event: XmlEvent) -> Box<dyn XmlState> {
        if let XmlEvent::StartElement { name, .. } = event {
            if name.local_name == "Group" {
                return Box::new(GroupState::new(self));
            } else if name.local_name == "Entry" {
                return Box::new(EntryState::new(self));
            }
        } else if let XmlEvent::EndElement { name, .. } = event {
            if name.local_name == "Group" {
                self.parent.add_group(self.group);
                return Box::new(self.parent);
            }
        }
        self
    }
}

impl GroupStateParent for GroupState {
    fn add_group(&mut self, group: Group) {
        self.group.children.push(GroupChild::Group(group));
    }
}

struct EntryState {
    parent: Box<dyn EntryStateParent>,
    entry: Entry,
}

impl EntryState {
    fn new(parent: Box<dyn EntryStateParent>) -> EntryState {
        EntryState {
            parent,
            entry: Entry::default(),
        }
    }
}

impl XmlState for EntryState {
    fn finish(self: Box<Self>) -> Result<XmlDatabase> {
        self.parent.finish()
    }

    fn handle_xml_event(mut self: Box<Self>, event: XmlEvent) -> Box<dyn XmlState> {
        if let XmlEvent::StartElement { name, .. } = event {
            if name.local_name == "String" {
                return Box::new(FieldState::new(self));
            } else if name.local_name == "History" {
                return Box::new(HistoryState::new(self));
            }
        } else if let XmlEvent::EndElement { name, .. } = event {
            if name.local_name == "Entry" {
                self.parent.add_entry(self.entry);
                return Box::new(self.parent);
            }
        }
        self
    }
}

struct HistoryState {
    parent: Box<EntryState>,
}

impl HistoryState {
    fn new(parent: Box<EntryState>) -> HistoryState {
        HistoryState { parent }
    }
}

impl XmlState for HistoryState {
    fn finish(self: Box<Self>) -> Result<XmlDatabase> {
        self.parent.finish()
    }

    fn handle_xml_event(self: Box<Self>, event: XmlEvent) -> Box<dyn XmlState> {
        if let XmlEvent::StartElement { name, .. } = event {
            if name.local_name == "Entry" {
                return Box::new(EntryState::new(self));
            }
        } else if let XmlEvent::EndElement { name, .. } = event {
            if name.local_name == "History" {
                return self.parent;
            }
        }
        self
    }
}

struct FieldState {
    parent: Box<dyn FieldStateParent>,
    key: String,
    value: Value,
    protected: bool,
    /// Text of the `Key` or `Value` element being read, if any
    characters: Option<String>,
}

impl FieldState {
    fn new(parent: Box<dyn FieldStateParent>) -> FieldState {
        FieldState {
            parent,
            key: String::new(),
            value: Value::Empty,
            protected: false,
            characters: None,
        }
    }
}

fn is_protected(attributes: &[OwnedAttribute]) -> bool {
    attributes
        .iter()
        .any(|attr| attr.name.local_name == "Protected" && attr.value == "True")
}

impl XmlState for FieldState {
    fn finish(self: Box<Self>) -> Result<XmlDatabase> {
        self.parent.finish()
    }

    fn handle_xml_event(mut self: Box<Self>, event: XmlEvent) -> Box<dyn XmlState> {
        match event {
            XmlEvent::StartElement {
                name, attributes, ..
            } => {
                if name.local_name == "Value" {
                    self.protected = is_protected(&attributes);
                    self.characters = Some(String::new());
                } else if name.local_name == "Key" {
                    self.characters = Some(String::new());
                }
            }
            XmlEvent::Characters(chars) | XmlEvent::Whitespace(chars) => {
                if let Some(text) = self.characters.as_mut() {
                    text.push_str(&chars);
                }
            }
            XmlEvent::EndElement { name } => {
                if name.local_name == "String" {
                    self.parent.add_field(Field {
                        key: self.key,
                        value: self.value,
                    });
                    return Box::new(self.parent);
                } else if name.local_name == "Key" {
                    self.key = self.characters.take().unwrap_or_default();
                } else if name.local_name == "Value" {
                    let text = self.characters.take().unwrap_or_default();
                    self.value = if self.protected {
                        Value::Protected(text)
                    } else if text.is_empty() {
                        Value::Empty
                    } else {
                        Value::Standard(text)
                    };
                }
            }
            _ => {}
        }
        self
    }
}

trait EntryStateParent: XmlState {
    fn add_entry(&mut self, entry: Entry);
}

impl XmlState for Box<dyn EntryStateParent> {
    fn finish(self: Box<Self>) -> Result<XmlDatabase> {
        (*self).finish()
    }

    fn handle_xml_event(self: Box<Self>, event: XmlEvent) -> Box<dyn XmlState> {
        (*self).handle_xml_event(event)
    }
}

impl EntryStateParent for GroupState {
    fn add_entry(&mut self, entry: Entry) {
        self.group.children.push(GroupChild::Entry(entry));
    }
}

impl EntryStateParent for HistoryState {
    fn add_entry(&mut self, entry: Entry) {
        self.parent.entry.history.push(entry);
    }
}

trait FieldStateParent: XmlState {
    fn add_field(&mut self, field: Field);
}

impl XmlState for Box<dyn FieldStateParent> {
    fn finish(self: Box<Self>) -> Result<XmlDatabase> {
        (*self).finish()
    }

    fn handle_xml_event(self: Box<Self>, event: XmlEvent) -> Box<dyn XmlState> {
        (*self).handle_xml_event(event)
    }
}

impl FieldStateParent for EntryState {
    fn add_field(&mut self, field: Field) {
        self.entry.fields.push(field);
    }
}

/// Parse decrypted XML into a database
pub fn parse_xml<R: Read>(xml_data: R) -> Result<XmlDatabase> {
    let database = XmlDatabase::default();
    let xml_config = xml::ParserConfig::new().cdata_to_characters(true);
    let xml_event_reader = EventReader::new_with_config(xml_data, xml_config);
    let mut parser_state: Box<dyn XmlState> = Box::new(InitialState {
        database,
        found_root: false,
    });

    for evt in xml_event_reader {
        match evt {
            Ok(evt) => {
                parser_state = parser_state.handle_xml_event(evt);
            }
            Err(e) => return Err(e.into()),
        }
    }

    let database = parser_state.finish()?;
    log::debug!("Parsed {} top level groups", database.groups.len());
    Ok(database)
}
