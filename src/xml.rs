//! Work directly with the KDBX decrypted inner XML format

pub(crate) mod flatten;
pub(crate) mod parse;
pub mod types;

pub use flatten::flatten;
pub use parse::parse_xml;
