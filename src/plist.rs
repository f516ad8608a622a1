use crate::error::Error;
use crate::stream::binary_reader;
use crate::stream::binary_writer::BinaryWriter;
use crate::stream::xml_reader;
use crate::stream::xml_writer::XmlFragment;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::io::Cursor;

const XML_PROLOGUE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
"#;

/// A property-list value. Dictionaries keep document order.
#[derive(Debug, Clone, PartialEq)]
pub enum Plist {
    Array(Vec<Plist>),
    Dictionary(IndexMap<String, Plist>),
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Date(DateTime<Utc>),
    Data(Vec<u8>),
}

impl Plist {
    /// Decodes a document from its binary or XML encoding, sniffed by magic.
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.starts_with(b"bplist00") {
            binary_reader::read(data)
        } else {
            xml_reader::read(data)
        }
    }

    pub fn to_binary(&self) -> Result<Vec<u8>, Error> {
        let mut output = Cursor::new(Vec::new());
        BinaryWriter::new().write(self, &mut output)?;
        Ok(output.into_inner())
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from(XML_PROLOGUE);
        self.write_fragment(0, &mut xml);
        xml.push_str("</plist>\n");
        xml
    }
}

impl From<bool> for Plist {
    fn from(value: bool) -> Self {
        Plist::Boolean(value)
    }
}
impl From<i64> for Plist {
    fn from(value: i64) -> Self {
        Plist::Integer(value)
    }
}
impl From<&str> for Plist {
    fn from(value: &str) -> Self {
        Plist::String(value.to_string())
    }
}
impl From<String> for Plist {
    fn from(value: String) -> Self {
        Plist::String(value)
    }
}
