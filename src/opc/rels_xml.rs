//! Reading and writing `.rels` relationship parts.
//!
//! The format is the OPC relationships schema: a `<Relationships>` root in
//! the `http://schemas.openxmlformats.org/package/2006/relationships`
//! namespace holding one `<Relationship Id=".." Type=".." Target=".."/>`
//! per entry. Every attribute is kept, in document order.

use crate::error::{Result, StorageError};
use crate::opc::constants::namespace;
use crate::opc::escape::escape_attr;
use crate::opc::rel::RelationshipRecord;
use quick_xml::Reader;
use quick_xml::events::Event;

/// Parse the records of a relationship part.
///
/// Elements without an `Id` attribute are skipped.
pub fn parse_relationships(rels_xml: &[u8]) -> Result<Vec<RelationshipRecord>> {
    let mut records = Vec::new();
    let mut reader = Reader::from_reader(rels_xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut pairs: Vec<(String, String)> = Vec::with_capacity(4);
                for attr in e.attributes() {
                    let attr = attr?;
                    let key = std::str::from_utf8(attr.key.as_ref())?;
                    if key == "xmlns" || key.starts_with("xmlns:") {
                        continue;
                    }
                    pairs.push((key.to_string(), attr.unescape_value()?.into_owned()));
                }

                let record = RelationshipRecord::from_pairs(pairs);
                if record.id().is_some() {
                    records.push(record);
                } else {
                    tracing::trace!("skipping relationship without Id");
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(StorageError::Xml(format!("Rels parse error: {}", e))),
            _ => {},
        }
        buf.clear();
    }

    Ok(records)
}

/// Serialize records to the XML of a relationship part.
///
/// Records and their attributes are written in the order given.
pub fn write_relationships(records: &[RelationshipRecord]) -> String {
    let mut xml = String::with_capacity(128 + records.len() * 160);

    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    xml.push_str(r#"<Relationships xmlns=""#);
    xml.push_str(namespace::OPC_RELATIONSHIPS);
    xml.push_str(r#"">"#);

    for rec in records {
        xml.push_str("<Relationship");
        for (key, value) in rec.pairs() {
            xml.push(' ');
            xml.push_str(key);
            xml.push_str("=\"");
            xml.push_str(&escape_attr(value));
            xml.push('"');
        }
        xml.push_str("/>");
    }

    xml.push_str("</Relationships>");
    xml
}
