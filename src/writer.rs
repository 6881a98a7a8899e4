//! MusicXML writer. Serializes the working tree back to text.
//!
//! The prolog and epilog captured at parse time are emitted verbatim around
//! the root element. Text and attribute escaping is left to quick-xml.

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::ScoreError;
use crate::model::{Document, Node, NodeId};

/// Serialize a document to a MusicXML string.
pub fn write_musicxml(doc: &Document) -> Result<String, ScoreError> {
    let mut writer = Writer::new(Vec::new());
    write_node(&mut writer, doc, doc.root())?;
    let body = String::from_utf8(writer.into_inner())
        .map_err(|e| ScoreError::Serialize(e.to_string()))?;

    let mut xml = String::with_capacity(doc.prolog().len() + body.len() + doc.epilog().len());
    xml.push_str(doc.prolog());
    xml.push_str(&body);
    xml.push_str(doc.epilog());
    Ok(xml)
}

fn write_node(writer: &mut Writer<Vec<u8>>, doc: &Document, id: NodeId) -> Result<(), ScoreError> {
    let event = match doc.node(id) {
        Node::Element(element) => {
            let mut start = BytesStart::new(element.name.as_str());
            for (name, value) in &element.attributes {
                start.push_attribute((name.as_str(), value.as_str()));
            }
            if element.children.is_empty() {
                return emit(writer, Event::Empty(start));
            }
            emit(writer, Event::Start(start))?;
            for &child in &element.children {
                write_node(writer, doc, child)?;
            }
            Event::End(BytesEnd::new(element.name.as_str()))
        }
        // Only markup characters are escaped in content, so quotes and
        // apostrophes survive a round trip unchanged.
        Node::Text(text) => Event::Text(BytesText::from_escaped(partial_escape(text))),
        Node::Comment(text) => Event::Comment(BytesText::from_escaped(text.as_str())),
        Node::ProcessingInstruction { target, value } => {
            let content = match value {
                Some(v) => format!("{target} {v}"),
                None => target.clone(),
            };
            Event::PI(BytesText::from_escaped(content))
        }
    };
    emit(writer, event)
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event) -> Result<(), ScoreError> {
    writer
        .write_event(event)
        .map_err(|e| ScoreError::Serialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_musicxml;
    use pretty_assertions::assert_eq;

    #[test]
    fn untouched_documents_round_trip() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="3.1">
  <!-- engraved by hand -->
  <part-list>
    <score-part id="P1"><part-name>Bass &amp; Drums</part-name></score-part>
  </part-list>
  <part id="P1">
    <measure number="1"><note><rest/><duration>4</duration></note></measure>
  </part>
</score-partwise>
"#;
        let doc = parse_musicxml(xml).unwrap();
        assert_eq!(write_musicxml(&doc).unwrap(), xml);
    }

    #[test]
    fn escapes_new_text() {
        let mut doc = Document::new("score-partwise");
        let root = doc.root();
        let name = doc.create_text_element("part-name", "Horn <F>");
        doc.append(root, name);
        doc.set_attr(name, "print-object", "yes");
        assert_eq!(
            write_musicxml(&doc).unwrap(),
            r#"<score-partwise><part-name print-object="yes">Horn &lt;F&gt;</part-name></score-partwise>"#
        );
    }
}
