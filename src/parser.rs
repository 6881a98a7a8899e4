//! MusicXML reader. Builds the working tree from text and pulls typed
//! values (pitches, staff numbers, key signatures) back out of it.

use roxmltree::NodeType;

use crate::error::ScoreError;
use crate::model::{Document, Node, NodeId};
use crate::pitch::{Pitch, Step, ALTER_RANGE, OCTAVE_RANGE};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Parse a MusicXML string into a working tree.
pub fn parse_musicxml(xml: &str) -> Result<Document, ScoreError> {
    // MusicXML files include a DOCTYPE declaration, so we must allow DTDs
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let source = roxmltree::Document::parse_with_options(xml, options)?;
    let root = source.root_element();

    // Verify this is a score-partwise document
    if root.tag_name().name() != "score-partwise" {
        return Err(ScoreError::UnsupportedRoot(root.tag_name().name().to_string()));
    }

    let mut doc = Document::new("score-partwise");
    let range = root.range();
    doc.set_prolog(&xml[..range.start]);
    doc.set_epilog(&xml[range.end..]);

    let root_id = doc.root();
    for ns in root.namespaces() {
        match ns.name() {
            Some("xml") => {}
            Some(prefix) => doc.set_attr(root_id, &format!("xmlns:{prefix}"), ns.uri()),
            None => doc.set_attr(root_id, "xmlns", ns.uri()),
        }
    }
    copy_attributes(&mut doc, root_id, &root);

    for child in root.children() {
        if let Some(id) = import(&mut doc, &child) {
            doc.push_child(root_id, id);
        }
    }

    Ok(doc)
}

fn import(doc: &mut Document, node: &roxmltree::Node) -> Option<NodeId> {
    match node.node_type() {
        NodeType::Element => {
            let tag = node.tag_name();
            let id = doc.create_element(&qualified_name(node, tag.namespace(), tag.name()));
            copy_attributes(doc, id, node);
            for child in node.children() {
                if let Some(child_id) = import(doc, &child) {
                    doc.push_child(id, child_id);
                }
            }
            Some(id)
        }
        NodeType::Text => node.text().map(|t| doc.create_text(t)),
        NodeType::Comment => node
            .text()
            .map(|t| doc.push_node(Node::Comment(t.to_string()))),
        NodeType::PI => node.pi().map(|pi| {
            doc.push_node(Node::ProcessingInstruction {
                target: pi.target.to_string(),
                value: pi.value.map(String::from),
            })
        }),
        NodeType::Root => None,
    }
}

fn copy_attributes(doc: &mut Document, id: NodeId, node: &roxmltree::Node) {
    for attr in node.attributes() {
        let name = qualified_name(node, attr.namespace(), attr.name());
        doc.set_attr(id, &name, attr.value());
    }
}

/// roxmltree resolves prefixes away; put them back for output.
fn qualified_name(node: &roxmltree::Node, namespace: Option<&str>, local: &str) -> String {
    match namespace {
        Some(XML_NAMESPACE) => format!("xml:{local}"),
        Some(uri) => match node.lookup_prefix(uri) {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
            _ => local.to_string(),
        },
        None => local.to_string(),
    }
}

// ─── Structure ───────────────────────────────────────────────────────

/// `<part>` elements in document order.
pub fn parts(doc: &Document) -> Vec<NodeId> {
    doc.children_named(doc.root(), "part")
}

pub fn measures(doc: &Document, part: NodeId) -> Vec<NodeId> {
    doc.children_named(part, "measure")
}

pub fn part_list(doc: &Document) -> Option<NodeId> {
    doc.child(doc.root(), "part-list")
}

/// The `<score-part>` entry declaring `id`.
pub fn score_part(doc: &Document, id: &str) -> Option<NodeId> {
    let list = part_list(doc)?;
    doc.children_named(list, "score-part")
        .into_iter()
        .find(|&sp| doc.attr(sp, "id") == Some(id))
}

/// Staff count of a part: the largest `<staves>` declaration, or the
/// largest `<staff>` number used by a note, whichever is greater.
pub fn declared_staves(doc: &Document, part: NodeId) -> u32 {
    let mut staves = 1;
    for measure in measures(doc, part) {
        for attributes in doc.children_named(measure, "attributes") {
            if let Some(n) = parse_u32(doc, attributes, "staves") {
                staves = staves.max(n);
            }
        }
        for note in doc.children_named(measure, "note") {
            staves = staves.max(staff_of(doc, note));
        }
    }
    staves
}

/// Staff number carried by a `<note>`, `<direction>`, `<harmony>` or
/// `<forward>` (defaults to 1).
pub fn staff_of(doc: &Document, id: NodeId) -> u32 {
    parse_u32(doc, id, "staff").unwrap_or(1)
}

// ─── Note ────────────────────────────────────────────────────────────

/// Read a `<pitch>` element. A missing step or octave yields `None`, as
/// does an octave or alter outside what can be notated; a missing or
/// unreadable alter is natural.
pub fn read_pitch(doc: &Document, pitch: NodeId) -> Option<Pitch> {
    let step: Step = doc.child_text(pitch, "step")?.parse().ok()?;
    let octave = doc.child_i32(pitch, "octave").filter(|o| OCTAVE_RANGE.contains(o))?;
    let alter = doc
        .child_text(pitch, "alter")
        .and_then(|t| t.trim().parse::<f64>().ok())
        .map(|a| a.round() as i32)
        .unwrap_or(0);
    if !ALTER_RANGE.contains(&alter) {
        return None;
    }
    Some(Pitch::new(step, alter, octave))
}

/// Duration in divisions (0 when absent, e.g. grace notes, or negative).
pub fn duration_of(doc: &Document, id: NodeId) -> i32 {
    doc.child_i32(id, "duration").unwrap_or(0).max(0)
}

// ─── Key ─────────────────────────────────────────────────────────────

/// `<fifths>` of a traditional key; `None` for non-traditional keys.
pub fn key_fifths(doc: &Document, key: NodeId) -> Option<i32> {
    let fifths = doc.child(key, "fifths")?;
    Some(doc.text(fifths).and_then(|t| t.parse().ok()).unwrap_or(0))
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn parse_u32(doc: &Document, id: NodeId, name: &str) -> Option<u32> {
    doc.child_text(id, name)?.parse().ok()
}
