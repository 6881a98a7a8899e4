//! Clef rewriting.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScoreError;
use crate::key::ATTRIBUTES_ORDER;
use crate::model::{Document, NodeId};
use crate::parser::measures;

const CLEF_ORDER: &[&str] = &["sign", "line", "clef-octave-change"];
const MEASURE_ORDER: &[&str] = &["print", "attributes"];

/// The clefs an instrument can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClefKind {
    Treble,
    Bass,
    Alto,
    Tenor,
}

impl ClefKind {
    /// MusicXML `(sign, line)` pair.
    pub fn sign_line(self) -> (&'static str, u32) {
        match self {
            ClefKind::Treble => ("G", 2),
            ClefKind::Bass => ("F", 4),
            ClefKind::Alto => ("C", 3),
            ClefKind::Tenor => ("C", 4),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClefKind::Treble => "treble",
            ClefKind::Bass => "bass",
            ClefKind::Alto => "alto",
            ClefKind::Tenor => "tenor",
        }
    }
}

impl fmt::Display for ClefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClefKind {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "treble" => Ok(ClefKind::Treble),
            "bass" => Ok(ClefKind::Bass),
            "alto" => Ok(ClefKind::Alto),
            "tenor" => Ok(ClefKind::Tenor),
            _ => Err(ScoreError::UnknownClef(s.to_string())),
        }
    }
}

/// Rewrite every clef of `staff` in `part` to `kind`, creating one in the
/// part's first `<attributes>` when there is none. `staves` is the part's
/// staff count; clefs without a `number` belong to staff 1.
pub fn rewrite_clefs(
    doc: &mut Document,
    part: NodeId,
    staff: u32,
    staves: u32,
    kind: ClefKind,
) -> usize {
    let mut rewritten = 0;
    for measure in measures(doc, part) {
        for attributes in doc.children_named(measure, "attributes") {
            for clef in doc.children_named(attributes, "clef") {
                if clef_staff(doc, clef) == staff {
                    write_clef(doc, clef, kind);
                    rewritten += 1;
                }
            }
        }
    }

    if rewritten == 0 {
        let Some(attributes) = first_attributes(doc, part) else {
            log::debug!("part has no measures; no clef written");
            return 0;
        };
        let clef = doc.create_element("clef");
        if staves > 1 {
            doc.set_attr(clef, "number", &staff.to_string());
        }
        write_clef(doc, clef, kind);
        doc.insert_ordered(attributes, clef, ATTRIBUTES_ORDER);
        rewritten = 1;
    }

    rewritten
}

fn clef_staff(doc: &Document, clef: NodeId) -> u32 {
    doc.attr(clef, "number")
        .and_then(|n| n.trim().parse().ok())
        .unwrap_or(1)
}

fn write_clef(doc: &mut Document, clef: NodeId, kind: ClefKind) {
    let (sign, line) = kind.sign_line();
    for (name, value) in [("sign", sign.to_string()), ("line", line.to_string())] {
        match doc.child(clef, name) {
            Some(el) => doc.set_text(el, &value),
            None => {
                let el = doc.create_text_element(name, &value);
                doc.insert_ordered(clef, el, CLEF_ORDER);
            }
        }
    }
    if let Some(octave_change) = doc.child(clef, "clef-octave-change") {
        doc.remove(clef, octave_change);
    }
}

/// The first `<attributes>` of the part, created in the first measure if
/// the part has none.
fn first_attributes(doc: &mut Document, part: NodeId) -> Option<NodeId> {
    let measures = measures(doc, part);
    if let Some(found) = measures
        .iter()
        .find_map(|&m| doc.child(m, "attributes"))
    {
        return Some(found);
    }
    let first = *measures.first()?;
    let attributes = doc.create_element("attributes");
    doc.insert_ordered(first, attributes, MEASURE_ORDER);
    Some(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_musicxml, parts};
    use crate::writer::write_musicxml;
    use pretty_assertions::assert_eq;

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!("Bass".parse::<ClefKind>().unwrap(), ClefKind::Bass);
        assert_eq!(" TENOR ".parse::<ClefKind>().unwrap().sign_line(), ("C", 4));
        assert!(matches!(
            "percussion".parse::<ClefKind>(),
            Err(ScoreError::UnknownClef(_))
        ));
    }

    #[test]
    fn rewrites_only_the_target_staff() {
        let xml = r#"<score-partwise><part id="P1"><measure number="1"><attributes><staves>2</staves><clef number="1"><sign>G</sign><line>2</line><clef-octave-change>-1</clef-octave-change></clef><clef number="2"><sign>F</sign><line>4</line></clef></attributes></measure></part></score-partwise>"#;
        let mut doc = parse_musicxml(xml).unwrap();
        let part = parts(&doc)[0];
        assert_eq!(rewrite_clefs(&mut doc, part, 1, 2, ClefKind::Alto), 1);
        assert_eq!(
            write_musicxml(&doc).unwrap(),
            r#"<score-partwise><part id="P1"><measure number="1"><attributes><staves>2</staves><clef number="1"><sign>C</sign><line>3</line></clef><clef number="2"><sign>F</sign><line>4</line></clef></attributes></measure></part></score-partwise>"#
        );
    }

    #[test]
    fn mid_piece_changes_follow() {
        let xml = r#"<score-partwise><part id="P1"><measure number="1"><attributes><clef><sign>G</sign><line>2</line></clef></attributes></measure><measure number="2"><attributes><clef><sign>F</sign><line>4</line></clef></attributes></measure></part></score-partwise>"#;
        let mut doc = parse_musicxml(xml).unwrap();
        let part = parts(&doc)[0];
        assert_eq!(rewrite_clefs(&mut doc, part, 1, 1, ClefKind::Bass), 2);
        let signs: Vec<_> = doc
            .descendants_named(part, "sign")
            .into_iter()
            .filter_map(|s| doc.text(s))
            .collect();
        assert_eq!(signs, ["F", "F"]);
    }

    #[test]
    fn creates_a_missing_clef_in_schema_order() {
        let xml = r#"<score-partwise><part id="P1"><measure number="1"><attributes><divisions>1</divisions><transpose><diatonic>0</diatonic><chromatic>0</chromatic></transpose></attributes></measure></part></score-partwise>"#;
        let mut doc = parse_musicxml(xml).unwrap();
        let part = parts(&doc)[0];
        rewrite_clefs(&mut doc, part, 1, 1, ClefKind::Treble);
        assert_eq!(
            write_musicxml(&doc).unwrap(),
            r#"<score-partwise><part id="P1"><measure number="1"><attributes><divisions>1</divisions><clef><sign>G</sign><line>2</line></clef><transpose><diatonic>0</diatonic><chromatic>0</chromatic></transpose></attributes></measure></part></score-partwise>"#
        );
    }

    #[test]
    fn creates_attributes_when_the_part_has_none() {
        let xml = r#"<score-partwise><part id="P1"><measure number="1"><print/><note><rest/></note></measure></part></score-partwise>"#;
        let mut doc = parse_musicxml(xml).unwrap();
        let part = parts(&doc)[0];
        rewrite_clefs(&mut doc, part, 1, 1, ClefKind::Bass);
        assert_eq!(
            write_musicxml(&doc).unwrap(),
            r#"<score-partwise><part id="P1"><measure number="1"><print/><attributes><clef><sign>F</sign><line>4</line></clef></attributes><note><rest/></note></measure></part></score-partwise>"#
        );
    }
}
