//! Note pass: rewrites the pitch of every note on the target staff and
//! places accidentals against the transposed key.
//!
//! Keys are transposed before this pass runs, so the signature read from
//! each `<attributes>` block is already the written one.

use crate::accidental::{AccidentalContext, AccidentalGlyph};
use crate::address::Scope;
use crate::interval::Interval;
use crate::key::KeySignature;
use crate::model::{Document, NodeId};
use crate::parser::{key_fifths, measures, read_pitch, staff_of};
use crate::pitch::Pitch;

/// Child order of `<note>`.
const NOTE_ORDER: &[&str] = &[
    "grace",
    "cue",
    "chord",
    "pitch",
    "unpitched",
    "rest",
    "duration",
    "tie",
    "instrument",
    "footnote",
    "level",
    "voice",
    "type",
    "dot",
    "accidental",
    "time-modification",
    "stem",
    "notehead",
    "notehead-text",
    "staff",
    "beam",
    "notations",
    "lyric",
    "play",
    "listen",
];

const PITCH_ORDER: &[&str] = &["step", "alter", "octave"];

/// Transpose the pitched notes of `staff` in `part`. Returns how many
/// notes were rewritten.
pub fn transpose_notes(
    doc: &mut Document,
    part: NodeId,
    staff: u32,
    interval: Interval,
) -> usize {
    if interval.is_identity() {
        return 0;
    }

    let mut context = AccidentalContext::default();
    let mut count = 0;

    for measure in measures(doc, part) {
        context.reset();
        for child in doc.child_elements(measure) {
            match doc.name(child) {
                "attributes" => {
                    if let Some(key) = staff_key(doc, child, staff) {
                        context.set_key(key);
                    }
                }
                "note" if staff_of(doc, child) == staff => {
                    let Some(pitch_el) = doc.child(child, "pitch") else {
                        continue;
                    };
                    let Some(pitch) = read_pitch(doc, pitch_el) else {
                        log::debug!("skipping note with unreadable pitch");
                        continue;
                    };
                    let written = pitch.transpose(interval);
                    write_pitch(doc, pitch_el, &written);
                    let glyph = context.resolve(&written);
                    write_accidental(doc, child, glyph);
                    count += 1;
                }
                _ => {}
            }
        }
    }

    count
}

/// The last traditional key in `attributes` that applies to `staff`.
fn staff_key(doc: &Document, attributes: NodeId, staff: u32) -> Option<KeySignature> {
    doc.children_named(attributes, "key")
        .into_iter()
        .filter(|&k| Scope::of(doc, k).applies_to(staff))
        .filter_map(|k| key_fifths(doc, k))
        .last()
        .map(KeySignature::new)
}

fn write_pitch(doc: &mut Document, pitch_el: NodeId, pitch: &Pitch) {
    if let Some(step) = doc.child(pitch_el, "step") {
        doc.set_text(step, pitch.step.as_str());
    }
    if let Some(octave) = doc.child(pitch_el, "octave") {
        doc.set_text(octave, &pitch.octave.to_string());
    }
    match (doc.child(pitch_el, "alter"), pitch.alter) {
        (Some(alter), 0) => {
            doc.remove(pitch_el, alter);
        }
        (Some(alter), value) => doc.set_text(alter, &value.to_string()),
        (None, 0) => {}
        (None, value) => {
            let alter = doc.create_text_element("alter", &value.to_string());
            doc.insert_ordered(pitch_el, alter, PITCH_ORDER);
        }
    }
}

fn write_accidental(doc: &mut Document, note: NodeId, glyph: Option<AccidentalGlyph>) {
    let existing = doc.child(note, "accidental");
    match (existing, glyph) {
        (Some(el), Some(glyph)) => {
            if doc.text(el) != Some(glyph.as_str()) {
                // cautionary/editorial flags described the old glyph
                for name in ["cautionary", "editorial", "parentheses", "bracket"] {
                    doc.remove_attr(el, name);
                }
                doc.set_text(el, glyph.as_str());
            }
        }
        (Some(el), None) => {
            doc.remove(note, el);
        }
        (None, Some(glyph)) => {
            let el = doc.create_text_element("accidental", glyph.as_str());
            doc.insert_ordered(note, el, NOTE_ORDER);
        }
        (None, None) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_musicxml, parts};
    use crate::writer::write_musicxml;
    use pretty_assertions::assert_eq;

    fn notes_of(doc: &Document) -> Vec<(String, Option<String>)> {
        doc.descendants_named(doc.root(), "note")
            .into_iter()
            .filter_map(|n| {
                let pitch = read_pitch(doc, doc.child(n, "pitch")?)?;
                Some((pitch.to_string(), doc.child_text(n, "accidental").map(String::from)))
            })
            .collect()
    }

    const MELODY: &str = r#"<score-partwise><part-list><score-part id="P1"/></part-list><part id="P1">
<measure number="1"><attributes><key><fifths>0</fifths></key></attributes>
<note><pitch><step>F</step><alter>1</alter><octave>4</octave></pitch><duration>1</duration><type>quarter</type><accidental>sharp</accidental></note>
<note><pitch><step>F</step><alter>1</alter><octave>4</octave></pitch><duration>1</duration><type>quarter</type></note>
<note><pitch><step>B</step><octave>4</octave></pitch><duration>1</duration><type>quarter</type></note>
<note><rest/><duration>1</duration></note>
</measure>
<measure number="2">
<note><pitch><step>F</step><alter>1</alter><octave>4</octave></pitch><duration>4</duration><type>whole</type><accidental>sharp</accidental></note>
</measure></part></score-partwise>"#;

    fn transposed(xml: &str, interval: Interval, fifths: i32) -> Document {
        let mut doc = parse_musicxml(xml).unwrap();
        let part = parts(&doc)[0];
        // Stand in for the key pass.
        for key in doc.descendants_named(part, "fifths") {
            doc.set_text(key, &fifths.to_string());
        }
        transpose_notes(&mut doc, part, 1, interval);
        doc
    }

    #[test]
    fn accidentals_follow_the_written_key() {
        let doc = transposed(MELODY, Interval::new(1, 2), 2);
        assert_eq!(
            notes_of(&doc),
            vec![
                ("G#4".to_string(), Some("sharp".to_string())),
                ("G#4".to_string(), None),
                ("C#5".to_string(), None),
                ("G#4".to_string(), Some("sharp".to_string())),
            ]
        );
    }

    #[test]
    fn new_accidentals_are_placed_after_type() {
        let xml = r#"<score-partwise><part id="P1"><measure number="1"><note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration><type>quarter</type><stem>up</stem></note></measure></part></score-partwise>"#;
        let mut doc = parse_musicxml(xml).unwrap();
        let part = parts(&doc)[0];
        transpose_notes(&mut doc, part, 1, Interval::new(0, 1));
        assert_eq!(
            write_musicxml(&doc).unwrap(),
            r#"<score-partwise><part id="P1"><measure number="1"><note><pitch><step>C</step><alter>1</alter><octave>4</octave></pitch><duration>1</duration><type>quarter</type><accidental>sharp</accidental><stem>up</stem></note></measure></part></score-partwise>"#
        );
    }

    #[test]
    fn naturals_drop_the_alter_element() {
        let doc = transposed(MELODY, Interval::new(0, -1), -5);
        let xml = write_musicxml(&doc).unwrap();
        // D-flat major leaves F unaltered, so the old sharp glyph goes.
        assert_eq!(notes_of(&doc)[0], ("F4".to_string(), None));
        assert!(xml.starts_with(
            "<score-partwise><part-list><score-part id=\"P1\"/></part-list><part id=\"P1\">\n<measure number=\"1\"><attributes><key><fifths>-5</fifths></key></attributes>\n<note><pitch><step>F</step><octave>4</octave></pitch>"
        ));
    }

    #[test]
    fn identity_touches_nothing() {
        let mut doc = parse_musicxml(MELODY).unwrap();
        let part = parts(&doc)[0];
        assert_eq!(transpose_notes(&mut doc, part, 1, Interval::IDENTITY), 0);
        assert_eq!(write_musicxml(&doc).unwrap(), MELODY);
    }

    #[test]
    fn other_staves_are_left_alone() {
        let xml = r#"<score-partwise><part id="P1"><measure number="1">
<note><pitch><step>C</step><octave>5</octave></pitch><duration>1</duration><staff>1</staff></note>
<note><pitch><step>C</step><octave>3</octave></pitch><duration>1</duration><staff>2</staff></note>
</measure></part></score-partwise>"#;
        let mut doc = parse_musicxml(xml).unwrap();
        let part = parts(&doc)[0];
        assert_eq!(transpose_notes(&mut doc, part, 2, Interval::new(1, 2)), 1);
        let pitches: Vec<_> = notes_of(&doc).into_iter().map(|(p, _)| p).collect();
        assert_eq!(pitches, ["C5", "D3"]);
    }
}
