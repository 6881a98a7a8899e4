//! Pitch-range summaries and the little preview score that shows them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::accidental::AccidentalContext;
use crate::clef::ClefKind;
use crate::interval::Interval;
use crate::key::KeySignature;
use crate::model::Document;
use crate::parser::{declared_staves, parse_musicxml, parts, read_pitch, staff_of};
use crate::pitch::Pitch;
use crate::transform::resolve;

/// Lowest and highest written pitch of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchRange {
    pub min: Pitch,
    pub max: Pitch,
}

impl PitchRange {
    pub fn transposed(&self, interval: Interval) -> PitchRange {
        PitchRange {
            min: self.min.transpose(interval),
            max: self.max.transpose(interval),
        }
    }
}

impl fmt::Display for PitchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.min, self.max)
    }
}

/// Range of the part (or staff) `target_index` addresses, shifted by
/// `semitone_shift`. The score is not split first, so in a single-part
/// score the index picks a staff.
pub fn part_range(xml: &str, target_index: usize, semitone_shift: i32) -> Option<PitchRange> {
    let doc = match parse_musicxml(xml) {
        Ok(doc) => doc,
        Err(e) => {
            log::warn!("{e}; no range available");
            return None;
        }
    };
    let range = range_of(&doc, target_index)?;
    Some(range.transposed(Interval::from_semitones(semitone_shift)))
}

/// Range of every addressable part or staff, in UI order.
pub fn ranges(xml: &str) -> Vec<Option<PitchRange>> {
    let Ok(doc) = parse_musicxml(xml) else {
        return Vec::new();
    };
    let parts = parts(&doc);
    let count = match parts.as_slice() {
        [only] => declared_staves(&doc, *only) as usize,
        _ => parts.len(),
    };
    (1..=count).map(|index| range_of(&doc, index)).collect()
}

fn range_of(doc: &Document, target_index: usize) -> Option<PitchRange> {
    let address = resolve(doc, target_index)?;
    let part = parts(doc)[address.part_index()];

    let mut range: Option<PitchRange> = None;
    for note in doc.descendants_named(part, "note") {
        if staff_of(doc, note) != address.staff() {
            continue;
        }
        let Some(pitch) = doc.child(note, "pitch").and_then(|p| read_pitch(doc, p)) else {
            continue;
        };
        range = Some(match range {
            None => PitchRange { min: pitch, max: pitch },
            Some(r) => PitchRange {
                min: if pitch.to_midi() < r.min.to_midi() { pitch } else { r.min },
                max: if pitch.to_midi() > r.max.to_midi() { pitch } else { r.max },
            },
        });
    }
    range
}

/// One measure holding the two ends of `range`, for a small preview
/// rendering in the given clef and key.
pub fn range_preview_xml(range: &PitchRange, clef: ClefKind, fifths: i32) -> String {
    let key = KeySignature::new(fifths);
    let (sign, line) = clef.sign_line();
    let mut context = AccidentalContext::new(key);
    let low = preview_note(&range.min, &mut context);
    let high = preview_note(&range.max, &mut context);

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 3.1 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="3.1">
  <part-list>
    <score-part id="P1">
      <part-name>Range</part-name>
    </score-part>
  </part-list>
  <part id="P1">
    <measure number="1">
      <attributes>
        <divisions>1</divisions>
        <key>
          <fifths>{fifths}</fifths>
        </key>
        <clef>
          <sign>{sign}</sign>
          <line>{line}</line>
        </clef>
      </attributes>
{low}{high}    </measure>
  </part>
</score-partwise>
"#,
        fifths = key.fifths(),
    )
}

fn preview_note(pitch: &Pitch, context: &mut AccidentalContext) -> String {
    let alter = if pitch.alter != 0 {
        format!("\n          <alter>{}</alter>", pitch.alter)
    } else {
        String::new()
    };
    let accidental = context
        .resolve(pitch)
        .map(|glyph| format!("\n        <accidental>{}</accidental>", glyph.as_str()))
        .unwrap_or_default();
    format!(
        r#"      <note>
        <pitch>
          <step>{step}</step>{alter}
          <octave>{octave}</octave>
        </pitch>
        <duration>1</duration>
        <type>quarter</type>{accidental}
      </note>
"#,
        step = pitch.step,
        octave = pitch.octave,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PIANO: &str = r#"<score-partwise><part id="P1"><measure number="1">
<attributes><staves>2</staves></attributes>
<note><pitch><step>G</step><octave>4</octave></pitch><duration>1</duration><staff>1</staff></note>
<note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration><staff>1</staff></note>
<note><rest/><duration>1</duration><staff>1</staff></note>
<note><pitch><step>F</step><alter>1</alter><octave>2</octave></pitch><duration>1</duration><staff>2</staff></note>
</measure></part></score-partwise>"#;

    fn p(s: &str) -> Pitch {
        s.parse().unwrap()
    }

    #[test]
    fn range_of_each_staff() {
        let range = part_range(PIANO, 1, 0).unwrap();
        assert_eq!(range, PitchRange { min: p("C4"), max: p("G4") });
        assert_eq!(range.to_string(), "C4 - G4");
        assert_eq!(part_range(PIANO, 2, 0).unwrap().to_string(), "F#2 - F#2");
        assert_eq!(part_range(PIANO, 3, 0), None);
    }

    #[test]
    fn shifted_ranges() {
        assert_eq!(part_range(PIANO, 1, 12).unwrap().to_string(), "C5 - G5");
        assert_eq!(part_range(PIANO, 1, 2).unwrap().to_string(), "D4 - A4");
        assert_eq!(part_range(PIANO, 1, -1).unwrap().to_string(), "B3 - F#4");
        assert_eq!(part_range(PIANO, 1, i32::MIN).unwrap().to_string(), "C-6 - G-6");
        assert_eq!(part_range(PIANO, 1, i32::MAX).unwrap().to_string(), "C14 - G14");
    }

    #[test]
    fn all_ranges_in_ui_order() {
        let all = ranges(PIANO);
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].map(|r| r.min), Some(p("F#2")));
        assert!(ranges("<broken").is_empty());
    }

    #[test]
    fn ranges_serialize() {
        let json = serde_json::to_string(&PitchRange { min: p("Bb3"), max: p("D5") }).unwrap();
        assert_eq!(
            json,
            r#"{"min":{"step":"B","alter":-1,"octave":3},"max":{"step":"D","alter":0,"octave":5}}"#
        );
    }

    #[test]
    fn preview_marks_accidentals_against_the_key() {
        let range = PitchRange { min: p("F#4"), max: p("Bb4") };
        let xml = range_preview_xml(&range, ClefKind::Treble, 2);
        let doc = parse_musicxml(&xml).unwrap();
        let notes = doc.descendants_named(doc.root(), "note");
        assert_eq!(notes.len(), 2);
        assert_eq!(doc.child(notes[0], "accidental"), None);
        assert_eq!(doc.child_text(notes[1], "accidental"), Some("flat"));
        assert!(xml.contains("<fifths>2</fifths>"));
        assert!(xml.contains("<sign>G</sign>"));
    }
}
