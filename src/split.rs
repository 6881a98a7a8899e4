//! Grand-staff splitting.
//!
//! A single part written on several staves (a piano's two hands) becomes
//! one part per staff, so that every later pass can treat "part N" as one
//! staff. Splitting a score that already has several parts does nothing.
//!
//! Each new part keeps only its own staff's notes and directions. The
//! `<backup>`/`<forward>` elements that interleaved the staves are dropped
//! and regenerated from the kept elements' start times, so each part's
//! timeline still adds up.

use crate::model::{Document, NodeId};
use crate::parser::{declared_staves, duration_of, measures, part_list, parts, score_part, staff_of};

const SCORE_PART_ORDER: &[&str] = &[
    "identification",
    "part-link",
    "part-name",
    "part-name-display",
    "part-abbreviation",
    "part-abbreviation-display",
    "group",
    "score-instrument",
    "player",
    "midi-device",
    "midi-instrument",
];

/// Split the sole part of `doc` into one part per staff. Returns whether
/// anything changed.
pub fn split_grand_staff(doc: &mut Document) -> bool {
    let parts = parts(doc);
    let &[part] = parts.as_slice() else {
        return false;
    };
    let staves = declared_staves(doc, part);
    if staves < 2 {
        return false;
    }

    let root = doc.root();
    let id = doc.attr(part, "id").unwrap_or("P1").to_string();
    let entry = score_part(doc, &id);
    let list = part_list(doc);
    let name = entry
        .and_then(|sp| doc.child_text(sp, "part-name"))
        .unwrap_or(id.as_str())
        .to_string();

    let mut last_part = part;
    let mut last_entry = entry;
    for staff in 1..=staves {
        let suffix = format!("-S{staff}");
        let new_id = format!("{id}{suffix}");

        let copy = doc.deep_clone(part);
        doc.set_attr(copy, "id", &new_id);
        filter_to_staff(doc, copy, staff);
        suffix_instrument_refs(doc, copy, &suffix);
        doc.insert_after(root, last_part, copy);
        last_part = copy;

        if let (Some(list), Some(entry), Some(anchor)) = (list, entry, last_entry) {
            let new_entry = doc.deep_clone(entry);
            doc.set_attr(new_entry, "id", &new_id);
            set_part_name(doc, new_entry, &staff_label(&name, staff, staves));
            for dropped in ["part-abbreviation", "part-abbreviation-display", "part-name-display"] {
                if let Some(el) = doc.child(new_entry, dropped) {
                    doc.remove(new_entry, el);
                }
            }
            for inst in ["score-instrument", "midi-instrument"] {
                for el in doc.children_named(new_entry, inst) {
                    suffix_attr(doc, el, "id", &suffix);
                }
            }
            doc.insert_after(list, anchor, new_entry);
            last_entry = Some(new_entry);
        }
    }

    doc.remove(root, part);
    if let (Some(list), Some(entry)) = (list, entry) {
        doc.remove(list, entry);
    }
    log::debug!("split part {id} into {staves} single-staff parts");
    true
}

/// Name of the part made from `staff` of a `staves`-staff part.
pub fn staff_label(name: &str, staff: u32, staves: u32) -> String {
    match (staves, staff) {
        (2, 1) => format!("{name} (High)"),
        (2, _) => format!("{name} (Low)"),
        _ => format!("{name} (Staff {staff})"),
    }
}

/// Whether `id` was produced by [`split_grand_staff`].
pub fn is_split_part(id: &str) -> bool {
    id.rsplit_once("-S")
        .is_some_and(|(base, n)| !base.is_empty() && !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Rename the part to `display_name`. Parts made by splitting keep their
/// staff label in front: "Piano (High) - Flute".
pub fn relabel_part(doc: &mut Document, part: NodeId, display_name: &str) {
    let Some(id) = doc.attr(part, "id").map(String::from) else {
        return;
    };
    let Some(entry) = score_part(doc, &id) else {
        log::debug!("no part-list entry for {id}; not relabelled");
        return;
    };
    let label = match doc.child_text(entry, "part-name") {
        Some(current) if is_split_part(&id) => {
            format!("{} - {display_name}", labelled_base(current, &id))
        }
        _ => display_name.to_string(),
    };
    set_part_name(doc, entry, &label);
    if let Some(display) = doc.child(entry, "part-name-display") {
        doc.remove(entry, display);
    }
}

/// `name` up to the end of the staff label the splitter gave part `id`,
/// dropping any display name appended after it.
fn labelled_base<'a>(name: &'a str, id: &str) -> &'a str {
    let staff = id.rsplit_once("-S").map_or("", |(_, n)| n);
    let staff_tag = format!("(Staff {staff})");
    let tags = match staff {
        "1" => vec!["(High)", staff_tag.as_str()],
        "2" => vec!["(Low)", staff_tag.as_str()],
        _ => vec![staff_tag.as_str()],
    };
    tags.iter()
        .flat_map(|tag| name.match_indices(tag).map(move |(at, _)| at + tag.len()))
        .filter(|&end| name[end..].is_empty() || name[end..].starts_with(" - "))
        .min()
        .map_or(name, |end| &name[..end])
}

fn set_part_name(doc: &mut Document, entry: NodeId, name: &str) {
    match doc.child(entry, "part-name") {
        Some(el) => doc.set_text(el, name),
        None => {
            let el = doc.create_text_element("part-name", name);
            doc.insert_ordered(entry, el, SCORE_PART_ORDER);
        }
    }
}

fn suffix_attr(doc: &mut Document, id: NodeId, name: &str, suffix: &str) {
    if let Some(value) = doc.attr(id, name).map(String::from) {
        doc.set_attr(id, name, &format!("{value}{suffix}"));
    }
}

/// Notes point at their part's `score-instrument` by id.
fn suffix_instrument_refs(doc: &mut Document, part: NodeId, suffix: &str) {
    for note in doc.descendants_named(part, "note") {
        for inst in doc.children_named(note, "instrument") {
            suffix_attr(doc, inst, "id", suffix);
        }
    }
    for inst in doc.descendants_named(part, "midi-instrument") {
        suffix_attr(doc, inst, "id", suffix);
    }
}

// ─── Staff filtering ─────────────────────────────────────────────────

/// Reduce `part` to the content of `staff`, renumbered as a single-staff
/// part. Shared by the splitter and single-part isolation.
pub fn filter_to_staff(doc: &mut Document, part: NodeId, staff: u32) {
    for measure in measures(doc, part) {
        let kept = filter_measure(doc, measure, staff);
        doc.replace_children(measure, kept);
    }
}

/// Time positions within one measure, in divisions.
#[derive(Debug, Default)]
struct Cursors {
    /// Position in the original, interleaved measure.
    source: i32,
    /// Position in the rebuilt measure.
    kept: i32,
    /// Start of the last note seen, for chord members.
    last_start: i32,
    /// Start of the last note kept.
    last_kept_start: Option<i32>,
    /// Furthest point the kept staff's own `<forward>`s reached.
    staff_end: i32,
}

fn filter_measure(doc: &mut Document, measure: NodeId, staff: u32) -> Vec<NodeId> {
    let mut kept = Vec::new();
    let mut at = Cursors::default();

    let children: Vec<NodeId> = doc
        .children(measure)
        .iter()
        .copied()
        .filter(|&c| !doc.is_whitespace(c))
        .collect();

    for child in children {
        match doc.name(child) {
            "note" => {
                let duration = duration_of(doc, child);
                let chord = doc.child(child, "chord");
                let start = if chord.is_some() { at.last_start } else { at.source };
                if chord.is_none() {
                    at.last_start = at.source;
                    at.source = at.source.saturating_add(duration);
                }
                if staff_of(doc, child) != staff {
                    continue;
                }
                match chord {
                    Some(_) if at.last_kept_start == Some(start) => {}
                    Some(chord) => {
                        // its chord root lived on another staff
                        doc.remove(child, chord);
                        realign(doc, &mut kept, &mut at.kept, start);
                        at.kept = at.kept.saturating_add(duration);
                    }
                    None => {
                        realign(doc, &mut kept, &mut at.kept, start);
                        at.kept = at.kept.saturating_add(duration);
                    }
                }
                at.last_kept_start = Some(start);
                strip_staff(doc, child);
                kept.push(child);
            }
            "backup" => {
                at.source = (at.source - duration_of(doc, child)).max(0);
            }
            "forward" => {
                at.source = at.source.saturating_add(duration_of(doc, child));
                if staff_of(doc, child) == staff {
                    at.staff_end = at.staff_end.max(at.source);
                }
            }
            "direction" | "harmony" | "figured-bass" => {
                if staff_of(doc, child) != staff {
                    continue;
                }
                realign(doc, &mut kept, &mut at.kept, at.source);
                strip_staff(doc, child);
                kept.push(child);
            }
            "attributes" => {
                if filter_attributes(doc, child, staff) {
                    realign(doc, &mut kept, &mut at.kept, at.source);
                    kept.push(child);
                }
            }
            _ => kept.push(child),
        }
    }

    if at.staff_end > at.kept {
        realign(doc, &mut kept, &mut at.kept, at.staff_end);
    }
    kept
}

/// Emit a `<forward>` or `<backup>` moving the rebuilt cursor to `target`.
fn realign(doc: &mut Document, kept: &mut Vec<NodeId>, cursor: &mut i32, target: i32) {
    let name = match target.cmp(cursor) {
        std::cmp::Ordering::Greater => "forward",
        std::cmp::Ordering::Less => "backup",
        std::cmp::Ordering::Equal => return,
    };
    let el = doc.create_element(name);
    let duration = doc.create_text_element("duration", &(target - *cursor).abs().to_string());
    doc.push_child(el, duration);
    kept.push(el);
    *cursor = target;
}

fn strip_staff(doc: &mut Document, id: NodeId) {
    for el in doc.children_named(id, "staff") {
        doc.remove(id, el);
    }
}

/// Keep only what applies to `staff`. Returns whether anything is left.
fn filter_attributes(doc: &mut Document, attributes: NodeId, staff: u32) -> bool {
    for child in doc.child_elements(attributes) {
        let number: Option<u32> = doc.attr(child, "number").and_then(|n| n.trim().parse().ok());
        let drop = match doc.name(child) {
            // unnumbered clefs belong to the first staff
            "clef" | "staff-details" => number.unwrap_or(1) != staff,
            "key" | "time" | "transpose" | "measure-style" => number.is_some_and(|n| n != staff),
            "staves" | "part-symbol" => true,
            _ => false,
        };
        if drop {
            doc.remove(attributes, child);
        } else if number.is_some() {
            doc.remove_attr(child, "number");
        }
    }
    !doc.child_elements(attributes).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_musicxml;
    use crate::writer::write_musicxml;
    use pretty_assertions::assert_eq;

    const PIANO: &str = r#"<score-partwise>
  <part-list>
    <score-part id="P1"><part-name>Piano</part-name><part-abbreviation>Pno.</part-abbreviation><score-instrument id="P1-I1"><instrument-name>Piano</instrument-name></score-instrument></score-part>
  </part-list>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions><key><fifths>0</fifths></key><staves>2</staves><clef number="1"><sign>G</sign><line>2</line></clef><clef number="2"><sign>F</sign><line>4</line></clef></attributes>
      <note><pitch><step>E</step><octave>5</octave></pitch><duration>2</duration><voice>1</voice><staff>1</staff></note>
      <note><chord/><pitch><step>G</step><octave>5</octave></pitch><duration>2</duration><voice>1</voice><staff>1</staff></note>
      <note><pitch><step>D</step><octave>5</octave></pitch><duration>2</duration><voice>1</voice><staff>1</staff></note>
      <backup><duration>4</duration></backup>
      <direction><direction-type><words>legato</words></direction-type><staff>2</staff></direction>
      <note><pitch><step>C</step><octave>3</octave></pitch><duration>4</duration><voice>5</voice><staff>2</staff></note>
    </measure>
  </part>
</score-partwise>"#;

    fn split(xml: &str) -> Document {
        let mut doc = parse_musicxml(xml).unwrap();
        assert!(split_grand_staff(&mut doc));
        doc
    }

    #[test]
    fn one_part_per_staff() {
        let doc = split(PIANO);
        let parts = parts(&doc);
        let ids: Vec<_> = parts.iter().filter_map(|&p| doc.attr(p, "id")).collect();
        assert_eq!(ids, ["P1-S1", "P1-S2"]);

        let list = part_list(&doc).unwrap();
        let names: Vec<_> = doc
            .children_named(list, "score-part")
            .into_iter()
            .filter_map(|sp| doc.child_text(sp, "part-name"))
            .collect();
        assert_eq!(names, ["Piano (High)", "Piano (Low)"]);
        assert!(doc.descendants_named(list, "part-abbreviation").is_empty());
        let instrument = doc.descendants_named(list, "score-instrument")[1];
        assert_eq!(doc.attr(instrument, "id"), Some("P1-I1-S2"));
    }

    #[test]
    fn each_part_keeps_its_own_staff() {
        let doc = split(PIANO);
        let low = parts(&doc)[1];
        let measure = measures(&doc, low)[0];
        let names: Vec<_> = doc
            .child_elements(measure)
            .into_iter()
            .map(|c| doc.name(c).to_string())
            .collect();
        assert_eq!(names, ["attributes", "direction", "note"]);
        assert!(doc.descendants_named(low, "staff").is_empty());
        assert!(doc.descendants_named(low, "staves").is_empty());

        let attributes = doc.child(measure, "attributes").unwrap();
        let clefs = doc.children_named(attributes, "clef");
        assert_eq!(clefs.len(), 1);
        assert_eq!(doc.child_text(clefs[0], "sign"), Some("F"));
        assert_eq!(doc.attr(clefs[0], "number"), None);
        assert!(doc.child(attributes, "key").is_some());
    }

    #[test]
    fn high_part_serializes_cleanly() {
        let doc = split(PIANO);
        let xml = write_musicxml(&doc).unwrap();
        assert!(xml.contains(
            r#"<part id="P1-S1">
    <measure number="1">
      <attributes><divisions>1</divisions><key><fifths>0</fifths></key><clef><sign>G</sign><line>2</line></clef></attributes>
      <note><pitch><step>E</step><octave>5</octave></pitch><duration>2</duration><voice>1</voice></note>
      <note><chord/><pitch><step>G</step><octave>5</octave></pitch><duration>2</duration><voice>1</voice></note>
      <note><pitch><step>D</step><octave>5</octave></pitch><duration>2</duration><voice>1</voice></note>
    </measure>
  </part>"#
        ));
    }

    #[test]
    fn splitting_twice_changes_nothing() {
        let mut doc = split(PIANO);
        let once = write_musicxml(&doc).unwrap();
        assert!(!split_grand_staff(&mut doc));
        assert_eq!(write_musicxml(&doc).unwrap(), once);
    }

    #[test]
    fn interleaved_voices_are_realigned() {
        // Staff 1 has two voices; staff 2 sits between them.
        let xml = r#"<score-partwise><part id="P1"><measure number="1"><attributes><staves>2</staves></attributes><note><pitch><step>C</step><octave>5</octave></pitch><duration>4</duration><staff>1</staff></note><backup><duration>4</duration></backup><note><pitch><step>C</step><octave>3</octave></pitch><duration>4</duration><staff>2</staff></note><backup><duration>2</duration></backup><note><pitch><step>E</step><octave>4</octave></pitch><duration>2</duration><staff>1</staff></note></measure></part></score-partwise>"#;
        let doc = split(xml);
        let high = parts(&doc)[0];
        let measure = measures(&doc, high)[0];
        let names: Vec<_> = doc
            .child_elements(measure)
            .into_iter()
            .map(|c| doc.name(c).to_string())
            .collect();
        assert_eq!(names, ["note", "backup", "note"]);
        let backup = doc.child(measure, "backup").unwrap();
        assert_eq!(duration_of(&doc, backup), 2);
    }

    #[test]
    fn oversized_durations_saturate() {
        let xml = r#"<score-partwise><part id="P1"><measure number="1"><attributes><staves>2</staves></attributes><note><pitch><step>C</step><octave>5</octave></pitch><duration>2000000000</duration><staff>1</staff></note><note><pitch><step>D</step><octave>5</octave></pitch><duration>2000000000</duration><staff>1</staff></note><backup><duration>2000000000</duration></backup><note><pitch><step>C</step><octave>3</octave></pitch><duration>1</duration><staff>2</staff></note></measure></part></score-partwise>"#;
        let doc = split(xml);
        let low = parts(&doc)[1];
        let measure = measures(&doc, low)[0];
        let names: Vec<_> = doc
            .child_elements(measure)
            .into_iter()
            .map(|c| doc.name(c).to_string())
            .collect();
        assert_eq!(names, ["forward", "note"]);
        let forward = doc.child(measure, "forward").unwrap();
        assert_eq!(duration_of(&doc, forward), i32::MAX - 2_000_000_000);
    }

    #[test]
    fn labels_and_split_ids() {
        assert_eq!(staff_label("Organ", 3, 3), "Organ (Staff 3)");
        assert_eq!(staff_label("Piano", 2, 2), "Piano (Low)");
        assert!(is_split_part("P1-S2"));
        assert!(!is_split_part("P1"));
        assert!(!is_split_part("P1-Sx"));
        assert!(!is_split_part("-S1"));
    }

    #[test]
    fn relabel_accumulates_on_split_parts() {
        let mut doc = split(PIANO);
        let high = parts(&doc)[0];
        relabel_part(&mut doc, high, "Flute");
        relabel_part(&mut doc, high, "Clarinet in Bb");
        let entry = score_part(&doc, "P1-S1").unwrap();
        assert_eq!(doc.child_text(entry, "part-name"), Some("Piano (High) - Clarinet in Bb"));
    }

    #[test]
    fn relabel_keeps_hyphenated_names_whole() {
        let mut doc = split(&PIANO.replace(
            "<part-name>Piano</part-name>",
            "<part-name>Violin I - Solo</part-name>",
        ));
        let low = parts(&doc)[1];
        relabel_part(&mut doc, low, "Cello");
        relabel_part(&mut doc, low, "Bassoon (Low)");
        relabel_part(&mut doc, low, "Tuba");
        let entry = score_part(&doc, "P1-S2").unwrap();
        assert_eq!(doc.child_text(entry, "part-name"), Some("Violin I - Solo (Low) - Tuba"));

        assert_eq!(labelled_base("Organ (Staff 3) - Flute", "P1-S3"), "Organ (Staff 3)");
        assert_eq!(labelled_base("Renamed", "P1-S1"), "Renamed");
    }

    #[test]
    fn single_staff_scores_are_not_split() {
        let mut doc = parse_musicxml(r#"<score-partwise><part id="P1"><measure number="1"/></part></score-partwise>"#).unwrap();
        assert!(!split_grand_staff(&mut doc));
    }
}
