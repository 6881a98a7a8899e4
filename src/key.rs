//! Key-signature transposition.
//!
//! Every `<key>` instance is transposed from its own root, so a piece that
//! modulates from C to G and is written up a major second reads D then A.
//! Results are folded into the six-sharps/six-flats range, and the
//! `<transpose>` element of the same `<attributes>` block is rewritten to
//! describe how far written pitch sits from concert pitch.

use serde::{Deserialize, Serialize};

use crate::address::Scope;
use crate::interval::Interval;
use crate::model::{Document, NodeId};
use crate::parser::{key_fifths, measures};
use crate::pitch::{PitchClass, Step};

/// Largest number of sharps or flats a written signature may carry.
pub const MAX_FIFTHS: i32 = 6;

/// Child order of `<attributes>`.
pub(crate) const ATTRIBUTES_ORDER: &[&str] = &[
    "footnote",
    "level",
    "divisions",
    "key",
    "time",
    "staves",
    "part-symbol",
    "instruments",
    "clef",
    "staff-details",
    "transpose",
    "for-part",
    "directive",
    "measure-style",
];

const KEY_ORDER: &[&str] = &["cancel", "fifths", "mode"];
const TRANSPOSE_ORDER: &[&str] = &["diatonic", "chromatic", "octave-change", "double"];

/// A traditional key signature, as a count of sharps (positive) or flats
/// (negative) in [-6, 6].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct KeySignature {
    fifths: i32,
}

impl KeySignature {
    /// Build from any count; out-of-range counts are folded enharmonically.
    pub fn new(fifths: i32) -> Self {
        Self {
            fifths: fold_fifths(fifths),
        }
    }

    pub fn fifths(self) -> i32 {
        self.fifths
    }

    /// Major-key root of this signature.
    pub fn root(self) -> PitchClass {
        PitchClass::from_fifths(self.fifths)
    }

    /// Signature of the major key on `root`.
    pub fn for_major_root(root: PitchClass) -> Self {
        Self::new(root.fifths())
    }

    /// Transpose relative to this signature's own root.
    pub fn transposed(self, interval: Interval) -> Self {
        Self::for_major_root(self.root().transpose(interval))
    }

    /// Alteration this signature applies to `step`.
    pub fn alteration(self, step: Step) -> i32 {
        // Sharps are added F C G D A E B, flats B E A D G C F.
        let sharp_position = step.fifths() + 1;
        let flat_position = 5 - step.fifths();
        if self.fifths > sharp_position {
            1
        } else if -self.fifths > flat_position {
            -1
        } else {
            0
        }
    }
}

/// Fold a signature count into [-6, 6]. Twelve fifths is a diminished
/// second, so C♯ major (7) becomes D♭ major (-5).
pub fn fold_fifths(fifths: i32) -> i32 {
    let class = fifths.rem_euclid(12);
    match fifths {
        f if f > MAX_FIFTHS && class > MAX_FIFTHS => class - 12,
        f if f > MAX_FIFTHS => class,
        f if f < -MAX_FIFTHS && class >= MAX_FIFTHS => class - 12,
        f if f < -MAX_FIFTHS => class,
        f => f,
    }
}

/// How a reader shifts written pitch to reach concert pitch; the inverse
/// of the interval applied to the notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundingOffset {
    pub diatonic: i32,
    pub chromatic: i32,
}

impl SoundingOffset {
    pub fn for_interval(interval: Interval) -> Self {
        Self {
            diatonic: -interval.diatonic,
            chromatic: -interval.chromatic,
        }
    }
}

/// Transpose every key instance of `part` that applies to `staff`.
///
/// `staves` is the part's staff count. In a multi-staff part a global key
/// is first split so the other staves keep the original signature.
/// Returns the number of instances rewritten.
pub fn transpose_keys(
    doc: &mut Document,
    part: NodeId,
    staff: u32,
    staves: u32,
    interval: Interval,
) -> usize {
    if interval.is_identity() {
        return 0;
    }

    let offset = SoundingOffset::for_interval(interval);
    let offset_scope = if staves > 1 {
        Scope::Staff(staff)
    } else {
        Scope::Global
    };
    let mut rewritten = 0;
    let mut offset_written = false;
    let mut first_attributes = None;

    for measure in measures(doc, part) {
        for attributes in doc.children_named(measure, "attributes") {
            first_attributes.get_or_insert(attributes);
            let mut touched = false;

            for key in doc.children_named(attributes, "key") {
                let scope = Scope::of(doc, key);
                if !scope.applies_to(staff) {
                    continue;
                }
                let Some(fifths) = key_fifths(doc, key) else {
                    log::debug!("skipping non-traditional key signature");
                    continue;
                };
                if scope == Scope::Global && staves > 1 {
                    narrow_to_staff(doc, attributes, key, staff, staves);
                }

                let source = KeySignature::new(fifths);
                let target = source.transposed(interval);
                if target.fifths() != source.root().transpose(interval).fifths() {
                    log::debug!(
                        "key {} folded to {} fifths",
                        source.root().transpose(interval),
                        target.fifths()
                    );
                }
                write_fifths(doc, key, target.fifths());
                transpose_cancel(doc, key, interval);
                touched = true;
                rewritten += 1;
            }

            // an older offset for this staff would contradict the new one
            let restated = doc
                .children_named(attributes, "transpose")
                .into_iter()
                .any(|t| Scope::of(doc, t).applies_to(staff));
            if touched || restated {
                write_sounding_offset(doc, attributes, offset_scope, staves, offset);
                offset_written = true;
            }
        }
    }

    // A part without any key still records its written/concert offset.
    if !offset_written {
        if let Some(attributes) = first_attributes {
            write_sounding_offset(doc, attributes, offset_scope, staves, offset);
        }
    }

    rewritten
}

/// Give each other staff a copy of a global `<key>` or `<transpose>`, and
/// scope the original to `staff`.
fn narrow_to_staff(doc: &mut Document, attributes: NodeId, element: NodeId, staff: u32, staves: u32) {
    let mut anchor = element;
    for other in 1..=staves {
        if other == staff {
            continue;
        }
        let copy = doc.deep_clone(element);
        doc.set_attr(copy, "number", &other.to_string());
        if other < staff {
            doc.insert_before(attributes, element, copy);
        } else {
            doc.insert_after(attributes, anchor, copy);
            anchor = copy;
        }
    }
    doc.set_attr(element, "number", &staff.to_string());
}

/// `<cancel>` names the previous signature, which moved with the notes.
fn transpose_cancel(doc: &mut Document, key: NodeId, interval: Interval) {
    let Some(cancel) = doc.child(key, "cancel") else {
        return;
    };
    let Some(fifths) = doc.text(cancel).and_then(|t| t.trim().parse::<i32>().ok()) else {
        return;
    };
    let moved = KeySignature::new(fifths).transposed(interval);
    doc.set_text(cancel, &moved.fifths().to_string());
}

fn write_fifths(doc: &mut Document, key: NodeId, fifths: i32) {
    match doc.child(key, "fifths") {
        Some(el) => doc.set_text(el, &fifths.to_string()),
        None => {
            let el = doc.create_text_element("fifths", &fifths.to_string());
            doc.insert_ordered(key, el, KEY_ORDER);
        }
    }
}

/// Replace any `<transpose>` that applies to `scope` with one describing
/// `offset`.
///
/// A global `scope` replaces every `<transpose>` of the block. When `scope`
/// is one staff of a `staves`-staff part, a global `<transpose>` is first
/// narrowed so the other staves keep it and the target staff carries only
/// the new offset.
pub fn write_sounding_offset(
    doc: &mut Document,
    attributes: NodeId,
    scope: Scope,
    staves: u32,
    offset: SoundingOffset,
) {
    for existing in doc.children_named(attributes, "transpose") {
        match (Scope::of(doc, existing), scope) {
            // a single-staff part has one offset, however it was numbered
            (_, Scope::Global) => {
                doc.remove(attributes, existing);
            }
            (Scope::Global, Scope::Staff(staff)) => {
                narrow_to_staff(doc, attributes, existing, staff, staves);
                doc.remove(attributes, existing);
            }
            (Scope::Staff(n), Scope::Staff(staff)) if n == staff => {
                doc.remove(attributes, existing);
            }
            _ => {}
        }
    }

    let transpose = doc.create_element("transpose");
    if let Scope::Staff(n) = scope {
        doc.set_attr(transpose, "number", &n.to_string());
    }
    let diatonic = doc.create_text_element("diatonic", &offset.diatonic.to_string());
    let chromatic = doc.create_text_element("chromatic", &offset.chromatic.to_string());
    doc.insert_ordered(transpose, diatonic, TRANSPOSE_ORDER);
    doc.insert_ordered(transpose, chromatic, TRANSPOSE_ORDER);
    doc.insert_ordered(attributes, transpose, ATTRIBUTES_ORDER);
}
