//! Part/staff addressing.
//!
//! The UI numbers "parts" from 1. In a multi-part score that number picks a
//! `<part>`; in a single-part score (a piano grand staff that was not
//! split) it picks a staff inside the sole part. [`StaffAddress::resolve`]
//! makes that decision once so that every later pass deals only in
//! (part, staff) pairs.

use serde::{Deserialize, Serialize};

use crate::model::{Document, NodeId};

/// Staff scope of a `<key>`, `<transpose>` or `<time>` element.
///
/// MusicXML leaves the `number` attribute off when the element applies to
/// every staff of the part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Global,
    Staff(u32),
}

impl Scope {
    /// Read the `number` attribute of `id`. Unparsable numbers are global.
    pub fn of(doc: &Document, id: NodeId) -> Scope {
        match doc.attr(id, "number").and_then(|n| n.trim().parse().ok()) {
            Some(n) => Scope::Staff(n),
            None => Scope::Global,
        }
    }

    pub fn applies_to(self, staff: u32) -> bool {
        match self {
            Scope::Global => true,
            Scope::Staff(n) => n == staff,
        }
    }
}

/// A resolved target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaffAddress {
    /// 0-based part index in a multi-part score; the staff inside it is 1.
    Part(usize),
    /// 1-based staff number inside the sole part.
    Staff(u32),
}

impl StaffAddress {
    /// Map a 1-based `target_index` onto the document shape.
    ///
    /// `staff_count` is the number of staves declared by the sole part and
    /// only matters when `part_count == 1`. Out-of-range targets give `None`.
    pub fn resolve(part_count: usize, staff_count: u32, target_index: usize) -> Option<Self> {
        if target_index == 0 {
            return None;
        }
        match part_count {
            0 => None,
            1 => {
                let staff = u32::try_from(target_index).ok()?;
                (staff <= staff_count.max(1)).then_some(StaffAddress::Staff(staff))
            }
            n => (target_index <= n).then_some(StaffAddress::Part(target_index - 1)),
        }
    }

    pub fn part_index(self) -> usize {
        match self {
            StaffAddress::Part(index) => index,
            StaffAddress::Staff(_) => 0,
        }
    }

    pub fn staff(self) -> u32 {
        match self {
            StaffAddress::Part(_) => 1,
            StaffAddress::Staff(staff) => staff,
        }
    }
}
