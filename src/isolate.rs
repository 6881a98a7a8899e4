//! Part isolation: "show one player's part".
//!
//! In a multi-part score every other part goes, together with its
//! part-list entry and any part group that bracketed it. In a single-part
//! score the chosen staff is kept and the part becomes single-staff, with
//! its timing rebuilt the way the splitter does it.

use std::collections::{HashMap, HashSet};

use crate::model::{Document, NodeId};
use crate::parser::{declared_staves, part_list, parts};
use crate::split::filter_to_staff;

/// Keep only part (or staff) `keep`, counted from 0. Returns whether the
/// document changed; an out-of-range index leaves it alone.
pub fn isolate(doc: &mut Document, keep: usize) -> bool {
    let parts = parts(doc);
    match parts.len() {
        0 => false,
        1 => isolate_staff(doc, parts[0], keep),
        n if keep >= n => {
            log::warn!("part index {keep} is out of range for {n} parts");
            false
        }
        _ => {
            isolate_part(doc, &parts, keep);
            true
        }
    }
}

fn isolate_staff(doc: &mut Document, part: NodeId, keep: usize) -> bool {
    let staves = declared_staves(doc, part);
    let Some(staff) = u32::try_from(keep + 1).ok().filter(|&s| s <= staves) else {
        log::warn!("staff index {keep} is out of range for {staves} staves");
        return false;
    };
    if staves == 1 {
        return false;
    }
    filter_to_staff(doc, part, staff);
    true
}

fn isolate_part(doc: &mut Document, parts: &[NodeId], keep: usize) {
    let root = doc.root();
    let kept_id = doc.attr(parts[keep], "id").unwrap_or_default().to_string();

    if let Some(list) = part_list(doc) {
        prune_part_list(doc, list, &kept_id);
    }
    for (index, &part) in parts.iter().enumerate() {
        if index != keep {
            doc.remove(root, part);
        }
    }
    log::debug!("isolated part {kept_id}");
}

/// Drop every `score-part` except `kept_id`, and every `part-group` whose
/// span held a dropped part.
fn prune_part_list(doc: &mut Document, list: NodeId, kept_id: &str) {
    let mut removed = Vec::new();
    // group number -> (start element, spans a removed part)
    let mut open: HashMap<String, (NodeId, bool)> = HashMap::new();
    let mut doomed_groups: HashSet<String> = HashSet::new();

    for child in doc.child_elements(list) {
        match doc.name(child) {
            "score-part" => {
                if doc.attr(child, "id") != Some(kept_id) {
                    removed.push(child);
                    for (_, spans_removed) in open.values_mut() {
                        *spans_removed = true;
                    }
                }
            }
            "part-group" => {
                let number = doc.attr(child, "number").unwrap_or("1").to_string();
                match doc.attr(child, "type") {
                    Some("start") => {
                        open.insert(number, (child, false));
                    }
                    Some("stop") => {
                        if let Some((start, true)) = open.remove(&number) {
                            removed.push(start);
                            removed.push(child);
                            doomed_groups.insert(number);
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    for id in removed {
        doc.remove(list, id);
    }
    if !doomed_groups.is_empty() {
        log::debug!("removed {} part group(s)", doomed_groups.len());
    }
}
