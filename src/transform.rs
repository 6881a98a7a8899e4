//! The public transform: put one part of a score into the key and clef of
//! the instrument that will read it.
//!
//! Each call parses its own working tree, so calls are independent and
//! can run on any thread.

use crate::address::StaffAddress;
use crate::clef::rewrite_clefs;
use crate::config::TransformParams;
use crate::error::ScoreError;
use crate::isolate::isolate;
use crate::key::transpose_keys;
use crate::model::Document;
use crate::notes::transpose_notes;
use crate::parser::{declared_staves, parse_musicxml, parts};
use crate::split::{self, relabel_part};
use crate::writer::write_musicxml;

/// Transform `xml` according to `params`. Anything that goes wrong is
/// logged and the input is returned unchanged.
pub fn transform(xml: &str, params: &TransformParams) -> String {
    try_transform(xml, params).unwrap_or_else(|e| {
        log::warn!("{e}; returning score unchanged");
        xml.to_string()
    })
}

pub fn try_transform(xml: &str, params: &TransformParams) -> Result<String, ScoreError> {
    let mut doc = parse_musicxml(xml)?;
    if params.split_grand_staff {
        split::split_grand_staff(&mut doc);
    }

    let Some(address) = resolve(&doc, params.target_index) else {
        log::warn!(
            "target index {} does not address a part or staff; score left unchanged",
            params.target_index
        );
        return Ok(xml.to_string());
    };

    let part = parts(&doc)[address.part_index()];
    let staff = address.staff();
    let staves = declared_staves(&doc, part);
    let interval = params.combined_interval();
    log::debug!("resolved target {} to {address:?}; interval {interval}", params.target_index);

    // An identity interval leaves keys, notes and <transpose> exactly as written.
    if !interval.is_identity() {
        transpose_keys(&mut doc, part, staff, staves, interval);
    }
    if let Some(kind) = params.clef() {
        rewrite_clefs(&mut doc, part, staff, staves, kind);
    }
    if !interval.is_identity() {
        transpose_notes(&mut doc, part, staff, interval);
    }

    match params.display_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() && staves == 1 => relabel_part(&mut doc, part, name),
        Some(name) if !name.is_empty() => {
            log::debug!("part has {staves} staves; keeping its name instead of '{name}'")
        }
        _ => {}
    }

    write_musicxml(&doc)
}

/// Map a 1-based UI index onto the document's shape.
pub(crate) fn resolve(doc: &Document, target_index: usize) -> Option<StaffAddress> {
    let parts = parts(doc);
    let staff_count = match parts.as_slice() {
        [only] => declared_staves(doc, *only),
        _ => 1,
    };
    StaffAddress::resolve(parts.len(), staff_count, target_index)
}

/// Keep only part (or staff, in a single-part score) `keep`, counted from 0.
pub fn isolate_part(xml: &str, keep: usize) -> String {
    try_isolate_part(xml, keep).unwrap_or_else(|e| {
        log::warn!("{e}; returning score unchanged");
        xml.to_string()
    })
}

pub fn try_isolate_part(xml: &str, keep: usize) -> Result<String, ScoreError> {
    let mut doc = parse_musicxml(xml)?;
    if !isolate(&mut doc, keep) {
        return Ok(xml.to_string());
    }
    write_musicxml(&doc)
}

/// Split a grand staff into one part per staff. Scores that are not a
/// single multi-staff part come back unchanged.
pub fn split_grand_staff(xml: &str) -> String {
    let result = parse_musicxml(xml).and_then(|mut doc| {
        if split::split_grand_staff(&mut doc) {
            write_musicxml(&doc).map(Some)
        } else {
            Ok(None)
        }
    });
    match result {
        Ok(Some(split)) => split,
        Ok(None) => xml.to_string(),
        Err(e) => {
            log::warn!("{e}; returning score unchanged");
            xml.to_string()
        }
    }
}
