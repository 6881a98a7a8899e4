//! scoretranspose: MusicXML transposition engine for DuetPlay.
//!
//! Puts one part of a score into the key and clef of the instrument that
//! will read it: written pitches, key signatures, accidentals and clefs are
//! rewritten, and the `<transpose>` element records the sounding offset.
//! Everything else in the document passes through untouched.
//!
//! # Example
//! ```no_run
//! use scoretranspose::{transform, TransformParams};
//!
//! let xml = std::fs::read_to_string("duet.musicxml").unwrap();
//! let clarinet = TransformParams {
//!     target_transposition: "M2".to_string(),
//!     target_index: 2,
//!     display_name: Some("Clarinet in Bb".to_string()),
//!     ..TransformParams::default()
//! };
//! let written = transform(&xml, &clarinet);
//! ```

pub mod accidental;
pub mod address;
pub mod clef;
pub mod config;
pub mod error;
pub mod interval;
pub mod isolate;
pub mod key;
pub mod model;
pub mod notes;
pub mod parser;
pub mod pitch;
pub mod range;
pub mod split;
pub mod transform;
pub mod writer;

#[cfg(target_os = "android")]
pub mod android;

pub use address::{Scope, StaffAddress};
pub use clef::ClefKind;
pub use config::{Instrument, TransformParams};
pub use error::{IntervalError, ScoreError};
pub use interval::{combine, normalize, relative, Interval};
pub use key::{KeySignature, SoundingOffset};
pub use parser::parse_musicxml;
pub use pitch::{Pitch, PitchClass, Step};
pub use range::{part_range, range_preview_xml, ranges, PitchRange};
pub use transform::{isolate_part, split_grand_staff, transform, try_isolate_part, try_transform};
pub use writer::write_musicxml;

/// Transform with parameters given as JSON, as the mobile shells send them.
pub fn transform_json(xml: &str, params_json: &str) -> Result<String, ScoreError> {
    let params = TransformParams::from_json(params_json)?;
    Ok(transform(xml, &params))
}

/// Range of a part as JSON (`null` when the part has no pitched notes).
pub fn part_range_json(xml: &str, target_index: usize, semitone_shift: i32) -> Result<String, ScoreError> {
    Ok(serde_json::to_string(&part_range(xml, target_index, semitone_shift))?)
}

// ═══════════════════════════════════════════════════════════════════════
// C FFI for iOS (static library) and Android (JNI)
// ═══════════════════════════════════════════════════════════════════════

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

unsafe fn str_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

fn into_c_string(s: String) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

/// Transform a MusicXML string. `params_json` holds [`TransformParams`]
/// fields in camelCase; missing fields take their defaults.
/// The caller must free the returned string with `scoretranspose_free_string`.
///
/// Returns null if either argument is null or not UTF-8, or if the
/// parameters cannot be decoded.
///
/// # Safety
/// `xml` and `params_json` must be valid null-terminated C strings.
#[no_mangle]
pub unsafe extern "C" fn scoretranspose_transform(
    xml: *const c_char,
    params_json: *const c_char,
) -> *mut c_char {
    let (Some(xml), Some(params)) = (unsafe { str_arg(xml) }, unsafe { str_arg(params_json) }) else {
        return std::ptr::null_mut();
    };

    match transform_json(xml, params) {
        Ok(out) => into_c_string(out),
        Err(e) => {
            log::warn!("{e}");
            std::ptr::null_mut()
        }
    }
}

/// Keep one part (or staff) of a MusicXML string, counted from 0.
/// The caller must free the returned string with `scoretranspose_free_string`.
///
/// # Safety
/// `xml` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn scoretranspose_isolate_part(xml: *const c_char, keep: u32) -> *mut c_char {
    match unsafe { str_arg(xml) } {
        Some(xml) => into_c_string(isolate_part(xml, keep as usize)),
        None => std::ptr::null_mut(),
    }
}

/// Pitch range of a part as JSON. The caller must free the returned string
/// with `scoretranspose_free_string`.
///
/// # Safety
/// `xml` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn scoretranspose_part_range(
    xml: *const c_char,
    target_index: u32,
    semitone_shift: i32,
) -> *mut c_char {
    let Some(xml) = (unsafe { str_arg(xml) }) else {
        return std::ptr::null_mut();
    };
    match part_range_json(xml, target_index as usize, semitone_shift) {
        Ok(json) => into_c_string(json),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Free a string previously returned by scoretranspose functions.
///
/// # Safety
/// `ptr` must be a string previously returned by a scoretranspose function, or null.
#[no_mangle]
pub unsafe extern "C" fn scoretranspose_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}
