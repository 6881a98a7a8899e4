//! JNI bindings for Android.
//!
//! These functions are called from Kotlin via the JNI bridge.

use jni::objects::{JClass, JString};
use jni::sys::{jint, jstring};
use jni::JNIEnv;

use crate::{isolate_part, part_range_json, transform_json};

fn to_jstring(env: &mut JNIEnv, s: &str) -> jstring {
    match env.new_string(s) {
        Ok(js) => js.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Transform MusicXML for one part.
///
/// Called from Kotlin as:
///   external fun transform(xml: String, paramsJson: String): String?
#[no_mangle]
pub extern "system" fn Java_com_duetplay_app_ScoreTranspose_transform(
    mut env: JNIEnv,
    _class: JClass,
    xml: JString,
    params_json: JString,
) -> jstring {
    let xml: String = match env.get_string(&xml) {
        Ok(s) => s.into(),
        Err(_) => return std::ptr::null_mut(),
    };
    let params: String = match env.get_string(&params_json) {
        Ok(s) => s.into(),
        Err(_) => return std::ptr::null_mut(),
    };

    match transform_json(&xml, &params) {
        Ok(out) => to_jstring(&mut env, &out),
        Err(e) => {
            log::warn!("{e}");
            std::ptr::null_mut()
        }
    }
}

/// Keep one part (or staff) of a score, counted from 0.
///
/// Called from Kotlin as:
///   external fun isolatePart(xml: String, keep: Int): String?
#[no_mangle]
pub extern "system" fn Java_com_duetplay_app_ScoreTranspose_isolatePart(
    mut env: JNIEnv,
    _class: JClass,
    xml: JString,
    keep: jint,
) -> jstring {
    let xml: String = match env.get_string(&xml) {
        Ok(s) => s.into(),
        Err(_) => return std::ptr::null_mut(),
    };
    let Ok(keep) = usize::try_from(keep) else {
        return to_jstring(&mut env, &xml);
    };

    let out = isolate_part(&xml, keep);
    to_jstring(&mut env, &out)
}

/// Pitch range of a part as JSON, or `"null"` when it has no notes.
///
/// Called from Kotlin as:
///   external fun partRange(xml: String, targetIndex: Int, semitoneShift: Int): String?
#[no_mangle]
pub extern "system" fn Java_com_duetplay_app_ScoreTranspose_partRange(
    mut env: JNIEnv,
    _class: JClass,
    xml: JString,
    target_index: jint,
    semitone_shift: jint,
) -> jstring {
    let xml: String = match env.get_string(&xml) {
        Ok(s) => s.into(),
        Err(_) => return std::ptr::null_mut(),
    };
    let index = usize::try_from(target_index).unwrap_or(0);

    match part_range_json(&xml, index, semitone_shift) {
        Ok(json) => to_jstring(&mut env, &json),
        Err(_) => std::ptr::null_mut(),
    }
}
