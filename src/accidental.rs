//! Accidental bookkeeping for one measure of one staff.
//!
//! An accidental stays in force for the rest of the measure on the same
//! letter and octave. At each barline the context falls back to the key
//! signature.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::key::KeySignature;
use crate::pitch::{Pitch, Step};

/// Glyph drawn in front of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccidentalGlyph {
    FlatFlat,
    Flat,
    Natural,
    Sharp,
    DoubleSharp,
}

impl AccidentalGlyph {
    /// Glyph for an alteration; `None` beyond double sharps and flats.
    pub fn from_alter(alter: i32) -> Option<Self> {
        match alter {
            -2 => Some(AccidentalGlyph::FlatFlat),
            -1 => Some(AccidentalGlyph::Flat),
            0 => Some(AccidentalGlyph::Natural),
            1 => Some(AccidentalGlyph::Sharp),
            2 => Some(AccidentalGlyph::DoubleSharp),
            _ => None,
        }
    }

    /// MusicXML `<accidental>` value.
    pub fn as_str(self) -> &'static str {
        match self {
            AccidentalGlyph::FlatFlat => "flat-flat",
            AccidentalGlyph::Flat => "flat",
            AccidentalGlyph::Natural => "natural",
            AccidentalGlyph::Sharp => "sharp",
            AccidentalGlyph::DoubleSharp => "double-sharp",
        }
    }
}

/// Running alteration per (letter, octave) within a measure.
#[derive(Debug, Clone, Default)]
pub struct AccidentalContext {
    key: KeySignature,
    active: HashMap<(Step, i32), i32>,
}

impl AccidentalContext {
    pub fn new(key: KeySignature) -> Self {
        Self {
            key,
            active: HashMap::new(),
        }
    }

    pub fn key(&self) -> KeySignature {
        self.key
    }

    /// A key change mid-measure cancels earlier accidentals.
    pub fn set_key(&mut self, key: KeySignature) {
        self.key = key;
        self.active.clear();
    }

    /// Barline.
    pub fn reset(&mut self) {
        self.active.clear();
    }

    /// Alteration a reader would assume for `step` in `octave` right now.
    pub fn current(&self, step: Step, octave: i32) -> i32 {
        self.active
            .get(&(step, octave))
            .copied()
            .unwrap_or_else(|| self.key.alteration(step))
    }

    /// Record `pitch` and return the glyph it needs, if any.
    pub fn resolve(&mut self, pitch: &Pitch) -> Option<AccidentalGlyph> {
        if self.current(pitch.step, pitch.octave) == pitch.alter {
            return None;
        }
        self.active.insert((pitch.step, pitch.octave), pitch.alter);
        let glyph = AccidentalGlyph::from_alter(pitch.alter);
        if glyph.is_none() {
            log::debug!("no accidental glyph for {pitch}");
        }
        glyph
    }
}
