//! Transform parameters.
//!
//! The mobile shells and the web front end hand these over as JSON, so
//! every field has a default and a missing key means "leave as written".

use serde::{Deserialize, Serialize};

use crate::clef::ClefKind;
use crate::error::ScoreError;
use crate::interval::{combine, relative, Interval};

/// What to do to one part of a score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformParams {
    /// Transposition of the instrument that will read the part ("M2" for a
    /// B♭ clarinet, "P1" for concert pitch).
    pub target_transposition: String,
    /// treble, bass, alto or tenor; `None` keeps the written clefs.
    pub target_clef: Option<String>,
    /// 1-based part (multi-part score) or staff (single-part score).
    pub target_index: usize,
    /// Transposition the part is currently written for.
    pub source_transposition: String,
    /// New part name, if any.
    pub display_name: Option<String>,
    /// Extra shift on top of the instrument interval (octave nudges, key
    /// slider).
    pub additional_semitones: i32,
    /// Split a grand staff into one part per staff before addressing.
    pub split_grand_staff: bool,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self {
            target_transposition: "P1".to_string(),
            target_clef: None,
            target_index: 1,
            source_transposition: "P1".to_string(),
            display_name: None,
            additional_semitones: 0,
            split_grand_staff: true,
        }
    }
}

impl TransformParams {
    pub fn from_json(json: &str) -> Result<Self, ScoreError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Interval applied to the notes of the target.
    pub fn combined_interval(&self) -> Interval {
        combine(
            relative(&self.target_transposition, &self.source_transposition),
            self.additional_semitones,
        )
    }

    /// The requested clef. Unknown names are logged and ignored.
    pub fn clef(&self) -> Option<ClefKind> {
        let name = self.target_clef.as_deref()?;
        match name.parse() {
            Ok(kind) => Some(kind),
            Err(e) => {
                log::warn!("{e}; keeping written clefs");
                None
            }
        }
    }
}

/// One row of the instrument table kept by the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub transposition: String,
    pub clef: Option<String>,
    pub display_name: String,
}

impl Instrument {
    /// Parameters that put this instrument on part `target_index`.
    pub fn params_for(&self, target_index: usize) -> TransformParams {
        TransformParams {
            target_transposition: self.transposition.clone(),
            target_clef: self.clef.clone(),
            target_index,
            display_name: Some(self.display_name.clone()),
            ..TransformParams::default()
        }
    }
}
