//! Error types.
//!
//! Nothing in the transposition engine is fatal to its caller: the
//! infallible entry points turn every `ScoreError` into "return the input
//! unchanged" plus a `log::warn!`. The fallible `try_*` variants hand the
//! error back for callers that want to report it.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoreError {
    /// The document text is not well-formed XML.
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The document parsed, but it is not a partwise MusicXML score.
    #[error("Unsupported root element: '{0}'. Only 'score-partwise' is supported.")]
    UnsupportedRoot(String),

    /// Transform parameters could not be decoded from JSON.
    #[error("Invalid transform parameters: {0}")]
    Params(#[from] serde_json::Error),

    /// A clef name outside treble/bass/alto/tenor.
    #[error("Unknown clef '{0}'")]
    UnknownClef(String),

    /// The working tree could not be written back to text.
    #[error("Serialization error: {0}")]
    Serialize(String),
}

/// Failure to read an interval token such as `M2`, `-P5` or `M6+8va`.
///
/// Callers of [`crate::interval::normalize`] never see this; it is logged
/// and the identity interval is used instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntervalError {
    #[error("Unparsable interval '{0}'")]
    Invalid(String),

    #[error("Quality '{quality}' does not apply to a {number} in interval '{spec}'")]
    QualityMismatch {
        spec: String,
        quality: String,
        number: i32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let err = ScoreError::UnsupportedRoot("score-timewise".to_string());
        assert_eq!(
            err.to_string(),
            "Unsupported root element: 'score-timewise'. Only 'score-partwise' is supported."
        );

        let err = IntervalError::QualityMismatch {
            spec: "M5".to_string(),
            quality: "M".to_string(),
            number: 5,
        };
        assert_eq!(
            err.to_string(),
            "Quality 'M' does not apply to a 5 in interval 'M5'"
        );
    }
}
