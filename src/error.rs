use thiserror::Error;

/// Errors surfaced by the note-detection pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    /// A caller-supplied or derived parameter makes analysis impossible.
    #[error("invalid {parameter}: {reason}")]
    InvalidInput {
        parameter: &'static str,
        reason: String,
    },

    /// A frame could not be built or transformed at the expected size.
    #[error("malformed frame {frame}: {reason}")]
    MalformedFrame { frame: usize, reason: String },
}

impl AnalysisError {
    pub(crate) fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            parameter,
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(frame: usize, reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            frame,
            reason: reason.into(),
        }
    }
}
