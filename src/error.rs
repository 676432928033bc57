//! Error types for the score-to-MIDI system

use std::fmt;

/// Custom error type for score recognition
#[derive(Debug, Clone)]
pub enum ScoreError {
    /// E001: Raster could not be decoded or is not a usable image
    InvalidRaster(String),
    /// E002: Raster and mask dimensions disagree
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    /// E003: Configuration validation failed
    ConfigValidationFailed(String),
    /// E004: File I/O error
    FileError(String),
    /// E005: Processing pipeline error (pass run out of order, missing state)
    ProcessingPipelineError(String),
    /// E006: Artifact parse error that cannot be skipped record-by-record
    ArtifactParseError(String),
    /// E007: MIDI export error
    MidiExportError(String),
    /// E008: Analysis export error
    AnalysisExportError(String),
    /// E009: QA artifact generation error
    QaGenerationError(String),
    /// E010: Input validation error
    InputValidationError(String),
}

impl fmt::Display for ScoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreError::InvalidRaster(msg) => write!(f, "E001: Invalid raster - {}", msg),
            ScoreError::DimensionMismatch { expected, found } => write!(
                f,
                "E002: Dimension mismatch - expected {}x{}, found {}x{}",
                expected.1, expected.0, found.1, found.0
            ),
            ScoreError::ConfigValidationFailed(msg) => {
                write!(f, "E003: Configuration validation failed - {}", msg)
            }
            ScoreError::FileError(msg) => write!(f, "E004: File I/O error - {}", msg),
            ScoreError::ProcessingPipelineError(msg) => {
                write!(f, "E005: Processing pipeline error - {}", msg)
            }
            ScoreError::ArtifactParseError(msg) => {
                write!(f, "E006: Artifact parse error - {}", msg)
            }
            ScoreError::MidiExportError(msg) => write!(f, "E007: MIDI export error - {}", msg),
            ScoreError::AnalysisExportError(msg) => {
                write!(f, "E008: Analysis export error - {}", msg)
            }
            ScoreError::QaGenerationError(msg) => {
                write!(f, "E009: QA artifact generation error - {}", msg)
            }
            ScoreError::InputValidationError(msg) => {
                write!(f, "E010: Input validation error - {}", msg)
            }
        }
    }
}

impl std::error::Error for ScoreError {}

impl From<std::io::Error> for ScoreError {
    fn from(err: std::io::Error) -> Self {
        ScoreError::FileError(err.to_string())
    }
}

impl From<serde_json::Error> for ScoreError {
    fn from(err: serde_json::Error) -> Self {
        ScoreError::AnalysisExportError(format!("JSON serialization error: {}", err))
    }
}

impl From<image::ImageError> for ScoreError {
    fn from(err: image::ImageError) -> Self {
        ScoreError::InvalidRaster(err.to_string())
    }
}

impl From<anyhow::Error> for ScoreError {
    fn from(err: anyhow::Error) -> Self {
        ScoreError::ProcessingPipelineError(format!("Generic error: {}", err))
    }
}

/// Result type alias for score recognition operations
pub type Result<T> = std::result::Result<T, ScoreError>;
