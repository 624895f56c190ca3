use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Analysis Error: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("Failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("Failed to write {}: {source}", path.display())]
    Export {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize result: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Stable identifier for per-image reports.
    pub fn reason_code(&self) -> &'static str {
        match self {
            AppError::Analysis(e) => e.reason_code(),
            AppError::Config(_) | AppError::InvalidConfig(_) => "invalid_config",
            AppError::Image(_) => "decode_error",
            AppError::Export { .. } => "export_error",
            AppError::Io(_) => "io_error",
            AppError::Serialization(_) => "serialization_error",
        }
    }
}

/// Failure of one analysis invocation.
///
/// Every variant maps to a stable [`reason_code`](AnalysisError::reason_code) so
/// callers can tell the outcomes apart without matching on display strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("No face detected in the image")]
    NoFaceDetected,
    #[error("{capability} is unavailable: {reason}")]
    ModelUnavailable {
        capability: &'static str,
        reason: String,
    },
    #[error("No skin pixels found in the face region, try a clearer photo")]
    NoSkinPixels,
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AnalysisError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            AnalysisError::NoFaceDetected => "no_face_detected",
            AnalysisError::ModelUnavailable { .. } => "model_unavailable",
            AnalysisError::NoSkinPixels => "no_skin_pixels",
            AnalysisError::InternalError(_) => "internal_error",
        }
    }

    /// Whether the caller can act on the failure (e.g. by uploading another photo).
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AnalysisError::NoFaceDetected | AnalysisError::NoSkinPixels
        )
    }

    pub(crate) fn unavailable(capability: &'static str, error: CapabilityError) -> Self {
        AnalysisError::ModelUnavailable {
            capability,
            reason: error.to_string(),
        }
    }
}

// Capability Error Type

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("model failed to load: {0}")]
    Unavailable(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("deadline of {0:?} elapsed")]
    TimedOut(Duration),
}
