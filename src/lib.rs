pub mod capability;
pub mod common;
pub mod config;
pub mod error;
pub mod pipeline;

pub use error::{AnalysisError, AppError, CapabilityError};

pub use common::{FaceCrop, FaceRegion, RawImage};
pub use config::{AnalysisConfig, Configuration};
pub use pipeline::{AnalysisResult, PipelineOrchestrator};
