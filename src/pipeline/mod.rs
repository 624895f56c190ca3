pub mod context;
pub mod domain;
pub mod orchestration;
pub mod skin;

pub use context::{AnalysisContext, AnalysisMetrics};
pub use domain::{AgeBucket, AnalysisResult, ColorSample, Demographics, Gender, Undertone};
pub use orchestration::{MaskedAnalysis, PipelineOrchestrator, PipelineOrchestratorBuilder};
pub use skin::SkinToneAnalyzer;
