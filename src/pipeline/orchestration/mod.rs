pub mod pipeline_orchestrator;
pub mod ranking;
pub mod service;

pub use pipeline_orchestrator::{MaskedAnalysis, PipelineOrchestrator, PipelineOrchestratorBuilder};
pub use ranking::select_face;
