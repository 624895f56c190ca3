pub mod analysis_context;
pub mod metrics;
pub mod state;

pub use analysis_context::AnalysisContext;
pub use metrics::AnalysisMetrics;
pub use state::ProcessingState;
