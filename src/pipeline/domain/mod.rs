pub mod analysis_result;
pub mod color;
pub mod demographics;
pub mod undertone;

pub use analysis_result::AnalysisResult;
pub use color::ColorSample;
pub use demographics::{AgeBucket, Demographics, Gender};
pub use undertone::{Undertone, UNDERTONE_THRESHOLD};
