use std::sync::Arc;

use crate::common::{FaceCrop, FaceRegion};
use crate::pipeline::domain::{ColorSample, Demographics, Undertone};

// Markers to track the state of one analysis invocation
pub struct StartState;
pub struct LocatedState {
    pub(super) face: FaceRegion,
}
pub struct CroppedState {
    pub(super) crop: Arc<FaceCrop>,
}
pub struct SampledState {
    pub(super) face: FaceRegion,
    pub(super) color: ColorSample,
    pub(super) demographics: Demographics,
}
pub struct ClassifiedState {
    pub(super) face: FaceRegion,
    pub(super) color: ColorSample,
    pub(super) undertone: Undertone,
    pub(super) demographics: Demographics,
}

pub trait ProcessingState: 'static {
    fn state_name() -> &'static str;
}

impl ProcessingState for StartState {
    fn state_name() -> &'static str {
        "Start"
    }
}

impl ProcessingState for LocatedState {
    fn state_name() -> &'static str {
        "Located"
    }
}

impl ProcessingState for CroppedState {
    fn state_name() -> &'static str {
        "Cropped"
    }
}

impl ProcessingState for SampledState {
    fn state_name() -> &'static str {
        "Sampled"
    }
}

impl ProcessingState for ClassifiedState {
    fn state_name() -> &'static str {
        "Classified"
    }
}
