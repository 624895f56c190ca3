use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::common::{FaceCrop, FaceRegion, RawImage};
use crate::error::AnalysisError;
use crate::pipeline::context::metrics::AnalysisMetrics;
use crate::pipeline::context::state::{
    ClassifiedState, CroppedState, LocatedState, ProcessingState, SampledState, StartState,
};
use crate::pipeline::domain::{AnalysisResult, ColorSample, Demographics, Undertone};

// AnalysisContext with compile-time state tracking; each transition consumes
// the previous state so no stage can run twice or out of order.
pub struct AnalysisContext<S> {
    invocation_id: Uuid,
    image: RawImage,
    metrics: AnalysisMetrics,
    started_at: DateTime<Utc>,
    processing_start: Instant,
    state: S,
}

impl<S: ProcessingState> AnalysisContext<S> {
    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    pub fn image(&self) -> &RawImage {
        &self.image
    }

    pub fn metrics(&self) -> &AnalysisMetrics {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut AnalysisMetrics {
        &mut self.metrics
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.processing_start.elapsed()
    }

    pub fn state_name(&self) -> &'static str {
        S::state_name()
    }

    fn transition<T>(self, state: T) -> AnalysisContext<T> {
        AnalysisContext {
            invocation_id: self.invocation_id,
            image: self.image,
            metrics: self.metrics,
            started_at: self.started_at,
            processing_start: self.processing_start,
            state,
        }
    }
}

impl AnalysisContext<StartState> {
    pub fn new(image: RawImage) -> Self {
        Self {
            invocation_id: Uuid::new_v4(),
            image,
            metrics: AnalysisMetrics::new(),
            started_at: Utc::now(),
            processing_start: Instant::now(),
            state: StartState,
        }
    }

    pub fn into_located(mut self, face: FaceRegion) -> AnalysisContext<LocatedState> {
        self.metrics.record_locate_duration(self.elapsed());
        self.transition(LocatedState { face })
    }
}

impl AnalysisContext<LocatedState> {
    pub fn face(&self) -> FaceRegion {
        self.state.face
    }

    pub fn into_cropped(self) -> Result<AnalysisContext<CroppedState>, AnalysisError> {
        let crop = self.image.crop(&self.state.face)?;
        Ok(self.transition(CroppedState {
            crop: Arc::new(crop),
        }))
    }
}

impl AnalysisContext<CroppedState> {
    pub fn crop(&self) -> &Arc<FaceCrop> {
        &self.state.crop
    }

    /// Join point of the skin and demographic branches; the crop is released here.
    pub fn into_sampled(
        self,
        color: ColorSample,
        demographics: Demographics,
    ) -> AnalysisContext<SampledState> {
        let face = self.state.crop.region();
        self.transition(SampledState {
            face,
            color,
            demographics,
        })
    }
}

impl AnalysisContext<SampledState> {
    pub fn color(&self) -> ColorSample {
        self.state.color
    }

    pub fn into_classified(self, threshold: i32) -> AnalysisContext<ClassifiedState> {
        let SampledState {
            face,
            color,
            demographics,
        } = self.state;
        let undertone = Undertone::classify_with_threshold(color, threshold);
        AnalysisContext {
            invocation_id: self.invocation_id,
            image: self.image,
            metrics: self.metrics,
            started_at: self.started_at,
            processing_start: self.processing_start,
            state: ClassifiedState {
                face,
                color,
                undertone,
                demographics,
            },
        }
    }
}

impl AnalysisContext<ClassifiedState> {
    pub fn undertone(&self) -> Undertone {
        self.state.undertone
    }

    /// Done: assemble the result and drop everything else.
    pub fn into_result(mut self) -> (AnalysisResult, AnalysisMetrics) {
        self.metrics.record_total_duration(self.elapsed());
        let state = self.state;
        (
            AnalysisResult::new(state.color, state.undertone, state.face, state.demographics),
            self.metrics,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::{AgeBucket, Gender};
    use image::{ImageBuffer, Rgba};

    #[test]
    fn test_context_walks_every_state() {
        let image = RawImage::new(ImageBuffer::from_pixel(20, 20, Rgba([200, 150, 120, 255])));
        let context = AnalysisContext::new(image);
        assert_eq!(context.state_name(), "Start");

        let located = context.into_located(FaceRegion::new(5, 5, 10, 10).unwrap());
        assert_eq!(located.state_name(), "Located");
        assert!(located.metrics().locate_duration().is_some());

        let cropped = located.into_cropped().unwrap();
        assert_eq!(cropped.crop().width(), 10);

        let sampled = cropped.into_sampled(
            ColorSample::new(200, 150, 120),
            Demographics::new(AgeBucket::Age25To32, Gender::Male),
        );
        let classified = sampled.into_classified(15);
        assert_eq!(classified.undertone(), Undertone::Warm);

        let (result, metrics) = classified.into_result();
        assert_eq!(result.skin_tone_hex(), "#C89678");
        assert_eq!(result.face_box(), FaceRegion::new(5, 5, 10, 10).unwrap());
        assert!(metrics.total_duration().is_some());
    }
}
