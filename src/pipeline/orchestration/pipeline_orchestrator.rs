use futures::future::BoxFuture;
use image::RgbaImage;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::Service;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::ranking::select_face;
use super::service::{estimate_with_deadline, locate_with_deadline};
use crate::capability::{DemographicEstimator, FaceLocator, UnknownDemographics};
use crate::common::{FaceCrop, RawImage};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AppError};
use crate::pipeline::context::state::StartState;
use crate::pipeline::context::{AnalysisContext, AnalysisMetrics};
use crate::pipeline::domain::{AnalysisResult, ColorSample, Demographics};
use crate::pipeline::skin::SkinToneAnalyzer;

/// Output of [`PipelineOrchestrator::analyze_with_mask`].
#[derive(Debug, Clone)]
pub struct MaskedAnalysis {
    pub result: AnalysisResult,
    pub metrics: AnalysisMetrics,
    /// The face crop with every unsampled pixel fully transparent.
    pub masked_face: RgbaImage,
}

/// Sequences location, cropping, the two concurrent branches and
/// classification for each invocation. Holds only shared, read-only state,
/// so one instance serves any number of concurrent requests.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    locator: Arc<dyn FaceLocator>,
    estimator: Arc<dyn DemographicEstimator>,
    skin: Arc<SkinToneAnalyzer>,
    config: Arc<AnalysisConfig>,
}

impl PipelineOrchestrator {
    pub fn builder() -> PipelineOrchestratorBuilder {
        PipelineOrchestratorBuilder::new()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub async fn analyze(&self, image: RawImage) -> Result<AnalysisResult, AnalysisError> {
        self.analyze_with_metrics(image)
            .await
            .map(|(result, _)| result)
    }

    pub async fn analyze_with_metrics(
        &self,
        image: RawImage,
    ) -> Result<(AnalysisResult, AnalysisMetrics), AnalysisError> {
        self.instrumented(image, false)
            .await
            .map(|(result, metrics, _)| (result, metrics))
    }

    /// Analyze and also keep the masked face, e.g. for export.
    pub async fn analyze_with_mask(&self, image: RawImage) -> Result<MaskedAnalysis, AnalysisError> {
        let (result, metrics, masked_face) = self.instrumented(image, true).await?;
        let masked_face = masked_face.ok_or_else(|| {
            AnalysisError::InternalError("skin branch returned no masked face".to_string())
        })?;
        Ok(MaskedAnalysis {
            result,
            metrics,
            masked_face,
        })
    }

    async fn instrumented(&self, image: RawImage, keep_mask: bool) -> Result<Analyzed, AnalysisError> {
        let context = AnalysisContext::new(image);
        let span = info_span!("analysis", invocation = %context.invocation_id());
        self.run(context, keep_mask).instrument(span).await
    }

    async fn run(
        &self,
        context: AnalysisContext<StartState>,
        keep_mask: bool,
    ) -> Result<Analyzed, AnalysisError> {
        debug!(
            "Analyzing {}x{} image received at {}",
            context.image().width(),
            context.image().height(),
            context.started_at()
        );

        // Start -> Located
        let detections = locate_with_deadline(
            self.locator.clone(),
            context.image().clone(),
            self.config.locator_timeout(),
        )
        .await
        .map_err(|e| failed(context.state_name(), AnalysisError::unavailable("face locator", e)))?;

        debug!("{} returned {} detection(s)", self.locator.name(), detections.len());

        let detection = select_face(
            &detections,
            self.config.face_ranking,
            self.config.min_confidence,
            context.image().width(),
            context.image().height(),
        )
        .ok_or_else(|| failed(context.state_name(), AnalysisError::NoFaceDetected))?;
        let located = context.into_located(detection.region);

        // Located -> Cropped
        let state_name = located.state_name();
        let mut cropped = located
            .into_cropped()
            .map_err(|e| failed(state_name, e))?;

        // Cropped -> {MaskBuilt ∥ DemographicsEstimated}
        let crop = cropped.crop().clone();
        let (skin_result, (demographics, demographics_duration)) = tokio::join!(
            self.sample_skin(crop.clone(), keep_mask),
            self.estimate_demographics(crop)
        );
        cropped
            .metrics_mut()
            .record_demographics_duration(demographics_duration);
        let (color, masked_face, skin_duration) = skin_result.map_err(|e| failed(cropped.state_name(), e))?;
        cropped.metrics_mut().record_skin_duration(skin_duration);

        // -> Sampled -> Classified -> Done
        let classified = cropped
            .into_sampled(color, demographics)
            .into_classified(self.config.undertone_threshold);
        let (result, metrics) = classified.into_result();

        info!(
            "Skin tone {} ({}), age {}, gender {}",
            result.skin_tone_hex(),
            result.undertone(),
            result.age_bucket(),
            result.gender()
        );
        debug!("Stage timings: {:?}", metrics);
        Ok((result, metrics, masked_face))
    }

    /// Skin branch: CPU-bound, so it runs off the async workers.
    async fn sample_skin(&self, crop: Arc<FaceCrop>, keep_mask: bool) -> Result<SkinSample, AnalysisError> {
        let skin = self.skin.clone();
        let start = Instant::now();
        let (color, masked_face) = tokio::task::spawn_blocking(move || {
            if keep_mask {
                skin.analyze_masked(&crop)
                    .map(|(color, masked)| (color, Some(masked)))
            } else {
                skin.analyze(&crop).map(|color| (color, None))
            }
        })
        .await
        .map_err(|e| AnalysisError::InternalError(format!("skin analysis task failed: {}", e)))??;
        Ok((color, masked_face, start.elapsed()))
    }

    /// Demographic branch: never fails, degrades to `Unknown` labels.
    async fn estimate_demographics(&self, crop: Arc<FaceCrop>) -> (Demographics, Duration) {
        let start = Instant::now();
        let demographics = match estimate_with_deadline(
            self.estimator.clone(),
            crop,
            self.config.estimator_timeout(),
        )
        .await
        {
            Ok(demographics) => demographics,
            Err(e) => {
                warn!(
                    "Demographic estimation with {} failed, using Unknown labels: {}",
                    self.estimator.name(),
                    e
                );
                Demographics::unknown()
            }
        };
        (demographics, start.elapsed())
    }
}

type Analyzed = (AnalysisResult, AnalysisMetrics, Option<RgbaImage>);
type SkinSample = (ColorSample, Option<RgbaImage>, Duration);

fn failed(state: &'static str, error: AnalysisError) -> AnalysisError {
    if error.is_user_facing() {
        info!("Analysis failed after {}: {} ({})", state, error, error.reason_code());
    } else {
        error!("Analysis failed after {}: {} ({})", state, error, error.reason_code());
    }
    error
}

/// Tower Service implementation so the orchestrator can sit behind middleware
impl Service<RawImage> for PipelineOrchestrator {
    type Response = AnalysisResult;
    type Error = AnalysisError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, image: RawImage) -> Self::Future {
        let orchestrator = self.clone();
        Box::pin(async move { orchestrator.analyze(image).await })
    }
}

pub struct PipelineOrchestratorBuilder {
    config: AnalysisConfig,
    locator: Option<Arc<dyn FaceLocator>>,
    estimator: Option<Arc<dyn DemographicEstimator>>,
}

impl PipelineOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
            locator: None,
            estimator: None,
        }
    }

    // Replaces every tunable set so far.
    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn locator(self, locator: impl FaceLocator + 'static) -> Self {
        self.shared_locator(Arc::new(locator))
    }

    pub fn shared_locator(mut self, locator: Arc<dyn FaceLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn estimator(self, estimator: impl DemographicEstimator + 'static) -> Self {
        self.shared_estimator(Arc::new(estimator))
    }

    pub fn shared_estimator(mut self, estimator: Arc<dyn DemographicEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn locator_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_locator_timeout(Some(timeout));
        self
    }

    pub fn estimator_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_estimator_timeout(Some(timeout));
        self
    }

    pub fn build(self) -> Result<PipelineOrchestrator, AppError> {
        self.config.validate().map_err(AppError::InvalidConfig)?;
        let locator = self
            .locator
            .ok_or_else(|| AppError::InvalidConfig("Face locator not set".to_string()))?;
        let estimator = self
            .estimator
            .unwrap_or_else(|| Arc::new(UnknownDemographics));

        Ok(PipelineOrchestrator {
            locator,
            estimator,
            skin: Arc::new(SkinToneAnalyzer::new(&self.config)),
            config: Arc::new(self.config),
        })
    }
}

impl Default for PipelineOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Detection, StaticFaceLocator};
    use crate::common::FaceRegion;
    use crate::config::NoSkinFallback;
    use crate::error::CapabilityError;
    use crate::pipeline::domain::{AgeBucket, Gender, Undertone};
    use async_trait::async_trait;
    use image::{ImageBuffer, Rgba};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    enum Outcome {
        Labels(Demographics),
        Fail,
        Hang,
    }

    struct CountingEstimator {
        calls: Arc<AtomicUsize>,
        outcome: Outcome,
    }

    impl CountingEstimator {
        fn new(outcome: Outcome) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: calls.clone(),
                    outcome,
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl DemographicEstimator for CountingEstimator {
        async fn classify(&self, _face: &FaceCrop) -> Result<Demographics, CapabilityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Outcome::Labels(demographics) => Ok(*demographics),
                Outcome::Fail => Err(CapabilityError::Inference("net exploded".to_string())),
                Outcome::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(Demographics::unknown())
                }
            }
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    struct FailingLocator;

    #[async_trait]
    impl FaceLocator for FailingLocator {
        async fn detect(&self, _image: &RawImage) -> Result<Vec<Detection>, CapabilityError> {
            Err(CapabilityError::Unavailable("haar cascade missing".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    struct HangingLocator;

    #[async_trait]
    impl FaceLocator for HangingLocator {
        async fn detect(&self, _image: &RawImage) -> Result<Vec<Detection>, CapabilityError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "hanging"
        }
    }

    const SKIN: Rgba<u8> = Rgba([200, 150, 120, 255]);

    fn uniform(width: u32, height: u32, pixel: Rgba<u8>) -> RawImage {
        RawImage::new(ImageBuffer::from_pixel(width, height, pixel))
    }

    fn face() -> FaceRegion {
        FaceRegion::new(10, 10, 40, 50).unwrap()
    }

    fn labels() -> Demographics {
        Demographics::new(AgeBucket::Age25To32, Gender::Female)
    }

    #[tokio::test]
    async fn test_uniform_skin_scenario() {
        let (estimator, calls) = CountingEstimator::new(Outcome::Labels(labels()));
        let orchestrator = PipelineOrchestrator::builder()
            .locator(StaticFaceLocator::single(face()))
            .estimator(estimator)
            .build()
            .unwrap();

        let (result, metrics) = orchestrator
            .analyze_with_metrics(uniform(64, 80, SKIN))
            .await
            .unwrap();

        assert_eq!(result.skin_tone_hex(), "#C89678");
        assert_eq!(result.undertone(), Undertone::Warm);
        assert_eq!(result.face_box(), face());
        assert_eq!(result.age_bucket(), AgeBucket::Age25To32);
        assert_eq!(result.gender(), Gender::Female);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(metrics.skin_duration().is_some());
        assert!(metrics.demographics_duration().is_some());
        assert!(metrics.total_duration().is_some());
    }

    #[tokio::test]
    async fn test_masked_face_matches_the_crop() {
        let orchestrator = PipelineOrchestrator::builder()
            .locator(StaticFaceLocator::single(face()))
            .build()
            .unwrap();

        let analysis = orchestrator
            .analyze_with_mask(uniform(64, 80, SKIN))
            .await
            .unwrap();
        assert_eq!(analysis.result.skin_tone_hex(), "#C89678");
        assert_eq!(analysis.masked_face.dimensions(), (40, 50));
        // corners sit outside the ellipse
        assert_eq!(analysis.masked_face.get_pixel(0, 0)[3], 0);
        assert_eq!(analysis.masked_face.get_pixel(20, 22), &SKIN);
    }

    #[tokio::test]
    async fn test_zero_detections_short_circuit() {
        let (estimator, calls) = CountingEstimator::new(Outcome::Labels(labels()));
        let orchestrator = PipelineOrchestrator::builder()
            .locator(StaticFaceLocator::default())
            .estimator(estimator)
            .build()
            .unwrap();

        let result = orchestrator.analyze(uniform(64, 80, SKIN)).await;
        assert_eq!(result, Err(AnalysisError::NoFaceDetected));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_detections_below_min_confidence_mean_no_face() {
        let orchestrator = PipelineOrchestrator::builder()
            .config(AnalysisConfig::default().with_min_confidence(0.5))
            .locator(StaticFaceLocator::new(vec![Detection::new(face(), 0.3)]))
            .build()
            .unwrap();
        assert_eq!(
            orchestrator.analyze(uniform(64, 80, SKIN)).await,
            Err(AnalysisError::NoFaceDetected)
        );
    }

    #[tokio::test]
    async fn test_no_skin_pixels_scenario() {
        let orchestrator = PipelineOrchestrator::builder()
            .locator(StaticFaceLocator::single(face()))
            .build()
            .unwrap();
        let result = orchestrator
            .analyze(uniform(64, 80, Rgba([30, 60, 200, 255])))
            .await;
        assert_eq!(result, Err(AnalysisError::NoSkinPixels));
    }

    #[tokio::test]
    async fn test_prior_only_fallback_returns_a_color() {
        let orchestrator = PipelineOrchestrator::builder()
            .config(AnalysisConfig::default().with_no_skin_fallback(NoSkinFallback::PriorOnly))
            .locator(StaticFaceLocator::single(face()))
            .build()
            .unwrap();
        let result = orchestrator
            .analyze(uniform(64, 80, Rgba([30, 60, 200, 255])))
            .await
            .unwrap();
        assert_eq!(result.skin_tone_hex(), "#1E3CC8");
        assert_eq!(result.undertone(), Undertone::Cool);
    }

    #[tokio::test]
    async fn test_estimator_failure_degrades_to_unknown() {
        let (estimator, calls) = CountingEstimator::new(Outcome::Fail);
        let orchestrator = PipelineOrchestrator::builder()
            .locator(StaticFaceLocator::single(face()))
            .estimator(estimator)
            .build()
            .unwrap();

        let result = orchestrator.analyze(uniform(64, 80, SKIN)).await.unwrap();
        assert_eq!(result.skin_tone_hex(), "#C89678");
        assert_eq!(result.age_bucket(), AgeBucket::Unknown);
        assert_eq!(result.gender(), Gender::Unknown);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_estimator_timeout_degrades_to_unknown() {
        let (estimator, _) = CountingEstimator::new(Outcome::Hang);
        let orchestrator = PipelineOrchestrator::builder()
            .locator(StaticFaceLocator::single(face()))
            .estimator(estimator)
            .estimator_timeout(Duration::from_millis(200))
            .build()
            .unwrap();

        let result = orchestrator.analyze(uniform(64, 80, SKIN)).await.unwrap();
        assert_eq!(result.undertone(), Undertone::Warm);
        assert_eq!(result.gender(), Gender::Unknown);
    }

    #[tokio::test]
    async fn test_skin_failure_aborts_even_when_estimator_succeeds() {
        let (estimator, calls) = CountingEstimator::new(Outcome::Labels(labels()));
        let orchestrator = PipelineOrchestrator::builder()
            .locator(StaticFaceLocator::single(face()))
            .estimator(estimator)
            .build()
            .unwrap();
        let result = orchestrator
            .analyze(uniform(64, 80, Rgba([0, 255, 0, 255])))
            .await;
        assert_eq!(result, Err(AnalysisError::NoSkinPixels));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_locator_failure_is_model_unavailable() {
        let orchestrator = PipelineOrchestrator::builder()
            .locator(FailingLocator)
            .build()
            .unwrap();
        let error = orchestrator
            .analyze(uniform(64, 80, SKIN))
            .await
            .unwrap_err();
        assert_eq!(error.reason_code(), "model_unavailable");
        assert!(error.to_string().contains("haar cascade missing"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_locator_timeout_is_model_unavailable() {
        let orchestrator = PipelineOrchestrator::builder()
            .locator(HangingLocator)
            .locator_timeout(Duration::from_millis(500))
            .build()
            .unwrap();
        let error = orchestrator
            .analyze(uniform(64, 80, SKIN))
            .await
            .unwrap_err();
        assert!(matches!(error, AnalysisError::ModelUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_best_ranked_face_is_sampled() {
        // left half skin, right half blue; the confident box sits on the skin
        let image = RawImage::new(ImageBuffer::from_fn(120, 60, |x, _| {
            if x < 60 { SKIN } else { Rgba([30, 60, 200, 255]) }
        }));
        let skin_box = FaceRegion::new(5, 5, 40, 50).unwrap();
        let blue_box = FaceRegion::new(70, 5, 45, 50).unwrap();
        let orchestrator = PipelineOrchestrator::builder()
            .locator(StaticFaceLocator::new(vec![
                Detection::new(blue_box, 0.7),
                Detection::new(skin_box, 0.95),
            ]))
            .build()
            .unwrap();

        let result = orchestrator.analyze(image).await.unwrap();
        assert_eq!(result.face_box(), skin_box);
        assert_eq!(result.skin_tone_hex(), "#C89678");
    }

    #[tokio::test]
    async fn test_repeated_runs_are_bit_identical() {
        let mut rng = StdRng::seed_from_u64(42);
        let pixels = ImageBuffer::from_fn(96, 96, |_, _| {
            Rgba([
                rng.random_range(170..=230u8),
                rng.random_range(120..=170u8),
                rng.random_range(90..=140u8),
                255,
            ])
        });
        let image = RawImage::new(pixels);
        let orchestrator = PipelineOrchestrator::builder()
            .locator(StaticFaceLocator::single(FaceRegion::new(8, 8, 80, 80).unwrap()))
            .build()
            .unwrap();

        let first = orchestrator.analyze(image.clone()).await;
        let second = orchestrator.analyze(image).await;
        assert_eq!(first, second);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_invocations_are_independent() {
        let orchestrator = PipelineOrchestrator::builder()
            .locator(StaticFaceLocator::single(face()))
            .estimator(CountingEstimator::new(Outcome::Labels(labels())).0)
            .build()
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = orchestrator.clone();
                tokio::spawn(async move { service.oneshot(uniform(64, 80, SKIN)).await })
            })
            .collect();
        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            assert_eq!(result.skin_tone_hex(), "#C89678");
            assert_eq!(result.gender(), Gender::Female);
        }
    }

    #[test]
    fn test_builder_requires_locator() {
        assert!(matches!(
            PipelineOrchestrator::builder().build(),
            Err(AppError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = PipelineOrchestrator::builder()
            .config(AnalysisConfig::default().with_kernel_size(0, 0))
            .locator(StaticFaceLocator::default())
            .build();
        assert!(matches!(result, Err(AppError::InvalidConfig(_))));
    }
}
