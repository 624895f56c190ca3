//! Process-wide model state and the adapters that run blocking inference on it.
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

use super::demographic_estimator::DemographicEstimator;
use super::face_locator::{Detection, FaceLocator};
use crate::common::{FaceCrop, RawImage};
use crate::error::CapabilityError;
use crate::pipeline::domain::Demographics;

/// Loads model weights. Called at most once per successful [`LazyModel`].
pub trait ModelLoader: Send + Sync + 'static {
    type Model: Send + Sync + 'static;

    fn load(&self) -> Result<Self::Model, CapabilityError>;
    fn name(&self) -> &'static str;
}

/// Load-once, read-many model holder.
///
/// Concurrent first callers wait on the same initialization; a failed load is
/// not cached, so the next request retries it.
pub struct LazyModel<L: ModelLoader> {
    loader: Arc<L>,
    cell: OnceCell<Arc<L::Model>>,
}

impl<L: ModelLoader> LazyModel<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader: Arc::new(loader),
            cell: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn get(&self) -> Result<Arc<L::Model>, CapabilityError> {
        self.cell
            .get_or_try_init(|| async {
                let loader = self.loader.clone();
                let name = loader.name();
                let model = tokio::task::spawn_blocking(move || loader.load())
                    .await
                    .map_err(|e| CapabilityError::Unavailable(format!("{} loader panicked: {}", name, e)))?
                    .inspect_err(|e| error!("Failed to load {}: {}", name, e))?;
                info!("Loaded {}", name);
                Ok::<_, CapabilityError>(Arc::new(model))
            })
            .await
            .cloned()
    }
}

/// Synchronous face detection model.
pub trait FaceModel: Send + Sync + 'static {
    fn detect_faces(&self, image: &RawImage) -> Result<Vec<Detection>, CapabilityError>;
}

/// Synchronous age/gender model returning raw per-class scores.
pub trait DemographicModel: Send + Sync + 'static {
    /// `(age_scores, gender_scores)`, one score per bucket/label.
    fn predict(&self, face: &FaceCrop) -> Result<(Vec<f32>, Vec<f32>), CapabilityError>;
}

/// [`FaceLocator`] backed by a lazily loaded [`FaceModel`].
pub struct ModelFaceLocator<L: ModelLoader>
where
    L::Model: FaceModel,
{
    model: LazyModel<L>,
}

impl<L: ModelLoader> ModelFaceLocator<L>
where
    L::Model: FaceModel,
{
    pub fn new(loader: L) -> Self {
        Self {
            model: LazyModel::new(loader),
        }
    }

    /// Load the weights now instead of on the first request.
    pub async fn warm_up(&self) -> Result<(), CapabilityError> {
        self.model.get().await.map(|_| ())
    }
}

#[async_trait]
impl<L: ModelLoader> FaceLocator for ModelFaceLocator<L>
where
    L::Model: FaceModel,
{
    async fn detect(&self, image: &RawImage) -> Result<Vec<Detection>, CapabilityError> {
        let model = self.model.get().await?;
        let image = image.clone();
        tokio::task::spawn_blocking(move || model.detect_faces(&image))
            .await
            .map_err(|e| CapabilityError::Inference(e.to_string()))?
    }

    fn name(&self) -> &'static str {
        self.model.loader.name()
    }
}

/// [`DemographicEstimator`] backed by a lazily loaded [`DemographicModel`].
pub struct ModelDemographicEstimator<L: ModelLoader>
where
    L::Model: DemographicModel,
{
    model: LazyModel<L>,
}

impl<L: ModelLoader> ModelDemographicEstimator<L>
where
    L::Model: DemographicModel,
{
    pub fn new(loader: L) -> Self {
        Self {
            model: LazyModel::new(loader),
        }
    }

    pub async fn warm_up(&self) -> Result<(), CapabilityError> {
        self.model.get().await.map(|_| ())
    }
}

#[async_trait]
impl<L: ModelLoader> DemographicEstimator for ModelDemographicEstimator<L>
where
    L::Model: DemographicModel,
{
    async fn classify(&self, face: &FaceCrop) -> Result<Demographics, CapabilityError> {
        let model = self.model.get().await?;
        let face = face.clone();
        let (age_scores, gender_scores) = tokio::task::spawn_blocking(move || model.predict(&face))
            .await
            .map_err(|e| CapabilityError::Inference(e.to_string()))??;
        Ok(Demographics::from_scores(&age_scores, &gender_scores))
    }

    fn name(&self) -> &'static str {
        self.model.loader.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::FaceRegion;
    use crate::pipeline::domain::{AgeBucket, Gender};
    use image::{ImageBuffer, Rgba};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingLoader {
        loads: Arc<AtomicUsize>,
        fail_first: bool,
    }

    struct FixedModel;

    impl FaceModel for FixedModel {
        fn detect_faces(&self, image: &RawImage) -> Result<Vec<Detection>, CapabilityError> {
            let region = FaceRegion::new(0, 0, image.width(), image.height()).unwrap();
            Ok(vec![Detection::new(region, 0.9)])
        }
    }

    impl DemographicModel for FixedModel {
        fn predict(&self, _face: &FaceCrop) -> Result<(Vec<f32>, Vec<f32>), CapabilityError> {
            Ok((vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.9, 0.1, 0.0], vec![0.8, 0.2]))
        }
    }

    impl ModelLoader for CountingLoader {
        type Model = FixedModel;

        fn load(&self) -> Result<FixedModel, CapabilityError> {
            let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            if self.fail_first && attempt == 0 {
                return Err(CapabilityError::Unavailable("weights missing".to_string()));
            }
            Ok(FixedModel)
        }

        fn name(&self) -> &'static str {
            "fixed-model"
        }
    }

    fn loader(fail_first: bool) -> (CountingLoader, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        (
            CountingLoader {
                loads: loads.clone(),
                fail_first,
            },
            loads,
        )
    }

    fn sample_image() -> RawImage {
        RawImage::new(ImageBuffer::from_pixel(16, 16, Rgba([200, 150, 120, 255])))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_lazy_model_loads_once_under_concurrency() {
        let (loader, loads) = loader(false);
        let model = Arc::new(LazyModel::new(loader));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let model = model.clone();
                tokio::spawn(async move { model.get().await.map(|_| ()) })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(model.is_loaded());
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let (loader, loads) = loader(true);
        let model = LazyModel::new(loader);

        assert!(matches!(model.get().await, Err(CapabilityError::Unavailable(_))));
        assert!(!model.is_loaded());
        assert!(model.get().await.is_ok());
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_model_backed_adapters() {
        let (face_loader, _) = loader(false);
        let locator = ModelFaceLocator::new(face_loader);
        let detections = locator.detect(&sample_image()).await.unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(locator.name(), "fixed-model");

        let (demo_loader, loads) = loader(false);
        let estimator = ModelDemographicEstimator::new(demo_loader);
        estimator.warm_up().await.unwrap();
        let crop = sample_image().crop(&FaceRegion::new(0, 0, 8, 8).unwrap()).unwrap();
        let demographics = estimator.classify(&crop).await.unwrap();
        assert_eq!(demographics.age_bucket, AgeBucket::Age38To43);
        assert_eq!(demographics.gender, Gender::Male);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }
}
