//! Skin-color sub-pipeline: chroma mask, anatomical prior, intersection, sampling.
pub mod chroma;
pub mod compositor;
pub mod mask;
pub mod morphology;
pub mod prior;
pub mod sampler;

pub use chroma::{SkinMaskBuilder, YCrCb};
pub use compositor::{CompositeMask, MaskCompositor};
pub use mask::SkinMask;
pub use prior::AnatomicalPriorMask;
pub use sampler::ColorSampler;

use crate::common::FaceCrop;
use crate::config::{AnalysisConfig, NoSkinFallback};
use crate::error::AnalysisError;
use crate::pipeline::domain::ColorSample;
use image::RgbaImage;
use tracing::{debug, warn};

/// Runs the whole skin branch over one crop. Stateless apart from its tunables.
#[derive(Debug, Clone)]
pub struct SkinToneAnalyzer {
    mask_builder: SkinMaskBuilder,
    prior: AnatomicalPriorMask,
    fallback: NoSkinFallback,
}

impl SkinToneAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            mask_builder: SkinMaskBuilder::from_config(config),
            prior: AnatomicalPriorMask::new(config.prior),
            fallback: config.no_skin_fallback,
        }
    }

    /// Mask of the pixels that get averaged, after the configured fallback.
    pub fn composite(&self, crop: &FaceCrop) -> Result<CompositeMask, AnalysisError> {
        let skin = self.mask_builder.build(crop);
        let prior = self.prior.build(crop.width(), crop.height());
        debug!(
            "Skin mask: {} px, prior: {} px",
            skin.count(),
            prior.count()
        );

        match MaskCompositor::composite(&skin, &prior) {
            Ok(composite) => Ok(composite),
            Err(AnalysisError::NoSkinPixels) if self.fallback == NoSkinFallback::PriorOnly => {
                warn!("No chroma-matched skin inside the prior, sampling the prior alone");
                CompositeMask::non_empty(prior)
            }
            Err(e) => Err(e),
        }
    }

    pub fn analyze(&self, crop: &FaceCrop) -> Result<ColorSample, AnalysisError> {
        let composite = self.composite(crop)?;
        ColorSampler::sample(crop, &composite)
    }

    /// Like [`analyze`](Self::analyze), also returning the crop with every
    /// unsampled pixel made transparent.
    pub fn analyze_masked(&self, crop: &FaceCrop) -> Result<(ColorSample, RgbaImage), AnalysisError> {
        let composite = self.composite(crop)?;
        let color = ColorSampler::sample(crop, &composite)?;
        Ok((color, crop.masked(&composite)?))
    }
}

impl Default for SkinToneAnalyzer {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}
