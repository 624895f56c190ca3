use async_trait::async_trait;
use serde::Serialize;

use crate::common::{FaceRegion, RawImage};
use crate::error::CapabilityError;

/// A face bounding box reported by a [`FaceLocator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    pub region: FaceRegion,
    pub confidence: f32,
}

impl Detection {
    pub fn new(region: FaceRegion, confidence: f32) -> Self {
        Self { region, confidence }
    }
}

/// Pluggable face detection backend. An empty result is a valid answer.
#[async_trait]
pub trait FaceLocator: Send + Sync {
    async fn detect(&self, image: &RawImage) -> Result<Vec<Detection>, CapabilityError>;
    fn name(&self) -> &'static str;
}

/// Returns a fixed set of boxes, e.g. ones chosen by a user upstream.
#[derive(Debug, Clone, Default)]
pub struct StaticFaceLocator {
    detections: Vec<Detection>,
}

impl StaticFaceLocator {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn single(region: FaceRegion) -> Self {
        Self::new(vec![Detection::new(region, 1.0)])
    }
}

#[async_trait]
impl FaceLocator for StaticFaceLocator {
    async fn detect(&self, _image: &RawImage) -> Result<Vec<Detection>, CapabilityError> {
        Ok(self.detections.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Portrait aspect ratio: 3:4 (width / height)
const PORTRAIT_ASPECT: f64 = 3.0 / 4.0;

/// Vertical bias toward the top of the image (faces in upper portion).
/// 0.0 = top, 0.5 = center, 1.0 = bottom.
const VERTICAL_BIAS: f64 = 0.2;

/// Guesses one face box for passport-style photos: the largest 3:4 portrait
/// window, centered horizontally and biased toward the top. Low confidence so
/// any real detector output ranks above it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortraitFaceLocator;

impl PortraitFaceLocator {
    pub const CONFIDENCE: f32 = 0.1;

    pub fn portrait_region(width: u32, height: u32) -> Option<FaceRegion> {
        if width == 0 || height == 0 {
            return None;
        }
        let (crop_width, crop_height) = if (width as f64 / height as f64) > PORTRAIT_ASPECT {
            // wider than 3:4, constrain by height
            ((height as f64 * PORTRAIT_ASPECT).round() as u32, height)
        } else {
            (width, ((width as f64 / PORTRAIT_ASPECT).round() as u32).min(height))
        };

        let x = width.saturating_sub(crop_width) / 2;
        let vertical_slack = height.saturating_sub(crop_height);
        let y = (vertical_slack as f64 * VERTICAL_BIAS).round() as u32;
        FaceRegion::new(x, y, crop_width.max(1), crop_height)
    }
}

#[async_trait]
impl FaceLocator for PortraitFaceLocator {
    async fn detect(&self, image: &RawImage) -> Result<Vec<Detection>, CapabilityError> {
        Ok(Self::portrait_region(image.width(), image.height())
            .map(|region| Detection::new(region, Self::CONFIDENCE))
            .into_iter()
            .collect())
    }

    fn name(&self) -> &'static str {
        "portrait-heuristic"
    }
}
