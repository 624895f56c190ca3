use image::{imageops, DynamicImage, Rgba, RgbaImage};
use serde::Serialize;
use std::sync::Arc;

use crate::error::AnalysisError;
use crate::pipeline::skin::CompositeMask;

/// Immutable decoded RGBA pixel buffer. Cloning shares the pixels.
#[derive(Clone)]
pub struct RawImage {
    pixels: Arc<RgbaImage>,
}

impl RawImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Copy the pixels of `region` into an owned crop.
    pub fn crop(&self, region: &FaceRegion) -> Result<FaceCrop, AnalysisError> {
        if !region.fits_within(self.width(), self.height()) {
            return Err(AnalysisError::InternalError(format!(
                "face region {:?} lies outside a {}x{} image",
                region,
                self.width(),
                self.height()
            )));
        }
        let pixels = imageops::crop_imm(
            self.pixels.as_ref(),
            region.x,
            region.y,
            region.width,
            region.height,
        )
        .to_image();
        Ok(FaceCrop {
            region: *region,
            pixels,
        })
    }
}

impl From<DynamicImage> for RawImage {
    fn from(image: DynamicImage) -> Self {
        Self::new(image.to_rgba8())
    }
}

/// Bounding box of a face inside a [`RawImage`].
///
/// Always non-empty; [`FaceRegion::clipped`] is the only way to build one from
/// untrusted detector output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FaceRegion {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl FaceRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Intersect a possibly out-of-bounds box with the image, returning `None`
    /// when nothing of it remains.
    pub fn clipped(x: i64, y: i64, width: i64, height: i64, image_width: u32, image_height: u32) -> Option<Self> {
        let left = x.max(0);
        let top = y.max(0);
        let right = x.saturating_add(width).min(image_width as i64);
        let bottom = y.saturating_add(height).min(image_height as i64);
        if right <= left || bottom <= top {
            return None;
        }
        Self::new(
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        )
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn fits_within(&self, image_width: u32, image_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x as u64 + self.width as u64 <= image_width as u64
            && self.y as u64 + self.height as u64 <= image_height as u64
    }
}

/// Owned pixels of the chosen face region, scoped to one invocation.
#[derive(Debug, Clone)]
pub struct FaceCrop {
    region: FaceRegion,
    pixels: RgbaImage,
}

impl FaceCrop {
    pub fn region(&self) -> FaceRegion {
        self.region
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Copy of the crop with everything outside `mask` made fully transparent.
    pub fn masked(&self, mask: &CompositeMask) -> Result<RgbaImage, AnalysisError> {
        let mask = mask.mask();
        if mask.dimensions() != self.pixels.dimensions() {
            return Err(AnalysisError::InternalError(format!(
                "mask {:?} does not match a {}x{} crop",
                mask.dimensions(),
                self.width(),
                self.height()
            )));
        }
        Ok(RgbaImage::from_fn(self.width(), self.height(), |x, y| {
            if mask.get(x, y) {
                *self.pixels.get_pixel(x, y)
            } else {
                Rgba([0, 0, 0, 0])
            }
        }))
    }
}
