use image::Rgba;

use super::mask::SkinMask;
use super::morphology::{self, StructuringElement};
use crate::common::FaceCrop;
use crate::config::{AnalysisConfig, ChromaBounds};

/// Luma and the two chroma channels of one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YCrCb {
    pub y: u8,
    pub cr: u8,
    pub cb: u8,
}

// BT.601 weights in 14-bit fixed point.
const SHIFT: u32 = 14;
const R2Y: i32 = 4899;
const G2Y: i32 = 9617;
const B2Y: i32 = 1868;
const CR_SCALE: i32 = 11682;
const CB_SCALE: i32 = 9241;
const CHROMA_OFFSET: i32 = 128 << SHIFT;

impl YCrCb {
    /// BT.601 full-range conversion for 8-bit RGB, bit-exact with OpenCV's
    /// integer `RGB2YCrCb` path: luma is rounded first and chroma is derived
    /// from the rounded luma.
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let (r, g, b) = (r as i32, g as i32, b as i32);
        let y = descale(r * R2Y + g * G2Y + b * B2Y);
        let cr = descale((r - y) * CR_SCALE + CHROMA_OFFSET);
        let cb = descale((b - y) * CB_SCALE + CHROMA_OFFSET);
        Self {
            y: saturate(y),
            cr: saturate(cr),
            cb: saturate(cb),
        }
    }
}

fn descale(value: i32) -> i32 {
    (value + (1 << (SHIFT - 1))) >> SHIFT
}

fn saturate(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Chroma-range skin classifier followed by opening and closing.
#[derive(Debug, Clone)]
pub struct SkinMaskBuilder {
    bounds: ChromaBounds,
    element: StructuringElement,
}

impl SkinMaskBuilder {
    pub fn new(bounds: ChromaBounds, kernel_width: u32, kernel_height: u32) -> Self {
        Self {
            bounds,
            element: StructuringElement::ellipse(kernel_width, kernel_height),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.chroma,
            config.morphology.kernel_width,
            config.morphology.kernel_height,
        )
    }

    pub fn is_skin(&self, pixel: &Rgba<u8>) -> bool {
        let [r, g, b, _] = pixel.0;
        let color = YCrCb::from_rgb(r, g, b);
        self.bounds.contains(color.cr, color.cb)
    }

    /// Raw chroma threshold, before any cleanup.
    pub fn threshold(&self, crop: &FaceCrop) -> SkinMask {
        let pixels = crop.pixels();
        SkinMask::from_fn(crop.width(), crop.height(), |x, y| {
            self.is_skin(pixels.get_pixel(x, y))
        })
    }

    pub fn build(&self, crop: &FaceCrop) -> SkinMask {
        let raw = self.threshold(crop);
        let opened = morphology::open(&raw, &self.element);
        morphology::close(&opened, &self.element)
    }
}

impl Default for SkinMaskBuilder {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}
