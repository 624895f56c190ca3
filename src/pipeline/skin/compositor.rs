use super::mask::SkinMask;
use crate::error::AnalysisError;

/// Intersection of the chroma mask and the anatomical prior, guaranteed to
/// contain at least one set pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeMask {
    mask: SkinMask,
    count: usize,
}

impl CompositeMask {
    /// Wrap a mask, refusing an empty one.
    pub fn non_empty(mask: SkinMask) -> Result<Self, AnalysisError> {
        let count = mask.count();
        if count == 0 {
            return Err(AnalysisError::NoSkinPixels);
        }
        Ok(Self { mask, count })
    }

    pub fn mask(&self) -> &SkinMask {
        &self.mask
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

pub struct MaskCompositor;

impl MaskCompositor {
    pub fn composite(skin: &SkinMask, prior: &SkinMask) -> Result<CompositeMask, AnalysisError> {
        let intersection = skin.intersect(prior).ok_or_else(|| {
            AnalysisError::InternalError(format!(
                "mask dimensions differ: {:?} vs {:?}",
                skin.dimensions(),
                prior.dimensions()
            ))
        })?;
        CompositeMask::non_empty(intersection)
    }
}
