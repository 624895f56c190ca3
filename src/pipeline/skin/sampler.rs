use super::compositor::CompositeMask;
use crate::common::FaceCrop;
use crate::error::AnalysisError;
use crate::pipeline::domain::ColorSample;

pub struct ColorSampler;

impl ColorSampler {
    /// Mean RGB over the set pixels of the composite mask, rounded to the
    /// nearest integer. The mask is non-empty by construction.
    pub fn sample(crop: &FaceCrop, composite: &CompositeMask) -> Result<ColorSample, AnalysisError> {
        let mask = composite.mask();
        if mask.dimensions() != (crop.width(), crop.height()) {
            return Err(AnalysisError::InternalError(format!(
                "mask {:?} does not match crop {}x{}",
                mask.dimensions(),
                crop.width(),
                crop.height()
            )));
        }

        let pixels = crop.pixels();
        let mut sums = [0u64; 3];
        for (x, y) in mask.iter_set() {
            let [r, g, b, _] = pixels.get_pixel(x, y).0;
            sums[0] += r as u64;
            sums[1] += g as u64;
            sums[2] += b as u64;
        }

        let count = composite.count() as f64;
        let [r, g, b] = sums.map(|sum| (sum as f64 / count).round().min(255.0) as u8);
        Ok(ColorSample::new(r, g, b))
    }
}
