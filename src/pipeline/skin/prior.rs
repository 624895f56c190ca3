use super::mask::SkinMask;
use crate::config::EllipsePrior;

/// Filled ellipse over the forehead/cheek zone of a face region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnatomicalPriorMask {
    proportions: EllipsePrior,
}

impl AnatomicalPriorMask {
    pub fn new(proportions: EllipsePrior) -> Self {
        Self { proportions }
    }

    /// Center and semi-axes in pixels for a region of the given size. The
    /// center is kept on a pixel of the region.
    pub fn geometry(&self, width: u32, height: u32) -> ((f64, f64), (f64, f64)) {
        let (w, h) = (width as f64, height as f64);
        let max_x = width.saturating_sub(1) as f64;
        let max_y = height.saturating_sub(1) as f64;
        let p = &self.proportions;
        (
            (
                (w * p.center_x).round().min(max_x),
                (h * p.center_y).round().min(max_y),
            ),
            ((w * p.semi_axis_x).round(), (h * p.semi_axis_y).round()),
        )
    }

    pub fn build(&self, width: u32, height: u32) -> SkinMask {
        let ((cx, cy), (a, b)) = self.geometry(width, height);
        SkinMask::from_fn(width, height, |x, y| {
            axis_term(x as f64 - cx, a) + axis_term(y as f64 - cy, b) <= 1.0
        })
    }
}

impl Default for AnatomicalPriorMask {
    fn default() -> Self {
        Self::new(EllipsePrior::default())
    }
}

// A zero semi-axis collapses the ellipse onto its center line.
fn axis_term(delta: f64, semi_axis: f64) -> f64 {
    if semi_axis > 0.0 {
        (delta / semi_axis).powi(2)
    } else if delta == 0.0 {
        0.0
    } else {
        f64::INFINITY
    }
}
