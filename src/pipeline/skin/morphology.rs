//! Binary erosion/dilation with an elliptical structuring element.
use super::mask::SkinMask;

/// Structuring element, anchored at its center.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    width: u32,
    height: u32,
    offsets: Vec<(i64, i64)>,
}

impl StructuringElement {
    /// Ellipse inscribed in a `width` x `height` box, built the same way as
    /// OpenCV's `MORPH_ELLIPSE` so masks stay comparable with it.
    pub fn ellipse(width: u32, height: u32) -> Self {
        let r = (width / 2) as i64;
        let c = (height / 2) as i64;
        let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };

        let mut offsets = Vec::new();
        for i in 0..height as i64 {
            let dy = i - c;
            let (j1, j2) = if dy.abs() <= c {
                let dx = (r as f64 * (((c * c - dy * dy) as f64) * inv_r2).sqrt()).round() as i64;
                ((r - dx).max(0), (r + dx + 1).min(width as i64))
            } else {
                (0, 0)
            };
            for j in j1..j2 {
                offsets.push((j - r, dy));
            }
        }
        Self {
            width,
            height,
            offsets,
        }
    }

    pub fn contains(&self, dx: i64, dy: i64) -> bool {
        self.offsets.contains(&(dx, dy))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

fn neighbours<'a>(
    mask: &'a SkinMask,
    element: &'a StructuringElement,
    x: u32,
    y: u32,
) -> impl Iterator<Item = bool> + 'a {
    let (width, height) = (mask.width() as i64, mask.height() as i64);
    element.offsets.iter().filter_map(move |&(dx, dy)| {
        let nx = x as i64 + dx;
        let ny = y as i64 + dy;
        (nx >= 0 && ny >= 0 && nx < width && ny < height).then(|| mask.get(nx as u32, ny as u32))
    })
}

/// A pixel survives only if every in-bounds neighbour under the element is set.
pub fn erode(mask: &SkinMask, element: &StructuringElement) -> SkinMask {
    SkinMask::from_fn(mask.width(), mask.height(), |x, y| {
        neighbours(mask, element, x, y).all(|bit| bit)
    })
}

/// A pixel is set if any in-bounds neighbour under the element is set.
pub fn dilate(mask: &SkinMask, element: &StructuringElement) -> SkinMask {
    SkinMask::from_fn(mask.width(), mask.height(), |x, y| {
        neighbours(mask, element, x, y).any(|bit| bit)
    })
}

/// Erosion then dilation: removes specks smaller than the element.
pub fn open(mask: &SkinMask, element: &StructuringElement) -> SkinMask {
    dilate(&erode(mask, element), element)
}

/// Dilation then erosion: fills holes smaller than the element.
pub fn close(mask: &SkinMask, element: &StructuringElement) -> SkinMask {
    erode(&dilate(mask, element), element)
}
