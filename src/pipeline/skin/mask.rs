/// Binary raster with the dimensions of a face region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl SkinMask {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut bits = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                bits.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            bits,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.bits[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        let index = self.index(x, y);
        self.bits[index] = value;
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&bit| bit).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.bits.iter().any(|&bit| bit)
    }

    /// Coordinates of set pixels in row-major order.
    pub fn iter_set(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.width.max(1);
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, &bit)| bit)
            .map(move |(i, _)| (i as u32 % width, i as u32 / width))
    }

    /// Pixel-wise AND; `None` when the dimensions differ.
    pub fn intersect(&self, other: &SkinMask) -> Option<SkinMask> {
        if self.dimensions() != other.dimensions() {
            return None;
        }
        Some(Self {
            width: self.width,
            height: self.height,
            bits: self
                .bits
                .iter()
                .zip(&other.bits)
                .map(|(&a, &b)| a && b)
                .collect(),
        })
    }

    pub fn is_subset_of(&self, other: &SkinMask) -> bool {
        self.dimensions() == other.dimensions()
            && self.bits.iter().zip(&other.bits).all(|(&a, &b)| !a || b)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fn_and_iter_set() {
        let mask = SkinMask::from_fn(3, 2, |x, y| x == y);
        assert_eq!(mask.count(), 2);
        assert_eq!(mask.iter_set().collect::<Vec<_>>(), vec![(0, 0), (1, 1)]);
        assert!(!mask.get(5, 0));
    }

    #[test]
    fn test_intersect_rejects_mismatched_dimensions() {
        assert!(SkinMask::empty(2, 2).intersect(&SkinMask::empty(2, 3)).is_none());
    }

    #[test]
    fn test_subset() {
        let big = SkinMask::from_fn(4, 4, |x, _| x < 3);
        let small = SkinMask::from_fn(4, 4, |x, y| x < 2 && y < 2);
        assert!(small.is_subset_of(&big));
        assert!(!big.is_subset_of(&small));
    }
}
