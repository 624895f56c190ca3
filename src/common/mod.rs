pub mod raw_image;

pub use raw_image::{FaceCrop, FaceRegion, RawImage};
