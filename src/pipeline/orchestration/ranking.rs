use std::cmp::Ordering;

use crate::capability::Detection;
use crate::common::FaceRegion;
use crate::config::FaceRanking;

/// Clip each detection to the image, drop unusable ones, and pick the best by
/// `ranking`. Ties fall back to the other key, then to the top-most and
/// left-most box, so the choice never depends on detector output order.
pub fn select_face(
    detections: &[Detection],
    ranking: FaceRanking,
    min_confidence: f32,
    image_width: u32,
    image_height: u32,
) -> Option<Detection> {
    detections
        .iter()
        .filter(|d| d.confidence.is_finite() && d.confidence >= min_confidence)
        .filter_map(|d| {
            let r = d.region;
            FaceRegion::clipped(
                r.x() as i64,
                r.y() as i64,
                r.width() as i64,
                r.height() as i64,
                image_width,
                image_height,
            )
            .map(|region| Detection::new(region, d.confidence))
        })
        .max_by(|a, b| compare(a, b, ranking))
}

fn compare(a: &Detection, b: &Detection, ranking: FaceRanking) -> Ordering {
    let by_confidence = a.confidence.total_cmp(&b.confidence);
    let by_area = a.region.area().cmp(&b.region.area());
    let primary = match ranking {
        FaceRanking::Confidence => by_confidence.then(by_area),
        FaceRanking::Area => by_area.then(by_confidence),
    };
    // max_by keeps the greater element, so smaller coordinates must compare greater
    primary
        .then_with(|| b.region.y().cmp(&a.region.y()))
        .then_with(|| b.region.x().cmp(&a.region.x()))
}
