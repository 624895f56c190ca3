use serde::Serialize;

use super::color::ColorSample;
use super::demographics::{AgeBucket, Demographics, Gender};
use super::undertone::Undertone;
use crate::common::FaceRegion;

/// Final output of one analysis, handed to the caller and never retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    skin_tone_hex: String,
    undertone: Undertone,
    face_box: FaceRegion,
    age_bucket: AgeBucket,
    gender: Gender,
}

impl AnalysisResult {
    pub fn new(
        color: ColorSample,
        undertone: Undertone,
        face_box: FaceRegion,
        demographics: Demographics,
    ) -> Self {
        Self {
            skin_tone_hex: color.to_hex(),
            undertone,
            face_box,
            age_bucket: demographics.age_bucket,
            gender: demographics.gender,
        }
    }

    pub fn skin_tone_hex(&self) -> &str {
        &self.skin_tone_hex
    }

    pub fn undertone(&self) -> Undertone {
        self.undertone
    }

    pub fn face_box(&self) -> FaceRegion {
        self.face_box
    }

    pub fn age_bucket(&self) -> AgeBucket {
        self.age_bucket
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }
}
