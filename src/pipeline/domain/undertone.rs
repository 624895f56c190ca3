use serde::Serialize;
use std::fmt;

use super::color::ColorSample;

/// Red/blue difference beyond which a skin color leans warm or cool.
pub const UNDERTONE_THRESHOLD: i32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Undertone {
    Warm,
    Cool,
    Neutral,
}

impl Undertone {
    /// Classify with the default threshold.
    pub fn classify(color: ColorSample) -> Self {
        Self::classify_with_threshold(color, UNDERTONE_THRESHOLD)
    }

    /// Only the red and blue channels matter; boundaries are neutral.
    pub fn classify_with_threshold(color: ColorSample, threshold: i32) -> Self {
        let diff = color.r as i32 - color.b as i32;
        if diff > threshold {
            Undertone::Warm
        } else if diff < -threshold {
            Undertone::Cool
        } else {
            Undertone::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Undertone::Warm => "warm",
            Undertone::Cool => "cool",
            Undertone::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Undertone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rb(r: u8, b: u8) -> ColorSample {
        ColorSample::new(r, 128, b)
    }

    #[test]
    fn test_warm_and_cool() {
        assert_eq!(Undertone::classify(rb(200, 120)), Undertone::Warm);
        assert_eq!(Undertone::classify(rb(100, 180)), Undertone::Cool);
        assert_eq!(Undertone::classify(rb(150, 150)), Undertone::Neutral);
    }

    #[test]
    fn test_boundaries_are_neutral() {
        assert_eq!(Undertone::classify(rb(115, 100)), Undertone::Neutral);
        assert_eq!(Undertone::classify(rb(100, 115)), Undertone::Neutral);
        assert_eq!(Undertone::classify(rb(116, 100)), Undertone::Warm);
        assert_eq!(Undertone::classify(rb(100, 116)), Undertone::Cool);
    }

    #[test]
    fn test_green_channel_is_ignored() {
        for g in [0, 77, 255] {
            assert_eq!(
                Undertone::classify(ColorSample::new(200, g, 120)),
                Undertone::Warm
            );
        }
    }

    #[test]
    fn test_extreme_channels_do_not_overflow() {
        assert_eq!(Undertone::classify(rb(255, 0)), Undertone::Warm);
        assert_eq!(Undertone::classify(rb(0, 255)), Undertone::Cool);
    }

    #[test]
    fn test_custom_threshold() {
        assert_eq!(
            Undertone::classify_with_threshold(rb(130, 100), 30),
            Undertone::Neutral
        );
        assert_eq!(
            Undertone::classify_with_threshold(rb(131, 100), 30),
            Undertone::Warm
        );
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Undertone::Warm).unwrap(), "\"warm\"");
        assert_eq!(Undertone::Neutral.to_string(), "neutral");
    }
}
