use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

use crate::error::AppError;
use crate::pipeline::domain::undertone::UNDERTONE_THRESHOLD;

const ENV_PREFIX: &str = "SKINTONE";

/// Largest accepted structuring element side, in pixels.
pub const MAX_KERNEL_SIZE: u32 = 31;

/// Process-level configuration: the analysis tunables plus logging.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub log_level: String,
    pub analysis: AnalysisConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Configuration {
    /// Load defaults, then an optional file, then `SKINTONE__*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }
        let configuration: Configuration = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        configuration
            .analysis
            .validate()
            .map_err(AppError::InvalidConfig)?;
        configuration.max_log_level()?;
        Ok(configuration)
    }

    pub fn max_log_level(&self) -> Result<Level, AppError> {
        self.log_level
            .parse::<Level>()
            .map_err(|_| AppError::InvalidConfig(format!("Unknown log level: {}", self.log_level)))
    }
}

/// Tunables of the analysis pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub chroma: ChromaBounds,
    pub morphology: MorphologyConfig,
    pub prior: EllipsePrior,
    pub undertone_threshold: i32,
    pub face_ranking: FaceRanking,
    pub min_confidence: f32,
    pub no_skin_fallback: NoSkinFallback,
    pub locator_timeout_ms: Option<u64>,
    pub estimator_timeout_ms: Option<u64>,
}

/// Inclusive Cr/Cb window that counts as skin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChromaBounds {
    pub cr_min: u8,
    pub cr_max: u8,
    pub cb_min: u8,
    pub cb_max: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MorphologyConfig {
    pub kernel_width: u32,
    pub kernel_height: u32,
}

/// Ellipse proportions relative to the face region size.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct EllipsePrior {
    pub center_x: f64,
    pub center_y: f64,
    pub semi_axis_x: f64,
    pub semi_axis_y: f64,
}

/// Primary key used to pick one face when the locator returns several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceRanking {
    #[default]
    Confidence,
    Area,
}

/// What to do when the composite mask comes out empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoSkinFallback {
    #[default]
    Abort,
    PriorOnly,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            chroma: ChromaBounds::default(),
            morphology: MorphologyConfig::default(),
            prior: EllipsePrior::default(),
            undertone_threshold: UNDERTONE_THRESHOLD,
            face_ranking: FaceRanking::default(),
            min_confidence: 0.0,
            no_skin_fallback: NoSkinFallback::default(),
            locator_timeout_ms: Some(5_000),
            estimator_timeout_ms: Some(5_000),
        }
    }
}

impl Default for ChromaBounds {
    fn default() -> Self {
        Self {
            cr_min: 133,
            cr_max: 173,
            cb_min: 77,
            cb_max: 127,
        }
    }
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self {
            kernel_width: 5,
            kernel_height: 5,
        }
    }
}

impl Default for EllipsePrior {
    fn default() -> Self {
        Self {
            center_x: 0.5,
            center_y: 0.45, // forehead/cheek zone
            semi_axis_x: 0.38,
            semi_axis_y: 0.50,
        }
    }
}

impl ChromaBounds {
    pub fn contains(&self, cr: u8, cb: u8) -> bool {
        (self.cr_min..=self.cr_max).contains(&cr) && (self.cb_min..=self.cb_max).contains(&cb)
    }
}

impl AnalysisConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.chroma.cr_min > self.chroma.cr_max {
            return Err("Cr lower bound must not exceed the upper bound".to_string());
        }

        if self.chroma.cb_min > self.chroma.cb_max {
            return Err("Cb lower bound must not exceed the upper bound".to_string());
        }

        if self.morphology.kernel_width == 0 || self.morphology.kernel_height == 0 {
            return Err("Morphology kernel dimensions must be greater than 0".to_string());
        }

        if self.morphology.kernel_width > MAX_KERNEL_SIZE
            || self.morphology.kernel_height > MAX_KERNEL_SIZE
        {
            return Err(format!(
                "Morphology kernel dimensions must not exceed {}",
                MAX_KERNEL_SIZE
            ));
        }

        let prior = &self.prior;
        for (name, value) in [
            ("center_x", prior.center_x),
            ("center_y", prior.center_y),
            ("semi_axis_x", prior.semi_axis_x),
            ("semi_axis_y", prior.semi_axis_y),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("Ellipse {} must be a non-negative number", name));
            }
        }

        if self.undertone_threshold < 0 {
            return Err("Undertone threshold must not be negative".to_string());
        }

        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err("Minimum confidence must be between 0.0 and 1.0".to_string());
        }

        if self.locator_timeout_ms == Some(0) || self.estimator_timeout_ms == Some(0) {
            return Err("Capability timeouts must be greater than 0 when set".to_string());
        }

        Ok(())
    }

    pub fn locator_timeout(&self) -> Option<Duration> {
        self.locator_timeout_ms.map(Duration::from_millis)
    }

    pub fn estimator_timeout(&self) -> Option<Duration> {
        self.estimator_timeout_ms.map(Duration::from_millis)
    }

    pub fn with_chroma(mut self, chroma: ChromaBounds) -> Self {
        self.chroma = chroma;
        self
    }

    pub fn with_kernel_size(mut self, width: u32, height: u32) -> Self {
        self.morphology = MorphologyConfig {
            kernel_width: width,
            kernel_height: height,
        };
        self
    }

    pub fn with_prior(mut self, prior: EllipsePrior) -> Self {
        self.prior = prior;
        self
    }

    pub fn with_undertone_threshold(mut self, threshold: i32) -> Self {
        self.undertone_threshold = threshold;
        self
    }

    pub fn with_face_ranking(mut self, ranking: FaceRanking) -> Self {
        self.face_ranking = ranking;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_no_skin_fallback(mut self, fallback: NoSkinFallback) -> Self {
        self.no_skin_fallback = fallback;
        self
    }

    pub fn with_locator_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.locator_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    pub fn with_estimator_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.estimator_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }
}
