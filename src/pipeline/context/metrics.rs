use std::time::Duration;

/// Stage timings collected during one analysis
#[derive(Debug, Clone, Default)]
pub struct AnalysisMetrics {
    locate_duration: Option<Duration>,
    skin_duration: Option<Duration>,
    demographics_duration: Option<Duration>,
    total_duration: Option<Duration>,
}

impl AnalysisMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_locate_duration(&mut self, duration: Duration) {
        self.locate_duration = Some(duration);
    }

    pub fn record_skin_duration(&mut self, duration: Duration) {
        self.skin_duration = Some(duration);
    }

    pub fn record_demographics_duration(&mut self, duration: Duration) {
        self.demographics_duration = Some(duration);
    }

    pub fn record_total_duration(&mut self, duration: Duration) {
        self.total_duration = Some(duration);
    }

    pub fn locate_duration(&self) -> Option<Duration> {
        self.locate_duration
    }

    pub fn skin_duration(&self) -> Option<Duration> {
        self.skin_duration
    }

    pub fn demographics_duration(&self) -> Option<Duration> {
        self.demographics_duration
    }

    pub fn total_duration(&self) -> Option<Duration> {
        self.total_duration
    }
}
