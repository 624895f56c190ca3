use async_trait::async_trait;

use crate::common::FaceCrop;
use crate::error::CapabilityError;
use crate::pipeline::domain::Demographics;

/// Pluggable age/gender classifier for a cropped face.
#[async_trait]
pub trait DemographicEstimator: Send + Sync {
    async fn classify(&self, face: &FaceCrop) -> Result<Demographics, CapabilityError>;
    fn name(&self) -> &'static str;
}

/// Estimator for deployments without a demographic model.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownDemographics;

#[async_trait]
impl DemographicEstimator for UnknownDemographics {
    async fn classify(&self, _face: &FaceCrop) -> Result<Demographics, CapabilityError> {
        Ok(Demographics::unknown())
    }

    fn name(&self) -> &'static str {
        "unknown"
    }
}
