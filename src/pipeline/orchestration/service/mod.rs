pub mod estimator_service;
pub mod locator_service;

pub use estimator_service::{estimate_with_deadline, EstimatorService};
pub use locator_service::{locate_with_deadline, LocatorService};

use std::time::Duration;
use tower::BoxError;
use tower::timeout::error::Elapsed;

use crate::error::CapabilityError;

/// Recover the adapter error from a tower stack, turning an elapsed deadline
/// into [`CapabilityError::TimedOut`].
pub(crate) fn into_capability_error(error: BoxError, deadline: Option<Duration>) -> CapabilityError {
    if error.is::<Elapsed>() {
        return CapabilityError::TimedOut(deadline.unwrap_or_default());
    }
    match error.downcast::<CapabilityError>() {
        Ok(error) => *error,
        Err(error) => CapabilityError::Inference(error.to_string()),
    }
}
