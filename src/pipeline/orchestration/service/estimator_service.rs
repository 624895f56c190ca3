use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::timeout::TimeoutLayer;
use tower::{BoxError, Service, ServiceBuilder, ServiceExt};

use super::into_capability_error;
use crate::capability::DemographicEstimator;
use crate::common::FaceCrop;
use crate::error::CapabilityError;
use crate::pipeline::domain::Demographics;

#[derive(Clone)]
pub struct EstimatorService {
    inner: Arc<dyn DemographicEstimator>,
}

impl EstimatorService {
    pub fn new(inner: Arc<dyn DemographicEstimator>) -> Self {
        Self { inner }
    }
}

impl Service<Arc<FaceCrop>> for EstimatorService {
    type Response = Demographics;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, face: Arc<FaceCrop>) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move { inner.classify(&face).await.map_err(BoxError::from) })
    }
}

pub async fn estimate_with_deadline(
    estimator: Arc<dyn DemographicEstimator>,
    face: Arc<FaceCrop>,
    deadline: Option<Duration>,
) -> Result<Demographics, CapabilityError> {
    ServiceBuilder::new()
        .option_layer(deadline.map(TimeoutLayer::new))
        .service(EstimatorService::new(estimator))
        .oneshot(face)
        .await
        .map_err(|e| into_capability_error(e, deadline))
}
