use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::timeout::TimeoutLayer;
use tower::{BoxError, Service, ServiceBuilder, ServiceExt};

use super::into_capability_error;
use crate::capability::{Detection, FaceLocator};
use crate::common::RawImage;
use crate::error::CapabilityError;

#[derive(Clone)]
pub struct LocatorService {
    inner: Arc<dyn FaceLocator>,
}

impl LocatorService {
    pub fn new(inner: Arc<dyn FaceLocator>) -> Self {
        Self { inner }
    }
}

impl Service<RawImage> for LocatorService {
    type Response = Vec<Detection>;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, image: RawImage) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move { inner.detect(&image).await.map_err(BoxError::from) })
    }
}

/// Run the locator once, bounded by `deadline` when one is set.
pub async fn locate_with_deadline(
    locator: Arc<dyn FaceLocator>,
    image: RawImage,
    deadline: Option<Duration>,
) -> Result<Vec<Detection>, CapabilityError> {
    ServiceBuilder::new()
        .option_layer(deadline.map(TimeoutLayer::new))
        .service(LocatorService::new(locator))
        .oneshot(image)
        .await
        .map_err(|e| into_capability_error(e, deadline))
}
