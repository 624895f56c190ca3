//! External capabilities consumed by the pipeline: face location and
//! demographic estimation.
pub mod demographic_estimator;
pub mod face_locator;
pub mod model;

pub use demographic_estimator::{DemographicEstimator, UnknownDemographics};
pub use face_locator::{Detection, FaceLocator, PortraitFaceLocator, StaticFaceLocator};
pub use model::{
    DemographicModel, FaceModel, LazyModel, ModelDemographicEstimator, ModelFaceLocator,
    ModelLoader,
};
