pub mod crop;
pub mod estimator;
pub mod landmark;
pub mod preprocess;
pub mod smoothing;
pub mod tracking;

pub use crop::{bbox_from_landmarks, crop_frame, region_for_bbox, remap_pose, BBox, CropRegion};
pub use estimator::{decode_landmarks, BlazePoseEstimator, PoseEstimator};
pub use landmark::{Landmark, LandmarkIndex, PoseLandmarks};
pub use preprocess::{preprocess_for_blazepose, BLAZEPOSE_INPUT_SIZE};
pub use smoothing::LandmarkSmoother;
pub use tracking::{PoseTracker, TrackingSettings};
