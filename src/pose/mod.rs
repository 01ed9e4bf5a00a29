pub mod detector;
pub mod keypoint;
pub mod normalize;
pub mod preprocess;

pub use detector::{LandmarkSource, MoveNetDetector, RawJoint, RawPerson};
pub use keypoint::{KeypointIndex, Point2d, Skeleton};
pub use normalize::{normalize, normalize_all, SourceKind, MIN_JOINT_CONFIDENCE};
pub use preprocess::{preprocess_for_multipose, MULTIPOSE_INPUT_SIZE};
