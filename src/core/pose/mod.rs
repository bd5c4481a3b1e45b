//! 人体关键点 - 检测器接口与单视频提取适配

pub mod detector;
pub mod error;
pub mod extractor;
pub mod landmark;

pub use detector::{
    synthetic_pose, DetectorInput, DetectorOptions, MockPoseDetector, PoseDetector, PoseSession,
};
pub use error::PoseError;
pub use extractor::LandmarkExtractor;
pub use landmark::{FrameLandmarks, Landmark, LANDMARK_COUNT};
