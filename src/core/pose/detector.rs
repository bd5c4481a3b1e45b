use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::RgbImage;
use log::debug;
use serde::Deserialize;

use super::error::PoseError;
use super::landmark::{
    FrameLandmarks, Landmark, LANDMARK_COUNT, LEFT_ANKLE, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER,
    NOSE, RIGHT_ANKLE, RIGHT_HIP, RIGHT_KNEE, RIGHT_SHOULDER,
};

/// 检测器初始化参数
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorOptions {
    pub model_complexity: u8,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            model_complexity: 1,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

/// One sampled frame as the detector sees it (RGB channel order).
pub struct DetectorInput<'a> {
    pub image: &'a RgbImage,
    pub frame_number: u64,
    pub timestamp_ms: u64,
}

/// Heavyweight pose model. Sessions are scoped to a single video.
pub trait PoseDetector: Send + Sync {
    fn start_session(
        &self,
        options: &DetectorOptions,
    ) -> Result<Box<dyn PoseSession + '_>, PoseError>;
}

/// Warm detector context. Dropping it releases the underlying resources.
pub trait PoseSession {
    fn detect(&mut self, input: &DetectorInput<'_>) -> Result<Option<FrameLandmarks>, PoseError>;
}

type PoseFn = Box<dyn Fn(u64) -> Option<FrameLandmarks> + Send + Sync>;

pub struct MockPoseDetector {
    // 按帧号生成姿态
    pose_fn: Option<PoseFn>,
    fail_at: Option<u64>,
    started: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
}

impl MockPoseDetector {
    /// Never finds a person.
    pub fn new() -> Self {
        Self {
            pose_fn: None,
            fail_at: None,
            started: Arc::new(AtomicUsize::new(0)),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(u64) -> bool + Send + Sync + 'static,
    {
        Self::with_generator(move |n| pattern(n).then(|| synthetic_pose(0.5, 0.6, 0.2)))
    }

    pub fn with_generator<F>(generator: F) -> Self
    where
        F: Fn(u64) -> Option<FrameLandmarks> + Send + Sync + 'static,
    {
        Self {
            pose_fn: Some(Box::new(generator)),
            ..Self::new()
        }
    }

    pub fn with_fixed_frames(frames: Vec<u64>) -> Self {
        Self::with_pattern(move |frame_num| frames.contains(&frame_num))
    }

    pub fn always() -> Self {
        Self::with_pattern(|_| true)
    }

    /// Make the session error out when it reaches `frame_number`.
    pub fn failing_at(mut self, frame_number: u64) -> Self {
        self.fail_at = Some(frame_number);
        self
    }

    pub fn sessions_started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for MockPoseDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseDetector for MockPoseDetector {
    fn start_session(
        &self,
        options: &DetectorOptions,
    ) -> Result<Box<dyn PoseSession + '_>, PoseError> {
        debug!(
            "MockPoseDetector: session start (complexity={}, min_conf={})",
            options.model_complexity, options.min_detection_confidence
        );
        self.started.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession { detector: self }))
    }
}

struct MockSession<'a> {
    detector: &'a MockPoseDetector,
}

impl PoseSession for MockSession<'_> {
    fn detect(&mut self, input: &DetectorInput<'_>) -> Result<Option<FrameLandmarks>, PoseError> {
        if self.detector.fail_at == Some(input.frame_number) {
            return Err(PoseError::Detector(format!(
                "mock failure at frame {}",
                input.frame_number
            )));
        }
        Ok(self
            .detector
            .pose_fn
            .as_ref()
            .and_then(|f| f(input.frame_number)))
    }
}

impl Drop for MockSession<'_> {
    fn drop(&mut self) {
        self.detector.active.fetch_sub(1, Ordering::SeqCst);
        debug!("MockPoseDetector: session released");
    }
}

/// Upright figure with its mid-hip at (`hip_x`, `hip_y`) and the given shoulder width,
/// in normalized image coordinates.
pub fn synthetic_pose(hip_x: f32, hip_y: f32, shoulder_width: f32) -> FrameLandmarks {
    let half = shoulder_width / 2.0;
    let torso = shoulder_width * 1.5;
    let mut points = [Landmark::new(hip_x, hip_y - torso / 2.0, 0.5); LANDMARK_COUNT];

    points[NOSE] = Landmark::new(hip_x, hip_y - torso * 1.4, 0.99);
    points[LEFT_SHOULDER] = Landmark::new(hip_x + half, hip_y - torso, 0.98);
    points[RIGHT_SHOULDER] = Landmark::new(hip_x - half, hip_y - torso, 0.98);
    points[LEFT_HIP] = Landmark::new(hip_x + half * 0.7, hip_y, 0.95);
    points[RIGHT_HIP] = Landmark::new(hip_x - half * 0.7, hip_y, 0.95);
    points[LEFT_KNEE] = Landmark::new(hip_x + half * 0.7, hip_y + torso * 0.8, 0.9);
    points[RIGHT_KNEE] = Landmark::new(hip_x - half * 0.7, hip_y + torso * 0.8, 0.9);
    points[LEFT_ANKLE] = Landmark::new(hip_x + half * 0.7, hip_y + torso * 1.6, 0.85);
    points[RIGHT_ANKLE] = Landmark::new(hip_x - half * 0.7, hip_y + torso * 1.6, 0.85);

    FrameLandmarks::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(image: &RgbImage, frame_number: u64) -> DetectorInput<'_> {
        DetectorInput {
            image,
            frame_number,
            timestamp_ms: frame_number * 33,
        }
    }

    #[test]
    fn test_mock_pattern() {
        let detector = MockPoseDetector::with_pattern(|n| n % 2 == 0);
        let image = RgbImage::new(4, 4);
        let mut session = detector.start_session(&DetectorOptions::default()).unwrap();

        assert!(session.detect(&input(&image, 0)).unwrap().is_some());
        assert!(session.detect(&input(&image, 1)).unwrap().is_none());
    }

    #[test]
    fn test_mock_tracks_session_lifetime() {
        let detector = MockPoseDetector::always();
        {
            let _session = detector.start_session(&DetectorOptions::default()).unwrap();
            assert_eq!(detector.active_sessions(), 1);
        }
        assert_eq!(detector.active_sessions(), 0);
        assert_eq!(detector.sessions_started(), 1);
    }

    #[test]
    fn test_mock_failure() {
        let detector = MockPoseDetector::always().failing_at(3);
        let image = RgbImage::new(4, 4);
        let mut session = detector.start_session(&DetectorOptions::default()).unwrap();

        assert!(session.detect(&input(&image, 2)).is_ok());
        assert!(matches!(
            session.detect(&input(&image, 3)),
            Err(PoseError::Detector(_))
        ));
    }

    #[test]
    fn test_synthetic_pose_geometry() {
        let pose = synthetic_pose(0.5, 0.6, 0.2);
        let ls = pose.get(LEFT_SHOULDER).unwrap();
        let rs = pose.get(RIGHT_SHOULDER).unwrap();
        let lh = pose.get(LEFT_HIP).unwrap();
        let rh = pose.get(RIGHT_HIP).unwrap();

        assert!(((ls.x - rs.x).abs() - 0.2).abs() < 1e-6);
        assert!(((lh.x + rh.x) / 2.0 - 0.5).abs() < 1e-6);
        assert!(((lh.y + rh.y) / 2.0 - 0.6).abs() < 1e-6);
    }
}
