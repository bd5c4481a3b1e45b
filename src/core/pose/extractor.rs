use log::debug;

use super::detector::{DetectorInput, DetectorOptions, PoseDetector, PoseSession};
use super::error::PoseError;
use super::landmark::FrameLandmarks;
use crate::core::video::Frame;

/// 单个视频的关键点提取器
///
/// Holds one warm detector session for the whole video. The session is
/// released when the extractor goes out of scope, whichever way the
/// sampling loop exits.
pub struct LandmarkExtractor<'d> {
    session: Box<dyn PoseSession + 'd>,
    calls: u64,
    detections: u64,
}

impl<'d> LandmarkExtractor<'d> {
    pub fn open(
        detector: &'d dyn PoseDetector,
        options: &DetectorOptions,
    ) -> Result<Self, PoseError> {
        let session = detector.start_session(options)?;
        debug!("🦴 LandmarkExtractor: detector session acquired");
        Ok(Self {
            session,
            calls: 0,
            detections: 0,
        })
    }

    /// Run the detector once on `frame`. `Ok(None)` means no person was found.
    pub fn extract(&mut self, frame: &Frame) -> Result<Option<FrameLandmarks>, PoseError> {
        let rgb = frame.to_rgb()?;
        let input = DetectorInput {
            image: &rgb,
            frame_number: frame.frame_number,
            timestamp_ms: frame.timestamp.as_millis() as u64,
        };

        self.calls += 1;
        let result = self.session.detect(&input)?;
        if result.is_some() {
            self.detections += 1;
        }
        Ok(result)
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }

    pub fn detections(&self) -> u64 {
        self.detections
    }
}

impl Drop for LandmarkExtractor<'_> {
    fn drop(&mut self) {
        debug!(
            "🗑️ LandmarkExtractor: releasing session ({}/{} frames detected)",
            self.detections, self.calls
        );
    }
}
