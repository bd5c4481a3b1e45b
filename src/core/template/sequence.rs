use std::path::Path;

use log::debug;

use super::config::ExtractionConfig;
use crate::core::pose::{FrameLandmarks, LandmarkExtractor, PoseDetector, PoseError};
use crate::core::video::{FrameSampler, VideoDecoder, VideoStream};

/// 检测成功的一帧，带源帧序号
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedLandmarks {
    pub frame_index: u64,
    pub timestamp_ms: u64,
    pub landmarks: FrameLandmarks,
}

/// One video's detections in source order. Frames without a detection are
/// absent; `frame_index` shows where the gaps are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSequence {
    pub frames: Vec<TaggedLandmarks>,
    /// Frames submitted to the detector.
    pub sampled_frames: u64,
    pub step: u64,
}

impl RawSequence {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame_indices(&self) -> Vec<u64> {
        self.frames.iter().map(|f| f.frame_index).collect()
    }

    /// Sampled frames the detector found nothing in.
    pub fn dropped_frames(&self) -> u64 {
        self.sampled_frames.saturating_sub(self.frames.len() as u64)
    }
}

pub struct SequenceBuilder {
    sampler: FrameSampler,
}

impl SequenceBuilder {
    pub fn new(sampler: FrameSampler) -> Self {
        Self { sampler }
    }

    pub fn sampler(&self) -> &FrameSampler {
        &self.sampler
    }

    /// Drain `stream`, running the extractor on every sampled frame.
    pub fn build(
        &self,
        stream: &mut dyn VideoStream,
        extractor: &mut LandmarkExtractor<'_>,
    ) -> Result<RawSequence, PoseError> {
        let mut sequence = RawSequence {
            step: self.sampler.step(),
            ..Default::default()
        };

        while let Some(frame) = stream.next_frame()? {
            if !self.sampler.should_sample(frame.frame_number) {
                continue;
            }
            sequence.sampled_frames += 1;

            if let Some(landmarks) = extractor.extract(&frame)? {
                sequence.frames.push(TaggedLandmarks {
                    frame_index: frame.frame_number,
                    timestamp_ms: frame.timestamp.as_millis() as u64,
                    landmarks,
                });
            }
        }

        Ok(sequence)
    }
}

/// 打开视频 → 采样 → 检测，得到原始关键点序列
pub fn extract_sequence(
    path: &Path,
    decoder: &dyn VideoDecoder,
    detector: &dyn PoseDetector,
    config: &ExtractionConfig,
) -> Result<RawSequence, PoseError> {
    let mut stream = decoder.open(path)?;

    let sampler = FrameSampler::with_fallback(
        stream.frame_rate(),
        config.sample_fps,
        config.fallback_fps,
    );
    debug!(
        "{:?}: source {:.2} fps, sampling every {} frame(s)",
        path,
        sampler.source_fps(),
        sampler.step()
    );

    let mut extractor = LandmarkExtractor::open(detector, &config.detector)?;
    let sequence = SequenceBuilder::new(sampler).build(stream.as_mut(), &mut extractor)?;

    debug!(
        "{:?}: {} of {} sampled frames with a pose",
        path,
        sequence.len(),
        sequence.sampled_frames
    );
    Ok(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pose::{DetectorOptions, MockPoseDetector};
    use crate::core::video::{MockClip, MockVideoDecoder};

    #[test]
    fn test_build_skips_undetected_frames() {
        let decoder = MockVideoDecoder::new().with_clip("clip.mp4", MockClip::new(Some(30.0), 10));
        let detector = MockPoseDetector::with_pattern(|n| n != 4);
        let mut stream = decoder.open(Path::new("clip.mp4")).unwrap();
        let mut extractor =
            LandmarkExtractor::open(&detector, &DetectorOptions::default()).unwrap();

        let builder = SequenceBuilder::new(FrameSampler::new(Some(30.0), 15.0));
        let sequence = builder.build(stream.as_mut(), &mut extractor).unwrap();

        assert_eq!(sequence.sampled_frames, 5);
        assert_eq!(sequence.frame_indices(), vec![0, 2, 6, 8]);
        assert_eq!(sequence.dropped_frames(), 1);
        assert_eq!(sequence.step, 2);
        assert_eq!(extractor.calls(), 5);
    }

    #[test]
    fn test_extract_sequence_scenario_full_detection() {
        let decoder = MockVideoDecoder::new().with_clip("kick.mp4", MockClip::new(Some(30.0), 90));
        let detector = MockPoseDetector::always();

        let sequence = extract_sequence(
            Path::new("kick.mp4"),
            &decoder,
            &detector,
            &ExtractionConfig::default(),
        )
        .unwrap();

        assert_eq!(sequence.len(), 45);
        assert_eq!(sequence.frames[1].frame_index, 2);
        assert_eq!(sequence.frames[1].timestamp_ms, 67);
        assert_eq!(detector.active_sessions(), 0);
    }

    #[test]
    fn test_extract_sequence_no_person_is_empty() {
        let decoder = MockVideoDecoder::new().with_clip("empty.mp4", MockClip::new(Some(30.0), 20));
        let detector = MockPoseDetector::new();

        let sequence = extract_sequence(
            Path::new("empty.mp4"),
            &decoder,
            &detector,
            &ExtractionConfig::default(),
        )
        .unwrap();

        assert!(sequence.is_empty());
        assert_eq!(sequence.sampled_frames, 10);
        assert_eq!(detector.sessions_started(), 1);
        assert_eq!(detector.active_sessions(), 0);
    }

    #[test]
    fn test_unreadable_source_never_opens_detector() {
        let decoder = MockVideoDecoder::new();
        let detector = MockPoseDetector::always();

        let err = extract_sequence(
            Path::new("corrupt.mp4"),
            &decoder,
            &detector,
            &ExtractionConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(err, PoseError::SourceUnreadable { .. }));
        assert_eq!(detector.sessions_started(), 0);
    }

    #[test]
    fn test_mid_stream_failures_release_session() {
        let decoder = MockVideoDecoder::new()
            .with_clip("bad.mp4", MockClip::new(Some(30.0), 30).corrupt_at(12));
        let detector = MockPoseDetector::always();
        let config = ExtractionConfig::default();

        let err = extract_sequence(Path::new("bad.mp4"), &decoder, &detector, &config).unwrap_err();
        assert!(matches!(err, PoseError::Decode(_)));
        assert_eq!(detector.active_sessions(), 0);

        let decoder = MockVideoDecoder::new().with_clip("ok.mp4", MockClip::new(Some(30.0), 30));
        let detector = MockPoseDetector::always().failing_at(6);
        let err = extract_sequence(Path::new("ok.mp4"), &decoder, &detector, &config).unwrap_err();
        assert!(matches!(err, PoseError::Detector(_)));
        assert_eq!(detector.sessions_started(), 1);
        assert_eq!(detector.active_sessions(), 0);
    }

    #[test]
    fn test_missing_frame_rate_uses_fallback() {
        let decoder = MockVideoDecoder::new().with_clip("norate.mp4", MockClip::new(None, 12));
        let detector = MockPoseDetector::always();

        let sequence = extract_sequence(
            Path::new("norate.mp4"),
            &decoder,
            &detector,
            &ExtractionConfig::default(),
        )
        .unwrap();

        assert_eq!(sequence.step, 2);
        assert_eq!(sequence.len(), 6);
    }
}
