/// 源帧率缺失时的默认值
pub const DEFAULT_SOURCE_FPS: f64 = 30.0;
pub const DEFAULT_SAMPLE_FPS: f64 = 15.0;

/// 按目标帧率降采样：每 `step` 帧保留一帧
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSampler {
    source_fps: f64,
    step: u64,
}

impl FrameSampler {
    pub fn new(source_fps: Option<f64>, target_fps: f64) -> Self {
        Self::with_fallback(source_fps, target_fps, DEFAULT_SOURCE_FPS)
    }

    pub fn with_fallback(source_fps: Option<f64>, target_fps: f64, fallback_fps: f64) -> Self {
        let source_fps = source_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .unwrap_or(fallback_fps);

        let ratio = source_fps / target_fps;
        // ties go to even, so 37.5 fps -> 15 fps samples every 2nd frame
        let step = if ratio.is_finite() && ratio >= 1.0 {
            ratio.round_ties_even() as u64
        } else {
            1
        };

        Self {
            source_fps,
            step: step.max(1),
        }
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    /// Source rate actually used, after the fallback.
    pub fn source_fps(&self) -> f64 {
        self.source_fps
    }

    pub fn should_sample(&self, frame_index: u64) -> bool {
        frame_index % self.step == 0
    }

    pub fn expected_samples(&self, total_frames: u64) -> u64 {
        total_frames.div_ceil(self.step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_from_rates() {
        assert_eq!(FrameSampler::new(Some(30.0), 15.0).step(), 2);
        assert_eq!(FrameSampler::new(Some(60.0), 15.0).step(), 4);
        assert_eq!(FrameSampler::new(Some(25.0), 15.0).step(), 2);
        assert_eq!(FrameSampler::new(Some(24.0), 15.0).step(), 2);
        assert_eq!(FrameSampler::new(Some(20.0), 15.0).step(), 1);
    }

    #[test]
    fn test_missing_source_rate_falls_back() {
        for source in [None, Some(0.0), Some(-5.0), Some(f64::NAN)] {
            let sampler = FrameSampler::new(source, 15.0);
            assert_eq!(sampler.source_fps(), DEFAULT_SOURCE_FPS);
            assert_eq!(sampler.step(), 2);
        }
    }

    #[test]
    fn test_step_positive_over_rate_grid() {
        for src in 1..=240 {
            for target in 1..=240 {
                let sampler = FrameSampler::new(Some(src as f64), target as f64);
                assert!(sampler.step() >= 1);
                if target >= src {
                    assert_eq!(sampler.step(), 1, "src={} target={}", src, target);
                }
            }
        }
    }

    #[test]
    fn test_fractional_rates() {
        let sampler = FrameSampler::new(Some(29.97), 14.5);
        assert_eq!(sampler.step(), 2);
        let sampler = FrameSampler::new(Some(0.5), 0.25);
        assert_eq!(sampler.step(), 2);
    }

    #[test]
    fn test_half_ratio_rounds_to_even() {
        assert_eq!(FrameSampler::new(Some(37.5), 15.0).step(), 2);
        assert_eq!(FrameSampler::new(Some(52.5), 15.0).step(), 4);
    }

    #[test]
    fn test_should_sample() {
        let sampler = FrameSampler::new(Some(60.0), 15.0);
        let kept: Vec<u64> = (0..10).filter(|&i| sampler.should_sample(i)).collect();
        assert_eq!(kept, vec![0, 4, 8]);
    }

    #[test]
    fn test_expected_samples() {
        let sampler = FrameSampler::new(Some(30.0), 15.0);
        assert_eq!(sampler.expected_samples(90), 45);
        assert_eq!(sampler.expected_samples(91), 46);
        assert_eq!(sampler.expected_samples(1), 1);
        assert_eq!(sampler.expected_samples(0), 0);
    }
}
