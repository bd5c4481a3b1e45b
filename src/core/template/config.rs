use std::path::Path;

use serde::Deserialize;

use crate::core::pose::{DetectorOptions, PoseError};
use crate::core::video::{DEFAULT_SAMPLE_FPS, DEFAULT_SOURCE_FPS};

/// 模板提取参数
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// 目标采样帧率
    pub sample_fps: f64,
    /// 源视频未报告帧率时使用
    pub fallback_fps: f64,
    pub detector: DetectorOptions,
    /// Deflate level for the archive (0-9).
    pub compression_level: i32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            sample_fps: DEFAULT_SAMPLE_FPS,
            fallback_fps: DEFAULT_SOURCE_FPS,
            detector: DetectorOptions::default(),
            compression_level: 6,
        }
    }
}

impl ExtractionConfig {
    pub fn with_sample_fps(mut self, sample_fps: f64) -> Self {
        self.sample_fps = sample_fps;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, PoseError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PoseError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), PoseError> {
        if !(self.sample_fps.is_finite() && self.sample_fps > 0.0) {
            return Err(PoseError::InvalidConfig(format!(
                "sample_fps must be positive, got {}",
                self.sample_fps
            )));
        }
        if !(self.fallback_fps.is_finite() && self.fallback_fps > 0.0) {
            return Err(PoseError::InvalidConfig(format!(
                "fallback_fps must be positive, got {}",
                self.fallback_fps
            )));
        }
        if !(0..=9).contains(&self.compression_level) {
            return Err(PoseError::InvalidConfig(format!(
                "compression_level must be 0-9, got {}",
                self.compression_level
            )));
        }
        let confidences = [
            ("min_detection_confidence", self.detector.min_detection_confidence),
            ("min_tracking_confidence", self.detector.min_tracking_confidence),
        ];
        for (name, conf) in confidences {
            if !(0.0..=1.0).contains(&conf) {
                return Err(PoseError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, conf
                )));
            }
        }
        Ok(())
    }
}
