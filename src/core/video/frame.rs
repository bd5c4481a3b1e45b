use std::time::Duration;

use image::{RgbImage, RgbaImage};

use crate::core::pose::PoseError;

/// 解码后的视频帧
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGBA 格式
    pub timestamp: Duration,
    /// 在源视频中的帧序号（从 0 开始）
    pub frame_number: u64,
}

impl Frame {
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Self {
        Self {
            width,
            height,
            data,
            timestamp: Duration::from_millis(timestamp_ms),
            frame_number,
        }
    }

    pub fn from_rgba(image: RgbaImage, timestamp_ms: u64, frame_number: u64) -> Self {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw(), timestamp_ms, frame_number)
    }

    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    /// Drop the alpha channel, giving the RGB order pose models expect.
    pub fn to_rgb(&self) -> Result<RgbImage, PoseError> {
        if self.data.len() != self.pixel_count() * 4 {
            return Err(PoseError::Decode(format!(
                "frame {} has {} bytes, expected {} for {}x{} RGBA",
                self.frame_number,
                self.data.len(),
                self.pixel_count() * 4,
                self.width,
                self.height
            )));
        }

        let mut rgb = Vec::with_capacity(self.pixel_count() * 3);
        for chunk in self.data.chunks_exact(4) {
            rgb.push(chunk[0]); // R
            rgb.push(chunk[1]); // G
            rgb.push(chunk[2]); // B
        }

        RgbImage::from_raw(self.width, self.height, rgb)
            .ok_or_else(|| {
                PoseError::Decode(format!("frame {}: invalid buffer", self.frame_number))
            })
    }
}
