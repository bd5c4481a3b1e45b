use std::collections::HashMap;
use std::path::Path;

use log::debug;

use super::frame::Frame;
use crate::core::pose::PoseError;

/// 视频解码器：打开失败即视为源不可读
pub trait VideoDecoder: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn VideoStream>, PoseError>;
}

/// An opened video. Frames come out in source order; `Ok(None)` is end of stream.
pub trait VideoStream {
    /// Frame rate reported by the container, if any.
    fn frame_rate(&self) -> Option<f64>;

    fn next_frame(&mut self) -> Result<Option<Frame>, PoseError>;
}

/// 测试用片段描述
#[derive(Debug, Clone)]
pub struct MockClip {
    pub frame_rate: Option<f64>,
    pub frame_count: u64,
    pub width: u32,
    pub height: u32,
    /// Decode error raised when this frame index is reached.
    pub corrupt_at: Option<u64>,
}

impl MockClip {
    pub fn new(frame_rate: Option<f64>, frame_count: u64) -> Self {
        Self {
            frame_rate,
            frame_count,
            width: 16,
            height: 16,
            corrupt_at: None,
        }
    }

    pub fn corrupt_at(mut self, frame_index: u64) -> Self {
        self.corrupt_at = Some(frame_index);
        self
    }
}

/// In-memory decoder keyed by file name; unknown names fail to open.
#[derive(Debug, Default)]
pub struct MockVideoDecoder {
    clips: HashMap<String, MockClip>,
}

impl MockVideoDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clip(mut self, file_name: &str, clip: MockClip) -> Self {
        self.clips.insert(file_name.to_string(), clip);
        self
    }
}

impl VideoDecoder for MockVideoDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn VideoStream>, PoseError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let clip = self
            .clips
            .get(&name)
            .ok_or_else(|| PoseError::unreadable(path, "unsupported or corrupt container"))?;

        debug!("MockVideoDecoder: opened {} ({} frames)", name, clip.frame_count);
        Ok(Box::new(MockStream {
            clip: clip.clone(),
            next_index: 0,
        }))
    }
}

struct MockStream {
    clip: MockClip,
    next_index: u64,
}

impl VideoStream for MockStream {
    fn frame_rate(&self) -> Option<f64> {
        self.clip.frame_rate
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, PoseError> {
        let index = self.next_index;
        if index >= self.clip.frame_count {
            return Ok(None);
        }
        if self.clip.corrupt_at == Some(index) {
            return Err(PoseError::Decode(format!("corrupt packet at frame {}", index)));
        }
        self.next_index += 1;

        let fps = self.clip.frame_rate.filter(|f| *f > 0.0).unwrap_or(30.0);
        let timestamp_ms = (index as f64 * 1000.0 / fps).round() as u64;
        let shade = (index % 256) as u8;
        let data = [shade, shade, shade, 255].repeat((self.clip.width * self.clip.height) as usize);

        Ok(Some(Frame::new(
            self.clip.width,
            self.clip.height,
            data,
            timestamp_ms,
            index,
        )))
    }
}
