//! Animated GIF clips via the `image` crate, decoded lazily frame by frame.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, Frames};
use log::debug;

use super::decoder::{VideoDecoder, VideoStream};
use super::frame::Frame;
use crate::core::pose::PoseError;

#[derive(Debug, Default, Clone, Copy)]
pub struct GifVideoDecoder;

impl GifVideoDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl VideoDecoder for GifVideoDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn VideoStream>, PoseError> {
        if !path.is_file() {
            return Err(PoseError::unreadable(path, "not a regular file"));
        }

        let file = File::open(path).map_err(|e| PoseError::unreadable(path, e))?;
        let decoder =
            GifDecoder::new(BufReader::new(file)).map_err(|e| PoseError::unreadable(path, e))?;
        let mut frames = decoder.into_frames();

        // 帧率取自首帧的延时；延时为 0 时视为未知
        let first = match frames.next() {
            Some(frame) => Some(frame.map_err(|e| PoseError::unreadable(path, e))?),
            None => None,
        };
        let frame_rate = first.as_ref().and_then(|f| delay_to_fps(f.delay()));

        debug!("🎞️ GifVideoDecoder: opened {:?} (fps={:?})", path, frame_rate);
        Ok(Box::new(GifStream {
            frames,
            pending: first,
            frame_rate,
            next_index: 0,
            elapsed_ms: 0.0,
        }))
    }
}

fn delay_to_fps(delay: image::Delay) -> Option<f64> {
    let (numer, denom) = delay.numer_denom_ms();
    if numer == 0 || denom == 0 {
        return None;
    }
    Some(1000.0 * denom as f64 / numer as f64)
}

struct GifStream {
    frames: Frames<'static>,
    pending: Option<image::Frame>,
    frame_rate: Option<f64>,
    next_index: u64,
    elapsed_ms: f64,
}

impl VideoStream for GifStream {
    fn frame_rate(&self) -> Option<f64> {
        self.frame_rate
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, PoseError> {
        let frame = match self.pending.take() {
            Some(frame) => frame,
            None => match self.frames.next() {
                Some(frame) => frame.map_err(|e| PoseError::Decode(e.to_string()))?,
                None => return Ok(None),
            },
        };

        let (numer, denom) = frame.delay().numer_denom_ms();
        let timestamp_ms = self.elapsed_ms.round() as u64;
        if denom > 0 {
            self.elapsed_ms += numer as f64 / denom as f64;
        }

        let index = self.next_index;
        self.next_index += 1;
        Ok(Some(Frame::from_rgba(frame.into_buffer(), timestamp_ms, index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Rgba, RgbaImage};

    fn write_gif(path: &Path, frame_count: u32, delay_ms: u32) {
        let mut buf = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut buf);
            let frames = (0..frame_count).map(|i| {
                let shade = (i * 20 % 256) as u8;
                image::Frame::from_parts(
                    RgbaImage::from_pixel(8, 8, Rgba([shade, 0, 0, 255])),
                    0,
                    0,
                    Delay::from_numer_denom_ms(delay_ms, 1),
                )
            });
            encoder.encode_frames(frames).unwrap();
        }
        std::fs::write(path, buf).unwrap();
    }

    #[test]
    fn test_gif_frame_rate_and_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.gif");
        write_gif(&path, 6, 50);

        let mut stream = GifVideoDecoder::new().open(&path).unwrap();
        let fps = stream.frame_rate().unwrap();
        assert!((fps - 20.0).abs() < 1e-6);

        let mut count = 0;
        let mut last_ts = 0;
        while let Some(frame) = stream.next_frame().unwrap() {
            assert_eq!(frame.frame_number, count);
            assert_eq!((frame.width, frame.height), (8, 8));
            last_ts = frame.timestamp.as_millis();
            count += 1;
        }
        assert_eq!(count, 6);
        assert_eq!(last_ts, 250);
    }

    #[test]
    fn test_gif_zero_delay_has_no_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.gif");
        write_gif(&path, 2, 0);

        let stream = GifVideoDecoder::new().open(&path).unwrap();
        assert_eq!(stream.frame_rate(), None);
    }

    #[test]
    fn test_gif_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.gif");
        std::fs::write(&path, b"definitely not a gif").unwrap();

        let err = GifVideoDecoder::new().open(&path).err().unwrap();
        assert!(matches!(err, PoseError::SourceUnreadable { .. }));
    }

    #[test]
    fn test_gif_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = GifVideoDecoder::new().open(dir.path()).err().unwrap();
        assert!(matches!(err, PoseError::SourceUnreadable { .. }));
    }
}
