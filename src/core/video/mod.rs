pub mod decoder;
pub mod frame;
pub mod gif;
pub mod sampler;

pub use decoder::{MockClip, MockVideoDecoder, VideoDecoder, VideoStream};
pub use frame::Frame;
pub use gif::GifVideoDecoder;
pub use sampler::{FrameSampler, DEFAULT_SAMPLE_FPS, DEFAULT_SOURCE_FPS};
