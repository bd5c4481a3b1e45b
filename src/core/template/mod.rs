//! 动作模板提取 - 采样序列 → 归一化 → 归档
//!
//! 流程：
//! 1. 按目标帧率采样并逐帧检测关键点（未检测到的帧直接跳过，保留源帧序号）
//! 2. 逐帧归一化：髋部中点为原点，肩宽为单位
//! 3. 按文件名排序批量处理目录，成功的序列写入同一个 `.npz` 归档

pub mod archive;
pub mod archiver;
pub mod config;
pub mod normalizer;
pub mod npy;
pub mod sequence;

pub use archive::{Manifest, ManifestEntry, StoredTemplate, TemplateArchive, TemplateEntry};
pub use archiver::{BatchOutcome, BatchReport, FileFailure, TemplateArchiver};
pub use config::ExtractionConfig;
pub use normalizer::{
    normalize_points, normalize_sequence, NormalizedFrame, NormalizedSequence, MIN_SHOULDER_WIDTH,
};
pub use sequence::{extract_sequence, RawSequence, SequenceBuilder, TaggedLandmarks};
