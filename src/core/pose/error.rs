use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot open {path:?}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },
    #[error("Frame decode failed: {0}")]
    Decode(String),
    #[error("Pose detector error: {0}")]
    Detector(String),
    #[error("Expected 33 landmarks, got {0}")]
    InvalidLandmarkCount(usize),
    #[error("Archive error: {0}")]
    Archive(String),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl PoseError {
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PoseError::SourceUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
