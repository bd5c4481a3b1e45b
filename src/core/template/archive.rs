//! 模板归档：`.npz` 兼容的 zip 容器
//!
//! One `<key>.npy` member per template, `(frames, 33, 2)` little-endian f32,
//! stored in archive order, plus `manifest.json` carrying the order, the
//! source file names and the source frame index of every stored frame.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::normalizer::{NormalizedSequence, Points};
use super::npy;
use crate::core::pose::{PoseError, LANDMARK_COUNT};

pub const MANIFEST_NAME: &str = "manifest.json";
const MANIFEST_VERSION: u32 = 1;
const NPY_SUFFIX: &str = ".npy";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub key: String,
    pub frames: usize,
    pub frame_indices: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateEntry {
    pub key: String,
    pub sequence: NormalizedSequence,
}

/// 批处理期间只追加，结束时一次写出
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateArchive {
    entries: Vec<TemplateEntry>,
}

impl TemplateArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        key: impl Into<String>,
        sequence: NormalizedSequence,
    ) -> Result<(), PoseError> {
        let key = key.into();
        if self.entries.iter().any(|e| e.key == key) {
            return Err(PoseError::Archive(format!("duplicate template key '{}'", key)));
        }
        self.entries.push(TemplateEntry { key, sequence });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TemplateEntry] {
        &self.entries
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.key.as_str()).collect()
    }

    pub fn manifest(&self) -> Manifest {
        Manifest {
            version: MANIFEST_VERSION,
            entries: self
                .entries
                .iter()
                .map(|e| ManifestEntry {
                    key: e.key.clone(),
                    frames: e.sequence.len(),
                    frame_indices: e.sequence.frame_indices(),
                })
                .collect(),
        }
    }

    /// Write the archive to `path`, creating parent directories as needed.
    /// The file only appears under its final name once fully written.
    pub fn write(&self, path: &Path, compression_level: i32) -> Result<(), PoseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let partial = partial_path(path);
        let result = self.write_zip(&partial, compression_level);
        if let Err(e) = result {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
        fs::rename(&partial, path)?;

        info!("💾 Saved {} templates -> {}", self.entries.len(), path.display());
        Ok(())
    }

    fn write_zip(&self, path: &Path, compression_level: i32) -> Result<(), PoseError> {
        let file = File::create(path)?;
        let mut writer = ZipWriter::new(file);
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(compression_level));

        for entry in &self.entries {
            let bytes = npy::encode_f32(&entry.sequence.shape(), &entry.sequence.flatten())?;
            writer.start_file(format!("{}{}", entry.key, NPY_SUFFIX), options)?;
            writer.write_all(&bytes)?;
            debug!("archived {} {:?}", entry.key, entry.sequence.shape());
        }

        writer.start_file(MANIFEST_NAME, options)?;
        serde_json::to_writer_pretty(&mut writer, &self.manifest())?;

        writer.finish()?;
        Ok(())
    }

    /// Read an archive back in stored order.
    pub fn load(path: &Path) -> Result<Vec<StoredTemplate>, PoseError> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)?;

        let manifest = match archive.by_name(MANIFEST_NAME) {
            Ok(mut member) => {
                let mut json = String::new();
                member.read_to_string(&mut json)?;
                Some(serde_json::from_str::<Manifest>(&json)?)
            }
            Err(ZipError::FileNotFound) => None,
            Err(e) => return Err(e.into()),
        };

        let keys: Vec<String> = match &manifest {
            Some(m) => m.entries.iter().map(|e| e.key.clone()).collect(),
            None => {
                let mut keys = Vec::new();
                for i in 0..archive.len() {
                    let member = archive.by_index(i)?;
                    if let Some(key) = member.name().strip_suffix(NPY_SUFFIX) {
                        keys.push(key.to_string());
                    }
                }
                keys
            }
        };

        let mut templates = Vec::with_capacity(keys.len());
        for (i, key) in keys.into_iter().enumerate() {
            let mut bytes = Vec::new();
            archive
                .by_name(&format!("{}{}", key, NPY_SUFFIX))?
                .read_to_end(&mut bytes)?;

            let (shape, data) = npy::decode_f32(&bytes)?;
            let frames = to_points(&key, &shape, &data)?;

            let frame_indices = match &manifest {
                Some(m) => m.entries[i].frame_indices.clone(),
                None => (0..frames.len() as u64).collect(),
            };
            if frame_indices.len() != frames.len() {
                return Err(PoseError::Archive(format!(
                    "{}: manifest lists {} frames, array has {}",
                    key,
                    frame_indices.len(),
                    frames.len()
                )));
            }

            templates.push(StoredTemplate {
                key,
                frame_indices,
                frames,
            });
        }

        Ok(templates)
    }
}

/// A template as read back from disk (positions only).
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTemplate {
    pub key: String,
    pub frame_indices: Vec<u64>,
    pub frames: Vec<Points>,
}

fn to_points(key: &str, shape: &[usize], data: &[f32]) -> Result<Vec<Points>, PoseError> {
    if shape.len() != 3 || shape[1] != LANDMARK_COUNT || shape[2] != 2 {
        return Err(PoseError::Archive(format!(
            "{}: expected shape (n, {}, 2), got {:?}",
            key, LANDMARK_COUNT, shape
        )));
    }

    let frames = data
        .chunks_exact(LANDMARK_COUNT * 2)
        .map(|chunk| {
            let mut points = [[0.0f32; 2]; LANDMARK_COUNT];
            for (point, xy) in points.iter_mut().zip(chunk.chunks_exact(2)) {
                *point = [xy[0], xy[1]];
            }
            points
        })
        .collect();
    Ok(frames)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}
