use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use super::archive::TemplateArchive;
use super::config::ExtractionConfig;
use super::normalizer::{normalize_sequence, NormalizedSequence};
use super::sequence::extract_sequence;
use crate::core::pose::{PoseDetector, PoseError};
use crate::core::video::VideoDecoder;

#[derive(Debug)]
pub struct FileFailure {
    pub file_name: String,
    pub error: PoseError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Written { path: PathBuf, templates: usize },
    /// 没有任何文件产出模板，不写归档
    NothingExtracted,
}

/// 批处理结果
#[derive(Debug)]
pub struct BatchReport {
    /// File names that made it into the archive, in archive order.
    pub extracted: Vec<String>,
    /// Decoded fine but no pose was ever detected.
    pub no_pose: Vec<String>,
    pub failures: Vec<FileFailure>,
    pub outcome: BatchOutcome,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.extracted.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn is_total_failure(&self) -> bool {
        self.outcome == BatchOutcome::NothingExtracted
    }

    pub fn is_partial_failure(&self) -> bool {
        !self.is_total_failure() && !self.failures.is_empty()
    }
}

enum FileResult {
    Extracted(NormalizedSequence),
    NoPose,
}

pub struct TemplateArchiver<'a> {
    decoder: &'a dyn VideoDecoder,
    detector: &'a dyn PoseDetector,
    config: ExtractionConfig,
}

impl<'a> TemplateArchiver<'a> {
    pub fn new(
        decoder: &'a dyn VideoDecoder,
        detector: &'a dyn PoseDetector,
        config: ExtractionConfig,
    ) -> Result<Self, PoseError> {
        config.validate()?;
        Ok(Self {
            decoder,
            detector,
            config,
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Process every visible entry of `input_dir` in file name order and write
    /// the successful templates to `output_path`. Names starting with `.` are skipped.
    pub fn process_folder(
        &self,
        input_dir: &Path,
        output_path: &Path,
    ) -> Result<BatchReport, PoseError> {
        let mut entries: Vec<(String, PathBuf)> = Vec::new();
        for entry in fs::read_dir(input_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                debug!("skipping hidden entry {}", name);
                continue;
            }
            entries.push((name, entry.path()));
        }
        entries.sort();

        info!(
            "📂 Processing {} entries from {}",
            entries.len(),
            input_dir.display()
        );

        let mut archive = TemplateArchive::new();
        let mut no_pose = Vec::new();
        let mut failures = Vec::new();

        for (name, path) in entries {
            match self.process_file(&path) {
                Ok(FileResult::Extracted(sequence)) => {
                    info!("✅ OK: {} -> {:?}", name, sequence.shape());
                    if let Err(e) = archive.push(name.clone(), sequence) {
                        error!("❌ ERR {}: {}", name, e);
                        failures.push(FileFailure { file_name: name, error: e });
                    }
                }
                Ok(FileResult::NoPose) => {
                    warn!("🫥 NO POSE: {}", name);
                    no_pose.push(name);
                }
                Err(e) => {
                    error!("❌ ERR {}: {}", name, e);
                    failures.push(FileFailure { file_name: name, error: e });
                }
            }
        }

        let extracted: Vec<String> = archive.keys().into_iter().map(String::from).collect();
        let outcome = if archive.is_empty() {
            warn!("⚠️ No templates extracted.");
            BatchOutcome::NothingExtracted
        } else {
            archive.write(output_path, self.config.compression_level)?;
            BatchOutcome::Written {
                path: output_path.to_path_buf(),
                templates: archive.len(),
            }
        };

        info!(
            "📊 Batch done: {} extracted, {} no pose, {} failed",
            extracted.len(),
            no_pose.len(),
            failures.len()
        );

        Ok(BatchReport {
            extracted,
            no_pose,
            failures,
            outcome,
        })
    }

    fn process_file(&self, path: &Path) -> Result<FileResult, PoseError> {
        let raw = extract_sequence(path, self.decoder, self.detector, &self.config)?;
        let normalized = normalize_sequence(&raw);
        if normalized.is_empty() {
            return Ok(FileResult::NoPose);
        }
        Ok(FileResult::Extracted(normalized))
    }
}
