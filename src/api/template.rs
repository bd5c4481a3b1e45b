//! 动作模板提取器

use std::path::Path;

use log::{error, info};

use crate::core::pose::{PoseDetector, PoseError};
use crate::core::template::{
    BatchReport, ExtractionConfig, StoredTemplate, TemplateArchive, TemplateArchiver,
};
use crate::core::video::{GifVideoDecoder, VideoDecoder};

/// 动作模板提取器 - 视频目录 → `.npz` 模板归档
///
/// ```no_run
/// use motion_template::api::template::TemplateExtractor;
/// use motion_template::core::pose::MockPoseDetector;
///
/// let extractor = TemplateExtractor::create(Box::new(MockPoseDetector::always()))?;
/// let report = extractor.extract_folder("videos/remates", "templates/remates.npz")?;
/// println!("{} templates", report.success_count());
/// # Ok::<(), motion_template::PoseError>(())
/// ```
pub struct TemplateExtractor {
    decoder: Box<dyn VideoDecoder>,
    detector: Box<dyn PoseDetector>,
    config: ExtractionConfig,
}

impl TemplateExtractor {
    /// GIF clips, default sampling.
    pub fn create(detector: Box<dyn PoseDetector>) -> Result<Self, PoseError> {
        Self::with_parts(Box::new(GifVideoDecoder::new()), detector, ExtractionConfig::default())
    }

    pub fn with_parts(
        decoder: Box<dyn VideoDecoder>,
        detector: Box<dyn PoseDetector>,
        config: ExtractionConfig,
    ) -> Result<Self, PoseError> {
        crate::init_logging();
        config.validate()?;
        info!(
            "🎬 TemplateExtractor: created (sample_fps={}, fallback_fps={})",
            config.sample_fps, config.fallback_fps
        );
        Ok(Self {
            decoder,
            detector,
            config,
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// 处理单个目录
    pub fn extract_folder(
        &self,
        input_dir: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
    ) -> Result<BatchReport, PoseError> {
        let archiver = TemplateArchiver::new(
            self.decoder.as_ref(),
            self.detector.as_ref(),
            self.config.clone(),
        )?;
        archiver.process_folder(input_dir.as_ref(), output_path.as_ref())
    }

    /// One batch per technique: `<videos_root>/<name>` → `<templates_root>/<name>.npz`.
    ///
    /// A category that fails as a whole (missing directory, archive write error)
    /// is reported in its slot and the remaining categories still run. Only
    /// failing to create `templates_root` aborts the call.
    pub fn extract_categories(
        &self,
        videos_root: impl AsRef<Path>,
        templates_root: impl AsRef<Path>,
        categories: &[&str],
    ) -> Result<Vec<(String, Result<BatchReport, PoseError>)>, PoseError> {
        let videos_root = videos_root.as_ref();
        let templates_root = templates_root.as_ref();
        std::fs::create_dir_all(templates_root)?;

        let mut reports = Vec::with_capacity(categories.len());
        for category in categories {
            info!("🏷️ Category: {}", category);
            let result = self.extract_folder(
                videos_root.join(category),
                templates_root.join(format!("{}.npz", category)),
            );
            if let Err(e) = &result {
                error!("❌ Category {} failed: {}", category, e);
            }
            reports.push((category.to_string(), result));
        }
        Ok(reports)
    }

    /// 读取已写出的模板归档
    pub fn load_templates(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<StoredTemplate>, PoseError> {
        TemplateArchive::load(path.as_ref())
    }
}

impl Drop for TemplateExtractor {
    fn drop(&mut self) {
        info!("🗑️ TemplateExtractor: released");
    }
}
