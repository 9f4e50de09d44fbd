//! Runtime configuration: optional JSON5 file, then environment overrides for secrets.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

use crate::core::video::compiler::CompileSettings;
use crate::core::video::sampler::SamplerConfig;
use crate::core::video::text_detector::TesseractConfig;
use crate::core::video::workspace::CleanupPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] json5::Error),
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub airtable: AirtableConfig,
    pub drive: DriveConfig,
    pub sampler: SamplerSection,
    pub ocr: OcrSection,
    pub compile: CompileSection,
    pub workspace: WorkspaceSection,
    pub pipeline: BatchSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AirtableConfig {
    pub api_key: Option<String>,
    pub base_id: Option<String>,
    pub table: Option<String>,
    pub view: Option<String>,
    pub api_base: String,
    pub url_field: String,
    pub tos_field: String,
    pub template_field: String,
    pub timeout_secs: u64,
}

impl Default for AirtableConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_id: None,
            table: None,
            view: None,
            api_base: "https://api.airtable.com/v0".to_string(),
            url_field: "DOWNLOAD URL".to_string(),
            tos_field: "TOS DETECTED".to_string(),
            template_field: "BABE PAGE TEMPLATE USED".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub access_token: Option<String>,
    pub folder_id: Option<String>,
    pub upload_base: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            folder_id: None,
            upload_base: "https://www.googleapis.com/upload/drive/v3".to_string(),
            api_base: "https://www.googleapis.com/drive/v3".to_string(),
            timeout_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplerSection {
    pub frame_rate: f64,
    pub frame_extension: String,
    pub decoder_program: String,
    pub decoder_threads: usize,
    pub decode_timeout_secs: u64,
}

impl Default for SamplerSection {
    fn default() -> Self {
        Self {
            frame_rate: 1.0,
            frame_extension: "png".to_string(),
            decoder_program: "ffmpeg".to_string(),
            decoder_threads: num_cpus::get().min(4),
            decode_timeout_secs: 120,
        }
    }
}

impl SamplerSection {
    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            frame_rate: self.frame_rate,
            frame_extension: self.frame_extension.clone(),
        }
    }

    pub fn decode_timeout(&self) -> Duration {
        Duration::from_secs(self.decode_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcrSection {
    pub program: String,
    pub language: String,
    pub page_segmentation_mode: Option<u8>,
    pub max_width: u32,
    pub timeout_secs: u64,
}

impl Default for OcrSection {
    fn default() -> Self {
        let tesseract = TesseractConfig::for_sparse_text();
        Self {
            program: tesseract.program,
            language: tesseract.language,
            page_segmentation_mode: tesseract.page_segmentation_mode,
            max_width: tesseract.max_width,
            timeout_secs: tesseract.timeout.as_secs(),
        }
    }
}

impl OcrSection {
    pub fn tesseract_config(&self) -> TesseractConfig {
        TesseractConfig {
            program: self.program.clone(),
            language: self.language.clone(),
            page_segmentation_mode: self.page_segmentation_mode,
            max_width: self.max_width,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompileSection {
    pub program: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub crf: u8,
    pub preset: String,
    pub include_audio: bool,
    pub timeout_secs: u64,
}

impl Default for CompileSection {
    fn default() -> Self {
        let settings = CompileSettings::portrait_1080p();
        Self {
            program: settings.program,
            width: settings.width,
            height: settings.height,
            fps: settings.fps,
            crf: settings.crf,
            preset: settings.preset,
            include_audio: settings.include_audio,
            timeout_secs: settings.timeout.as_secs(),
        }
    }
}

impl CompileSection {
    pub fn settings(&self) -> CompileSettings {
        CompileSettings {
            program: self.program.clone(),
            width: self.width,
            height: self.height,
            fps: self.fps,
            crf: self.crf,
            preset: self.preset.clone(),
            include_audio: self.include_audio,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkspaceSection {
    /// Parent of the per-video `frames_<id>` directories
    pub root: PathBuf,
    pub keep_frames: bool,
}

impl Default for WorkspaceSection {
    fn default() -> Self {
        Self {
            root: std::env::temp_dir().join("minicomp"),
            keep_frames: false,
        }
    }
}

impl WorkspaceSection {
    pub fn cleanup_policy(&self) -> CleanupPolicy {
        if self.keep_frames {
            CleanupPolicy::Keep
        } else {
            CleanupPolicy::Erase
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchSection {
    pub batch_size: usize,
    /// Stop after this many compilations; unlimited when unset
    pub max_batches: Option<usize>,
    pub downloads_dir: PathBuf,
    pub fetch_timeout_secs: u64,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            batch_size: 3,
            max_batches: None,
            downloads_dir: PathBuf::from("downloads"),
            fetch_timeout_secs: 300,
        }
    }
}

impl PipelineConfig {
    /// Defaults when `path` is `None`, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                info!("⚙️ Loading config from {:?}", path);
                Self::from_json5(&std::fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_json5(text: &str) -> Result<Self, ConfigError> {
        Ok(json5::from_str(text)?)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            let value = lookup(key).filter(|v| !v.trim().is_empty());
            if value.is_some() {
                debug!("⚙️ {} taken from environment", key);
            }
            value
        };

        if let Some(v) = get("AIRTABLE_API_KEY") {
            self.airtable.api_key = Some(v);
        }
        if let Some(v) = get("AIRTABLE_BASE_ID") {
            self.airtable.base_id = Some(v);
        }
        if let Some(v) = get("AIRTABLE_TABLE") {
            self.airtable.table = Some(v);
        }
        if let Some(v) = get("AIRTABLE_VIEW") {
            self.airtable.view = Some(v);
        }
        if let Some(v) = get("GOOGLE_DRIVE_ACCESS_TOKEN") {
            self.drive.access_token = Some(v);
        }
        if let Some(v) = get("GOOGLE_DRIVE_FOLDER_ID") {
            self.drive.folder_id = Some(v);
        }
    }

    /// Settings needed by every command
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sampler = &self.sampler;
        if !(sampler.frame_rate > 0.0 && sampler.frame_rate.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "sampler.frame_rate must be > 0, got {}",
                sampler.frame_rate
            )));
        }
        if sampler.decode_timeout_secs == 0 || self.ocr.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "decode and OCR timeouts must be non-zero".to_string(),
            ));
        }
        if self.compile.width == 0 || self.compile.height == 0 || self.compile.fps == 0 {
            return Err(ConfigError::Invalid(format!(
                "compile target {}x{}@{} must be non-zero",
                self.compile.width, self.compile.height, self.compile.fps
            )));
        }
        if self.compile.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "compile.timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.pipeline.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// [`Self::validate`] plus the remote credentials
    pub fn validate_for_run(&self) -> Result<(), ConfigError> {
        self.validate()?;
        require(&self.airtable.api_key, "airtable.api_key (AIRTABLE_API_KEY)")?;
        require(&self.airtable.base_id, "airtable.base_id (AIRTABLE_BASE_ID)")?;
        require(&self.airtable.table, "airtable.table (AIRTABLE_TABLE)")?;
        require(
            &self.drive.access_token,
            "drive.access_token (GOOGLE_DRIVE_ACCESS_TOKEN)",
        )?;
        Ok(())
    }
}

fn require(value: &Option<String>, name: &'static str) -> Result<(), ConfigError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(ConfigError::Missing(name)),
    }
}
