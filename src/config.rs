use anyhow::{Context, Result};
use facebench_vision::{CascadeParams, YuNetParams};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::labeling::Convention;

/// Where the config is looked up when `--config` is not given.
pub static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| {
    directories::ProjectDirs::from("", "", "facebench")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("facebench.toml"))
});

/// Euclidean tolerance for L2-normalised SFace embeddings.
pub const DEFAULT_TOLERANCE: f32 = 1.128;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum distance for two embeddings to count as the same person.
    pub tolerance: f32,
    #[serde(flatten)]
    pub convention: Convention,
    pub enroll: YuNetParams,
    pub evaluate: CascadeParams,
    pub models: ModelPaths,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            convention: Convention::default(),
            enroll: YuNetParams::default(),
            evaluate: CascadeParams::default(),
            models: ModelPaths::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPaths {
    pub detector: PathBuf,
    pub recognizer: PathBuf,
    pub cascade: PathBuf,
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self {
            detector: PathBuf::from("models/face_detection_yunet_2023mar.onnx"),
            recognizer: PathBuf::from("models/face_recognition_sface_2021dec.onnx"),
            cascade: PathBuf::from("models/seeta_fd_frontal_v1.0.bin"),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            anyhow::bail!("tolerance must be a non-negative number, got {}", self.tolerance);
        }
        self.convention.validate()?;
        self.evaluate.validate()?;
        Ok(())
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
