//! Configuration handling for botscript
//!
//! Configuration is stored in `.botscript/config.toml` (project) and
//! `~/.config/botscript/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{FfmpegConverter, DEFAULT_ROUND_SIDE, DEFAULT_VOICE_FORMAT};

/// Name of the project directory
pub const PROJECT_DIR: &str = ".botscript";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Media conversion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// ffmpeg executable (name on PATH or absolute path)
    pub ffmpeg: String,

    /// Container voice messages are converted to
    pub voice_format: String,

    /// Side of round videos in pixels
    pub round_side: u32,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            voice_format: DEFAULT_VOICE_FORMAT.to_string(),
            round_side: DEFAULT_ROUND_SIDE,
        }
    }
}

impl MediaConfig {
    pub fn converter(&self) -> FfmpegConverter {
        FfmpegConverter::new(&self.ffmpeg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ffmpeg.trim().is_empty() {
            return Err(ConfigError::Invalid("media.ffmpeg must not be empty".into()));
        }
        if self.voice_format.trim().is_empty() {
            return Err(ConfigError::Invalid("media.voice_format must not be empty".into()));
        }
        if self.round_side == 0 {
            return Err(ConfigError::Invalid("media.round_side must be positive".into()));
        }
        Ok(())
    }
}

/// Settings for the terminal player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayConfig {
    /// Upper bound on posts sent in a row without waiting for a reply
    pub max_auto_steps: usize,
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self { max_auto_steps: 50 }
    }
}

impl PlayConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_auto_steps == 0 {
            return Err(ConfigError::Invalid("play.max_auto_steps must be positive".into()));
        }
        Ok(())
    }
}

/// Project-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProjectConfig {
    /// Media conversion settings
    pub media: MediaConfig,

    /// Terminal player settings
    pub play: PlayConfig,
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project_root = Self::find_project_root();
        let project = match &project_root {
            Some(root) => Self::load_project_config(root)?,
            None => ProjectConfig::default(),
        };

        Ok(Self {
            project,
            global,
            project_root,
        })
    }

    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self {
            project,
            global,
            project_root: Some(project_root.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "botscript", "botscript").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(PROJECT_DIR).join("config.toml");

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;
        config.media.validate().context("Invalid project config")?;
        config.play.validate().context("Invalid project config")?;
        Ok(config)
    }

    /// Finds the project root by looking for a `.botscript/` directory
    pub fn find_project_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_project_root_from(&current)
    }

    /// Walks up from `start` looking for a `.botscript/` directory
    pub fn find_project_root_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Creates `.botscript/config.toml` with defaults; existing files are kept
    pub fn init_project(root: &Path) -> Result<PathBuf> {
        let dir = root.join(PROJECT_DIR);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {} directory: {}", PROJECT_DIR, dir.display()))?;

        let config_path = dir.join("config.toml");
        if !config_path.exists() {
            let content = format!(
                "# botscript configuration\n\n{}",
                toml::to_string_pretty(&ProjectConfig::default())
                    .context("Failed to serialize project config")?
            );
            fs::write(&config_path, content)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }
        Ok(config_path)
    }

    /// Returns true if we're in a botscript project
    pub fn is_in_project(&self) -> bool {
        self.project_root.is_some()
    }
}
