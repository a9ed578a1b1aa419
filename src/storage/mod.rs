//! # Storage Layer
//!
//! Files read by botscript.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Scripts | TOML | anywhere, media paths relative to the file |
//! | Project config | TOML | `.botscript/config.toml` |
//! | Global config | TOML | `~/.config/botscript/config.toml` |
//!
//! Traversal state is never persisted.

mod config;
mod script_file;

pub use config::{Config, ConfigError, GlobalConfig, MediaConfig, OutputFormat, PlayConfig, ProjectConfig, PROJECT_DIR};
pub use script_file::{load as load_script, ButtonDef, NextDef, PostBody, PostDef, ScriptFile, ScriptFileError};
