//! Media files and the conversion collaborator
//!
//! Posts that carry files hold a [`MediaFile`], a path that was checked when
//! the post was built. Format conversion is delegated to a
//! [`MediaConverter`]; the crate ships [`FfmpegConverter`] for real use and
//! [`NoopConverter`] for scripts that are only inspected.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::content::ContentError;

/// Default side of a round video, in pixels
pub const DEFAULT_ROUND_SIDE: u32 = 480;

/// Default container for voice messages
pub const DEFAULT_VOICE_FORMAT: &str = "ogg";

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Failed to replace {path}: {source}")]
    Replace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unsupported conversion: {0}")]
    Unsupported(String),
}

/// A file path that passed validation at post construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaFile(PathBuf);

impl MediaFile {
    /// Accepts a path that exists and has at least one byte
    pub fn non_empty(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let path = path.as_ref();
        let meta = fs::metadata(path).map_err(|_| ContentError::Missing(path.to_path_buf()))?;
        if !meta.is_file() {
            return Err(ContentError::Missing(path.to_path_buf()));
        }
        if meta.len() == 0 {
            return Err(ContentError::Empty(path.to_path_buf()));
        }
        Ok(Self(path.to_path_buf()))
    }

    /// Accepts any path that exists as a file
    pub fn existing(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ContentError::Missing(path.to_path_buf()));
        }
        Ok(Self(path.to_path_buf()))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// Converts media into the shapes the messenger expects
///
/// Implementations may shell out, call a library or do nothing; the post
/// constructors only rely on the contract below.
pub trait MediaConverter {
    /// Produces an audio file in `format` (e.g. `ogg`) and returns its path.
    /// May return the input path when no conversion is needed.
    fn convert_to_audio(&self, path: &Path, format: &str) -> Result<PathBuf, ConversionError>;

    /// Rescales the video in place to `width x height`
    fn resize_video(&self, path: &Path, size: (u32, u32)) -> Result<(), ConversionError>;
}

/// Converter that leaves every file untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopConverter;

impl MediaConverter for NoopConverter {
    fn convert_to_audio(&self, path: &Path, _format: &str) -> Result<PathBuf, ConversionError> {
        Ok(path.to_path_buf())
    }

    fn resize_video(&self, _path: &Path, _size: (u32, u32)) -> Result<(), ConversionError> {
        Ok(())
    }
}

/// Converter backed by the `ffmpeg` executable
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    program: String,
}

impl Default for FfmpegConverter {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn run(&self, args: &[&OsStr]) -> Result<(), ConversionError> {
        debug!(program = %self.program, ?args, "running media converter");

        let output: Output = Command::new(&self.program)
            .args(["-y", "-loglevel", "error"])
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ConversionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ConversionError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl MediaConverter for FfmpegConverter {
    fn convert_to_audio(&self, path: &Path, format: &str) -> Result<PathBuf, ConversionError> {
        let already = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(format));
        if already {
            return Ok(path.to_path_buf());
        }

        let target = path.with_extension(format);
        let codec: &[&str] = match format {
            "ogg" | "oga" | "opus" => &["-c:a", "libopus"],
            "mp3" => &["-c:a", "libmp3lame"],
            "m4a" | "aac" => &["-c:a", "aac"],
            other => return Err(ConversionError::Unsupported(format!("audio format '{}'", other))),
        };

        let mut args = vec![OsStr::new("-i"), path.as_os_str(), OsStr::new("-vn")];
        args.extend(codec.iter().map(OsStr::new));
        args.push(target.as_os_str());
        self.run(&args)?;

        debug!(from = %path.display(), to = %target.display(), "converted audio");
        Ok(target)
    }

    fn resize_video(&self, path: &Path, size: (u32, u32)) -> Result<(), ConversionError> {
        let (width, height) = size;
        if width == 0 || height == 0 {
            return Err(ConversionError::Unsupported(format!("resolution {}x{}", width, height)));
        }

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("video");
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("mp4");
        let scratch = path.with_file_name(format!("{}.resized.{}", stem, ext));

        let filter = format!(
            "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}",
            w = width,
            h = height
        );
        let result = self
            .run(&[
                OsStr::new("-i"),
                path.as_os_str(),
                OsStr::new("-vf"),
                OsStr::new(&filter),
                OsStr::new("-c:a"),
                OsStr::new("copy"),
                scratch.as_os_str(),
            ])
            .and_then(|()| {
                fs::rename(&scratch, path).map_err(|source| ConversionError::Replace {
                    path: path.to_path_buf(),
                    source,
                })
            });
        if let Err(err) = result {
            // ffmpeg may have written part of the output before failing
            if scratch.exists() {
                let _ = fs::remove_file(&scratch);
            }
            return Err(err);
        }

        debug!(path = %path.display(), width, height, "resized video");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn non_empty_rejects_missing_and_empty() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.jpg");
        assert!(matches!(
            MediaFile::non_empty(&missing),
            Err(ContentError::Missing(_))
        ));

        let empty = dir.path().join("empty.jpg");
        fs::write(&empty, b"").unwrap();
        assert!(matches!(
            MediaFile::non_empty(&empty),
            Err(ContentError::Empty(_))
        ));

        let full = dir.path().join("full.jpg");
        fs::write(&full, b"jpeg").unwrap();
        assert_eq!(MediaFile::non_empty(&full).unwrap().path(), full);
    }

    #[test]
    fn directories_are_not_media() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            MediaFile::non_empty(dir.path()),
            Err(ContentError::Missing(_))
        ));
        assert!(MediaFile::existing(dir.path()).is_err());
    }

    #[test]
    fn existing_allows_empty_files() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("sticker.webp");
        fs::write(&empty, b"").unwrap();
        assert!(MediaFile::existing(&empty).is_ok());
    }

    #[test]
    fn noop_converter_keeps_paths() {
        let path = Path::new("voice.wav");
        assert_eq!(NoopConverter.convert_to_audio(path, "ogg").unwrap(), path);
        assert!(NoopConverter.resize_video(path, (480, 480)).is_ok());
    }

    #[test]
    fn ffmpeg_skips_matching_format() {
        let converter = FfmpegConverter::new("definitely-not-ffmpeg");
        let path = Path::new("voice.OGG");
        assert_eq!(converter.convert_to_audio(path, "ogg").unwrap(), path);
    }

    #[test]
    fn ffmpeg_missing_binary_is_spawn_error() {
        let converter = FfmpegConverter::new("definitely-not-ffmpeg-binary");
        let err = converter
            .convert_to_audio(Path::new("voice.wav"), "ogg")
            .unwrap_err();
        assert!(matches!(err, ConversionError::Spawn { .. }));
    }

    #[test]
    fn ffmpeg_rejects_unknown_audio_format() {
        let converter = FfmpegConverter::default();
        let err = converter
            .convert_to_audio(Path::new("voice.wav"), "xyz")
            .unwrap_err();
        assert!(matches!(err, ConversionError::Unsupported(_)));
    }

    #[test]
    fn ffmpeg_rejects_zero_resolution() {
        let converter = FfmpegConverter::default();
        let err = converter
            .resize_video(Path::new("round.mp4"), (0, 480))
            .unwrap_err();
        assert!(matches!(err, ConversionError::Unsupported(_)));
    }

    #[cfg(unix)]
    #[test]
    fn failed_resize_leaves_no_scratch_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        // writes its last argument, then fails like a crashing ffmpeg
        let fake = dir.path().join("fake-ffmpeg");
        fs::write(&fake, "#!/bin/sh\nfor last; do :; done\necho partial > \"$last\"\nexit 1\n").unwrap();
        fs::set_permissions(&fake, fs::Permissions::from_mode(0o755)).unwrap();

        let video = dir.path().join("face.mp4");
        fs::write(&video, b"mp4").unwrap();

        let converter = FfmpegConverter::new(fake.to_string_lossy().into_owned());
        let err = converter.resize_video(&video, (240, 240)).unwrap_err();
        assert!(matches!(err, ConversionError::Failed { .. }));

        assert!(!dir.path().join("face.resized.mp4").exists());
        assert_eq!(fs::read(&video).unwrap(), b"mp4");
    }
}
