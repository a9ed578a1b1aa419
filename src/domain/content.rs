//! Post content variants
//!
//! Every post carries exactly one [`Content`]. Constructors validate what the
//! messenger will later need (files present, media converted, group mix
//! allowed) so that a built script can be sent without further checks.

use std::fmt;
use std::path::{Path, PathBuf};

use askama::Template;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::button::{Button, ButtonId};
use super::media::{ConversionError, MediaConverter, MediaFile};

/// Maximum number of non-text items in a media group
pub const MAX_GROUP_MEDIA: usize = 10;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("File {0} does not exist")]
    Missing(PathBuf),

    #[error("File {0} is empty")]
    Empty(PathBuf),

    #[error("Media conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Invalid media group: {0}")]
    Composition(#[from] CompositionError),

    #[error("Failed to render markup: {0}")]
    Render(#[from] askama::Error),
}

/// Violations of the media group mixing rules
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompositionError {
    #[error("group has no items")]
    Empty,

    #[error("{0} posts cannot be grouped")]
    Unsupported(ContentKind),

    #[error("only one text item is allowed")]
    TooManyTexts,

    #[error("at most {MAX_GROUP_MEDIA} media items are allowed, got {0}")]
    TooManyMedia(usize),

    #[error("documents can only be grouped with documents and text")]
    MixedDocuments,

    #[error("audio can only be grouped with audio and text")]
    MixedAudio,
}

/// Discriminant of [`Content`], used for reporting and group rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Image,
    Video,
    Voice,
    Gif,
    Round,
    Model,
    Doc,
    Audio,
    Sticker,
    Buttons,
    Group,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Image => "image",
            ContentKind::Video => "video",
            ContentKind::Voice => "voice",
            ContentKind::Gif => "gif",
            ContentKind::Round => "round",
            ContentKind::Model => "model",
            ContentKind::Doc => "doc",
            ContentKind::Audio => "audio",
            ContentKind::Sticker => "sticker",
            ContentKind::Buttons => "buttons",
            ContentKind::Group => "group",
        }
    }

    /// Returns true if this kind may appear inside a media group
    pub fn is_groupable(&self) -> bool {
        matches!(
            self,
            ContentKind::Text
                | ContentKind::Image
                | ContentKind::Video
                | ContentKind::Doc
                | ContentKind::Audio
        )
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caption with the buttons shown under it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonPanel {
    pub caption: String,
    pub buttons: Vec<Button>,
}

impl ButtonPanel {
    /// Returns true if the panel shows a button with this id
    pub fn contains(&self, id: &ButtonId) -> bool {
        self.buttons.iter().any(|b| b.id() == id)
    }

    pub fn button(&self, id: &ButtonId) -> Option<&Button> {
        self.buttons.iter().find(|b| b.id() == id)
    }
}

/// What a post shows to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
    Image { file: MediaFile },
    Video { file: MediaFile },
    Voice { file: MediaFile },
    Gif { file: MediaFile },
    Round { file: MediaFile, side: u32 },
    Model { markup: String },
    Doc { file: MediaFile },
    Audio { file: MediaFile },
    Sticker { file: MediaFile },
    Buttons(ButtonPanel),
    Group { items: Vec<Content> },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }

    pub fn image(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        Ok(Content::Image {
            file: MediaFile::non_empty(path)?,
        })
    }

    pub fn video(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        Ok(Content::Video {
            file: MediaFile::non_empty(path)?,
        })
    }

    /// Validates the recording and converts it to `format` (usually `ogg`)
    pub fn voice(
        path: impl AsRef<Path>,
        format: &str,
        converter: &dyn MediaConverter,
    ) -> Result<Self, ContentError> {
        let source = MediaFile::non_empty(path)?;
        let converted = converter.convert_to_audio(source.path(), format)?;
        debug!(source = %source.path().display(), converted = %converted.display(), "voice ready");
        Ok(Content::Voice {
            file: MediaFile::non_empty(converted)?,
        })
    }

    pub fn gif(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        Ok(Content::Gif {
            file: MediaFile::existing(path)?,
        })
    }

    /// Validates the video and resizes it in place to a `side x side` square
    pub fn round(
        path: impl AsRef<Path>,
        side: u32,
        converter: &dyn MediaConverter,
    ) -> Result<Self, ContentError> {
        let file = MediaFile::existing(path)?;
        converter.resize_video(file.path(), (side, side))?;
        Ok(Content::Round { file, side })
    }

    /// Builds a page fragment that embeds the 3D model
    pub fn model(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        Ok(Content::Model {
            markup: model_markup(path.as_ref())?,
        })
    }

    pub fn doc(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        Ok(Content::Doc {
            file: MediaFile::non_empty(path)?,
        })
    }

    pub fn audio(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        Ok(Content::Audio {
            file: MediaFile::existing(path)?,
        })
    }

    pub fn sticker(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        Ok(Content::Sticker {
            file: MediaFile::existing(path)?,
        })
    }

    pub fn buttons(caption: impl Into<String>, buttons: Vec<Button>) -> Self {
        Content::Buttons(ButtonPanel {
            caption: caption.into(),
            buttons,
        })
    }

    /// Groups several items into one message, enforcing the mixing rules
    pub fn group(items: Vec<Content>) -> Result<Self, ContentError> {
        check_group(&items)?;
        Ok(Content::Group { items })
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            Content::Text { .. } => ContentKind::Text,
            Content::Image { .. } => ContentKind::Image,
            Content::Video { .. } => ContentKind::Video,
            Content::Voice { .. } => ContentKind::Voice,
            Content::Gif { .. } => ContentKind::Gif,
            Content::Round { .. } => ContentKind::Round,
            Content::Model { .. } => ContentKind::Model,
            Content::Doc { .. } => ContentKind::Doc,
            Content::Audio { .. } => ContentKind::Audio,
            Content::Sticker { .. } => ContentKind::Sticker,
            Content::Buttons(_) => ContentKind::Buttons,
            Content::Group { .. } => ContentKind::Group,
        }
    }

    /// Returns the button panel of a buttons post
    pub fn panel(&self) -> Option<&ButtonPanel> {
        match self {
            Content::Buttons(panel) => Some(panel),
            _ => None,
        }
    }

    /// Returns the file behind a media post
    pub fn file(&self) -> Option<&Path> {
        match self {
            Content::Image { file }
            | Content::Video { file }
            | Content::Voice { file }
            | Content::Gif { file }
            | Content::Round { file, .. }
            | Content::Doc { file }
            | Content::Audio { file }
            | Content::Sticker { file } => Some(file.path()),
            _ => None,
        }
    }

    /// One-line human readable summary
    pub fn summary(&self) -> String {
        match self {
            Content::Text { text } => text.clone(),
            Content::Model { .. } => "3D model".to_string(),
            Content::Buttons(panel) => panel.caption.clone(),
            Content::Group { items } => format!("{} grouped items", items.len()),
            other => match other.file() {
                Some(path) => format!("{}: {}", other.kind(), path.display()),
                None => other.kind().to_string(),
            },
        }
    }
}

fn check_group(items: &[Content]) -> Result<(), CompositionError> {
    if items.is_empty() {
        return Err(CompositionError::Empty);
    }

    let mut texts = 0;
    let mut media = 0;
    let mut docs = 0;
    let mut audio = 0;

    for item in items {
        let kind = item.kind();
        if !kind.is_groupable() {
            return Err(CompositionError::Unsupported(kind));
        }
        match kind {
            ContentKind::Text => texts += 1,
            ContentKind::Doc => {
                docs += 1;
                media += 1;
            }
            ContentKind::Audio => {
                audio += 1;
                media += 1;
            }
            _ => media += 1,
        }
    }

    if texts > 1 {
        return Err(CompositionError::TooManyTexts);
    }
    if media > MAX_GROUP_MEDIA {
        return Err(CompositionError::TooManyMedia(media));
    }
    if docs > 0 && docs != media {
        return Err(CompositionError::MixedDocuments);
    }
    if audio > 0 && audio != media {
        return Err(CompositionError::MixedAudio);
    }
    Ok(())
}

/// `<model-viewer>` embed; values are HTML-escaped by the template
#[derive(Template)]
#[template(path = "model.html")]
struct ModelTemplate {
    src: String,
    title: String,
}

fn model_markup(path: &Path) -> Result<String, askama::Error> {
    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());
    ModelTemplate {
        src: path.to_string_lossy().into_owned(),
        title,
    }
    .render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FailingConverter;

    impl MediaConverter for FailingConverter {
        fn convert_to_audio(&self, _: &Path, _: &str) -> Result<PathBuf, ConversionError> {
            Err(ConversionError::Unsupported("test".into()))
        }

        fn resize_video(&self, _: &Path, _: (u32, u32)) -> Result<(), ConversionError> {
            Err(ConversionError::Unsupported("test".into()))
        }
    }

    /// Writes `<name>.ogg` next to the input and records calls
    #[derive(Default)]
    struct RecordingConverter {
        calls: AtomicUsize,
    }

    impl MediaConverter for RecordingConverter {
        fn convert_to_audio(&self, path: &Path, format: &str) -> Result<PathBuf, ConversionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let target = path.with_extension(format);
            fs::write(&target, b"OggS").unwrap();
            Ok(target)
        }

        fn resize_video(&self, _: &Path, size: (u32, u32)) -> Result<(), ConversionError> {
            assert_eq!(size.0, size.1);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn image_and_video_need_non_empty_files() {
        let dir = TempDir::new().unwrap();
        let empty = write(&dir, "empty.png", b"");
        let missing = dir.path().join("missing.png");

        assert!(matches!(Content::image(&empty), Err(ContentError::Empty(_))));
        assert!(matches!(Content::image(&missing), Err(ContentError::Missing(_))));
        assert!(matches!(Content::video(&empty), Err(ContentError::Empty(_))));
        assert!(matches!(Content::video(&missing), Err(ContentError::Missing(_))));

        let ok = write(&dir, "logo.png", b"png");
        assert_eq!(Content::image(&ok).unwrap().kind(), ContentKind::Image);
    }

    #[test]
    fn doc_needs_non_empty_file() {
        let dir = TempDir::new().unwrap();
        let empty = write(&dir, "doc.docx", b"");
        assert!(matches!(Content::doc(&empty), Err(ContentError::Empty(_))));
    }

    #[test]
    fn voice_validates_before_converting() {
        let dir = TempDir::new().unwrap();
        let empty = write(&dir, "voice.wav", b"");
        let converter = RecordingConverter::default();

        assert!(matches!(
            Content::voice(&empty, "ogg", &converter),
            Err(ContentError::Empty(_))
        ));
        assert_eq!(converter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn voice_with_missing_file_is_not_converted() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nowhere.wav");
        let converter = RecordingConverter::default();

        assert!(matches!(
            Content::voice(&missing, "ogg", &converter),
            Err(ContentError::Missing(_))
        ));
        assert_eq!(converter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn round_with_missing_file_is_not_resized() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("face.mp4");
        let converter = RecordingConverter::default();

        assert!(matches!(
            Content::round(&missing, 240, &converter),
            Err(ContentError::Missing(_))
        ));
        assert_eq!(converter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn voice_uses_converted_file() {
        let dir = TempDir::new().unwrap();
        let wav = write(&dir, "voice.wav", b"RIFF");
        let converter = RecordingConverter::default();

        let content = Content::voice(&wav, "ogg", &converter).unwrap();
        assert_eq!(content.file(), Some(dir.path().join("voice.ogg").as_path()));
        assert_eq!(converter.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn voice_conversion_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let wav = write(&dir, "voice.wav", b"RIFF");

        let err = Content::voice(&wav, "ogg", &FailingConverter).unwrap_err();
        assert!(matches!(err, ContentError::Conversion(ConversionError::Unsupported(_))));
    }

    #[test]
    fn round_resizes_to_square() {
        let dir = TempDir::new().unwrap();
        let mp4 = write(&dir, "face.mp4", b"mp4");
        let converter = RecordingConverter::default();

        let content = Content::round(&mp4, 240, &converter).unwrap();
        assert!(matches!(content, Content::Round { side: 240, .. }));
        assert_eq!(converter.calls.load(Ordering::SeqCst), 1);

        assert!(matches!(
            Content::round(&mp4, 480, &FailingConverter),
            Err(ContentError::Conversion(_))
        ));
    }

    #[test]
    fn model_markup_escapes_path() {
        let content = Content::model("models/<hippo>.glb").unwrap();
        let Content::Model { markup } = content else {
            panic!("expected model content");
        };
        assert!(markup.contains("<model-viewer src=\"models/&lt;hippo&gt;.glb\""));
        assert!(markup.contains("alt=\"&lt;hippo&gt;\""));
        assert!(markup.contains("camera-controls auto-rotate"));

        let Content::Model { markup } = Content::model("a&b.glb").unwrap() else {
            panic!("expected model content");
        };
        assert!(markup.contains("src=\"a&amp;b.glb\""));
    }

    #[test]
    fn group_allows_media_with_one_text() {
        let dir = TempDir::new().unwrap();
        let png = write(&dir, "a.png", b"png");
        let mp4 = write(&dir, "b.mp4", b"mp4");

        let group = Content::group(vec![
            Content::image(&png).unwrap(),
            Content::video(&mp4).unwrap(),
            Content::text("caption"),
        ])
        .unwrap();
        assert_eq!(group.kind(), ContentKind::Group);
        assert_eq!(group.summary(), "3 grouped items");
    }

    #[test]
    fn group_rules() {
        let dir = TempDir::new().unwrap();
        let png = write(&dir, "a.png", b"png");
        let doc = write(&dir, "a.pdf", b"pdf");
        let mp3 = write(&dir, "a.mp3", b"mp3");
        let image = || Content::image(&png).unwrap();

        let composition = |items: Vec<Content>| match Content::group(items) {
            Err(ContentError::Composition(e)) => Some(e),
            _ => None,
        };

        assert_eq!(composition(vec![]), Some(CompositionError::Empty));
        assert_eq!(
            composition(vec![Content::text("a"), Content::text("b")]),
            Some(CompositionError::TooManyTexts)
        );
        assert_eq!(
            composition((0..11).map(|_| image()).collect()),
            Some(CompositionError::TooManyMedia(11))
        );
        assert_eq!(
            composition(vec![image(), Content::doc(&doc).unwrap()]),
            Some(CompositionError::MixedDocuments)
        );
        assert_eq!(
            composition(vec![Content::audio(&mp3).unwrap(), image()]),
            Some(CompositionError::MixedAudio)
        );
        assert_eq!(
            composition(vec![image(), Content::buttons("pick", vec![])]),
            Some(CompositionError::Unsupported(ContentKind::Buttons))
        );

        assert!(Content::group((0..10).map(|_| image()).chain([Content::text("t")]).collect()).is_ok());
        assert!(Content::group(vec![
            Content::doc(&doc).unwrap(),
            Content::doc(&doc).unwrap(),
            Content::text("docs"),
        ])
        .is_ok());
    }

    #[test]
    fn panel_lookup() {
        let gray = Button::new("Gray");
        let pink = Button::new("Pink");
        let content = Content::buttons("What color?", vec![gray.clone()]);
        let panel = content.panel().unwrap();

        assert!(panel.contains(gray.id()));
        assert!(!panel.contains(pink.id()));
        assert_eq!(panel.button(gray.id()).map(Button::label), Some("Gray"));
        assert!(Content::text("x").panel().is_none());
    }
}
