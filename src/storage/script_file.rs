//! Script definitions in TOML
//!
//! ```toml
//! start = "question"
//!
//! [[posts]]
//! name = "question"
//! kind = "buttons"
//! caption = "What color is the hippo?"
//! buttons = [{ key = "pink", label = "Pink" }, "Gray"]
//!
//! [[posts.next]]
//! to = "cartoon"
//! button = "pink"
//!
//! [[posts]]
//! name = "cartoon"
//! kind = "text"
//! text = "Only in cartoons"
//!
//! [[posts.next]]
//! to = "question"
//! ```
//!
//! A `next` entry holds at most one of `exact`, `keyword` or `button`;
//! with none of them the transition is unconditional. Media paths are
//! relative to the script file. Group posts list other posts by name in
//! `members` and copy their content.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::config::MediaConfig;
use crate::domain::{
    Button, ButtonId, CompositionError, Condition, Content, ContentError, ContentKind, MediaConverter,
    Script,
};

#[derive(Debug, Error)]
pub enum ScriptFileError {
    #[error("Failed to parse script: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Script has no posts")]
    NoPosts,

    #[error("Post name used twice: {0}")]
    DuplicateName(String),

    #[error("Start post '{0}' is not defined")]
    UnknownStart(String),

    #[error("Post '{from}' links to undefined post '{to}'")]
    UnknownTarget { from: String, to: String },

    #[error("Post '{post}' has a rule with more than one of exact/keyword/button")]
    AmbiguousRule { post: String },

    #[error("Post '{post}' has no button '{key}'")]
    UnknownButton { post: String, key: String },

    #[error("Post '{post}' defines button '{key}' twice")]
    DuplicateButton { post: String, key: String },

    #[error("Group '{post}' lists undefined member '{member}'")]
    UnknownMember { post: String, member: String },

    #[error("Post '{post}': {source}")]
    Content {
        post: String,
        #[source]
        source: ContentError,
    },
}

/// A button given either as a bare label or with an explicit key
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ButtonDef {
    Label(String),
    Keyed { key: String, label: String },
}

impl ButtonDef {
    /// Key used by `next.button`; bare labels are keyed by their lowercase form
    pub fn key(&self) -> String {
        match self {
            ButtonDef::Label(label) => label.to_lowercase(),
            ButtonDef::Keyed { key, .. } => key.clone(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ButtonDef::Label(label) | ButtonDef::Keyed { label, .. } => label,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostBody {
    Text { text: String },
    Image { file: PathBuf },
    Video { file: PathBuf },
    Voice { file: PathBuf },
    Gif { file: PathBuf },
    Round { file: PathBuf, side: Option<u32> },
    Model { file: PathBuf },
    Doc { file: PathBuf },
    Audio { file: PathBuf },
    Sticker { file: PathBuf },
    Buttons { caption: String, buttons: Vec<ButtonDef> },
    Group { members: Vec<String> },
}

#[derive(Debug, Clone, Deserialize)]
pub struct NextDef {
    pub to: String,
    pub exact: Option<String>,
    pub keyword: Option<String>,
    pub button: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostDef {
    pub name: String,
    #[serde(flatten)]
    pub body: PostBody,
    #[serde(default)]
    pub next: Vec<NextDef>,
}

/// Parsed but not yet validated script file
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptFile {
    pub start: Option<String>,
    #[serde(default)]
    pub posts: Vec<PostDef>,
}

impl ScriptFile {
    pub fn parse(source: &str) -> Result<Self, ScriptFileError> {
        Ok(toml::from_str(source)?)
    }

    /// Builds the script, validating media relative to `base_dir`
    pub fn build(
        &self,
        base_dir: &Path,
        media: &MediaConfig,
        converter: &dyn MediaConverter,
    ) -> Result<Script, ScriptFileError> {
        if self.posts.is_empty() {
            return Err(ScriptFileError::NoPosts);
        }

        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, def) in self.posts.iter().enumerate() {
            if index.insert(def.name.as_str(), i).is_some() {
                return Err(ScriptFileError::DuplicateName(def.name.clone()));
            }
        }

        // groups copy member content, so plain posts are built first
        let mut contents: Vec<Option<Content>> = vec![None; self.posts.len()];
        let mut buttons: HashMap<usize, HashMap<String, ButtonId>> = HashMap::new();
        for (i, def) in self.posts.iter().enumerate() {
            let content = match &def.body {
                PostBody::Group { .. } => continue,
                PostBody::Buttons { caption, buttons: defs } => {
                    let (content, keys) = build_buttons(&def.name, caption, defs)?;
                    buttons.insert(i, keys);
                    content
                }
                body => match build_plain(body, base_dir, media, converter) {
                    Ok(Some(content)) => content,
                    Ok(None) => continue,
                    Err(source) => {
                        return Err(ScriptFileError::Content {
                            post: def.name.clone(),
                            source,
                        })
                    }
                },
            };
            contents[i] = Some(content);
        }

        for (i, def) in self.posts.iter().enumerate() {
            let PostBody::Group { members } = &def.body else {
                continue;
            };
            let mut items = Vec::with_capacity(members.len());
            for member in members {
                let unknown = || ScriptFileError::UnknownMember {
                    post: def.name.clone(),
                    member: member.clone(),
                };
                let m = *index.get(member.as_str()).ok_or_else(unknown)?;
                if matches!(self.posts[m].body, PostBody::Group { .. }) {
                    return Err(ScriptFileError::Content {
                        post: def.name.clone(),
                        source: CompositionError::Unsupported(ContentKind::Group).into(),
                    });
                }
                items.push(contents[m].clone().ok_or_else(unknown)?);
            }
            let group = Content::group(items).map_err(|source| ScriptFileError::Content {
                post: def.name.clone(),
                source,
            })?;
            contents[i] = Some(group);
        }

        let mut script = Script::new();
        for (def, content) in self.posts.iter().zip(contents) {
            let Some(content) = content else { continue };
            script
                .add_named(def.name.clone(), content)
                .map_err(|_| ScriptFileError::DuplicateName(def.name.clone()))?;
        }

        for (i, def) in self.posts.iter().enumerate() {
            let from = script
                .id_of(&def.name)
                .map_err(|_| ScriptFileError::DuplicateName(def.name.clone()))?;
            for rule in &def.next {
                let to = script.id_of(&rule.to).map_err(|_| ScriptFileError::UnknownTarget {
                    from: def.name.clone(),
                    to: rule.to.clone(),
                })?;
                let condition = build_condition(&def.name, rule, buttons.get(&i))?;
                script
                    .add_next(from, to, condition)
                    .map_err(|_| ScriptFileError::UnknownTarget {
                        from: def.name.clone(),
                        to: rule.to.clone(),
                    })?;
            }
        }

        if let Some(start) = &self.start {
            let id = script
                .id_of(start)
                .map_err(|_| ScriptFileError::UnknownStart(start.clone()))?;
            script
                .set_start(id)
                .map_err(|_| ScriptFileError::UnknownStart(start.clone()))?;
        }

        debug!(posts = script.len(), "script built");
        Ok(script)
    }
}

fn build_buttons(
    post: &str,
    caption: &str,
    defs: &[ButtonDef],
) -> Result<(Content, HashMap<String, ButtonId>), ScriptFileError> {
    let mut keys = HashMap::new();
    let mut buttons = Vec::with_capacity(defs.len());
    for def in defs {
        let button = Button::new(def.label());
        if keys.insert(def.key(), button.id().clone()).is_some() {
            return Err(ScriptFileError::DuplicateButton {
                post: post.to_string(),
                key: def.key(),
            });
        }
        buttons.push(button);
    }
    Ok((Content::buttons(caption, buttons), keys))
}

/// Builds text and media posts; buttons and groups need the whole file
fn build_plain(
    body: &PostBody,
    base_dir: &Path,
    media: &MediaConfig,
    converter: &dyn MediaConverter,
) -> Result<Option<Content>, ContentError> {
    let path = |file: &Path| base_dir.join(file);
    let content = match body {
        PostBody::Text { text } => Content::text(text.clone()),
        PostBody::Image { file } => Content::image(path(file))?,
        PostBody::Video { file } => Content::video(path(file))?,
        PostBody::Voice { file } => Content::voice(path(file), &media.voice_format, converter)?,
        PostBody::Gif { file } => Content::gif(path(file))?,
        PostBody::Round { file, side } => {
            Content::round(path(file), side.unwrap_or(media.round_side), converter)?
        }
        PostBody::Model { file } => Content::model(path(file))?,
        PostBody::Doc { file } => Content::doc(path(file))?,
        PostBody::Audio { file } => Content::audio(path(file))?,
        PostBody::Sticker { file } => Content::sticker(path(file))?,
        PostBody::Buttons { .. } | PostBody::Group { .. } => return Ok(None),
    };
    Ok(Some(content))
}

fn build_condition(
    post: &str,
    rule: &NextDef,
    buttons: Option<&HashMap<String, ButtonId>>,
) -> Result<Condition, ScriptFileError> {
    let set = [&rule.exact, &rule.keyword, &rule.button]
        .iter()
        .filter(|v| v.is_some())
        .count();
    if set > 1 {
        return Err(ScriptFileError::AmbiguousRule {
            post: post.to_string(),
        });
    }

    if let Some(token) = &rule.exact {
        return Ok(Condition::exact(token.clone()));
    }
    if let Some(token) = &rule.keyword {
        return Ok(Condition::keyword(token.clone()));
    }
    if let Some(key) = &rule.button {
        let id = buttons
            .and_then(|keys| keys.get(key))
            .ok_or_else(|| ScriptFileError::UnknownButton {
                post: post.to_string(),
                key: key.clone(),
            })?;
        return Ok(Condition::Button(id.clone()));
    }
    Ok(Condition::Unconditional)
}

/// Reads and builds a script file
pub fn load(path: &Path, media: &MediaConfig, converter: &dyn MediaConverter) -> Result<Script> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read script: {}", path.display()))?;
    let file = ScriptFile::parse(&source)
        .with_context(|| format!("Invalid script file: {}", path.display()))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    file.build(base_dir, media, converter)
        .with_context(|| format!("Failed to build script: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NoopConverter, Session, Step};
    use tempfile::TempDir;

    const HIPPO: &str = r#"
start = "question"

[[posts]]
name = "cartoon"
kind = "text"
text = "Only in cartoons"

[[posts.next]]
to = "question"

[[posts]]
name = "question"
kind = "buttons"
caption = "What color is the hippo?"
buttons = [{ key = "pink", label = "Pink" }, "Gray"]

[[posts.next]]
to = "cartoon"
button = "pink"

[[posts.next]]
to = "real"
button = "gray"

[[posts]]
name = "real"
kind = "text"
text = "Correct!"

[[posts.next]]
to = "end"
exact = "bye"

[[posts.next]]
to = "end"
keyword = "enough"

[[posts]]
name = "end"
kind = "text"
text = "Goodbye"
"#;

    fn build(source: &str, dir: &Path) -> Result<Script, ScriptFileError> {
        ScriptFile::parse(source)?.build(dir, &MediaConfig::default(), &NoopConverter)
    }

    #[test]
    fn loads_hippo() {
        let dir = TempDir::new().unwrap();
        let script = build(HIPPO, dir.path()).unwrap();

        let question = script.id_of("question").unwrap();
        let cartoon = script.id_of("cartoon").unwrap();
        let real = script.id_of("real").unwrap();
        let end = script.id_of("end").unwrap();
        assert_eq!(script.start(), Some(question));

        let mut session = Session::new(&script).unwrap();
        assert_eq!(session.press("pink"), Step::Moved(cartoon));
        assert_eq!(session.advance(None), Step::Moved(question));
        assert_eq!(session.press("pink"), Step::Waiting);
        assert_eq!(session.press("gray"), Step::Moved(real));
        assert_eq!(session.advance(Some("that's ENOUGH")), Step::Moved(end));
    }

    #[test]
    fn first_post_is_default_start() {
        let dir = TempDir::new().unwrap();
        let source = "[[posts]]\nname = \"a\"\nkind = \"text\"\ntext = \"hi\"\n";
        let script = build(source, dir.path()).unwrap();
        assert_eq!(script.start(), script.id_of("a").ok());
    }

    #[test]
    fn rejects_bad_references() {
        let dir = TempDir::new().unwrap();
        let text = |name: &str, next: &str| {
            format!("[[posts]]\nname = \"{name}\"\nkind = \"text\"\ntext = \"x\"\n{next}")
        };

        let missing_target = text("a", "[[posts.next]]\nto = \"nowhere\"\n");
        assert!(matches!(
            build(&missing_target, dir.path()),
            Err(ScriptFileError::UnknownTarget { .. })
        ));

        let twice = format!("{}{}", text("a", ""), text("a", ""));
        assert!(matches!(
            build(&twice, dir.path()),
            Err(ScriptFileError::DuplicateName(_))
        ));

        let ambiguous = text("a", "[[posts.next]]\nto = \"a\"\nexact = \"x\"\nkeyword = \"y\"\n");
        assert!(matches!(
            build(&ambiguous, dir.path()),
            Err(ScriptFileError::AmbiguousRule { .. })
        ));

        let no_button = text("a", "[[posts.next]]\nto = \"a\"\nbutton = \"pink\"\n");
        assert!(matches!(
            build(&no_button, dir.path()),
            Err(ScriptFileError::UnknownButton { .. })
        ));

        let bad_start = format!("start = \"b\"\n{}", text("a", ""));
        assert!(matches!(
            build(&bad_start, dir.path()),
            Err(ScriptFileError::UnknownStart(_))
        ));

        assert!(matches!(build("", dir.path()), Err(ScriptFileError::NoPosts)));
        assert!(matches!(build("posts = 3", dir.path()), Err(ScriptFileError::Parse(_))));
    }

    #[test]
    fn duplicate_button_keys() {
        let dir = TempDir::new().unwrap();
        let source = r#"
[[posts]]
name = "menu"
kind = "buttons"
caption = "pick"
buttons = ["Pink", { key = "pink", label = "Also pink" }]
"#;
        assert!(matches!(
            build(source, dir.path()),
            Err(ScriptFileError::DuplicateButton { .. })
        ));
    }

    #[test]
    fn media_is_relative_to_script() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("logo.png"), b"png").unwrap();
        fs::write(dir.path().join("face.mp4"), b"mp4").unwrap();

        let source = r#"
[[posts]]
name = "logo"
kind = "image"
file = "logo.png"

[[posts]]
name = "round"
kind = "round"
file = "face.mp4"

[[posts]]
name = "caption"
kind = "text"
text = "Our logo"

[[posts]]
name = "album"
kind = "group"
members = ["logo", "caption"]
"#;
        let script = build(source, dir.path()).unwrap();
        let logo = script.post(script.id_of("logo").unwrap()).unwrap();
        assert_eq!(logo.content.file(), Some(dir.path().join("logo.png").as_path()));

        let round = script.post(script.id_of("round").unwrap()).unwrap();
        assert!(matches!(round.content, Content::Round { side: 480, .. }));

        let album = script.post(script.id_of("album").unwrap()).unwrap();
        assert_eq!(album.content.kind(), ContentKind::Group);
    }

    #[test]
    fn media_errors_name_the_post() {
        let dir = TempDir::new().unwrap();
        let source = "[[posts]]\nname = \"pic\"\nkind = \"image\"\nfile = \"missing.png\"\n";
        let err = build(source, dir.path()).unwrap_err();
        assert!(matches!(
            &err,
            ScriptFileError::Content { post, source: ContentError::Missing(_) } if post == "pic"
        ));
    }

    #[test]
    fn group_errors() {
        let dir = TempDir::new().unwrap();
        let source = r#"
[[posts]]
name = "a"
kind = "text"
text = "one"

[[posts]]
name = "b"
kind = "text"
text = "two"

[[posts]]
name = "pair"
kind = "group"
members = ["a", "b"]
"#;
        assert!(matches!(
            build(source, dir.path()),
            Err(ScriptFileError::Content { source: ContentError::Composition(_), .. })
        ));

        let unknown = "[[posts]]\nname = \"g\"\nkind = \"group\"\nmembers = [\"x\"]\n";
        assert!(matches!(
            build(unknown, dir.path()),
            Err(ScriptFileError::UnknownMember { .. })
        ));

        let nested = "[[posts]]\nname = \"g\"\nkind = \"group\"\nmembers = [\"g\"]\n";
        assert!(matches!(
            build(nested, dir.path()),
            Err(ScriptFileError::Content {
                source: ContentError::Composition(CompositionError::Unsupported(ContentKind::Group)),
                ..
            })
        ));
    }

    #[test]
    fn load_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hippo.toml");
        fs::write(&path, HIPPO).unwrap();

        let script = load(&path, &MediaConfig::default(), &NoopConverter).unwrap();
        assert_eq!(script.len(), 4);

        assert!(load(&dir.path().join("missing.toml"), &MediaConfig::default(), &NoopConverter).is_err());
    }
}
