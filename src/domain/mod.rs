//! Domain models for botscript
//!
//! Contains the script graph and transition logic without any transport
//! concerns. File checks and media conversion happen only when content is
//! constructed.

mod button;
mod content;
mod media;
mod post;
mod script;
mod session;
mod transition;
pub mod sample;

pub use button::{Button, ButtonId, IdError, BUTTON_ID_LEN};
pub use content::{ButtonPanel, CompositionError, Content, ContentError, ContentKind, MAX_GROUP_MEDIA};
pub use media::{
    ConversionError, FfmpegConverter, MediaConverter, MediaFile, NoopConverter, DEFAULT_ROUND_SIDE,
    DEFAULT_VOICE_FORMAT,
};
pub use post::{Post, PostId};
pub use script::{Finding, Script, ScriptError};
pub use session::{Session, Step};
pub use transition::{Condition, Transition};
