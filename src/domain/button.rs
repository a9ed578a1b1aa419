//! Buttons and their callback identifiers
//!
//! ID Format: 10 lowercase ASCII letters (e.g. `qhzkcmwrta`).
//!
//! The letters are derived from a blake3 hash of the label, the creation
//! timestamp and a process-wide counter. Buttons with identical labels still
//! get different hash inputs; ids are practically unique (26^10 values), not
//! guaranteed unique.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of a button id
pub const BUTTON_ID_LEN: usize = 10;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid button ID: expected {BUTTON_ID_LEN} lowercase letters, got '{0}'")]
    InvalidButtonId(String),
}

/// Maps hash bytes onto `a..=z`
fn generate_letters(label: &str) -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or(0);

    let mut hasher = blake3::Hasher::new();
    hasher.update(label.as_bytes());
    hasher.update(&nanos.to_le_bytes());
    hasher.update(&seq.to_le_bytes());
    let hash = hasher.finalize();

    hash.as_bytes()[..BUTTON_ID_LEN]
        .iter()
        .map(|b| char::from(b'a' + b % 26))
        .collect()
}

/// Callback identifier sent back by the messenger when a button is pressed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ButtonId(String);

impl ButtonId {
    /// Generates a fresh id for a button with the given label
    pub fn generate(label: &str) -> Self {
        Self(generate_letters(label))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ButtonId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != BUTTON_ID_LEN || !s.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(IdError::InvalidButtonId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for ButtonId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ButtonId> for String {
    fn from(id: ButtonId) -> Self {
        id.0
    }
}

/// A selectable control shown under a buttons post
///
/// Labels and ids are fixed at creation. A transition rule refers to a
/// button by its id only; the button itself lives in the post's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    label: String,
    id: ButtonId,
}

impl Button {
    /// Creates a button with a freshly generated id
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let id = ButtonId::generate(&label);
        Self { label, id }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn id(&self) -> &ButtonId {
        &self.id
    }
}
