//! Transition rules between posts
//!
//! A post carries an ordered list of [`Transition`]s. Each one pairs a
//! [`Condition`] over the received signal with the post to go to when the
//! condition holds. Rules are evaluated in the order they were added and the
//! first match wins.

use serde::{Deserialize, Serialize};

use super::button::{Button, ButtonId};
use super::post::PostId;

/// What a user reply must look like for a transition to fire
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Condition {
    /// Fires immediately, with or without a reply
    #[default]
    Unconditional,
    /// Reply equals the token, ignoring case
    Exact(String),
    /// Reply contains the token, ignoring case
    Keyword(String),
    /// Reply is the callback id of a button that is still live
    Button(ButtonId),
}

impl Condition {
    pub fn exact(token: impl Into<String>) -> Self {
        Condition::Exact(token.into())
    }

    pub fn keyword(token: impl Into<String>) -> Self {
        Condition::Keyword(token.into())
    }

    pub fn button(button: &Button) -> Self {
        Condition::Button(button.id().clone())
    }

    /// Returns true if this condition needs no reply
    pub fn is_unconditional(&self) -> bool {
        matches!(self, Condition::Unconditional)
    }

    /// Checks the reply against this condition
    ///
    /// For button conditions this only compares the callback id; whether the
    /// button is still live is up to the post that owns the rule.
    pub fn accepts(&self, received: Option<&str>) -> bool {
        match self {
            Condition::Unconditional => true,
            Condition::Exact(token) => {
                received.is_some_and(|r| r.to_lowercase() == token.to_lowercase())
            }
            Condition::Keyword(token) => received.is_some_and(|r| {
                let needle = token.to_lowercase();
                !needle.trim().is_empty() && r.to_lowercase().contains(&needle)
            }),
            Condition::Button(id) => received.is_some_and(|r| r == id.as_str()),
        }
    }

    /// Short label used in graph output
    pub fn label(&self) -> String {
        match self {
            Condition::Unconditional => String::new(),
            Condition::Exact(token) => format!("= {}", token),
            Condition::Keyword(token) => format!("~ {}", token),
            Condition::Button(id) => format!("[{}]", id),
        }
    }
}

/// A rule leading from one post to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub condition: Condition,
    pub target: PostId,
}

impl Transition {
    pub fn new(target: PostId, condition: Condition) -> Self {
        Self { condition, target }
    }
}
