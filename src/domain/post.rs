//! Posts and transition matching
//!
//! A [`Post`] is one message of a script plus the ordered rules that decide
//! which post follows it. Posts refer to each other by [`PostId`]; the
//! [`Script`](super::script::Script) owns them.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::button::ButtonId;
use super::content::Content;
use super::transition::{Condition, Transition};

/// Index of a post inside its script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub(crate) usize);

impl PostId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One message of a script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub content: Content,
    transitions: Vec<Transition>,
}

impl Post {
    pub fn new(content: Content) -> Self {
        Self {
            content,
            transitions: Vec::new(),
        }
    }

    /// Appends a transition rule; rules are tried in insertion order
    pub fn add_next(&mut self, target: PostId, condition: Condition) {
        self.transitions.push(Transition::new(target, condition));
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Returns true if this post moves on without waiting for a reply
    pub fn advances_immediately(&self) -> bool {
        self.transitions
            .first()
            .is_some_and(|t| t.condition.is_unconditional())
    }

    /// Returns true if this post has no way forward
    pub fn is_dead_end(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Finds the next post for a reply, consuming the matched button if any
    ///
    /// `consumed` holds the buttons already pressed on this post. A button
    /// rule fires only while its button is shown by this post and not yet in
    /// `consumed`; on a match the button is added to `consumed`.
    pub fn next(&self, received: Option<&str>, consumed: &mut HashSet<ButtonId>) -> Option<PostId> {
        let transition = self.matching(received, consumed)?;
        if let Condition::Button(id) = &transition.condition {
            debug!(button = %id, "button consumed");
            consumed.insert(id.clone());
        }
        debug!(target = %transition.target, ?received, "transition matched");
        Some(transition.target)
    }

    /// Same as [`next`](Self::next) without consuming anything
    pub fn peek_next(&self, received: Option<&str>, consumed: &HashSet<ButtonId>) -> Option<PostId> {
        self.matching(received, consumed).map(|t| t.target)
    }

    fn matching(&self, received: Option<&str>, consumed: &HashSet<ButtonId>) -> Option<&Transition> {
        self.transitions.iter().find(|t| {
            if !t.condition.accepts(received) {
                return false;
            }
            match &t.condition {
                Condition::Button(id) => self.is_live(id, consumed),
                _ => true,
            }
        })
    }

    /// Returns true if this post shows the button and it has not been used
    pub fn is_live(&self, id: &ButtonId, consumed: &HashSet<ButtonId>) -> bool {
        !consumed.contains(id) && self.content.panel().is_some_and(|p| p.contains(id))
    }
}
