//! One user's walk through a script
//!
//! The script itself is shared and immutable; everything that changes while
//! a user talks to the bot (current post, used buttons) lives here. Buttons
//! are used up per post: pressing a button on one post leaves the same
//! button live on every other post that shows it.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::button::{Button, ButtonId};
use super::post::{Post, PostId};
use super::script::{Script, ScriptError};
use super::transition::Condition;

/// Outcome of feeding a reply to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Moved to a new post
    Moved(PostId),
    /// The reply matched nothing; the current post still has rules that can fire
    Waiting,
    /// The current post has no rule left that could ever fire
    Finished,
}

/// Traversal state for a single user
#[derive(Debug, Clone)]
pub struct Session<'s> {
    script: &'s Script,
    current: PostId,
    consumed: HashMap<PostId, HashSet<ButtonId>>,
    history: Vec<PostId>,
}

impl<'s> Session<'s> {
    /// Starts at the script's start post
    pub fn new(script: &'s Script) -> Result<Self, ScriptError> {
        let start = script.start().ok_or(ScriptError::NoStart)?;
        Self::at(script, start)
    }

    /// Starts at an arbitrary post
    pub fn at(script: &'s Script, post: PostId) -> Result<Self, ScriptError> {
        if script.post(post).is_none() {
            return Err(ScriptError::UnknownPost(post));
        }
        Ok(Self {
            script,
            current: post,
            consumed: HashMap::new(),
            history: vec![post],
        })
    }

    pub fn script(&self) -> &'s Script {
        self.script
    }

    pub fn current(&self) -> PostId {
        self.current
    }

    pub fn current_post(&self) -> &'s Post {
        // ids are validated on entry and transitions only point at existing posts
        let script: &'s Script = self.script;
        &script[self.current]
    }

    /// Posts visited so far, starting with the first one
    pub fn history(&self) -> &[PostId] {
        &self.history
    }

    /// Returns true if `button` has already been pressed on `post`
    pub fn is_consumed(&self, post: PostId, button: &ButtonId) -> bool {
        self.consumed.get(&post).is_some_and(|used| used.contains(button))
    }

    /// Feeds a reply (or `None` when nothing was received) to the current post
    pub fn advance(&mut self, received: Option<&str>) -> Step {
        let post = self.current_post();
        let used = self.consumed.entry(self.current).or_default();
        match post.next(received, used) {
            Some(next) => {
                debug!(from = %self.current, to = %next, "session advanced");
                self.current = next;
                self.history.push(next);
                Step::Moved(next)
            }
            None if self.is_finished() => Step::Finished,
            None => Step::Waiting,
        }
    }

    /// Presses a button of the current post by its label, ignoring case
    pub fn press(&mut self, label: &str) -> Step {
        let id = self
            .live_buttons(self.current)
            .into_iter()
            .find(|b| b.label().to_lowercase() == label.to_lowercase())
            .map(|b| b.id().clone());
        match id {
            Some(id) => self.advance(Some(id.as_str())),
            None => self.advance(Some(label)),
        }
    }

    /// Buttons of a post that have not been pressed in this session
    pub fn live_buttons(&self, post: PostId) -> Vec<&'s Button> {
        let script: &'s Script = self.script;
        let Some(panel) = script.post(post).and_then(|p| p.content.panel()) else {
            return Vec::new();
        };
        panel
            .buttons
            .iter()
            .filter(|b| !self.is_consumed(post, b.id()))
            .collect()
    }

    /// Returns true if no rule of the current post can fire any more
    pub fn is_finished(&self) -> bool {
        let post = self.current_post();
        let none = HashSet::new();
        let used = self.consumed.get(&self.current).unwrap_or(&none);
        !post.transitions().iter().any(|t| match &t.condition {
            Condition::Button(id) => post.is_live(id, used),
            _ => true,
        })
    }

    /// Returns to the start post and forgets pressed buttons
    pub fn reset(&mut self) -> Result<(), ScriptError> {
        let start = self.script.start().ok_or(ScriptError::NoStart)?;
        self.current = start;
        self.consumed.clear();
        self.history = vec![start];
        Ok(())
    }
}
