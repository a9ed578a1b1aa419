//! botscript - branching message scripts for chat bots
//!
//! A script is a graph of posts (text, media, buttons, media groups) joined
//! by transitions that fire on the user's reply. Given the current post and
//! a reply, the crate decides which post comes next; delivering posts to a
//! messenger is left to the embedding bot.

pub mod domain;
pub mod storage;
pub mod cli;

pub use domain::{Button, Condition, Content, Post, PostId, Script, Session, Step};
