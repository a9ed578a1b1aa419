//! Script graph
//!
//! A [`Script`] owns every post of one scenario and knows where it starts.
//! Posts are wired together with [`Script::add_next`]. Once built, a script
//! is never mutated by traversal, so one instance can back any number of
//! [`Session`](super::session::Session)s.
//!
//! Structural checks (unreachable posts, dead ends, shadowed rules) run on a
//! petgraph view of the transitions.

use std::collections::{HashMap, HashSet};
use std::ops::Index;

use petgraph::dot::{Config as DotConfig, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use serde::Serialize;
use thiserror::Error;

use super::content::{Content, ContentKind};
use super::post::{Post, PostId};
use super::transition::Condition;

#[derive(Debug, Error, PartialEq)]
pub enum ScriptError {
    #[error("Post not found: {0}")]
    UnknownPost(PostId),

    #[error("Post name already used: {0}")]
    DuplicateName(String),

    #[error("No post named '{0}'")]
    UnknownName(String),

    #[error("Script has no start post")]
    NoStart,
}

/// Something worth fixing in a script that still loads
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "finding", rename_all = "snake_case")]
pub enum Finding {
    /// No path leads from the start post to this one
    Unreachable { post: PostId },
    /// The post has no transitions; a session ends here
    DeadEnd { post: PostId },
    /// A rule follows an unconditional one and can never fire
    ShadowedRule { post: PostId, rule: usize },
    /// A button rule refers to a button this post does not show
    ForeignButton { post: PostId, rule: usize },
}

impl Finding {
    pub fn post(&self) -> PostId {
        match self {
            Finding::Unreachable { post }
            | Finding::DeadEnd { post }
            | Finding::ShadowedRule { post, .. }
            | Finding::ForeignButton { post, .. } => *post,
        }
    }
}

/// All posts of one scenario
#[derive(Debug, Clone, Default)]
pub struct Script {
    posts: Vec<Post>,
    names: HashMap<String, PostId>,
    start: Option<PostId>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a post; the first post added becomes the start post
    pub fn add(&mut self, content: Content) -> PostId {
        let id = PostId(self.posts.len());
        self.posts.push(Post::new(content));
        if self.start.is_none() {
            self.start = Some(id);
        }
        id
    }

    /// Adds a post that can be looked up by name
    pub fn add_named(&mut self, name: impl Into<String>, content: Content) -> Result<PostId, ScriptError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(ScriptError::DuplicateName(name));
        }
        let id = self.add(content);
        self.names.insert(name, id);
        Ok(id)
    }

    /// Appends a transition from `from` to `to`
    pub fn add_next(&mut self, from: PostId, to: PostId, condition: Condition) -> Result<(), ScriptError> {
        if to.0 >= self.posts.len() {
            return Err(ScriptError::UnknownPost(to));
        }
        let post = self
            .posts
            .get_mut(from.0)
            .ok_or(ScriptError::UnknownPost(from))?;
        post.add_next(to, condition);
        Ok(())
    }

    pub fn set_start(&mut self, id: PostId) -> Result<(), ScriptError> {
        if id.0 >= self.posts.len() {
            return Err(ScriptError::UnknownPost(id));
        }
        self.start = Some(id);
        Ok(())
    }

    pub fn start(&self) -> Option<PostId> {
        self.start
    }

    pub fn post(&self, id: PostId) -> Option<&Post> {
        self.posts.get(id.0)
    }

    /// Looks up a post id by name
    pub fn id_of(&self, name: &str) -> Result<PostId, ScriptError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| ScriptError::UnknownName(name.to_string()))
    }

    /// Returns the name of a post, if it was added with one
    pub fn name_of(&self, id: PostId) -> Option<&str> {
        self.names
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(k, _)| k.as_str())
    }

    /// Name if known, otherwise the numeric id
    pub fn display_name(&self, id: PostId) -> String {
        self.name_of(id)
            .map(str::to_string)
            .unwrap_or_else(|| id.to_string())
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PostId, &Post)> {
        self.posts.iter().enumerate().map(|(i, p)| (PostId(i), p))
    }

    /// Builds a directed graph with one node per post and one edge per rule
    pub fn graph(&self) -> DiGraph<PostId, Condition> {
        let mut graph = DiGraph::with_capacity(self.posts.len(), 0);
        let nodes: Vec<NodeIndex> = self.iter().map(|(id, _)| graph.add_node(id)).collect();

        for (id, post) in self.iter() {
            for transition in post.transitions() {
                graph.add_edge(
                    nodes[id.0],
                    nodes[transition.target.0],
                    transition.condition.clone(),
                );
            }
        }
        graph
    }

    /// Posts reachable from the start post (including it)
    pub fn reachable(&self) -> HashSet<PostId> {
        let Some(start) = self.start else {
            return HashSet::new();
        };

        // node indices equal post indices since nodes are added in order
        let graph = self.graph();
        let mut dfs = Dfs::new(&graph, NodeIndex::new(start.0));
        let mut seen = HashSet::new();
        while let Some(idx) = dfs.next(&graph) {
            seen.insert(graph[idx]);
        }
        seen
    }

    /// Runs all structural checks
    pub fn check(&self) -> Vec<Finding> {
        let reachable = self.reachable();
        let mut findings = Vec::new();

        for (id, post) in self.iter() {
            if !reachable.contains(&id) {
                findings.push(Finding::Unreachable { post: id });
            }
            if post.is_dead_end() {
                findings.push(Finding::DeadEnd { post: id });
            }

            let panel = post.content.panel();
            let mut shadowed = false;
            for (rule, transition) in post.transitions().iter().enumerate() {
                if shadowed {
                    findings.push(Finding::ShadowedRule { post: id, rule });
                }
                match &transition.condition {
                    Condition::Unconditional => shadowed = true,
                    Condition::Button(button) if !panel.is_some_and(|p| p.contains(button)) => {
                        findings.push(Finding::ForeignButton { post: id, rule });
                    }
                    _ => {}
                }
            }
        }
        findings
    }

    /// Renders the transitions in Graphviz DOT
    pub fn to_dot(&self) -> String {
        let graph = self.graph();
        // same indices as `graph`, weights replaced by their labels
        let labels = graph.map(
            |_, &id| {
                format!(
                    "{}\n{}",
                    self.display_name(id),
                    truncate(&self[id].content.summary(), 40)
                )
            },
            |edge, condition| match condition {
                Condition::Button(button_id) => graph
                    .edge_endpoints(edge)
                    .and_then(|(source, _)| self[graph[source]].content.panel())
                    .and_then(|panel| panel.button(button_id))
                    .map(|b| format!("[{}]", b.label()))
                    .unwrap_or_else(|| condition.label()),
                other => other.label(),
            },
        );

        let edge_attrs = |_, _| String::new();
        let node_attrs = |_, (idx, _)| {
            let id = graph[idx];
            let shape = match self[id].content.kind() {
                ContentKind::Buttons => "box",
                ContentKind::Group => "folder",
                _ => "ellipse",
            };
            let peripheries = if Some(id) == self.start { 2 } else { 1 };
            format!("shape={} peripheries={} ", shape, peripheries)
        };
        let dot = Dot::with_attr_getters(
            &labels,
            &[DotConfig::GraphContentOnly],
            &edge_attrs,
            &node_attrs,
        );

        format!("digraph script {{\n{}}}\n", dot)
    }
}

impl Index<PostId> for Script {
    type Output = Post;

    fn index(&self, id: PostId) -> &Post {
        &self.posts[id.0]
    }
}

fn truncate(raw: &str, max: usize) -> String {
    if raw.chars().count() <= max {
        return raw.to_string();
    }
    let cut: String = raw.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut)
}
