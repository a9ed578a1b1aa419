//! Script inspection commands

use std::path::Path;

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::debug;

use super::output::Output;
use crate::domain::{sample, Condition, Finding, NoopConverter, Post, Script};
use crate::storage::{load_script, Config};

/// Loads a script for inspection; media is validated but never converted
pub(super) fn open_script(config: &Config, file: Option<&Path>) -> Result<Script> {
    match file {
        Some(path) => {
            debug!(path = %path.display(), "loading script");
            load_script(path, &config.project.media, &NoopConverter)
        }
        None => Ok(sample::hippo()),
    }
}

#[derive(Serialize)]
struct FindingView<'a> {
    #[serde(flatten)]
    finding: &'a Finding,
    name: String,
    message: String,
}

#[derive(Serialize)]
struct CheckReport<'a> {
    posts: usize,
    start: Option<String>,
    findings: Vec<FindingView<'a>>,
}

fn describe(script: &Script, finding: &Finding) -> String {
    let name = script.display_name(finding.post());
    match finding {
        Finding::Unreachable { .. } => format!("{} cannot be reached from the start post", name),
        Finding::DeadEnd { .. } => format!("{} has no transitions; the script ends there", name),
        Finding::ShadowedRule { rule, .. } => {
            format!("rule {} of {} follows an unconditional rule and never fires", rule + 1, name)
        }
        Finding::ForeignButton { rule, .. } => {
            format!("rule {} of {} waits for a button the post does not show", rule + 1, name)
        }
    }
}

/// Reports structural findings
pub fn check(output: &Output, config: &Config, file: Option<&Path>, strict: bool) -> Result<()> {
    let script = open_script(config, file)?;
    let findings = script.check();

    let report = CheckReport {
        posts: script.len(),
        start: script.start().map(|id| script.display_name(id)),
        findings: findings
            .iter()
            .map(|f| FindingView {
                finding: f,
                name: script.display_name(f.post()),
                message: describe(&script, f),
            })
            .collect(),
    };

    if output.is_json() {
        output.data(&report);
    } else {
        output.line(&format!(
            "{} posts, starting at {}",
            report.posts,
            report.start.as_deref().unwrap_or("-")
        ));
        for view in &report.findings {
            output.line(&format!("  - {}", view.message));
        }
        if report.findings.is_empty() {
            output.line("No problems found");
        }
    }

    if strict && !findings.is_empty() {
        bail!("{} finding(s) reported", findings.len());
    }
    Ok(())
}

/// Prints the DOT graph
pub fn graph(output: &Output, config: &Config, file: Option<&Path>) -> Result<()> {
    let script = open_script(config, file)?;
    let dot = script.to_dot();

    if output.is_json() {
        output.data(&serde_json::json!({ "dot": dot }));
    } else {
        print!("{}", dot);
    }
    Ok(())
}

/// Loads a script with real media conversion
pub fn prepare(output: &Output, config: &Config, file: &Path) -> Result<()> {
    let converter = config.project.media.converter();
    debug!(ffmpeg = %converter.program(), "preparing media");

    let script = load_script(file, &config.project.media, &converter)?;
    let media = script.iter().filter(|(_, p)| p.content.file().is_some()).count();
    output.success(&format!(
        "Prepared {} posts ({} with media) from {}",
        script.len(),
        media,
        file.display()
    ));
    Ok(())
}

#[derive(Serialize)]
struct RuleView {
    to: String,
    condition: String,
}

#[derive(Serialize)]
struct PostView {
    id: usize,
    name: String,
    kind: String,
    summary: String,
    next: Vec<RuleView>,
}

fn rule_label(from: &Post, condition: &Condition) -> String {
    match condition {
        Condition::Unconditional => "always".to_string(),
        Condition::Exact(token) => format!("reply is \"{}\"", token),
        Condition::Keyword(token) => format!("reply contains \"{}\"", token),
        Condition::Button(id) => from
            .content
            .panel()
            .and_then(|p| p.button(id))
            .map(|b| format!("button {}", b.label()))
            .unwrap_or_else(|| format!("button {}", id)),
    }
}

/// Lists the built-in sample script
pub fn sample(output: &Output) -> Result<()> {
    let script = sample::hippo();
    let posts: Vec<PostView> = script
        .iter()
        .map(|(id, post)| PostView {
            id: id.index(),
            name: script.display_name(id),
            kind: post.content.kind().to_string(),
            summary: post.content.summary(),
            next: post
                .transitions()
                .iter()
                .map(|t| RuleView {
                    to: script.display_name(t.target),
                    condition: rule_label(post, &t.condition),
                })
                .collect(),
        })
        .collect();

    if output.is_json() {
        output.data(&posts);
        return Ok(());
    }

    for view in &posts {
        output.row(&[view.name.as_str(), view.kind.as_str(), view.summary.as_str()]);
        for rule in &view.next {
            output.line(&format!("    -> {} ({})", rule.to, rule.condition));
        }
    }
    Ok(())
}
