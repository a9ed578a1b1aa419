//! Terminal player
//!
//! Stands in for a messenger: prints each post, reads replies line by line
//! and lets the session decide where to go. Buttons are pressed by typing
//! their label.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::debug;

use super::output::Output;
use super::script_cmd::open_script;
use crate::domain::{Content, PostId, Script, Session, Step};
use crate::storage::Config;

/// What the player emits, one JSON object per line in JSON mode
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event<'a> {
    Post {
        post: String,
        kind: &'a str,
        text: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        buttons: Vec<&'a str>,
    },
    NoMatch {
        reply: &'a str,
    },
    End {
        post: String,
        visited: usize,
    },
}

fn emit<W: Write>(out: &mut W, json: bool, event: &Event<'_>) -> io::Result<()> {
    if json {
        let line = serde_json::to_string(event).map_err(io::Error::other)?;
        return writeln!(out, "{}", line);
    }
    match event {
        Event::Post { text, buttons, .. } => {
            writeln!(out, "> {}", text)?;
            if !buttons.is_empty() {
                let labels: Vec<String> = buttons.iter().map(|b| format!("[{}]", b)).collect();
                writeln!(out, "  {}", labels.join(" "))?;
            }
        }
        Event::NoMatch { reply } => writeln!(out, "  (no transition for \"{}\")", reply)?,
        Event::End { visited, .. } => writeln!(out, "-- end of script ({} posts shown) --", visited)?,
    }
    Ok(())
}

fn post_event<'s>(session: &Session<'s>, id: PostId) -> Event<'s> {
    let script: &'s Script = session.script();
    let post = &script[id];
    let text = match &post.content {
        Content::Group { items } => items
            .iter()
            .map(Content::summary)
            .collect::<Vec<_>>()
            .join(" | "),
        other => other.summary(),
    };
    Event::Post {
        post: script.display_name(id),
        kind: post.content.kind().as_str(),
        text,
        buttons: session.live_buttons(id).into_iter().map(|b| b.label()).collect(),
    }
}

/// Plays a script until it ends or input runs out; returns the visited posts
pub(crate) fn play_session<R: BufRead, W: Write>(
    script: &Script,
    input: R,
    out: &mut W,
    json: bool,
    max_auto_steps: usize,
) -> Result<Vec<PostId>> {
    let mut session = Session::new(script)?;
    let mut lines = input.lines();
    let mut auto_steps = 0;
    emit(out, json, &post_event(&session, session.current()))?;

    loop {
        // posts without a pending question move on by themselves
        match session.advance(None) {
            Step::Moved(next) => {
                auto_steps += 1;
                if auto_steps > max_auto_steps {
                    bail!(
                        "More than {} posts in a row without waiting for a reply; check for unconditional loops",
                        max_auto_steps
                    );
                }
                emit(out, json, &post_event(&session, next))?;
                continue;
            }
            Step::Finished => break,
            Step::Waiting => {}
        }

        out.flush()?;
        let Some(line) = lines.next() else {
            debug!("input closed");
            break;
        };
        let line = line.context("Failed to read reply")?;
        let reply = line.trim();
        auto_steps = 0;

        match session.press(reply) {
            Step::Moved(next) => emit(out, json, &post_event(&session, next))?,
            Step::Waiting => emit(out, json, &Event::NoMatch { reply })?,
            Step::Finished => break,
        }
    }

    emit(
        out,
        json,
        &Event::End {
            post: script.display_name(session.current()),
            visited: session.history().len(),
        },
    )?;
    Ok(session.history().to_vec())
}

/// Runs the player on stdin/stdout
pub fn run(output: &Output, config: &Config, file: Option<&Path>) -> Result<()> {
    let script = open_script(config, file)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    let visited = play_session(
        &script,
        stdin.lock(),
        &mut stdout,
        output.is_json(),
        config.project.play.max_auto_steps,
    )?;
    debug!(visited = visited.len(), "play finished");
    Ok(())
}
