//! # Command-Line Interface
//!
//! Tools for authoring scripts before they go into a bot.
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `init` | Create `.botscript/config.toml` |
//! | `check` | Load a script and report structural problems |
//! | `graph` | Print the transition graph as Graphviz DOT |
//! | `prepare` | Load a script converting voice and round media with ffmpeg |
//! | `play` | Walk a script in the terminal |
//! | `sample` | List the built-in hippo quiz |
//!
//! `check`, `graph` and `play` use the built-in hippo quiz when no file is
//! given.
//!
//! ## Output Formats
//!
//! All commands support `--format`:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Logging
//!
//! `--verbose` (or `-v`) enables debug logs on stderr; `RUST_LOG` overrides
//! the filter.

mod app;
mod output;
mod play;
mod script_cmd;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
