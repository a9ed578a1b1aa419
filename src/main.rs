//! botscript - check, render and play chat bot scripts

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = botscript::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
