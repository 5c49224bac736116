//! tforge - command-line entry point of themeforge

use std::process::ExitCode;

use themeforge::cli;

fn main() -> ExitCode {
    cli::run()
}
