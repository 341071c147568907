use super::{exit_code, fail, locate_bobfile};
use bob_core::Parser;
use colored::Colorize;
use std::path::PathBuf;

pub fn handle(file: Option<PathBuf>, quiet: bool) -> anyhow::Result<()> {
    let path = match locate_bobfile(file) {
        Ok(path) => path,
        Err(e) => fail(exit_code::LINT_NOT_OPENABLE, e, quiet),
    };

    let parser = match Parser::new(&path) {
        Ok(parser) => parser,
        Err(e) => fail(exit_code::LINT_NOT_OPENABLE, e, quiet),
    };

    if let Err(e) = parser.lint() {
        let code = if e.is_not_openable() {
            exit_code::LINT_NOT_OPENABLE
        } else {
            exit_code::LINT_INVALID
        };
        fail(code, e, quiet);
    }

    if !quiet {
        println!(
            "{} {}",
            "✓".green().bold(),
            path.display().to_string().cyan()
        );
    }
    Ok(())
}
