use anyhow::{Context, Result, bail};
use std::io::{self, Write};
use std::path::Path;

use git_rewind::cli;
use git_rewind::cursor::{Cursor, Navigation};
use git_rewind::git::GitCli;
use git_rewind::logging::init_logging;
use git_rewind::tui::{App, run_tui};

fn main() -> Result<()> {
    let args = cli::parse_args();
    init_logging(&args.log_config()).context("Failed to initialize logging")?;

    let history = GitCli::new(args.rev.clone()).context("Invalid --rev")?;
    let branch = history.branch().to_string();
    let cursor = Cursor::new(history);

    match (&args.file, args.print) {
        (Some(path), true) => handle_print(cursor, &branch, path, args.at.as_deref()),
        (file, _) => {
            let mut app = App::new(cursor);
            if let Some(path) = file {
                app.open(path.clone());
            }
            run_tui(app)
        }
    }
}

/// Print the blame of one revision without starting the TUI.
///
/// Lines introduced by the printed revision are marked with `+`.
fn handle_print(
    mut cursor: Cursor<GitCli>,
    branch: &str,
    path: &Path,
    at: Option<&str>,
) -> Result<()> {
    cursor
        .load_file(path)
        .with_context(|| format!("Failed to load {} on {}", path.display(), branch))?;

    if let Some(prefix) = at {
        let navigation = cursor
            .go_to_revision_prefix(prefix)
            .with_context(|| format!("Failed to load revision {}", prefix))?;
        if navigation == Navigation::NotFound {
            bail!(
                "Revision {} is not in the history of {} on {}",
                prefix,
                path.display(),
                branch
            );
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in cursor.lines() {
        let marker = if cursor.is_current_revision(line) {
            '+'
        } else {
            ' '
        };
        writeln!(out, "{}{}{}", marker, line.gutter(), line.text)?;
    }
    out.flush()?;

    Ok(())
}
