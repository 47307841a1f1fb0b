//! Resolve a query to a single repository and open a shell inside it.

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc;

use crate::error::{Error, Result};
use crate::local::LocalRepository;
use crate::workspace::Workspace;

/// Environment variable carrying the repository's `/`-separated relative path.
pub const LOOK_ENV: &str = "GHQ_LOOK";

/// Runs an interactive program in a directory and waits for it.
pub trait Launcher {
    fn launch(&self, dir: &Path, env: &[(&str, String)]) -> Result<ExitStatus>;
}

/// Starts the configured shell with inherited standard streams.
#[derive(Debug, Clone)]
pub struct ShellLauncher {
    argv: Vec<String>,
}

impl ShellLauncher {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl Launcher for ShellLauncher {
    fn launch(&self, dir: &Path, env: &[(&str, String)]) -> Result<ExitStatus> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(Error::io(
                dir,
                io::Error::new(io::ErrorKind::InvalidInput, "no shell configured"),
            ));
        };
        tracing::debug!(shell = %program, dir = %dir.display(), "launching shell");
        Command::new(program)
            .args(args)
            .current_dir(dir)
            .envs(env.iter().map(|(key, value)| (*key, value)))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|err| Error::io(dir, err))
    }
}

/// Every scanned repository matching `query`, sorted by relative path.
pub fn find_matches(ws: &Workspace, query: &str) -> Result<Vec<LocalRepository>> {
    let (tx, rx) = mpsc::channel();
    ws.walker().walk(|repo| {
        if repo.matches(query) {
            // The receiver outlives the walk.
            let _ = tx.send(repo);
        }
    })?;
    drop(tx);

    let mut found: Vec<LocalRepository> = rx.into_iter().collect();
    found.sort_by(|a, b| a.rel_path_slash().cmp(&b.rel_path_slash()));
    Ok(found)
}

/// Resolve `query` to exactly one repository.
///
/// When the scan finds nothing, the query is read as a repository name and
/// its mapped directory is used if it exists on disk.
pub fn resolve(ws: &Workspace, query: &str) -> Result<LocalRepository> {
    let mut found = find_matches(ws, query)?;

    if found.is_empty() {
        if let Ok(id) = ws.normalizer().normalize(query, false, false) {
            found.extend(ws.find_existing(&id));
        }
    }

    match found.len() {
        0 => Err(Error::NoRepositoryFound),
        1 => Ok(found.remove(0)),
        _ => Err(Error::AmbiguousMatch(ambiguity_message(&found))),
    }
}

/// Resolve `query` and run `launcher` inside the match. The session's exit
/// status is returned untouched.
pub fn look(ws: &Workspace, query: &str, launcher: &dyn Launcher) -> Result<ExitStatus> {
    let repo = resolve(ws, query)?;
    launcher.launch(repo.full_path(), &[(LOOK_ENV, repo.rel_path_slash())])
}

fn ambiguity_message(found: &[LocalRepository]) -> String {
    let mut message = String::from("More than one repositories are found; Try more precise name\n");
    for repo in found {
        message.push_str("       - ");
        message.push_str(&repo.rel_path_slash());
        message.push('\n');
    }
    message
}
