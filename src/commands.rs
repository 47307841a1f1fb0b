//! Command handlers behind the CLI.

use std::io::{self, Write};
use std::sync::mpsc;

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands, CreateOpts, ListOpts, LookOpts, RootOpts};
use crate::config;
use crate::create::create;
use crate::look::{ShellLauncher, look};
use crate::workspace::Workspace;

/// Run the parsed command line; returns the process exit code.
pub fn run(cli: Cli) -> Result<i32> {
    let ws = load_workspace(&cli)?;
    match cli.command {
        Commands::Create(opts) => run_create(&ws, opts),
        Commands::Look(opts) => run_look(&ws, opts),
        Commands::List(opts) => run_list(&ws, opts).map(|()| 0),
        Commands::Root(opts) => run_root(&ws, opts).map(|()| 0),
    }
}

fn load_workspace(cli: &Cli) -> Result<Workspace> {
    let path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let mut cfg = config::load(&path)?;
    if !cli.roots.is_empty() {
        cfg.override_roots(&cli.roots)?;
    }
    tracing::debug!(roots = ?cfg.roots(), "workspace roots");
    Ok(Workspace::from_config(cfg))
}

fn run_create(ws: &Workspace, opts: CreateOpts) -> Result<i32> {
    let path = create(ws, &opts.name, opts.vcs.as_deref())?;
    println!("{}", path.display());
    if opts.look {
        return run_look(ws, LookOpts { query: opts.name });
    }
    Ok(0)
}

fn run_look(ws: &Workspace, opts: LookOpts) -> Result<i32> {
    let launcher = ShellLauncher::new(ws.config().shell.clone());
    let status = look(ws, &opts.query, &launcher)?;
    Ok(status.code().unwrap_or(1))
}

fn run_list(ws: &Workspace, opts: ListOpts) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_list(ws, &opts, &mut out)
}

/// Write matching repositories to `out`, one per line, sorted and deduplicated.
fn write_list<W: Write>(ws: &Workspace, opts: &ListOpts, out: &mut W) -> Result<()> {
    let query = opts.query.as_deref().unwrap_or("");
    let (tx, rx) = mpsc::channel();
    ws.walker().walk(|repo| {
        let keep = if query.is_empty() {
            true
        } else if opts.exact {
            repo.matches(query)
        } else {
            repo.rel_path_slash().contains(query)
        };
        if keep {
            let line = if opts.full_path {
                repo.full_path().display().to_string()
            } else {
                repo.rel_path_slash()
            };
            let _ = tx.send(line);
        }
    })?;
    drop(tx);

    let mut lines: Vec<String> = rx.into_iter().collect();
    lines.sort();
    lines.dedup();

    for line in lines {
        writeln!(out, "{}", line).context("failed to write listing")?;
    }
    Ok(())
}

fn run_root(ws: &Workspace, opts: RootOpts) -> Result<()> {
    if opts.all {
        for root in ws.roots() {
            println!("{}", root.display());
        }
    } else {
        println!("{}", ws.primary_root().display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::ffi::OsStr;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn root_flags_override_config_file() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        fs::write(
            &config_path,
            "roots = [\"/from/config\"]\ndefault-vcs = \"hg\"\n",
        )
        .unwrap();
        let override_root = tmp.path().join("override");

        let cli = Cli::try_parse_from([
            OsStr::new("ghq"),
            OsStr::new("root"),
            OsStr::new("--config"),
            config_path.as_os_str(),
            OsStr::new("--root"),
            override_root.as_os_str(),
        ])
        .unwrap();
        let ws = load_workspace(&cli).unwrap();
        assert_eq!(ws.roots(), [override_root]);
        assert_eq!(ws.config().default_vcs, "hg");
    }

    fn list_workspace(tmp: &TempDir) -> Workspace {
        let root = tmp.path().join("root");
        let cli = Cli::try_parse_from([
            OsStr::new("ghq"),
            OsStr::new("list"),
            OsStr::new("--config"),
            tmp.path().join("absent.toml").as_os_str(),
            OsStr::new("--root"),
            root.as_os_str(),
        ])
        .unwrap();
        let ws = load_workspace(&cli).unwrap();

        for rel in ["github.com/a/b", "github.com/a/bc", "gitlab.com/x/b"] {
            fs::create_dir_all(root.join(rel).join(".git")).unwrap();
        }
        ws
    }

    fn listing(ws: &Workspace, query: Option<&str>, exact: bool, full_path: bool) -> Vec<String> {
        let opts = ListOpts {
            query: query.map(str::to_string),
            exact,
            full_path,
        };
        let mut out = Vec::new();
        write_list(ws, &opts, &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn list_prints_every_repository_sorted() {
        let tmp = TempDir::new().unwrap();
        let ws = list_workspace(&tmp);
        assert_eq!(
            listing(&ws, None, false, false),
            ["github.com/a/b", "github.com/a/bc", "gitlab.com/x/b"]
        );
    }

    #[test]
    fn list_filters_by_substring() {
        let tmp = TempDir::new().unwrap();
        let ws = list_workspace(&tmp);
        assert_eq!(
            listing(&ws, Some("a/b"), false, false),
            ["github.com/a/b", "github.com/a/bc"]
        );
        assert!(listing(&ws, Some("zzz"), false, false).is_empty());
    }

    #[test]
    fn list_exact_matches_whole_segments() {
        let tmp = TempDir::new().unwrap();
        let ws = list_workspace(&tmp);
        assert_eq!(
            listing(&ws, Some("b"), true, false),
            ["github.com/a/b", "gitlab.com/x/b"]
        );
        assert_eq!(listing(&ws, Some("a/b"), true, false), ["github.com/a/b"]);
    }

    #[test]
    fn list_full_path_prints_absolute_paths() {
        let tmp = TempDir::new().unwrap();
        let ws = list_workspace(&tmp);
        let root = ws.primary_root().to_path_buf();
        assert_eq!(
            listing(&ws, Some("x/b"), false, true),
            [root.join("gitlab.com/x/b").display().to_string()]
        );
    }

    #[test]
    fn list_reports_each_repository_once_across_overlapping_roots() {
        let tmp = TempDir::new().unwrap();
        let ws = list_workspace(&tmp);
        let outer = tmp.path().to_path_buf();
        let inner = ws.primary_root().to_path_buf();
        let ws = Workspace::from_config(crate::config::Config::with_roots(vec![outer, inner]));
        assert_eq!(
            listing(&ws, Some("x/"), false, false),
            ["gitlab.com/x/b"]
        );
    }
}
