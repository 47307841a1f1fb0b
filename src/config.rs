use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use shellexpand::tilde;

pub const DEFAULT_ROOT: &str = "~/ghq";
pub const DEFAULT_HOST: &str = "github.com";
pub const DEFAULT_VCS: &str = "git";

const CONFIG_ENV: &str = "GHQ_CONFIG";
const ROOT_ENV: &str = "GHQ_ROOT";
const USER_ENV: &str = "GHQ_USER";
const SHELL_ENV: &str = "GHQ_SHELL";

/// On-disk configuration, every key optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FileConfig {
    /// Workspace roots; the first one receives new repositories.
    #[serde(alias = "root")]
    pub roots: Vec<String>,
    pub default_host: Option<String>,
    pub user: Option<String>,
    #[serde(alias = "vcs")]
    pub default_vcs: Option<String>,
    pub shell: Option<String>,
    /// Scanner threads; 0 lets the walker pick.
    pub walk_threads: Option<usize>,
}

/// Resolved settings after merging the config file with the environment.
#[derive(Debug, Clone)]
pub struct Config {
    roots: Vec<PathBuf>,
    pub default_host: String,
    pub user: Option<String>,
    pub default_vcs: String,
    pub shell: Vec<String>,
    pub walk_threads: usize,
}

impl Config {
    /// Settings for an explicit set of roots with every other key defaulted.
    /// An empty list falls back to the default root.
    pub fn with_roots(roots: Vec<PathBuf>) -> Self {
        Self {
            roots: or_default_root(roots),
            default_host: DEFAULT_HOST.to_string(),
            user: None,
            default_vcs: DEFAULT_VCS.to_string(),
            shell: default_shell(),
            walk_threads: 0,
        }
    }

    /// Workspace roots in configured order; never empty.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// The root new repositories are created under.
    pub fn primary_root(&self) -> &Path {
        &self.roots[0]
    }

    /// Replace the roots, e.g. from `--root` flags. An empty list leaves the
    /// current roots in place.
    pub fn override_roots(&mut self, roots: &[PathBuf]) -> Result<()> {
        if roots.is_empty() {
            return Ok(());
        }
        let expanded = roots
            .iter()
            .map(|root| expand_path(&root.to_string_lossy()))
            .collect();
        self.roots = absolutize(expanded)?;
        Ok(())
    }

    fn from_file(file: FileConfig) -> Result<Self> {
        let roots = match env::var_os(ROOT_ENV).filter(|v| !v.is_empty()) {
            Some(raw) => env::split_paths(&raw)
                .map(|p| expand_path(&p.to_string_lossy()))
                .collect(),
            None if !file.roots.is_empty() => file.roots.iter().map(|r| expand_path(r)).collect(),
            None => vec![expand_path(DEFAULT_ROOT)],
        };

        let user = file
            .user
            .or_else(|| non_empty_env(USER_ENV))
            .or_else(|| non_empty_env("GITHUB_USER"))
            .or_else(|| non_empty_env("USER"))
            .or_else(|| non_empty_env("USERNAME"));

        let shell = match file.shell.or_else(|| non_empty_env(SHELL_ENV)) {
            Some(raw) => shell_words::split(&raw)
                .with_context(|| format!("failed to parse shell command {:?}", raw))?,
            None => default_shell(),
        };

        Ok(Self {
            roots: absolutize(roots)?,
            default_host: file
                .default_host
                .map(|h| h.to_ascii_lowercase())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            user,
            default_vcs: file.default_vcs.unwrap_or_else(|| DEFAULT_VCS.to_string()),
            shell,
            walk_threads: file.walk_threads.unwrap_or(0),
        })
    }
}

pub fn expand_path(raw: &str) -> PathBuf {
    let tilde_expanded = tilde(raw).into_owned();
    let env_expanded = match shellexpand::env(&tilde_expanded) {
        Ok(val) => val.into_owned(),
        Err(_) => tilde_expanded,
    };
    PathBuf::from(env_expanded)
}

pub fn default_config_path() -> PathBuf {
    if let Some(path) = non_empty_env(CONFIG_ENV) {
        return expand_path(&path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config/ghq/config.toml")
}

/// Load settings from `path`; a missing file yields the defaults.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let file = match fs::read_to_string(path) {
        Ok(contents) => {
            tracing::debug!(path = %path.display(), "loaded config file");
            parse(&contents).with_context(|| format!("failed to parse {}", path.display()))?
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    Config::from_file(file)
}

pub fn parse(contents: &str) -> Result<FileConfig> {
    Ok(toml::from_str(contents)?)
}

fn absolutize(roots: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    let cwd = env::current_dir().context("failed to resolve current directory")?;
    let mut out: Vec<PathBuf> = Vec::with_capacity(roots.len());
    for root in roots {
        let root = if root.is_absolute() { root } else { cwd.join(root) };
        if !out.contains(&root) {
            out.push(root);
        }
    }
    Ok(out)
}

fn or_default_root(roots: Vec<PathBuf>) -> Vec<PathBuf> {
    if roots.is_empty() {
        vec![expand_path(DEFAULT_ROOT)]
    } else {
        roots
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_shell() -> Vec<String> {
    if let Some(shell) = non_empty_env("SHELL") {
        return vec![shell];
    }
    if cfg!(windows) {
        vec![non_empty_env("COMSPEC").unwrap_or_else(|| "cmd.exe".to_string())]
    } else {
        vec!["/bin/sh".to_string()]
    }
}
