//! Version control backends and the registry used to pick one.

use std::fmt;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};

use crate::remote::RemoteId;

/// One version control system: how to recognize a working copy and how to
/// create an empty one.
pub trait VcsBackend: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Other names accepted by [`Registry::lookup`].
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// Entries whose presence marks a directory as a working copy root.
    fn markers(&self) -> &[&str];

    fn can_init(&self) -> bool;

    /// Create an empty repository in `dir`, which already exists.
    fn init(&self, dir: &Path) -> Result<()>;
}

/// Backend that shells out to the VCS binary.
#[derive(Debug, Clone, Copy)]
pub struct CommandBackend {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub markers: &'static [&'static str],
    /// Program and leading arguments; the target directory is appended.
    pub init: Option<&'static [&'static str]>,
}

impl VcsBackend for CommandBackend {
    fn name(&self) -> &str {
        self.name
    }

    fn aliases(&self) -> &[&str] {
        self.aliases
    }

    fn markers(&self) -> &[&str] {
        self.markers
    }

    fn can_init(&self) -> bool {
        self.init.is_some()
    }

    fn init(&self, dir: &Path) -> Result<()> {
        let Some((program, args)) = self.init.and_then(|argv| argv.split_first()) else {
            bail!("{} does not support init", self.name);
        };
        let binary = which::which(program)
            .with_context(|| format!("{} is required but not available on PATH", program))?;

        tracing::debug!(vcs = self.name, dir = %dir.display(), "running init");
        let output = Command::new(binary)
            .args(args)
            .arg(dir)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to run {} init", program))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.trim();
            if message.is_empty() {
                bail!("{} init exited with {}", program, output.status);
            }
            bail!("{}", message);
        }
        Ok(())
    }
}

pub const GIT: CommandBackend = CommandBackend {
    name: "git",
    aliases: &["github"],
    markers: &[".git"],
    init: Some(&["git", "init"]),
};

pub const MERCURIAL: CommandBackend = CommandBackend {
    name: "hg",
    aliases: &["mercurial"],
    markers: &[".hg"],
    init: Some(&["hg", "init"]),
};

pub const SUBVERSION: CommandBackend = CommandBackend {
    name: "svn",
    aliases: &["subversion"],
    markers: &[".svn"],
    init: None,
};

pub const DARCS: CommandBackend = CommandBackend {
    name: "darcs",
    aliases: &[],
    markers: &["_darcs"],
    init: Some(&["darcs", "init", "--repodir"]),
};

pub const BAZAAR: CommandBackend = CommandBackend {
    name: "bzr",
    aliases: &["bazaar"],
    markers: &[".bzr"],
    init: Some(&["bzr", "init"]),
};

pub const FOSSIL: CommandBackend = CommandBackend {
    name: "fossil",
    aliases: &[],
    markers: &[".fslckout", "_FOSSIL_"],
    init: None,
};

pub const PIJUL: CommandBackend = CommandBackend {
    name: "pijul",
    aliases: &[],
    markers: &[".pijul"],
    init: Some(&["pijul", "init"]),
};

/// Hosts whose VCS is known without probing the remote.
const HOST_VCS: &[(&str, &str)] = &[
    ("github.com", "git"),
    ("gist.github.com", "git"),
    ("gitlab.com", "git"),
    ("codeberg.org", "git"),
    ("bitbucket.org", "git"),
    ("git.sr.ht", "git"),
    ("hub.darcs.net", "darcs"),
    ("launchpad.net", "bzr"),
    ("chiselapp.com", "fossil"),
];

/// Immutable set of backends, built once and shared by reference.
#[derive(Debug, Default)]
pub struct Registry {
    backends: Vec<Box<dyn VcsBackend>>,
    default: Option<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in backend, defaulting to git.
    pub fn builtin() -> Self {
        let mut registry = Self::new().with_default("git");
        for backend in [GIT, MERCURIAL, SUBVERSION, DARCS, BAZAAR, FOSSIL, PIJUL] {
            registry.register(backend);
        }
        registry
    }

    /// Backend used when neither the identifier nor its host decides.
    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.default = Some(name.into());
        self
    }

    /// Add a backend, replacing any previous one with the same name.
    pub fn register(&mut self, backend: impl VcsBackend + 'static) {
        self.backends.retain(|b| b.name() != backend.name());
        self.backends.push(Box::new(backend));
    }

    pub fn lookup(&self, name: &str) -> Option<&dyn VcsBackend> {
        let name = name.trim().to_ascii_lowercase();
        self.backends
            .iter()
            .find(|b| b.name() == name || b.aliases().contains(&name.as_str()))
            .map(|b| b.as_ref())
    }

    /// Pick a backend for `id`: its own VCS hint first, then the host table,
    /// then the registry default.
    pub fn detect(&self, id: &RemoteId) -> Option<&dyn VcsBackend> {
        if let Some(backend) = id.vcs_hint().and_then(|hint| self.lookup(hint)) {
            return Some(backend);
        }
        if let Some(backend) = HOST_VCS
            .iter()
            .find(|(host, _)| *host == id.host())
            .and_then(|(_, name)| self.lookup(name))
        {
            return Some(backend);
        }
        self.default.as_deref().and_then(|name| self.lookup(name))
    }

    pub fn backends(&self) -> impl Iterator<Item = &dyn VcsBackend> {
        self.backends.iter().map(|b| b.as_ref())
    }

    /// The backend whose marker is present directly inside `dir`, if any.
    pub fn repository_kind(&self, dir: &Path) -> Option<&dyn VcsBackend> {
        self.backends()
            .find(|b| b.markers().iter().any(|marker| dir.join(marker).exists()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::Normalizer;
    use std::fs;
    use tempfile::TempDir;

    fn remote(input: &str) -> RemoteId {
        Normalizer {
            default_host: "github.com",
            user: None,
            roots: &[],
        }
        .normalize(input, false, false)
        .unwrap()
    }

    #[test]
    fn looks_up_by_name_and_alias() {
        let registry = Registry::builtin();
        assert_eq!(registry.lookup("git").unwrap().name(), "git");
        assert_eq!(registry.lookup("Mercurial").unwrap().name(), "hg");
        assert_eq!(registry.lookup("bazaar").unwrap().name(), "bzr");
        assert!(registry.lookup("cvs").is_none());
    }

    #[test]
    fn detect_prefers_hint_then_host_then_default() {
        let registry = Registry::builtin();
        assert_eq!(registry.detect(&remote("hg+https://github.com/a/b")).unwrap().name(), "hg");
        assert_eq!(registry.detect(&remote("https://hub.darcs.net/a/b")).unwrap().name(), "darcs");
        assert_eq!(registry.detect(&remote("https://launchpad.net/proj")).unwrap().name(), "bzr");
        assert_eq!(registry.detect(&remote("svn://svn.example.org/proj")).unwrap().name(), "svn");
        assert_eq!(registry.detect(&remote("https://example.org/a/b")).unwrap().name(), "git");
    }

    #[test]
    fn unknown_hint_falls_through_to_host() {
        let registry = Registry::builtin();
        let id = remote("cvs+https://hub.darcs.net/a/b");
        assert_eq!(registry.detect(&id).unwrap().name(), "darcs");
    }

    #[test]
    fn detect_without_default_is_absent() {
        let mut registry = Registry::new();
        registry.register(MERCURIAL);
        assert!(registry.detect(&remote("https://example.org/a/b")).is_none());

        let registry = Registry::new().with_default("hg");
        assert!(registry.detect(&remote("https://example.org/a/b")).is_none());
    }

    #[test]
    fn register_replaces_same_name() {
        let mut registry = Registry::builtin();
        registry.register(CommandBackend {
            name: "git",
            aliases: &[],
            markers: &[".git"],
            init: None,
        });
        assert_eq!(registry.backends().filter(|b| b.name() == "git").count(), 1);
        assert!(!registry.lookup("git").unwrap().can_init());
    }

    #[test]
    fn svn_and_fossil_cannot_init() {
        let registry = Registry::builtin();
        assert!(!registry.lookup("svn").unwrap().can_init());
        assert!(!registry.lookup("fossil").unwrap().can_init());
        assert!(registry.lookup("git").unwrap().can_init());
    }

    #[test]
    fn recognizes_repository_markers() {
        let tmp = TempDir::new().unwrap();
        let registry = Registry::builtin();
        assert!(registry.repository_kind(tmp.path()).is_none());

        fs::create_dir(tmp.path().join(".hg")).unwrap();
        assert_eq!(registry.repository_kind(tmp.path()).unwrap().name(), "hg");

        let fossil = tmp.path().join("fossil");
        fs::create_dir(&fossil).unwrap();
        fs::write(fossil.join(".fslckout"), b"").unwrap();
        assert_eq!(registry.repository_kind(&fossil).unwrap().name(), "fossil");
    }

    #[test]
    fn init_reports_missing_binary() {
        let tmp = TempDir::new().unwrap();
        let backend = CommandBackend {
            name: "nope",
            aliases: &[],
            markers: &[".nope"],
            init: Some(&["ghq-test-missing-vcs-binary", "init"]),
        };
        let err = backend.init(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("not available on PATH"));
    }
}
