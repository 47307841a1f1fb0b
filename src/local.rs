//! On-disk view of a repository under a workspace root.

use std::path::{Path, PathBuf};

use crate::remote::RemoteId;

/// A directory under a workspace root believed to hold a working copy.
///
/// `full_path` is always `root` joined with every element of `path_parts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRepository {
    root: PathBuf,
    full_path: PathBuf,
    path_parts: Vec<String>,
}

/// Map a remote identifier to its location under `root`:
/// `root/host/segment/...`.
pub fn map_to_local(id: &RemoteId, root: &Path) -> LocalRepository {
    let path_parts: Vec<String> = std::iter::once(id.host().to_string())
        .chain(id.segments().iter().cloned())
        .collect();
    LocalRepository::from_parts(root, path_parts)
}

impl LocalRepository {
    fn from_parts(root: &Path, path_parts: Vec<String>) -> Self {
        let full_path = path_parts
            .iter()
            .fold(root.to_path_buf(), |path, part| path.join(part));
        Self {
            root: root.to_path_buf(),
            full_path,
            path_parts,
        }
    }

    /// Build a view for a directory found while scanning `root`. Returns
    /// `None` when `full_path` is the root itself or lies outside it.
    pub fn from_full_path(root: &Path, full_path: &Path) -> Option<Self> {
        let rel = full_path.strip_prefix(root).ok()?;
        let path_parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if path_parts.is_empty() {
            return None;
        }
        Some(Self {
            root: root.to_path_buf(),
            full_path: full_path.to_path_buf(),
            path_parts,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    pub fn path_parts(&self) -> &[String] {
        &self.path_parts
    }

    /// Path relative to the root, with platform separators.
    pub fn rel_path(&self) -> PathBuf {
        self.path_parts.iter().collect()
    }

    /// Path relative to the root, always `/`-separated.
    pub fn rel_path_slash(&self) -> String {
        self.path_parts.join("/")
    }

    /// Trailing segment combinations, shortest first:
    /// `repo`, `owner/repo`, `host/owner/repo`.
    pub fn subpaths(&self) -> Vec<String> {
        (0..self.path_parts.len())
            .rev()
            .map(|start| self.path_parts[start..].join("/"))
            .collect()
    }

    /// Whether `query` names this repository.
    ///
    /// Case-sensitive. Matches the full path, the relative path, or any run
    /// of whole consecutive segments (`repo`, `owner/repo`, `owner`, ...).
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }
        if Path::new(query) == self.full_path.as_path() {
            return true;
        }

        let normalized = query.replace('\\', "/");
        let normalized = normalized.trim_end_matches('/');
        let wanted: Vec<&str> = normalized.split('/').collect();
        if wanted.iter().any(|part| part.is_empty()) {
            return false;
        }
        self.path_parts
            .windows(wanted.len())
            .any(|window| window.iter().zip(&wanted).all(|(have, want)| have == want))
    }
}
