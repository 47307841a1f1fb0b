//! Creating a new, empty local repository at its canonical location.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::remote::RemoteId;
use crate::vcs::VcsBackend;
use crate::workspace::Workspace;

/// Create an empty repository for `raw_name` and return its path.
///
/// An existing empty directory is reused; anything non-empty is left alone.
/// When init fails the directory is kept so the partial state can be
/// inspected.
pub fn create(ws: &Workspace, raw_name: &str, explicit_vcs: Option<&str>) -> Result<PathBuf> {
    let id = ws.normalizer().normalize(raw_name, false, true)?;
    let repo = ws.map_to_local(&id);
    let path = repo.full_path().to_path_buf();

    if !is_missing_or_empty(&path)? {
        return Err(Error::TargetExists(path));
    }

    let backend = resolve_backend(ws, &id, explicit_vcs)?;
    tracing::debug!(vcs = backend.name(), remote = %id, "resolved backend");

    fs::create_dir_all(&path).map_err(|err| Error::io(&path, err))?;

    backend
        .init(&path)
        .map_err(|source| Error::VcsInitFailed {
            vcs: backend.name().to_string(),
            path: path.clone(),
            source: source.into(),
        })?;

    tracing::info!(vcs = backend.name(), path = %path.display(), "created repository");
    Ok(path)
}

fn resolve_backend<'a>(
    ws: &'a Workspace,
    id: &RemoteId,
    explicit_vcs: Option<&str>,
) -> Result<&'a dyn VcsBackend> {
    let requested = explicit_vcs.map(str::trim).filter(|name| !name.is_empty());
    let explicit = requested.and_then(|name| {
        let found = ws.registry().lookup(name);
        if found.is_none() {
            tracing::debug!(vcs = name, "unknown VCS requested, detecting instead");
        }
        found
    });
    let backend = match explicit {
        Some(backend) => backend,
        None => ws
            .registry()
            .detect(id)
            .ok_or_else(|| Error::UnsupportedVcs(requested.map(str::to_string)))?,
    };
    if !backend.can_init() {
        return Err(Error::UnsupportedVcs(Some(backend.name().to_string())));
    }
    Ok(backend)
}

/// True when `path` does not exist or is an empty directory.
pub fn is_missing_or_empty(path: &Path) -> Result<bool> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(true),
        Err(err) => return Err(Error::io(path, err)),
    };
    if !meta.is_dir() {
        return Ok(false);
    }
    let mut entries = fs::read_dir(path).map_err(|err| Error::io(path, err))?;
    Ok(entries.next().is_none())
}
