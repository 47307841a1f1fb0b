//! Parallel discovery of working copies under the workspace roots.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ignore::{WalkBuilder, WalkState};

use crate::error::{Error, Result};
use crate::local::LocalRepository;
use crate::vcs::Registry;

/// Scans every root on a shared worker pool.
///
/// A directory holding a backend marker is reported once and not descended
/// into; any other directory is searched further, so repositories below an
/// ordinary grouping directory are still found.
#[derive(Debug, Clone, Copy)]
pub struct Walker<'a> {
    roots: &'a [PathBuf],
    registry: &'a Registry,
    threads: usize,
}

impl<'a> Walker<'a> {
    pub fn new(roots: &'a [PathBuf], registry: &'a Registry) -> Self {
        Self {
            roots,
            registry,
            threads: 0,
        }
    }

    /// Worker count; 0 picks one based on available parallelism.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Call `visit` once per repository found, from scanner threads and in
    /// no particular order. Returns after every worker has finished.
    ///
    /// Missing roots are skipped. Other errors on a root, and any error
    /// below a root except permission-denied or a vanished entry, abort the
    /// scan; the first such error is returned.
    pub fn walk<F>(&self, visit: F) -> Result<()>
    where
        F: Fn(LocalRepository) + Sync,
    {
        let roots = self.existing_roots()?;
        let Some((first, rest)) = roots.split_first() else {
            return Ok(());
        };

        let mut builder = WalkBuilder::new(first);
        for root in rest {
            builder.add(root);
        }
        builder
            .standard_filters(false)
            .hidden(false)
            .follow_links(false)
            .threads(self.threads);

        let failure: Mutex<Option<ignore::Error>> = Mutex::new(None);
        let registry = self.registry;
        let roots = roots.as_slice();
        let visit = &visit;
        let failure_ref = &failure;

        builder.build_parallel().run(|| {
            Box::new(move |entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => return on_error(err, failure_ref),
                };
                if entry.depth() == 0 {
                    return WalkState::Continue;
                }

                let path = entry.path();
                let is_dir = match entry.file_type() {
                    Some(ft) if ft.is_dir() => true,
                    Some(ft) if ft.is_symlink() => path.is_dir(),
                    _ => false,
                };
                if !is_dir {
                    return WalkState::Continue;
                }
                // Nested roots are scanned on their own.
                if roots.iter().any(|root| root == path) {
                    return WalkState::Skip;
                }
                if registry.repository_kind(path).is_none() {
                    return WalkState::Continue;
                }

                if let Some(repo) =
                    owning_root(roots, path).and_then(|root| LocalRepository::from_full_path(root, path))
                {
                    visit(repo);
                }
                WalkState::Skip
            })
        });

        match failure.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()) {
            Some(err) => Err(Error::Walk(err)),
            None => Ok(()),
        }
    }

    fn existing_roots(&self) -> Result<Vec<PathBuf>> {
        let mut roots = Vec::with_capacity(self.roots.len());
        for root in self.roots {
            match fs::metadata(root) {
                Ok(meta) if meta.is_dir() => roots.push(root.clone()),
                Ok(_) => {
                    return Err(Error::io(
                        root,
                        io::Error::other("workspace root is not a directory"),
                    ));
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!(root = %root.display(), "skipping missing root");
                }
                Err(err) => return Err(Error::io(root, err)),
            }
        }
        Ok(roots)
    }
}

fn on_error(err: ignore::Error, failure: &Mutex<Option<ignore::Error>>) -> WalkState {
    let below_root = err.depth().is_some_and(|depth| depth > 0);
    let skippable = matches!(
        err.io_error().map(io::Error::kind),
        Some(io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound)
    );
    if below_root && skippable {
        tracing::debug!(%err, "skipping unreadable entry");
        return WalkState::Continue;
    }

    let mut slot = failure.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    slot.get_or_insert(err);
    WalkState::Quit
}

/// The deepest root containing `path`.
fn owning_root<'r>(roots: &'r [PathBuf], path: &Path) -> Option<&'r Path> {
    roots
        .iter()
        .filter(|root| path.starts_with(root))
        .max_by_key(|root| root.components().count())
        .map(PathBuf::as_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::{CommandBackend, GIT};
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register(GIT);
        registry.register(CommandBackend {
            name: "hg",
            aliases: &[],
            markers: &[".hg"],
            init: None,
        });
        registry
    }

    fn make_repo(root: &Path, rel: &str, marker: &str) {
        fs::create_dir_all(root.join(rel).join(marker)).unwrap();
    }

    fn collect(roots: &[PathBuf], registry: &Registry) -> Vec<String> {
        let (tx, rx) = mpsc::channel();
        Walker::new(roots, registry)
            .walk(|repo| tx.send(repo.rel_path_slash()).unwrap())
            .unwrap();
        drop(tx);
        let mut found: Vec<String> = rx.into_iter().collect();
        found.sort();
        found
    }

    #[test]
    fn finds_repositories_of_every_kind() {
        let tmp = TempDir::new().unwrap();
        make_repo(tmp.path(), "github.com/a/one", ".git");
        make_repo(tmp.path(), "example.org/b/two", ".hg");
        fs::create_dir_all(tmp.path().join("github.com/a/not-a-repo/src")).unwrap();

        let found = collect(&[tmp.path().to_path_buf()], &registry());
        assert_eq!(found, vec!["example.org/b/two", "github.com/a/one"]);
    }

    #[test]
    fn does_not_descend_into_repositories() {
        let tmp = TempDir::new().unwrap();
        make_repo(tmp.path(), "github.com/a/outer", ".git");
        make_repo(tmp.path(), "github.com/a/outer/vendor/inner", ".git");

        let found = collect(&[tmp.path().to_path_buf()], &registry());
        assert_eq!(found, vec!["github.com/a/outer"]);
    }

    #[test]
    fn finds_repositories_below_plain_directories() {
        let tmp = TempDir::new().unwrap();
        make_repo(tmp.path(), "gitlab.com/group/subgroup/deep/project", ".git");

        let found = collect(&[tmp.path().to_path_buf()], &registry());
        assert_eq!(found, vec!["gitlab.com/group/subgroup/deep/project"]);
    }

    #[test]
    fn missing_roots_are_skipped() {
        let tmp = TempDir::new().unwrap();
        make_repo(tmp.path(), "github.com/a/one", ".git");

        let roots = vec![tmp.path().join("absent"), tmp.path().to_path_buf()];
        assert_eq!(collect(&roots, &registry()), vec!["github.com/a/one"]);
        assert!(collect(&[tmp.path().join("absent")], &registry()).is_empty());
    }

    #[test]
    fn file_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("root-file");
        fs::write(&file, b"").unwrap();

        let registry = registry();
        let roots = [file];
        let err = Walker::new(&roots, &registry).walk(|_| {}).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn nested_roots_report_each_repository_once() {
        let tmp = TempDir::new().unwrap();
        let inner = tmp.path().join("mirror");
        make_repo(tmp.path(), "github.com/a/one", ".git");
        make_repo(&inner, "github.com/b/two", ".git");

        let roots = vec![tmp.path().to_path_buf(), inner.clone()];
        let registry = registry();
        let (tx, rx) = mpsc::channel();
        Walker::new(&roots, &registry)
            .walk(|repo| tx.send(repo).unwrap())
            .unwrap();
        drop(tx);
        let mut found: Vec<LocalRepository> = rx.into_iter().collect();
        found.sort_by_key(|r| r.rel_path_slash());

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].rel_path_slash(), "github.com/a/one");
        assert_eq!(found[1].rel_path_slash(), "github.com/b/two");
        assert_eq!(found[1].root(), inner.as_path());
    }

    #[test]
    fn concurrent_roots_lose_and_duplicate_nothing() {
        const ROOTS: usize = 6;
        const REPOS: usize = 25;

        let dirs: Vec<TempDir> = (0..ROOTS).map(|_| TempDir::new().unwrap()).collect();
        for dir in &dirs {
            for i in 0..REPOS {
                make_repo(dir.path(), &format!("host{}/owner/repo{}", i % 3, i), ".git");
            }
        }
        let roots: Vec<PathBuf> = dirs.iter().map(|d| d.path().to_path_buf()).collect();
        let registry = registry();

        let (tx, rx) = mpsc::channel();
        Walker::new(&roots, &registry)
            .threads(8)
            .walk(|repo| {
                std::thread::sleep(Duration::from_millis(1));
                tx.send(repo.full_path().to_path_buf()).unwrap();
            })
            .unwrap();
        drop(tx);

        let mut found: Vec<PathBuf> = rx.into_iter().collect();
        assert_eq!(found.len(), ROOTS * REPOS);
        found.sort();
        found.dedup();
        assert_eq!(found.len(), ROOTS * REPOS);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        make_repo(tmp.path(), "github.com/a/one", ".git");
        let locked = tmp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Privileged users (root in containers) bypass the mode bits.
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            eprintln!("skipping: permission bits are not enforced for this user");
            return;
        }

        let found = collect(&[tmp.path().to_path_buf()], &registry());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(found, vec!["github.com/a/one"]);
    }
}
