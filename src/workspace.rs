use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::local::{LocalRepository, map_to_local};
use crate::remote::{Normalizer, RemoteId};
use crate::vcs::Registry;
use crate::walk::Walker;

/// Everything an operation needs: resolved settings plus the backend
/// registry. Built once in `main` and passed by reference.
#[derive(Debug)]
pub struct Workspace {
    config: Config,
    registry: Registry,
}

impl Workspace {
    pub fn new(config: Config, registry: Registry) -> Self {
        Self { config, registry }
    }

    /// Workspace with the built-in backends and the configured default VCS.
    pub fn from_config(config: Config) -> Self {
        let registry = Registry::builtin().with_default(config.default_vcs.clone());
        Self::new(config, registry)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn roots(&self) -> &[PathBuf] {
        self.config.roots()
    }

    pub fn primary_root(&self) -> &Path {
        self.config.primary_root()
    }

    pub fn normalizer(&self) -> Normalizer<'_> {
        Normalizer {
            default_host: &self.config.default_host,
            user: self.config.user.as_deref(),
            roots: self.config.roots(),
        }
    }

    /// Where a repository for `id` lives (or would be created).
    pub fn map_to_local(&self, id: &RemoteId) -> LocalRepository {
        map_to_local(id, self.primary_root())
    }

    /// First root, in configured order, that already has a directory at the
    /// mapped path for `id`.
    pub fn find_existing(&self, id: &RemoteId) -> Option<LocalRepository> {
        self.roots()
            .iter()
            .map(|root| map_to_local(id, root))
            .find(|repo| repo.full_path().is_dir())
    }

    pub fn walker(&self) -> Walker<'_> {
        Walker::new(self.config.roots(), &self.registry).threads(self.config.walk_threads)
    }
}
