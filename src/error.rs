//! Error taxonomy shared by every workspace operation.

use std::io;
use std::path::PathBuf;

/// Result alias for workspace operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Causes are exposed through `source()` rather than the message; render
/// with `{:#}` on an `anyhow::Error` to get the whole chain.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input could not be turned into a remote identifier.
    #[error("invalid repository identifier {input:?}: {reason}")]
    InvalidIdentifier { input: String, reason: String },

    #[error("directory {0:?} already exists and not empty")]
    TargetExists(PathBuf),

    #[error("failed to init: unsupported VCS{}", vcs_suffix(.0))]
    UnsupportedVcs(Option<String>),

    #[error("I/O error at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A hard error while scanning the workspace roots.
    #[error("failed to scan repositories")]
    Walk(#[from] ignore::Error),

    /// The backend's init step failed; the directory is left in place.
    #[error("{vcs} init failed in {}", path.display())]
    VcsInitFailed {
        vcs: String,
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("No repository found")]
    NoRepositoryFound,

    /// Carries the pre-rendered candidate listing.
    #[error("{0}")]
    AmbiguousMatch(String),
}

impl Error {
    pub(crate) fn invalid(input: &str, reason: impl Into<String>) -> Self {
        Error::InvalidIdentifier {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

fn vcs_suffix(name: &Option<String>) -> String {
    match name {
        Some(name) => format!(" {name:?}"),
        None => String::new(),
    }
}
