//! Parsing of user supplied repository references into a canonical identifier.
//!
//! Accepts full URLs (`https://github.com/owner/repo.git`), scp-like ssh
//! references (`git@github.com:owner/repo`), and shorthands that expand with
//! the configured default host (`owner/repo`, `host/owner/repo`).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::error::{Error, Result};

fn scheme_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("valid scheme regex"))
}

fn scp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:([^@/:]+)@)?([^@/:]+):(.+)$").expect("valid scp-like regex")
    })
}

/// Canonical form of a remote repository reference.
///
/// Identity is the lowercased host plus the path segments; scheme and VCS
/// hint are carried along but two references to the same resource compare
/// equal regardless of transport.
#[derive(Debug, Clone)]
pub struct RemoteId {
    scheme: String,
    host: String,
    segments: Vec<String>,
    vcs_hint: Option<String>,
}

impl RemoteId {
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Path segments after the host, `.git` suffix removed.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// VCS named by the reference itself (`hg+https://`, `svn://`, `*.git`).
    pub fn vcs_hint(&self) -> Option<&str> {
        self.vcs_hint.as_deref()
    }

    pub fn path(&self) -> String {
        self.segments.join("/")
    }
}

impl PartialEq for RemoteId {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host && self.segments == other.segments
    }
}

impl Eq for RemoteId {}

impl Hash for RemoteId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.hash(state);
        self.segments.hash(state);
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.host, self.path())
    }
}

/// Expands shorthands using the workspace defaults.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    pub default_host: &'a str,
    /// Owner used when a bare repository name must be qualified.
    pub user: Option<&'a str>,
    /// Workspace roots, consulted for `./` and `../` references.
    pub roots: &'a [PathBuf],
}

impl Normalizer<'_> {
    /// Normalize `input` into a [`RemoteId`].
    ///
    /// `allow_relative` resolves `./x` and `../x` against the current
    /// directory when it lies inside a workspace root. With
    /// `require_explicit_scheme` a bare `repo` must be qualified with a known
    /// owner; without it the name is placed directly under the default host.
    pub fn normalize(
        &self,
        input: &str,
        allow_relative: bool,
        require_explicit_scheme: bool,
    ) -> Result<RemoteId> {
        let cwd = if allow_relative && is_relative_ref(input.trim()) {
            Some(std::env::current_dir().map_err(|err| Error::io(".", err))?)
        } else {
            None
        };
        self.normalize_from(input, cwd.as_deref(), require_explicit_scheme)
    }

    /// Like [`Normalizer::normalize`] with an explicit working directory for
    /// relative references; `None` disables them.
    pub fn normalize_from(
        &self,
        input: &str,
        cwd: Option<&Path>,
        require_explicit_scheme: bool,
    ) -> Result<RemoteId> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid(input, "empty repository name"));
        }

        let mut reference = trimmed.to_string();
        if let Some(cwd) = cwd {
            if is_relative_ref(trimmed) {
                if let Some(guess) = self.resolve_relative(cwd, trimmed) {
                    reference = guess;
                }
            }
        }

        let reference = reference.trim_end_matches('/');
        let url = if scheme_re().is_match(reference) {
            reference.to_string()
        } else if let Some(caps) = scp_re().captures(reference) {
            let user = caps.get(1).map(|m| format!("{}@", m.as_str())).unwrap_or_default();
            format!(
                "ssh://{}{}/{}",
                user,
                &caps[2],
                caps[3].trim_start_matches('/')
            )
        } else {
            self.expand_shorthand(input, reference, require_explicit_scheme)?
        };

        parse_url(input, &url)
    }

    fn expand_shorthand(&self, input: &str, reference: &str, qualify: bool) -> Result<String> {
        let parts: Vec<&str> = reference.split('/').collect();
        if parts.iter().any(|p| p.is_empty() || *p == "." || *p == "..") {
            return Err(Error::invalid(input, "path traversal is not allowed"));
        }
        match parts.len() {
            1 if qualify => {
                let user = self.user.ok_or_else(|| {
                    Error::invalid(input, "bare repository name needs an owner; set `user`")
                })?;
                Ok(format!("https://{}/{}/{}", self.default_host, user, reference))
            }
            1 | 2 => Ok(format!("https://{}/{}", self.default_host, reference)),
            _ => Ok(format!("https://{}", reference)),
        }
    }

    /// Turn `./x` inside a root into `https://host/owner/x`, picking the
    /// deepest root that contains the path.
    fn resolve_relative(&self, cwd: &Path, reference: &str) -> Option<String> {
        let target = lexical_clean(&cwd.join(reference));
        self.roots
            .iter()
            .filter_map(|root| target.strip_prefix(lexical_clean(root)).ok().map(Path::to_path_buf))
            .filter(|rel| rel.components().next().is_some())
            .min_by_key(|rel| rel.components().count())
            .map(|rel| {
                let parts: Vec<String> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                format!("https://{}", parts.join("/"))
            })
    }
}

fn is_relative_ref(reference: &str) -> bool {
    let first = reference.split(['/', '\\']).next().unwrap_or("");
    first == "." || first == ".."
}

fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn parse_url(input: &str, raw: &str) -> Result<RemoteId> {
    let url = Url::parse(raw).map_err(|err| Error::invalid(input, err.to_string()))?;

    let raw_scheme = url.scheme().to_ascii_lowercase();
    let (scheme, mut vcs_hint) = if raw_scheme == "svn" || raw_scheme.starts_with("svn+") {
        (raw_scheme.clone(), Some("svn".to_string()))
    } else if let Some((vcs, transport)) = raw_scheme.split_once('+') {
        (transport.to_string(), Some(vcs.to_string()))
    } else {
        (raw_scheme.clone(), None)
    };

    let host = url
        .host_str()
        .map(|h| h.trim_matches(['[', ']']).to_ascii_lowercase())
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::invalid(input, "missing host"))?;

    let mut segments = Vec::new();
    for encoded in url.path_segments().into_iter().flatten() {
        if encoded.is_empty() {
            continue;
        }
        let segment = urlencoding::decode(encoded)
            .map_err(|err| Error::invalid(input, format!("path is not valid UTF-8: {err}")))?;
        if segment == "." || segment == ".." {
            return Err(Error::invalid(input, "path traversal is not allowed"));
        }
        if segment.contains(['/', '\\', '\0']) {
            return Err(Error::invalid(input, format!("unsafe path segment {:?}", segment)));
        }
        segments.push(segment.into_owned());
    }

    if let Some(last) = segments.last_mut() {
        if let Some(stripped) = last.strip_suffix(".git") {
            *last = stripped.to_string();
            vcs_hint.get_or_insert_with(|| "git".to_string());
        }
        if last.is_empty() {
            segments.pop();
        }
    }
    if segments.is_empty() {
        return Err(Error::invalid(input, "missing repository path"));
    }

    Ok(RemoteId {
        scheme,
        host,
        segments,
        vcs_hint,
    })
}
