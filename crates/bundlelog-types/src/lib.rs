//! Shared types for bundlelog
//!
//! This crate contains data structures used across multiple bundlelog crates.

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

// ============================================================================
// Errors
// ============================================================================

/// Errors surfaced by the bundlelog library crates.
///
/// Only the search-root variants are fatal for a run; everything else is
/// reported by callers and degraded around.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("search root does not exist or is not a directory: {0}")]
    SearchRootMissing(PathBuf),

    #[error("search root is not readable: {path}")]
    SearchRootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid include pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("failed to write output")]
    Output(#[source] std::io::Error),

    #[error("malformed pod inventory {path}")]
    Inventory {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Log Types
// ============================================================================

/// A single matched log line and the file it came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    /// Path of the file the line was read from, kept verbatim
    pub source_path: String,

    /// The line content, without its trailing newline
    pub raw_line: String,

    /// Timestamp token extracted by the sorter
    pub timestamp_key: Option<String>,
}

impl LogRecord {
    pub fn new(source_path: impl Into<String>, raw_line: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            raw_line: raw_line.into(),
            timestamp_key: None,
        }
    }

    /// The `path:line` form produced by the matcher
    pub fn tagged_line(&self) -> String {
        format!("{}:{}", self.source_path, self.raw_line)
    }

    /// Namespace and pod encoded in the source path, if it has the
    /// `.../logs/<namespace>/<pod>/<file>` shape
    pub fn path_tag(&self) -> Option<PathTag> {
        PathTag::parse(&self.source_path)
    }
}

/// Sort direction for the timestamp sorter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            other => Err(format!("unknown sort order '{other}'")),
        }
    }
}

// ============================================================================
// Pod Identity Types
// ============================================================================

/// (namespace, pod) pair derived from a structural log path
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PathTag {
    pub namespace: String,
    pub pod: String,
}

impl PathTag {
    /// Parse `.../logs/<namespace>/<pod>/<file>`.
    ///
    /// The file must be the last path segment; a `.log` or `.log.N` suffix
    /// on the pod segment is dropped.
    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.split('/').collect();
        let [logs, namespace, pod, file] = segments.get(segments.len().checked_sub(4)?..)? else {
            return None;
        };
        if *logs != "logs" {
            return None;
        }

        let pod = strip_log_suffix(pod);
        if namespace.is_empty() || pod.is_empty() || file.is_empty() {
            return None;
        }

        Some(Self {
            namespace: namespace.to_string(),
            pod: pod.to_string(),
        })
    }

    pub fn key(&self) -> PodKey {
        PodKey::new(&self.namespace, &self.pod)
    }
}

/// Drop a trailing `.log` or `.log.<digits>` from a pod segment
fn strip_log_suffix(segment: &str) -> &str {
    if let Some(stem) = segment.strip_suffix(".log") {
        return stem;
    }
    if let Some((stem, rotation)) = segment.rsplit_once('.')
        && !rotation.is_empty()
        && rotation.bytes().all(|b| b.is_ascii_digit())
        && let Some(stem) = stem.strip_suffix(".log")
    {
        return stem;
    }
    segment
}

/// Cache key for identity resolution
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PodKey {
    pub namespace: String,
    pub pod: String,
}

impl PodKey {
    pub fn new(namespace: impl Into<String>, pod: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            pod: pod.into(),
        }
    }
}

impl fmt::Display for PodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.pod)
    }
}

/// Placeholder for a missing owner or node
pub const UNKNOWN: &str = "unknown";

/// Owner and node of a pod, immutable once resolved
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodIdentity {
    pub namespace: String,
    pub pod: String,
    pub owner: String,
    pub node: String,
}

impl PodIdentity {
    /// Build an identity, normalizing every field and defaulting missing
    /// owner/node to "unknown"
    pub fn new(
        namespace: &str,
        pod: &str,
        owner: Option<&str>,
        node: Option<&str>,
    ) -> Self {
        Self {
            namespace: normalize_field(namespace),
            pod: normalize_field(pod),
            owner: owner
                .map(normalize_field)
                .filter(|o| !o.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            node: node
                .map(normalize_field)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string()),
        }
    }

    /// Bracketed label used by the annotator: `[ns/owner node]`
    pub fn label(&self) -> String {
        format!("[{}/{} {}]", self.namespace, self.owner, self.node)
    }
}

/// Strip embedded newlines, collapse internal whitespace and trim.
pub fn normalize_field(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Outcome of resolving one pod
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Found(PodIdentity),
    NotFound,
}

impl Resolution {
    pub fn identity(&self) -> Option<&PodIdentity> {
        match self {
            Self::Found(identity) => Some(identity),
            Self::NotFound => None,
        }
    }
}
