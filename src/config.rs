//! Optional TOML configuration
//!
//! Priority: CLI flags > config file > defaults. The file is taken from
//! `--config`, then `BUNDLELOG_CONFIG`, then `bundlelog.toml` in the working
//! directory when it exists.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use bundlelog_k8s::{SourceKind, default_sources};
use bundlelog_types::SortOrder;

pub const CONFIG_ENV: &str = "BUNDLELOG_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "bundlelog.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub search: SearchConfig,
    pub identity: IdentityConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Basename globs; empty matches every file
    pub include: Vec<String>,
    pub exclude: String,
    pub sort_order: SortOrder,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    pub annotate: bool,
    pub sources: Vec<SourceKind>,
    /// Namespace the live query is scoped to
    pub namespace: String,
    /// Pod inventory, relative to the bundle root
    pub inventory_path: PathBuf,
    pub context: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            annotate: true,
            sources: default_sources(),
            namespace: "longhorn-system".to_string(),
            inventory_path: PathBuf::from("yamls/pods.json"),
            context: None,
        }
    }
}

impl Config {
    /// Load from an explicit path, the env var, or the default file.
    /// An explicitly named file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        match explicit {
            Some(path) => Self::from_file(&path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading configuration from: {}", path.display());
        let contents = fs::read_to_string(path)
            .context(format!("Failed to read config file {}", path.display()))?;
        Self::parse(&contents).context(format!("Invalid config file {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}
