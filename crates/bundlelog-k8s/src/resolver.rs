use std::collections::{HashMap, HashSet};
use std::fs;

use tracing::{debug, warn};

use bundlelog_types::{PodIdentity, PodKey, Resolution};

use crate::PodRow;
use crate::locator::ManifestLocator;
use crate::manifest::scan_manifest;

/// Answer of a single identity strategy.
///
/// `Unavailable` means the strategy could not answer at all (source
/// missing, unreadable, out of its scope); it is never cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    Found(PodIdentity),
    NotFound,
    Unavailable,
}

/// One way of resolving a pod's owner and node
pub trait IdentityStrategy {
    fn name(&self) -> &str;

    fn lookup(&self, key: &PodKey) -> Lookup;
}

// ============================================================================
// Prefetched identities (bundle inventory or live cluster query)
// ============================================================================

/// Identities loaded once before the pipeline runs
#[derive(Debug, Default)]
pub struct PrefetchedIdentities {
    source: String,
    pods: HashMap<PodKey, PodIdentity>,
    namespaces: HashSet<String>,
}

impl PrefetchedIdentities {
    pub fn from_rows(source: impl Into<String>, rows: Vec<PodRow>) -> Self {
        let mut pods = HashMap::with_capacity(rows.len());
        let mut namespaces = HashSet::new();

        for row in rows {
            let identity = PodIdentity::new(
                &row.namespace,
                &row.pod,
                row.owner.as_deref(),
                row.node.as_deref(),
            );
            let key = PodKey::new(&identity.namespace, &identity.pod);
            namespaces.insert(identity.namespace.clone());
            // first row wins for duplicate pods
            pods.entry(key).or_insert(identity);
        }

        Self {
            source: source.into(),
            pods,
            namespaces,
        }
    }

    pub fn len(&self) -> usize {
        self.pods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }
}

impl IdentityStrategy for PrefetchedIdentities {
    fn name(&self) -> &str {
        &self.source
    }

    fn lookup(&self, key: &PodKey) -> Lookup {
        if let Some(identity) = self.pods.get(key) {
            Lookup::Found(identity.clone())
        } else if self.namespaces.contains(&key.namespace) {
            Lookup::NotFound
        } else {
            Lookup::Unavailable
        }
    }
}

// ============================================================================
// Manifest files
// ============================================================================

/// Resolves pods by scanning the namespace's manifest in the bundle
#[derive(Clone, Debug)]
pub struct ManifestStrategy {
    locator: ManifestLocator,
}

impl ManifestStrategy {
    pub fn new(locator: ManifestLocator) -> Self {
        Self { locator }
    }
}

impl IdentityStrategy for ManifestStrategy {
    fn name(&self) -> &str {
        "manifest"
    }

    fn lookup(&self, key: &PodKey) -> Lookup {
        let Some(path) = self.locator.locate(&key.namespace) else {
            debug!("No manifest for namespace {}", key.namespace);
            return Lookup::NotFound;
        };

        let text = match fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!("Could not read manifest {}: {}", path.display(), e);
                return Lookup::Unavailable;
            }
        };

        match scan_manifest(&text, &key.pod) {
            Some(entry) => Lookup::Found(PodIdentity::new(
                &key.namespace,
                &key.pod,
                entry.owner.as_deref(),
                entry.node.as_deref(),
            )),
            None => Lookup::NotFound,
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Caching resolver over an ordered chain of strategies.
///
/// The first conclusive answer (`Found` or `NotFound`) wins and is cached
/// for the rest of the run, misses included. Cached answers never touch a
/// strategy again.
pub struct IdentityResolver {
    strategies: Vec<Box<dyn IdentityStrategy>>,
    cache: HashMap<PodKey, Resolution>,
}

impl IdentityResolver {
    pub fn new(strategies: Vec<Box<dyn IdentityStrategy>>) -> Self {
        Self {
            strategies,
            cache: HashMap::new(),
        }
    }

    pub fn resolve(&mut self, namespace: &str, pod: &str) -> Resolution {
        let key = PodKey::new(namespace, pod);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        for strategy in &self.strategies {
            let resolution = match strategy.lookup(&key) {
                Lookup::Found(identity) => Resolution::Found(identity),
                Lookup::NotFound => Resolution::NotFound,
                Lookup::Unavailable => continue,
            };
            debug!("Resolved {} via {}: {:?}", key, strategy.name(), resolution);
            self.cache.insert(key, resolution.clone());
            return resolution;
        }

        debug!("No identity source could answer for {}", key);
        Resolution::NotFound
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Number of cached answers, hits and misses
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
