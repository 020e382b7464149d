//! Pod identity resolution for bundlelog
//!
//! This crate maps a (namespace, pod) pair to the pod's controller owner and
//! node, using a bundle's pod inventory, a live cluster query, or the pod
//! manifests captured in the bundle.

mod cluster;
mod inventory;
mod locator;
mod manifest;
mod resolver;
mod setup;

pub use cluster::{ClusterSource, pod_to_row};
pub use inventory::load_inventory;
pub use locator::ManifestLocator;
pub use manifest::{ManifestEntry, scan_manifest};
pub use resolver::{
    IdentityResolver, IdentityStrategy, Lookup, ManifestStrategy, PrefetchedIdentities,
};
pub use setup::{
    IdentitySettings, ResolverSetup, SourceKind, build_resolver, default_sources, prefetch,
};

// Re-export types used in our public API
pub use bundlelog_types::{PodIdentity, PodKey, Resolution};

/// One pod as reported by an identity source
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodRow {
    pub namespace: String,
    pub pod: String,
    pub owner: Option<String>,
    pub node: Option<String>,
}
