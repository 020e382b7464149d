//! Building the resolver chain and running the one-time prefetch

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{info, warn};

use crate::cluster::ClusterSource;
use crate::inventory::load_inventory;
use crate::locator::ManifestLocator;
use crate::resolver::{IdentityResolver, IdentityStrategy, ManifestStrategy, PrefetchedIdentities};

/// An identity source, in the order given by configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Structured pod inventory inside the bundle
    Inventory,
    /// Live query against the cluster API
    Cluster,
    /// Pod manifests inside the bundle, scanned per pod
    Manifest,
}

impl SourceKind {
    fn is_prefetch(&self) -> bool {
        matches!(self, Self::Inventory | Self::Cluster)
    }
}

pub fn default_sources() -> Vec<SourceKind> {
    vec![SourceKind::Inventory, SourceKind::Cluster, SourceKind::Manifest]
}

/// Everything needed to assemble the identity resolver
#[derive(Clone, Debug)]
pub struct IdentitySettings {
    pub bundle_root: PathBuf,
    pub sources: Vec<SourceKind>,
    /// Namespace the live query is scoped to, and the default namespace
    /// for inventory items that carry none
    pub namespace: String,
    /// Inventory path, relative to the bundle root
    pub inventory_path: PathBuf,
    pub context: Option<String>,
}

/// Resolver plus whether annotation stays on for this run
pub struct ResolverSetup {
    pub resolver: IdentityResolver,
    pub annotate: bool,
    /// A prefetch source was configured but yielded no identities
    pub prefetch_missing: bool,
}

/// Load prefetch sources in order; the first one yielding entries wins.
///
/// Source failures are reported and skipped, never fatal.
pub async fn prefetch(settings: &IdentitySettings) -> Option<PrefetchedIdentities> {
    for kind in settings.sources.iter().filter(|k| k.is_prefetch()) {
        let prefetched = match kind {
            SourceKind::Inventory => prefetch_inventory(settings),
            SourceKind::Cluster => prefetch_cluster(settings).await,
            SourceKind::Manifest => None,
        };
        if let Some(prefetched) = prefetched.filter(|p| !p.is_empty()) {
            info!(
                "Loaded {} pod identities from {}",
                prefetched.len(),
                prefetched.name()
            );
            return Some(prefetched);
        }
    }
    None
}

fn prefetch_inventory(settings: &IdentitySettings) -> Option<PrefetchedIdentities> {
    let path = settings.bundle_root.join(&settings.inventory_path);
    match load_inventory(&path, &settings.namespace) {
        Ok(Some(rows)) => Some(PrefetchedIdentities::from_rows("inventory", rows)),
        Ok(None) => {
            info!("No pod inventory at {}", path.display());
            None
        }
        Err(e) => {
            warn!("Skipping pod inventory: {}", e);
            None
        }
    }
}

async fn prefetch_cluster(settings: &IdentitySettings) -> Option<PrefetchedIdentities> {
    let source = match ClusterSource::connect(settings.context.as_deref()).await {
        Ok(source) => source,
        Err(e) => {
            warn!("Cluster query unavailable: {:#}", e);
            return None;
        }
    };
    match source.list_pods(&settings.namespace).await {
        Ok(rows) => Some(PrefetchedIdentities::from_rows("cluster", rows)),
        Err(e) => {
            warn!("Cluster query failed: {:#}", e);
            None
        }
    }
}

/// Assemble the strategy chain in configured order.
///
/// Annotation is switched off when the chain would have nothing to ask:
/// no manifest strategy and an empty prefetch.
pub fn build_resolver(
    settings: &IdentitySettings,
    prefetched: Option<PrefetchedIdentities>,
) -> ResolverSetup {
    let mut prefetched = prefetched.filter(|p| !p.is_empty());
    let prefetch_missing =
        prefetched.is_none() && settings.sources.iter().any(SourceKind::is_prefetch);
    let mut strategies: Vec<Box<dyn IdentityStrategy>> = Vec::new();
    let mut manifest_added = false;

    for kind in &settings.sources {
        match kind {
            SourceKind::Inventory | SourceKind::Cluster => {
                // one map serves both prefetch kinds, placed at the first
                if let Some(p) = prefetched.take() {
                    strategies.push(Box::new(p));
                }
            }
            SourceKind::Manifest if !manifest_added => {
                manifest_added = true;
                strategies.push(Box::new(ManifestStrategy::new(ManifestLocator::new(
                    &settings.bundle_root,
                ))));
            }
            SourceKind::Manifest => {}
        }
    }

    let annotate = !strategies.is_empty();
    if !annotate {
        warn!("No pod identities available; annotation disabled for this run");
    } else if prefetch_missing {
        warn!("No prefetched pod identities; resolving from bundle manifests only");
    }

    ResolverSetup {
        resolver: IdentityResolver::new(strategies),
        annotate,
        prefetch_missing,
    }
}
