//! Structured pod inventory captured in a bundle
//!
//! Accepts the output of `kubectl get pods -o json` (a `{"items": [...]}`
//! list) as well as a bare array. Items may be in Kubernetes shape or flat
//! (`name`, `namespace`, `ownerReferences`, `nodeName` at the top level).

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;

use bundlelog_types::{Error, Result};

use crate::PodRow;

#[derive(Deserialize)]
#[serde(untagged)]
enum InventoryDoc {
    Wrapped { items: Vec<InventoryPod> },
    Bare(Vec<InventoryPod>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InventoryPod {
    #[serde(default)]
    metadata: Option<InventoryMeta>,
    #[serde(default)]
    spec: Option<InventorySpec>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    owner_references: Option<Vec<OwnerRef>>,
    #[serde(default)]
    node_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InventoryMeta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    owner_references: Option<Vec<OwnerRef>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InventorySpec {
    #[serde(default)]
    node_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwnerRef {
    name: String,
    #[serde(default)]
    controller: Option<bool>,
}

/// Load the inventory at `path`.
///
/// Returns `Ok(None)` when the file does not exist. Items without a
/// namespace are assigned `default_namespace`; items without a name are
/// skipped.
pub fn load_inventory(path: &Path, default_namespace: &str) -> Result<Option<Vec<PodRow>>> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(Error::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let doc: InventoryDoc = serde_json::from_slice(&content).map_err(|source| Error::Inventory {
        path: path.to_path_buf(),
        source,
    })?;
    let items = match doc {
        InventoryDoc::Wrapped { items } | InventoryDoc::Bare(items) => items,
    };

    Ok(Some(
        items
            .into_iter()
            .filter_map(|item| item.into_row(default_namespace))
            .collect(),
    ))
}

impl InventoryPod {
    fn into_row(self, default_namespace: &str) -> Option<PodRow> {
        let meta = self.metadata.unwrap_or_default();
        let pod = meta.name.or(self.name).filter(|n| !n.is_empty())?;
        let namespace = meta
            .namespace
            .or(self.namespace)
            .unwrap_or_else(|| default_namespace.to_string());
        let refs = meta.owner_references.or(self.owner_references).unwrap_or_default();
        let owner = controller_owner(&refs);
        let node = self.spec.and_then(|s| s.node_name).or(self.node_name);

        Some(PodRow {
            namespace,
            pod,
            owner,
            node,
        })
    }
}

fn controller_owner(refs: &[OwnerRef]) -> Option<String> {
    refs.iter()
        .find(|r| r.controller == Some(true))
        .or_else(|| refs.first())
        .map(|r| r.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("pods.json");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_inventory_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let rows = load_inventory(&dir.path().join("pods.json"), "ns").unwrap();
        assert!(rows.is_none());
    }

    #[test]
    fn test_kubectl_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"{"apiVersion":"v1","kind":"List","items":[
                {"metadata":{"name":"mgr-1","namespace":"longhorn-system",
                  "ownerReferences":[{"kind":"Node","name":"n"},{"kind":"DaemonSet","name":"longhorn-manager","controller":true}]},
                 "spec":{"nodeName":"node-1"}},
                {"metadata":{"name":"lonely"}}
            ]}"#,
        );
        let rows = load_inventory(&path, "fallback").unwrap().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].namespace, "longhorn-system");
        assert_eq!(rows[0].owner.as_deref(), Some("longhorn-manager"));
        assert_eq!(rows[0].node.as_deref(), Some("node-1"));
        assert_eq!(rows[1].namespace, "fallback");
        assert!(rows[1].owner.is_none());
        assert!(rows[1].node.is_none());
    }

    #[test]
    fn test_flat_bare_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"[{"name":"p","ownerReferences":[{"name":"rs-1"}],"nodeName":"n2"},{"nodeName":"x"}]"#,
        );
        let rows = load_inventory(&path, "ns").unwrap().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pod, "p");
        assert_eq!(rows[0].owner.as_deref(), Some("rs-1"));
        assert_eq!(rows[0].node.as_deref(), Some("n2"));
    }

    #[test]
    fn test_malformed_inventory_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "{not json");
        assert!(matches!(
            load_inventory(&path, "ns"),
            Err(Error::Inventory { .. })
        ));
    }
}
