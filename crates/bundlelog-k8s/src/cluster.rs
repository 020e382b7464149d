//! Live pod query against a running cluster

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::api::ListParams;
use kube::config::KubeConfigOptions;
use tracing::debug;

use crate::PodRow;

/// Cluster identity source backed by the kubeconfig
pub struct ClusterSource {
    client: kube::Client,
}

impl ClusterSource {
    /// Connect using the named kubeconfig context, or infer the config
    /// (current context or in-cluster) when none is given
    pub async fn connect(context: Option<&str>) -> Result<Self> {
        let config = match context {
            Some(name) => kube::Config::from_kubeconfig(&KubeConfigOptions {
                context: Some(name.to_string()),
                ..Default::default()
            })
            .await
            .context(format!("Failed to create config for context: {}", name))?,
            None => kube::Config::infer()
                .await
                .context("Failed to infer cluster config. Is kubectl configured?")?,
        };

        let client = kube::Client::try_from(config).context("Failed to create cluster client")?;
        Ok(Self { client })
    }

    /// List every pod in `namespace` as (pod, owner, node) rows
    pub async fn list_pods(&self, namespace: &str) -> Result<Vec<PodRow>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods
            .list(&ListParams::default())
            .await
            .context(format!("Failed to list pods in {}", namespace))?;

        debug!("Listed {} pods in {}", list.items.len(), namespace);
        Ok(list
            .items
            .iter()
            .filter_map(|pod| pod_to_row(pod, namespace))
            .collect())
    }
}

/// Convert a k8s Pod to a PodRow
pub fn pod_to_row(pod: &Pod, namespace: &str) -> Option<PodRow> {
    let name = pod.metadata.name.clone().filter(|n| !n.is_empty())?;
    let refs = pod.metadata.owner_references.as_deref().unwrap_or_default();
    let owner = refs
        .iter()
        .find(|r| r.controller == Some(true))
        .or_else(|| refs.first())
        .map(|r| r.name.clone());
    let node = pod.spec.as_ref().and_then(|s| s.node_name.clone());

    Some(PodRow {
        namespace: pod
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| namespace.to_string()),
        pod: name,
        owner,
        node,
    })
}
