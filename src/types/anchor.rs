// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::api::ObjectMeta;
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Marker whose acceptance by the hierarchy controller materializes a child namespace
/// named after the anchor, below the namespace the anchor lives in.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "hnc.x-k8s.io", version = "v1alpha2", kind = "SubnamespaceAnchor")]
#[kube(namespaced)]
#[kube(status = "SubnamespaceAnchorStatus")]
#[serde(rename_all = "camelCase")]
pub struct SubnamespaceAnchorSpec {
    /// Labels propagated onto the child namespace
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<MetaKvp>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<MetaKvp>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, schemars::JsonSchema)]
pub struct MetaKvp {
    pub key: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
pub struct SubnamespaceAnchorStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AnchorState>,
}

/// Convergence state reported by the hierarchy controller
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, schemars::JsonSchema)]
pub enum AnchorState {
    /// Not yet observed by the controller
    Pending,
    Ok,
    Missing,
    Conflict,
    Forbidden,
}

impl SubnamespaceAnchor {
    /// Build an anchor for `child` below `parent`
    pub fn child(
        parent: &str,
        child: &str,
        labels: BTreeMap<String, String>,
        annotations: BTreeMap<String, String>,
    ) -> Self {
        let mut anchor = SubnamespaceAnchor::new(child, SubnamespaceAnchorSpec::default());
        anchor.metadata = ObjectMeta {
            name: Some(child.to_string()),
            namespace: Some(parent.to_string()),
            labels: Some(labels).filter(|l| !l.is_empty()),
            annotations: Some(annotations).filter(|a| !a.is_empty()),
            ..Default::default()
        };
        anchor
    }

    /// Current state, an anchor without status is still pending
    pub fn state(&self) -> AnchorState {
        self.status
            .as_ref()
            .and_then(|s| s.status)
            .unwrap_or(AnchorState::Pending)
    }

    pub fn is_ok(&self) -> bool {
        self.state() == AnchorState::Ok
    }

    /// Value of a metadata label, or an empty string
    pub fn label(&self, key: &str) -> String {
        self.metadata
            .labels
            .as_ref()
            .and_then(|l| l.get(key))
            .cloned()
            .unwrap_or_default()
    }

    /// Namespace the anchor lives in, which is the parent of its child namespace
    pub fn parent_namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or_default()
    }
}
