// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Per-namespace hierarchy settings, a singleton named `hierarchy`
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "hnc.x-k8s.io", version = "v1alpha2", kind = "HierarchyConfiguration")]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyConfigurationSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// When set, deleting the anchor also removes the whole namespace subtree
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_cascading_deletion: Option<bool>,
}

impl HierarchyConfiguration {
    pub fn allows_cascading_deletion(&self) -> bool {
        self.spec.allow_cascading_deletion.unwrap_or(false)
    }
}
