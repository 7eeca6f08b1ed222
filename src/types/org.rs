// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::api::ObjectMeta;
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// First-class organization resource, reconciled into a namespace by its own controller
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[kube(group = "korifi.cloudfoundry.org", version = "v1alpha1", kind = "CFOrg")]
#[kube(namespaced)]
#[kube(status = "CFOrgStatus")]
#[serde(rename_all = "camelCase")]
pub struct CFOrgSpec {
    pub display_name: String,
}

impl CFOrg {
    pub fn in_root(
        root_namespace: &str,
        guid: &str,
        display_name: &str,
        labels: BTreeMap<String, String>,
        annotations: BTreeMap<String, String>,
    ) -> Self {
        let mut org = CFOrg::new(
            guid,
            CFOrgSpec {
                display_name: display_name.to_string(),
            },
        );
        org.metadata = ObjectMeta {
            name: Some(guid.to_string()),
            namespace: Some(root_namespace.to_string()),
            labels: Some(labels).filter(|l| !l.is_empty()),
            annotations: Some(annotations).filter(|a| !a.is_empty()),
            ..Default::default()
        };
        org
    }

    /// Check if the org controller reports the Ready condition as True
    pub fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .is_some_and(|conditions| {
                conditions
                    .iter()
                    .any(|c| c.condition_type == "Ready" && c.status == "True")
            })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CFOrgStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
