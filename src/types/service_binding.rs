// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Association between an app and a service instance within one space namespace
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[kube(
    group = "services.cloudfoundry.org",
    version = "v1alpha1",
    kind = "CFServiceBinding"
)]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct CFServiceBindingSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub service: ServiceRef,
    pub app_ref: AppRef,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRef {
    pub kind: String,
    pub api_version: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, schemars::JsonSchema)]
pub struct AppRef {
    pub name: String,
}

impl CFServiceBinding {
    pub fn app_guid(&self) -> &str {
        &self.spec.app_ref.name
    }

    pub fn service_instance_guid(&self) -> &str {
        &self.spec.service.name
    }

    /// True only when both the app and the service instance match
    pub fn binds(&self, app_guid: &str, service_instance_guid: &str) -> bool {
        self.app_guid() == app_guid && self.service_instance_guid() == service_instance_guid
    }
}
