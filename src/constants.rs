// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Label keys set on backing cluster objects
pub mod labels {
    /// Display name of an organization, set on its anchor
    pub const ORG_NAME: &str = "cloudfoundry.org/org-name";
    /// Display name of a space, set on its anchor
    pub const SPACE_NAME: &str = "cloudfoundry.org/space-name";
    pub const PROVISIONED_SERVICE: &str = "servicebinding.io/provisioned-service";
}

/// Annotation keys set on backing cluster objects
pub mod annotations {
    /// Persists the suspended flag of an organization
    pub const SUSPENDED: &str = "cloudfoundry.org/suspended";
}

/// Identifier prefixes, the generated identifier doubles as the namespace name
pub mod guid {
    pub const ORG_PREFIX: &str = "cf-org-";
    pub const SPACE_PREFIX: &str = "cf-space-";
}

/// Hierarchical namespace controller conventions
pub mod hnc {
    /// Name of the per-namespace HierarchyConfiguration singleton
    pub const HIERARCHY_CONFIG_NAME: &str = "hierarchy";
    /// Suffix of the `<ancestor>.tree.hnc.x-k8s.io/depth` namespace label
    pub const TREE_DEPTH_LABEL_SUFFIX: &str = ".tree.hnc.x-k8s.io/depth";
    /// Depth of organization namespaces below the root namespace
    pub const ORG_DEPTH: u32 = 1;
    /// Depth of space namespaces below the root namespace
    pub const SPACE_DEPTH: u32 = 2;
}

/// Provisioning wait defaults
pub mod provisioning {
    /// Deadline applied to each of the two convergence waits
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    /// Fixed interval between permission propagation probes
    pub const DEFAULT_POLL_INTERVAL_MILLIS: u64 = 500;
}

/// Baseline service accounts created in every new space
pub mod service_accounts {
    /// Used by the image builder, references the registry credentials
    pub const DEFAULT_BUILDER: &str = "kpack-service-account";
    /// Used by the workload runner
    pub const DEFAULT_RUNNER: &str = "eirini";
}

pub mod service_binding {
    pub const TYPE_APP: &str = "app";
    pub const SERVICE_INSTANCE_KIND: &str = "CFServiceInstance";
    pub const LAST_OPERATION_CREATE: &str = "create";
    pub const LAST_OPERATION_SUCCEEDED: &str = "succeeded";
}
