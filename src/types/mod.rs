// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster object kinds backing organizations, spaces and service bindings.

pub mod anchor;
pub mod hierarchy;
pub mod org;
pub mod service_binding;

pub use anchor::{AnchorState, SubnamespaceAnchor, SubnamespaceAnchorSpec, SubnamespaceAnchorStatus};
pub use hierarchy::{HierarchyConfiguration, HierarchyConfigurationSpec};
pub use org::{CFOrg, CFOrgSpec, CFOrgStatus, Condition};
pub use service_binding::{AppRef, CFServiceBinding, CFServiceBindingSpec, ServiceRef};

use std::fmt;

/// Platform-level resource kinds, used to scope errors and lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Org,
    Space,
    ServiceBinding,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceType::Org => "Org",
            ResourceType::Space => "Space",
            ResourceType::ServiceBinding => "Service Binding",
        };
        f.write_str(name)
    }
}
