// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Caller-scoped repositories for organizations, spaces and service bindings.
//!
//! Reads go through the privileged client and are then intersected with the caller's
//! authorized namespaces; writes go through a client built from the caller's credentials.

pub mod filter;
pub mod org;
pub mod service_binding;
pub mod space;

pub use org::{CreateOrgMessage, ListOrgsMessage, OrgRecord, OrgRepository};
pub use service_binding::{
    CreateServiceBindingMessage, LastOperation, ListServiceBindingsMessage, ServiceBindingRecord,
    ServiceBindingRepository,
};
pub use space::{
    CreateSpaceMessage, DeleteSpaceMessage, ListSpacesMessage, ServiceAccountNames, SpaceRecord,
    SpaceRepository,
};

use crate::authorization::NamespacePermissions;
use crate::kubernetes::UserClientFactory;
use kube::Client;
use std::sync::Arc;
use uuid::Uuid;

/// Collaborators shared by every repository
#[derive(Clone)]
pub struct RepositoryContext {
    /// Namespace under which organization namespaces live
    pub root_namespace: String,
    /// Cluster-wide read/watch client
    pub privileged: Client,
    pub user_clients: Arc<dyn UserClientFactory>,
    pub permissions: Arc<dyn NamespacePermissions>,
}

/// Generates a fresh identifier with the given prefix
pub type GuidSource = fn(&str) -> String;

pub fn random_guid(prefix: &str) -> String {
    format!("{}{}", prefix, Uuid::new_v4())
}
