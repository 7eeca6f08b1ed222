// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Synchronous creation of namespace-scoping resources.
//!
//! A provisioning call creates the resource as the caller, then blocks through two
//! independent bounded waits: the hierarchy controller materializing the namespace,
//! and RBAC propagating the caller's access into it. Neither timeout rolls anything
//! back; identifiers are unique so a retry never collides with leftovers.

use crate::authorization::{AuthInfo, AuthorizedNamespaces, NamespacePermissions};
use crate::error::{RepositoryError, Result};
use crate::kubernetes::UserClientFactory;
use crate::provisioning::wait::{poll_until, watch_until, Outcome};
use crate::types::{CFOrg, ResourceType, SubnamespaceAnchor};
use kube::core::NamespaceResourceScope;
use kube::{api::PostParams, Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// A namespaced resource whose convergence materializes a namespace named after it
pub trait Provisionable:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Serialize
    + DeserializeOwned
    + Debug
    + Send
    + Sync
    + 'static
{
    /// Whether the owning controller reports the child namespace as ready
    fn is_provisioned(&self) -> bool;
}

impl Provisionable for SubnamespaceAnchor {
    fn is_provisioned(&self) -> bool {
        self.is_ok()
    }
}

impl Provisionable for CFOrg {
    fn is_provisioned(&self) -> bool {
        self.is_ready()
    }
}

/// Timing of the two convergence waits
#[derive(Debug, Clone, Copy)]
pub struct ProvisioningConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

pub struct Provisioner {
    privileged: Client,
    user_clients: Arc<dyn UserClientFactory>,
    permissions: Arc<dyn NamespacePermissions>,
    config: ProvisioningConfig,
}

impl Provisioner {
    pub fn new(
        privileged: Client,
        user_clients: Arc<dyn UserClientFactory>,
        permissions: Arc<dyn NamespacePermissions>,
        config: ProvisioningConfig,
    ) -> Self {
        Self {
            privileged,
            user_clients,
            permissions,
            config,
        }
    }

    /// Create an anchor for `child` below `parent` and wait for it to converge
    pub async fn provision_anchor(
        &self,
        auth: &AuthInfo,
        parent: &str,
        child: &str,
        labels: BTreeMap<String, String>,
        annotations: BTreeMap<String, String>,
        resource_type: ResourceType,
    ) -> Result<SubnamespaceAnchor> {
        let anchor = SubnamespaceAnchor::child(parent, child, labels, annotations);
        self.provision(auth, anchor, resource_type).await
    }

    /// Create `resource` as the caller, then wait until it is provisioned and the caller
    /// can see the namespace it materialized. Returns the converged object.
    #[instrument(
        skip(self, auth, resource),
        fields(
            parent = %resource.namespace().unwrap_or_default(),
            name = %resource.name_any()
        )
    )]
    pub async fn provision<K: Provisionable>(
        &self,
        auth: &AuthInfo,
        resource: K,
        resource_type: ResourceType,
    ) -> Result<K> {
        let parent = resource.namespace().unwrap_or_default();
        let name = resource.name_any();

        let user_client = self.user_clients.build_client(auth)?;
        let user_api: Api<K> = Api::namespaced(user_client, &parent);
        user_api
            .create(&PostParams::default(), &resource)
            .await
            .map_err(|e| RepositoryError::from_kube(e, resource_type))?;
        info!("Created {} {}/{}", K::kind(&()), parent, name);

        let watch_api: Api<K> = Api::namespaced(self.privileged.clone(), &parent);
        let converged = match watch_until(watch_api, &name, self.config.timeout, K::is_provisioned)
            .await?
        {
            Outcome::Ready(obj) => obj,
            Outcome::TimedOut(elapsed) => {
                return Err(RepositoryError::ConvergenceTimeout {
                    resource_type,
                    elapsed,
                })
            }
        };
        debug!("{} {} is provisioned, waiting for permissions", resource_type, name);

        let namespace = name.as_str();
        let propagated = poll_until(self.config.poll_interval, self.config.timeout, || async move {
            let authorized = self.authorized_namespaces(auth, resource_type).await?;
            Ok(authorized.contains(namespace))
        })
        .await?;

        if let Outcome::TimedOut(elapsed) = propagated {
            return Err(RepositoryError::PermissionPropagationTimeout {
                namespace: name,
                elapsed,
            });
        }

        info!("{} {} is ready and visible to the caller", resource_type, name);
        Ok(converged)
    }

    async fn authorized_namespaces(
        &self,
        auth: &AuthInfo,
        resource_type: ResourceType,
    ) -> Result<AuthorizedNamespaces> {
        match resource_type {
            ResourceType::Org => self.permissions.authorized_org_namespaces(auth).await,
            _ => self.permissions.authorized_space_namespaces(auth).await,
        }
    }
}
