// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-caller namespace visibility, recomputed live on every call.

use crate::authorization::identity::{AuthInfo, IdentityProvider};
use crate::constants::hnc;
use crate::error::{RepositoryError, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::rbac::v1::RoleBinding;
use kube::{api::ListParams, Api, Client, ResourceExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Point-in-time snapshot of the namespaces a caller can see
pub type AuthorizedNamespaces = HashSet<String>;

#[async_trait]
pub trait NamespacePermissions: Send + Sync {
    /// Namespaces currently visible to the caller as organizations
    async fn authorized_org_namespaces(&self, auth: &AuthInfo) -> Result<AuthorizedNamespaces>;

    /// Namespaces currently visible to the caller as spaces
    async fn authorized_space_namespaces(&self, auth: &AuthInfo) -> Result<AuthorizedNamespaces>;
}

/// Derives visibility from role bindings naming the caller, restricted to namespaces
/// at the org or space depth of the hierarchy below the root namespace.
pub struct RoleBindingNamespacePermissions {
    client: Client,
    identity_provider: Arc<dyn IdentityProvider>,
    root_namespace: String,
}

impl RoleBindingNamespacePermissions {
    pub fn new(
        client: Client,
        identity_provider: Arc<dyn IdentityProvider>,
        root_namespace: impl Into<String>,
    ) -> Self {
        Self {
            client,
            identity_provider,
            root_namespace: root_namespace.into(),
        }
    }

    #[instrument(skip(self, auth))]
    async fn authorized_namespaces_at_depth(
        &self,
        auth: &AuthInfo,
        depth: u32,
    ) -> Result<AuthorizedNamespaces> {
        let identity = self.identity_provider.identity(auth).await?;

        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let candidates: HashSet<String> = namespaces
            .list(&ListParams::default().labels(&depth_selector(&self.root_namespace, depth)))
            .await
            .map_err(|e| RepositoryError::transport("failed to list namespaces", e))?
            .items
            .iter()
            .map(|ns| ns.name_any())
            .collect();

        let role_bindings: Api<RoleBinding> = Api::all(self.client.clone());
        let bindings = role_bindings
            .list(&ListParams::default())
            .await
            .map_err(|e| RepositoryError::transport("failed to list role bindings", e))?;

        let authorized: AuthorizedNamespaces = bindings
            .items
            .iter()
            .filter(|rb| {
                rb.subjects
                    .as_ref()
                    .is_some_and(|subjects| subjects.iter().any(|s| identity.matches_subject(s)))
            })
            .filter_map(|rb| rb.namespace())
            .filter(|ns| candidates.contains(ns))
            .collect();

        debug!(
            "Caller {} can see {} of {} namespaces at depth {}",
            identity.name,
            authorized.len(),
            candidates.len(),
            depth
        );

        Ok(authorized)
    }
}

/// Label selector for namespaces `depth` levels below `root` in the hierarchy
fn depth_selector(root: &str, depth: u32) -> String {
    format!("{}{}={}", root, hnc::TREE_DEPTH_LABEL_SUFFIX, depth)
}

#[async_trait]
impl NamespacePermissions for RoleBindingNamespacePermissions {
    async fn authorized_org_namespaces(&self, auth: &AuthInfo) -> Result<AuthorizedNamespaces> {
        self.authorized_namespaces_at_depth(auth, hnc::ORG_DEPTH)
            .await
    }

    async fn authorized_space_namespaces(&self, auth: &AuthInfo) -> Result<AuthorizedNamespaces> {
        self.authorized_namespaces_at_depth(auth, hnc::SPACE_DEPTH)
            .await
    }
}
