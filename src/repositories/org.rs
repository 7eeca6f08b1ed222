// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Organizations: namespaces directly below the root namespace.

use crate::authorization::AuthInfo;
use crate::config::OrgBackend;
use crate::constants::{annotations, guid, hnc, labels};
use crate::error::{RepositoryError, Result};
use crate::provisioning::Provisioner;
use crate::repositories::filter::{created_at, retain_authorized, updated_at, without_keys, Filter};
use crate::repositories::{random_guid, GuidSource, RepositoryContext};
use crate::types::{CFOrg, HierarchyConfiguration, ResourceType, SubnamespaceAnchor};
use chrono::{DateTime, Utc};
use kube::api::{DeleteParams, ListParams, ObjectMeta, Patch, PatchParams};
use kube::{Api, ResourceExt};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Default)]
pub struct CreateOrgMessage {
    pub name: String,
    pub suspended: bool,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListOrgsMessage {
    pub names: Vec<String>,
    pub guids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrgRecord {
    pub name: String,
    pub guid: String,
    pub suspended: bool,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrgRecord {
    fn from_meta(name: String, meta: &ObjectMeta) -> Self {
        let suspended = meta
            .annotations
            .as_ref()
            .and_then(|a| a.get(annotations::SUSPENDED))
            .is_some_and(|v| v == "true");

        OrgRecord {
            name,
            guid: meta.name.clone().unwrap_or_default(),
            suspended,
            labels: without_keys(meta.labels.as_ref(), &[labels::ORG_NAME]),
            annotations: without_keys(meta.annotations.as_ref(), &[annotations::SUSPENDED]),
            created_at: created_at(meta),
            updated_at: updated_at(meta),
        }
    }
}

pub struct OrgRepository {
    ctx: RepositoryContext,
    provisioner: Arc<Provisioner>,
    backend: OrgBackend,
    new_guid: GuidSource,
}

impl OrgRepository {
    pub fn new(ctx: RepositoryContext, provisioner: Arc<Provisioner>, backend: OrgBackend) -> Self {
        Self {
            ctx,
            provisioner,
            backend,
            new_guid: random_guid,
        }
    }

    pub fn with_guid_source(mut self, new_guid: GuidSource) -> Self {
        self.new_guid = new_guid;
        self
    }

    #[instrument(skip(self, auth, message), fields(name = %message.name))]
    pub async fn create_org(&self, auth: &AuthInfo, message: CreateOrgMessage) -> Result<OrgRecord> {
        let org_guid = (self.new_guid)(guid::ORG_PREFIX);

        let mut org_annotations = message.annotations.clone();
        if message.suspended {
            org_annotations.insert(annotations::SUSPENDED.to_string(), "true".to_string());
        }

        let meta = match self.backend {
            OrgBackend::Anchor => {
                let mut org_labels = message.labels.clone();
                org_labels.insert(labels::ORG_NAME.to_string(), message.name.clone());

                let anchor = self
                    .provisioner
                    .provision_anchor(
                        auth,
                        &self.ctx.root_namespace,
                        &org_guid,
                        org_labels,
                        org_annotations,
                        ResourceType::Org,
                    )
                    .await?;
                self.enable_cascading_delete(auth, &org_guid).await?;
                anchor.metadata
            }
            OrgBackend::CfOrg => {
                let org = CFOrg::in_root(
                    &self.ctx.root_namespace,
                    &org_guid,
                    &message.name,
                    message.labels.clone(),
                    org_annotations,
                );
                self.provisioner
                    .provision(auth, org, ResourceType::Org)
                    .await?
                    .metadata
            }
        };

        info!("Created org {} ({})", message.name, org_guid);
        Ok(OrgRecord {
            name: message.name,
            guid: meta.name.clone().unwrap_or(org_guid),
            suspended: message.suspended,
            labels: message.labels,
            annotations: message.annotations,
            created_at: created_at(&meta),
            updated_at: created_at(&meta),
        })
    }

    /// Let deleting the org anchor remove the whole namespace subtree
    async fn enable_cascading_delete(&self, auth: &AuthInfo, org_guid: &str) -> Result<()> {
        let user_client = self.ctx.user_clients.build_client(auth)?;
        let configs: Api<HierarchyConfiguration> = Api::namespaced(user_client, org_guid);
        let patch = serde_json::json!({"spec": {"allowCascadingDeletion": true}});

        configs
            .patch(
                hnc::HIERARCHY_CONFIG_NAME,
                &PatchParams::default(),
                &Patch::Merge(&patch),
            )
            .await
            .map_err(|e| RepositoryError::from_kube(e, ResourceType::Org))?;

        debug!("Enabled cascading deletion for {}", org_guid);
        Ok(())
    }

    #[instrument(skip(self, auth))]
    pub async fn list_orgs(&self, auth: &AuthInfo, filter: ListOrgsMessage) -> Result<Vec<OrgRecord>> {
        let names = Filter::new(&filter.names);
        let guids = Filter::new(&filter.guids);

        let records: Vec<OrgRecord> = self
            .converged_orgs()
            .await?
            .into_iter()
            .filter(|r| names.matches(&r.name) && guids.matches(&r.guid))
            .collect();

        let authorized = self.ctx.permissions.authorized_org_namespaces(auth).await?;
        Ok(retain_authorized(records, &authorized, |r| &r.guid))
    }

    /// All fully converged orgs below the root namespace, regardless of the caller
    async fn converged_orgs(&self) -> Result<Vec<OrgRecord>> {
        let lp = ListParams::default();
        match self.backend {
            OrgBackend::Anchor => {
                let anchors: Api<SubnamespaceAnchor> =
                    Api::namespaced(self.ctx.privileged.clone(), &self.ctx.root_namespace);
                let list = anchors
                    .list(&lp)
                    .await
                    .map_err(|e| RepositoryError::from_kube(e, ResourceType::Org))?;

                Ok(list
                    .items
                    .iter()
                    .filter(|a| a.is_ok())
                    .map(|a| OrgRecord::from_meta(a.label(labels::ORG_NAME), &a.metadata))
                    .collect())
            }
            OrgBackend::CfOrg => {
                let orgs: Api<CFOrg> =
                    Api::namespaced(self.ctx.privileged.clone(), &self.ctx.root_namespace);
                let list = orgs
                    .list(&lp)
                    .await
                    .map_err(|e| RepositoryError::from_kube(e, ResourceType::Org))?;

                Ok(list
                    .items
                    .iter()
                    .filter(|o| o.is_ready())
                    .map(|o| OrgRecord::from_meta(o.spec.display_name.clone(), &o.metadata))
                    .collect())
            }
        }
    }

    /// Guids of orgs matching `filter`, taken from the anchors when orgs are anchors.
    /// Readiness and caller visibility are not considered.
    pub(crate) async fn org_guids(
        &self,
        anchors: &[SubnamespaceAnchor],
        filter: &Filter,
    ) -> Result<HashSet<String>> {
        match self.backend {
            OrgBackend::Anchor => Ok(anchors
                .iter()
                .filter(|a| a.parent_namespace() == self.ctx.root_namespace)
                .map(|a| a.name_any())
                .filter(|guid| filter.matches(guid))
                .collect()),
            OrgBackend::CfOrg => {
                let orgs: Api<CFOrg> =
                    Api::namespaced(self.ctx.privileged.clone(), &self.ctx.root_namespace);
                let list = orgs
                    .list(&ListParams::default())
                    .await
                    .map_err(|e| RepositoryError::from_kube(e, ResourceType::Org))?;

                Ok(list
                    .items
                    .iter()
                    .map(|o| o.name_any())
                    .filter(|guid| filter.matches(guid))
                    .collect())
            }
        }
    }

    #[instrument(skip(self, auth))]
    pub async fn get_org(&self, auth: &AuthInfo, org_guid: &str) -> Result<OrgRecord> {
        let filter = ListOrgsMessage {
            guids: vec![org_guid.to_string()],
            ..Default::default()
        };

        self.list_orgs(auth, filter)
            .await?
            .into_iter()
            .next()
            .ok_or(RepositoryError::NotFound(ResourceType::Org))
    }

    #[instrument(skip(self, auth))]
    pub async fn delete_org(&self, auth: &AuthInfo, org_guid: &str) -> Result<()> {
        let user_client = self.ctx.user_clients.build_client(auth)?;
        let dp = DeleteParams::default();

        match self.backend {
            OrgBackend::Anchor => {
                // a missing hierarchy config means the namespace was never provisioned
                let configs: Api<HierarchyConfiguration> =
                    Api::namespaced(self.ctx.privileged.clone(), org_guid);
                let hierarchy = configs
                    .get(hnc::HIERARCHY_CONFIG_NAME)
                    .await
                    .map_err(|e| RepositoryError::from_kube(e, ResourceType::Org))?;
                debug!(
                    "Org {} allows cascading deletion: {}",
                    org_guid,
                    hierarchy.allows_cascading_deletion()
                );

                let anchors: Api<SubnamespaceAnchor> =
                    Api::namespaced(user_client, &self.ctx.root_namespace);
                anchors
                    .delete(org_guid, &dp)
                    .await
                    .map_err(|e| RepositoryError::from_kube(e, ResourceType::Org))?;
            }
            OrgBackend::CfOrg => {
                let privileged: Api<CFOrg> =
                    Api::namespaced(self.ctx.privileged.clone(), &self.ctx.root_namespace);
                privileged
                    .get(org_guid)
                    .await
                    .map_err(|e| RepositoryError::from_kube(e, ResourceType::Org))?;

                let orgs: Api<CFOrg> = Api::namespaced(user_client, &self.ctx.root_namespace);
                orgs.delete(org_guid, &dp)
                    .await
                    .map_err(|e| RepositoryError::from_kube(e, ResourceType::Org))?;
            }
        }

        info!("Deleted org {}", org_guid);
        Ok(())
    }
}
