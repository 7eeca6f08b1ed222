// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Spaces: namespaces directly below an organization namespace.

use crate::authorization::AuthInfo;
use crate::constants::{guid, labels, service_accounts};
use crate::error::{RepositoryError, Result};
use crate::provisioning::Provisioner;
use crate::repositories::filter::{created_at, retain_authorized, updated_at, without_keys, Filter};
use crate::repositories::org::OrgRepository;
use crate::repositories::{random_guid, GuidSource, RepositoryContext};
use crate::types::{ResourceType, SubnamespaceAnchor};
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{LocalObjectReference, ObjectReference, ServiceAccount};
use kube::api::{DeleteParams, ListParams, ObjectMeta, PostParams};
use kube::{Api, ResourceExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Default)]
pub struct CreateSpaceMessage {
    pub name: String,
    pub organization_guid: String,
    /// Secret holding the image registry credentials used by the builder
    pub image_registry_credentials: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListSpacesMessage {
    pub names: Vec<String>,
    pub guids: Vec<String>,
    pub organization_guids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DeleteSpaceMessage {
    pub guid: String,
    pub organization_guid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpaceRecord {
    pub name: String,
    pub guid: String,
    pub organization_guid: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&SubnamespaceAnchor> for SpaceRecord {
    fn from(anchor: &SubnamespaceAnchor) -> Self {
        SpaceRecord {
            name: anchor.label(labels::SPACE_NAME),
            guid: anchor.name_any(),
            organization_guid: anchor.parent_namespace().to_string(),
            labels: without_keys(anchor.metadata.labels.as_ref(), &[labels::SPACE_NAME]),
            annotations: without_keys(anchor.metadata.annotations.as_ref(), &[]),
            created_at: created_at(&anchor.metadata),
            updated_at: updated_at(&anchor.metadata),
        }
    }
}

/// Names of the service accounts bootstrapped into every new space
#[derive(Debug, Clone)]
pub struct ServiceAccountNames {
    pub builder: String,
    pub runner: String,
}

impl Default for ServiceAccountNames {
    fn default() -> Self {
        Self {
            builder: service_accounts::DEFAULT_BUILDER.to_string(),
            runner: service_accounts::DEFAULT_RUNNER.to_string(),
        }
    }
}

pub struct SpaceRepository {
    ctx: RepositoryContext,
    provisioner: Arc<Provisioner>,
    orgs: Arc<OrgRepository>,
    service_accounts: ServiceAccountNames,
    new_guid: GuidSource,
}

impl SpaceRepository {
    pub fn new(
        ctx: RepositoryContext,
        provisioner: Arc<Provisioner>,
        orgs: Arc<OrgRepository>,
        service_accounts: ServiceAccountNames,
    ) -> Self {
        Self {
            ctx,
            provisioner,
            orgs,
            service_accounts,
            new_guid: random_guid,
        }
    }

    pub fn with_guid_source(mut self, new_guid: GuidSource) -> Self {
        self.new_guid = new_guid;
        self
    }

    #[instrument(skip(self, auth, message), fields(name = %message.name, org = %message.organization_guid))]
    pub async fn create_space(&self, auth: &AuthInfo, message: CreateSpaceMessage) -> Result<SpaceRecord> {
        // an org the caller cannot see is treated like one that does not exist
        self.orgs
            .get_org(auth, &message.organization_guid)
            .await
            .map_err(|e| RepositoryError::ParentOrganization(Box::new(e)))?;

        let space_guid = (self.new_guid)(guid::SPACE_PREFIX);
        let mut space_labels = message.labels.clone();
        space_labels.insert(labels::SPACE_NAME.to_string(), message.name.clone());

        let anchor = self
            .provisioner
            .provision_anchor(
                auth,
                &message.organization_guid,
                &space_guid,
                space_labels,
                message.annotations.clone(),
                ResourceType::Space,
            )
            .await?;

        // partially bootstrapped spaces are left in place, like timed out provisions
        self.create_builder_service_account(&space_guid, &message.image_registry_credentials)
            .await?;
        self.create_runner_service_account(&space_guid).await?;

        info!("Created space {} ({}) in org {}", message.name, space_guid, message.organization_guid);
        Ok(SpaceRecord {
            name: message.name,
            guid: space_guid,
            organization_guid: message.organization_guid,
            labels: message.labels,
            annotations: message.annotations,
            created_at: created_at(&anchor.metadata),
            updated_at: created_at(&anchor.metadata),
        })
    }

    async fn create_builder_service_account(&self, namespace: &str, registry_secret: &str) -> Result<()> {
        let account = ServiceAccount {
            metadata: ObjectMeta {
                name: Some(self.service_accounts.builder.clone()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            image_pull_secrets: Some(vec![LocalObjectReference {
                name: registry_secret.to_string().into(),
            }]),
            secrets: Some(vec![ObjectReference {
                name: Some(registry_secret.to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        };
        self.create_service_account(namespace, account).await
    }

    async fn create_runner_service_account(&self, namespace: &str) -> Result<()> {
        let account = ServiceAccount {
            metadata: ObjectMeta {
                name: Some(self.service_accounts.runner.clone()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        self.create_service_account(namespace, account).await
    }

    async fn create_service_account(&self, namespace: &str, account: ServiceAccount) -> Result<()> {
        let name = account.name_any();
        let accounts: Api<ServiceAccount> = Api::namespaced(self.ctx.privileged.clone(), namespace);
        accounts
            .create(&PostParams::default(), &account)
            .await
            .map_err(|e| {
                RepositoryError::transport(format!("failed to create service account {}/{}", namespace, name), e)
            })?;

        debug!("Created service account {}/{}", namespace, name);
        Ok(())
    }

    #[instrument(skip(self, auth))]
    pub async fn list_spaces(&self, auth: &AuthInfo, filter: ListSpacesMessage) -> Result<Vec<SpaceRecord>> {
        let anchors: Api<SubnamespaceAnchor> = Api::all(self.ctx.privileged.clone());
        let all = anchors
            .list(&ListParams::default())
            .await
            .map_err(|e| RepositoryError::from_kube(e, ResourceType::Space))?
            .items;

        let org_guids = self
            .orgs
            .org_guids(&all, &Filter::new(&filter.organization_guids))
            .await?;

        let names = Filter::new(&filter.names);
        let guids = Filter::new(&filter.guids);
        let records: Vec<SpaceRecord> = all
            .iter()
            .filter(|a| org_guids.contains(a.parent_namespace()))
            .filter(|a| a.is_ok())
            .map(SpaceRecord::from)
            .filter(|r| names.matches(&r.name) && guids.matches(&r.guid))
            .collect();

        let authorized = self.ctx.permissions.authorized_space_namespaces(auth).await?;
        Ok(retain_authorized(records, &authorized, |r| &r.guid))
    }

    #[instrument(skip(self, auth))]
    pub async fn get_space(&self, auth: &AuthInfo, space_guid: &str) -> Result<SpaceRecord> {
        let filter = ListSpacesMessage {
            guids: vec![space_guid.to_string()],
            ..Default::default()
        };

        self.list_spaces(auth, filter)
            .await?
            .into_iter()
            .next()
            .ok_or(RepositoryError::NotFound(ResourceType::Space))
    }

    #[instrument(skip(self, auth))]
    pub async fn delete_space(&self, auth: &AuthInfo, message: DeleteSpaceMessage) -> Result<()> {
        let privileged: Api<SubnamespaceAnchor> =
            Api::namespaced(self.ctx.privileged.clone(), &message.organization_guid);
        privileged
            .get(&message.guid)
            .await
            .map_err(|e| RepositoryError::from_kube(e, ResourceType::Space))?;

        let user_client = self.ctx.user_clients.build_client(auth)?;
        let anchors: Api<SubnamespaceAnchor> = Api::namespaced(user_client, &message.organization_guid);
        anchors
            .delete(&message.guid, &DeleteParams::default())
            .await
            .map_err(|e| RepositoryError::from_kube(e, ResourceType::Space))?;

        info!("Deleted space {} in org {}", message.guid, message.organization_guid);
        Ok(())
    }
}
