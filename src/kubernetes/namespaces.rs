// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resolving the namespace a platform resource lives in

use crate::error::{RepositoryError, Result};
use crate::types::{CFServiceBinding, ResourceType};
use async_trait::async_trait;
use kube::{
    api::{ApiResource, DynamicObject, ListParams},
    Api, Client, ResourceExt,
};
use tracing::{debug, instrument};

#[async_trait]
pub trait NamespaceRetriever: Send + Sync {
    /// Namespace holding the object named `guid` of the given kind
    async fn namespace_for(&self, guid: &str, resource_type: ResourceType) -> Result<String>;
}

/// Looks the object up cluster-wide with the privileged client
pub struct ClusterNamespaceRetriever {
    client: Client,
}

impl ClusterNamespaceRetriever {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NamespaceRetriever for ClusterNamespaceRetriever {
    #[instrument(skip(self))]
    async fn namespace_for(&self, guid: &str, resource_type: ResourceType) -> Result<String> {
        // orgs and spaces are backed by a namespace of the same name
        if resource_type != ResourceType::ServiceBinding {
            return Ok(guid.to_string());
        }

        let resource = ApiResource::erase::<CFServiceBinding>(&());
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);

        let objects = api
            .list(&ListParams::default().fields(&format!("metadata.name={}", guid)))
            .await
            .map_err(|e| RepositoryError::from_kube(e, resource_type))?;

        match objects.items.as_slice() {
            [] => Err(RepositoryError::NotFound(resource_type)),
            [object] => {
                let namespace = object
                    .namespace()
                    .ok_or(RepositoryError::NotFound(resource_type))?;
                debug!("{} {} lives in namespace {}", resource_type, guid, namespace);
                Ok(namespace)
            }
            _ => Err(RepositoryError::DuplicateRecords {
                resource_type,
                guid: guid.to_string(),
            }),
        }
    }
}
