// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Service bindings between apps and service instances, stored in space namespaces.

use crate::authorization::AuthInfo;
use crate::constants::{labels, service_binding};
use crate::error::{RepositoryError, Result};
use crate::kubernetes::NamespaceRetriever;
use crate::repositories::filter::{created_at, updated_at, Filter};
use crate::repositories::{random_guid, GuidSource, RepositoryContext};
use crate::types::{AppRef, CFServiceBinding, CFServiceBindingSpec, ResourceType, ServiceRef};
use chrono::{DateTime, Utc};
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::{Api, Resource, ResourceExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Default)]
pub struct CreateServiceBindingMessage {
    pub name: Option<String>,
    pub app_guid: String,
    pub service_instance_guid: String,
    pub space_guid: String,
}

#[derive(Debug, Clone, Default)]
pub struct ListServiceBindingsMessage {
    pub app_guids: Vec<String>,
    pub service_instance_guids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastOperation {
    #[serde(rename = "type")]
    pub operation_type: String,
    pub state: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceBindingRecord {
    pub guid: String,
    #[serde(rename = "type")]
    pub binding_type: String,
    pub name: Option<String>,
    pub app_guid: String,
    pub service_instance_guid: String,
    pub space_guid: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_operation: LastOperation,
}

impl From<&CFServiceBinding> for ServiceBindingRecord {
    fn from(binding: &CFServiceBinding) -> Self {
        let created = created_at(&binding.metadata);
        let updated = updated_at(&binding.metadata);

        ServiceBindingRecord {
            guid: binding.name_any(),
            binding_type: service_binding::TYPE_APP.to_string(),
            name: binding.spec.display_name.clone(),
            app_guid: binding.app_guid().to_string(),
            service_instance_guid: binding.service_instance_guid().to_string(),
            space_guid: binding.namespace().unwrap_or_default(),
            created_at: created,
            updated_at: updated,
            // credential projection is reported by a separate controller
            last_operation: LastOperation {
                operation_type: service_binding::LAST_OPERATION_CREATE.to_string(),
                state: service_binding::LAST_OPERATION_SUCCEEDED.to_string(),
                description: None,
                created_at: created,
                updated_at: updated,
            },
        }
    }
}

pub struct ServiceBindingRepository {
    ctx: RepositoryContext,
    namespaces: Arc<dyn NamespaceRetriever>,
    new_guid: GuidSource,
}

impl ServiceBindingRepository {
    pub fn new(ctx: RepositoryContext, namespaces: Arc<dyn NamespaceRetriever>) -> Self {
        Self {
            ctx,
            namespaces,
            new_guid: random_guid,
        }
    }

    pub fn with_guid_source(mut self, new_guid: GuidSource) -> Self {
        self.new_guid = new_guid;
        self
    }

    fn user_api(&self, auth: &AuthInfo, namespace: &str) -> Result<Api<CFServiceBinding>> {
        let client = self.ctx.user_clients.build_client(auth)?;
        Ok(Api::namespaced(client, namespace))
    }

    #[instrument(skip(self, auth, message), fields(space = %message.space_guid))]
    pub async fn create_service_binding(
        &self,
        auth: &AuthInfo,
        message: CreateServiceBindingMessage,
    ) -> Result<ServiceBindingRecord> {
        let guid = (self.new_guid)("");
        let spec = CFServiceBindingSpec {
            display_name: message.name,
            service: ServiceRef {
                kind: service_binding::SERVICE_INSTANCE_KIND.to_string(),
                api_version: CFServiceBinding::api_version(&()).to_string(),
                name: message.service_instance_guid,
            },
            app_ref: AppRef {
                name: message.app_guid,
            },
        };
        let mut binding = CFServiceBinding::new(&guid, spec);
        binding.metadata.namespace = Some(message.space_guid.clone());
        binding.metadata.labels = Some(BTreeMap::from([(
            labels::PROVISIONED_SERVICE.to_string(),
            "true".to_string(),
        )]));

        let created = self
            .user_api(auth, &message.space_guid)?
            .create(&PostParams::default(), &binding)
            .await
            .map_err(|e| RepositoryError::from_kube(e, ResourceType::ServiceBinding))?;

        info!("Created service binding {} in {}", guid, message.space_guid);
        Ok(ServiceBindingRecord::from(&created))
    }

    #[instrument(skip(self, auth))]
    pub async fn delete_service_binding(&self, auth: &AuthInfo, guid: &str) -> Result<()> {
        let namespace = self
            .namespaces
            .namespace_for(guid, ResourceType::ServiceBinding)
            .await?;
        let api = self.user_api(auth, &namespace)?;

        api.get(guid).await.map_err(|e| {
            RepositoryError::from_kube(e, ResourceType::ServiceBinding).forbidden_as_not_found()
        })?;

        api.delete(guid, &DeleteParams::default())
            .await
            .map_err(|e| RepositoryError::from_kube(e, ResourceType::ServiceBinding))?;

        info!("Deleted service binding {} in {}", guid, namespace);
        Ok(())
    }

    /// Whether a binding of this app to this instance already exists in the space.
    /// Not atomic with a following create.
    #[instrument(skip(self, auth))]
    pub async fn service_binding_exists(
        &self,
        auth: &AuthInfo,
        space_guid: &str,
        app_guid: &str,
        service_instance_guid: &str,
    ) -> Result<bool> {
        let bindings = self
            .user_api(auth, space_guid)?
            .list(&ListParams::default())
            .await
            .map_err(|e| RepositoryError::from_kube(e, ResourceType::ServiceBinding))?;

        Ok(bindings
            .items
            .iter()
            .any(|b| b.binds(app_guid, service_instance_guid)))
    }

    #[instrument(skip(self, auth))]
    pub async fn list_service_bindings(
        &self,
        auth: &AuthInfo,
        filter: ListServiceBindingsMessage,
    ) -> Result<Vec<ServiceBindingRecord>> {
        let mut namespaces: Vec<String> = self
            .ctx
            .permissions
            .authorized_space_namespaces(auth)
            .await?
            .into_iter()
            .collect();
        namespaces.sort();

        let apps = Filter::new(&filter.app_guids);
        let instances = Filter::new(&filter.service_instance_guids);
        let mut records = Vec::new();
        let user_client = self.ctx.user_clients.build_client(auth)?;

        for namespace in &namespaces {
            let api: Api<CFServiceBinding> = Api::namespaced(user_client.clone(), namespace);
            let list = match api.list(&ListParams::default()).await {
                Ok(list) => list,
                Err(e) => match RepositoryError::from_kube(e, ResourceType::ServiceBinding) {
                    RepositoryError::Forbidden(_) => {
                        warn!("Not allowed to list service bindings in {}, skipping", namespace);
                        continue;
                    }
                    other => return Err(other),
                },
            };

            records.extend(
                list.items
                    .iter()
                    .filter(|b| apps.matches(b.app_guid()) && instances.matches(b.service_instance_guid()))
                    .map(ServiceBindingRecord::from),
            );
        }

        debug!("Found {} service bindings in {} spaces", records.len(), namespaces.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::UserClientFactory;
    use crate::repositories::org::tests::context;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::test_utils::{
        auth, binding_json, forbidden_json, list_json, status_json, FakeNamespaceRetriever,
        FakePermissions, MockService,
    };

    fn bindings_path(namespace: &str) -> String {
        format!("/apis/services.cloudfoundry.org/v1alpha1/namespaces/{}/cfservicebindings", namespace)
    }

    fn binding_list(items: Vec<serde_json::Value>) -> String {
        list_json("services.cloudfoundry.org/v1alpha1", "CFServiceBindingList", items)
    }

    fn repo(
        mock: MockService,
        permissions: FakePermissions,
        namespaces: FakeNamespaceRetriever,
    ) -> ServiceBindingRepository {
        ServiceBindingRepository::new(context(mock, Arc::new(permissions)), Arc::new(namespaces))
            .with_guid_source(|_| "binding-fixed".to_string())
    }

    fn guids(records: &[ServiceBindingRecord]) -> Vec<&str> {
        records.iter().map(|r| r.guid.as_str()).collect()
    }

    #[tokio::test]
    async fn test_create_service_binding() {
        let path = bindings_path("cf-space-1");
        let mock = MockService::new().on_post(
            &path,
            201,
            &binding_json("cf-space-1", "binding-fixed", "app-1", "instance-1").to_string(),
        );

        let record = repo(mock.clone(), FakePermissions::new(), FakeNamespaceRetriever::default())
            .create_service_binding(
                &auth(),
                CreateServiceBindingMessage {
                    name: None,
                    app_guid: "app-1".to_string(),
                    service_instance_guid: "instance-1".to_string(),
                    space_guid: "cf-space-1".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(record.guid, "binding-fixed");
        assert_eq!(record.binding_type, "app");
        assert_eq!(record.app_guid, "app-1");
        assert_eq!(record.service_instance_guid, "instance-1");
        assert_eq!(record.space_guid, "cf-space-1");
        assert_eq!(record.last_operation.operation_type, "create");
        assert_eq!(record.last_operation.state, "succeeded");
        assert_eq!(record.last_operation.created_at, record.created_at);
        assert_eq!(mock.count("POST", &path), 1);
    }

    #[tokio::test]
    async fn test_create_service_binding_admission_rejection() {
        let mock = MockService::new().on_post(
            &bindings_path("cf-space-1"),
            403,
            &status_json(
                403,
                "Forbidden",
                "admission webhook \"vcfservicebinding.korifi.cloudfoundry.org\" denied the request: already bound",
            ),
        );

        let err = repo(mock, FakePermissions::new(), FakeNamespaceRetriever::default())
            .create_service_binding(
                &auth(),
                CreateServiceBindingMessage {
                    app_guid: "app-1".to_string(),
                    service_instance_guid: "instance-1".to_string(),
                    space_guid: "cf-space-1".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Validation(msg) if msg == "already bound"));
    }

    #[tokio::test]
    async fn test_delete_service_binding() {
        let path = format!("{}/binding-1", bindings_path("cf-space-1"));
        let binding = binding_json("cf-space-1", "binding-1", "app-1", "instance-1").to_string();
        let mock = MockService::new()
            .on_get(&path, 200, &binding)
            .on_delete(&path, 200, &binding);

        repo(
            mock.clone(),
            FakePermissions::new(),
            FakeNamespaceRetriever::default().with("binding-1", "cf-space-1"),
        )
        .delete_service_binding(&auth(), "binding-1")
        .await
        .unwrap();

        assert_eq!(mock.count("DELETE", &path), 1);
    }

    #[tokio::test]
    async fn test_delete_forbidden_service_binding_is_not_found() {
        let path = format!("{}/binding-1", bindings_path("cf-space-1"));
        let mock = MockService::new().on_get(&path, 403, &forbidden_json("cfservicebindings", "binding-1"));

        let err = repo(
            mock.clone(),
            FakePermissions::new(),
            FakeNamespaceRetriever::default().with("binding-1", "cf-space-1"),
        )
        .delete_service_binding(&auth(), "binding-1")
        .await
        .unwrap_err();

        assert!(matches!(err, RepositoryError::NotFound(ResourceType::ServiceBinding)));
        assert_eq!(mock.count("DELETE", &path), 0);
    }

    #[tokio::test]
    async fn test_delete_unknown_service_binding_is_not_found() {
        let mock = MockService::new();

        let err = repo(mock.clone(), FakePermissions::new(), FakeNamespaceRetriever::default())
            .delete_service_binding(&auth(), "binding-1")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_service_binding_exists_requires_full_match() {
        let mock = MockService::new().on_get(
            &bindings_path("cf-space-1"),
            200,
            &binding_list(vec![
                binding_json("cf-space-1", "binding-1", "app-1", "instance-1"),
                binding_json("cf-space-1", "binding-2", "app-2", "instance-2"),
            ]),
        );
        let repo = repo(mock, FakePermissions::new(), FakeNamespaceRetriever::default());

        assert!(repo
            .service_binding_exists(&auth(), "cf-space-1", "app-1", "instance-1")
            .await
            .unwrap());
        assert!(!repo
            .service_binding_exists(&auth(), "cf-space-1", "app-1", "instance-2")
            .await
            .unwrap());
        assert!(!repo
            .service_binding_exists(&auth(), "cf-space-1", "app-3", "instance-1")
            .await
            .unwrap());
    }

    fn listing_mock() -> MockService {
        MockService::new()
            .on_get(
                &bindings_path("cf-space-1"),
                200,
                &binding_list(vec![binding_json("cf-space-1", "binding-1", "app-1", "instance-1")]),
            )
            .on_get(
                &bindings_path("cf-space-2"),
                403,
                &forbidden_json("cfservicebindings", ""),
            )
            .on_get(
                &bindings_path("cf-space-3"),
                200,
                &binding_list(vec![
                    binding_json("cf-space-3", "binding-3", "app-2", "instance-1"),
                    binding_json("cf-space-3", "binding-4", "app-2", "instance-2"),
                ]),
            )
    }

    fn listing_permissions() -> FakePermissions {
        FakePermissions::new().with_spaces(&["cf-space-3", "cf-space-1", "cf-space-2"])
    }

    #[tokio::test]
    async fn test_list_service_bindings_skips_forbidden_namespaces() {
        let repo = repo(listing_mock(), listing_permissions(), FakeNamespaceRetriever::default());

        let records = repo
            .list_service_bindings(&auth(), ListServiceBindingsMessage::default())
            .await
            .unwrap();

        assert_eq!(guids(&records), vec!["binding-1", "binding-3", "binding-4"]);
        assert_eq!(records[1].space_guid, "cf-space-3");
    }

    struct CountingClientFactory {
        client: kube::Client,
        built: AtomicUsize,
    }

    impl UserClientFactory for CountingClientFactory {
        fn build_client(&self, _auth: &AuthInfo) -> Result<kube::Client> {
            self.built.fetch_add(1, Ordering::SeqCst);
            Ok(self.client.clone())
        }
    }

    #[tokio::test]
    async fn test_list_service_bindings_builds_one_user_client() {
        let mut ctx = context(listing_mock(), Arc::new(listing_permissions()));
        let factory = Arc::new(CountingClientFactory {
            client: ctx.privileged.clone(),
            built: AtomicUsize::new(0),
        });
        ctx.user_clients = factory.clone() as Arc<dyn UserClientFactory>;
        let repo = ServiceBindingRepository::new(ctx, Arc::new(FakeNamespaceRetriever::default()));

        let records = repo
            .list_service_bindings(&auth(), ListServiceBindingsMessage::default())
            .await
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(factory.built.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_list_service_bindings_filters() {
        let repo = repo(listing_mock(), listing_permissions(), FakeNamespaceRetriever::default());

        let by_app = repo
            .list_service_bindings(
                &auth(),
                ListServiceBindingsMessage {
                    app_guids: vec!["app-2".to_string()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let by_both = repo
            .list_service_bindings(
                &auth(),
                ListServiceBindingsMessage {
                    app_guids: vec!["app-2".to_string()],
                    service_instance_guids: vec!["instance-1".to_string()],
                },
            )
            .await
            .unwrap();

        assert_eq!(guids(&by_app), vec!["binding-3", "binding-4"]);
        assert_eq!(guids(&by_both), vec!["binding-3"]);
    }

    #[tokio::test]
    async fn test_list_service_bindings_without_spaces_is_empty() {
        let mock = MockService::new();
        let repo = repo(mock.clone(), FakePermissions::new(), FakeNamespaceRetriever::default());

        let records = repo
            .list_service_bindings(&auth(), ListServiceBindingsMessage::default())
            .await
            .unwrap();

        assert!(records.is_empty());
        assert!(mock.requests().is_empty());
    }
}
