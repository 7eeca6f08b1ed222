// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses and repository collaborators.

use crate::authorization::{AuthInfo, AuthorizedNamespaces, NamespacePermissions};
use crate::error::{RepositoryError, Result as RepoResult};
use crate::kubernetes::{NamespaceRetriever, UserClientFactory};
use crate::types::ResourceType;
use async_trait::async_trait;
use http::{Request, Response};
use kube::client::Body;
use kube::Client;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

pub const CREATED_AT: &str = "2026-01-01T00:00:00Z";

/// A mock HTTP service that returns predefined responses based on request method and path.
/// GET requests carrying `watch=true` are routed to responses registered with `on_watch`.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            (status, body.to_string()),
        );
        self
    }

    /// Add a response for GET requests matching the path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Add a newline-delimited stream of watch events for the path
    pub fn on_watch(self, path: &str, events: &[String]) -> Self {
        self.on("WATCH", path, 200, &events.join("\n"))
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    /// Requests seen so far as (method, path)
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|(m, p)| m == method && p == path)
            .count()
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        // Try exact match first
        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Fall back to the longest registered prefix
        responses
            .iter()
            .filter(|((m, p), _)| m == method && path.starts_with(p.as_str()))
            .max_by_key(|((_, p), _)| p.len())
            .map(|(_, resp)| resp.clone())
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let is_watch = req
            .uri()
            .query()
            .is_some_and(|q| q.split('&').any(|kv| kv == "watch=true"));
        let method = if is_watch {
            "WATCH".to_string()
        } else {
            req.method().to_string()
        };
        let path = req.uri().path().to_string();

        self.requests
            .lock()
            .unwrap()
            .push((method.clone(), path.clone()));
        let response = self.find_response(&method, &path);

        Box::pin(async move {
            let (status, body) = response.unwrap_or_else(|| (404, not_found_json("resource", &path)));
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Wrap items into a Kubernetes list response
pub fn list_json(api_version: &str, kind: &str, items: Vec<Value>) -> String {
    json!({
        "apiVersion": api_version,
        "kind": kind,
        "metadata": {"resourceVersion": "1"},
        "items": items
    })
    .to_string()
}

/// A single watch event line
pub fn watch_event(event_type: &str, object: Value) -> String {
    json!({"type": event_type, "object": object}).to_string()
}

/// Create a mock namespace object
pub fn namespace_json(name: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "uid": "test-uid"
        }
    })
}

/// Create a status response with the given code
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    status_json(404, "NotFound", &format!("{} \"{}\" not found", resource, name))
}

pub fn forbidden_json(resource: &str, name: &str) -> String {
    status_json(
        403,
        "Forbidden",
        &format!("{} \"{}\" is forbidden", resource, name),
    )
}

pub fn anchor_json(
    namespace: &str,
    name: &str,
    label: (&str, &str),
    state: Option<&str>,
) -> Value {
    let mut anchor = json!({
        "apiVersion": "hnc.x-k8s.io/v1alpha2",
        "kind": "SubnamespaceAnchor",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "creationTimestamp": CREATED_AT,
            "resourceVersion": "1",
            "labels": {label.0: label.1}
        },
        "spec": {}
    });
    if let Some(state) = state {
        anchor["status"] = json!({"status": state});
    }
    anchor
}

pub fn cf_org_json(namespace: &str, name: &str, display_name: &str, ready: bool) -> Value {
    json!({
        "apiVersion": "korifi.cloudfoundry.org/v1alpha1",
        "kind": "CFOrg",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "creationTimestamp": CREATED_AT,
            "resourceVersion": "1"
        },
        "spec": {"displayName": display_name},
        "status": {
            "conditions": [{"type": "Ready", "status": if ready { "True" } else { "False" }}]
        }
    })
}

pub fn hierarchy_json(namespace: &str, cascading: bool) -> Value {
    json!({
        "apiVersion": "hnc.x-k8s.io/v1alpha2",
        "kind": "HierarchyConfiguration",
        "metadata": {"name": "hierarchy", "namespace": namespace},
        "spec": {"allowCascadingDeletion": cascading}
    })
}

pub fn service_account_json(namespace: &str, name: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "ServiceAccount",
        "metadata": {"name": name, "namespace": namespace}
    })
}

pub fn binding_json(namespace: &str, name: &str, app_guid: &str, instance_guid: &str) -> Value {
    json!({
        "apiVersion": "services.cloudfoundry.org/v1alpha1",
        "kind": "CFServiceBinding",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "creationTimestamp": CREATED_AT,
            "labels": {"servicebinding.io/provisioned-service": "true"}
        },
        "spec": {
            "service": {
                "kind": "CFServiceInstance",
                "apiVersion": "services.cloudfoundry.org/v1alpha1",
                "name": instance_guid
            },
            "appRef": {"name": app_guid}
        }
    })
}

pub fn role_binding_json(namespace: &str, name: &str, subject_kind: &str, subject: &str) -> Value {
    json!({
        "apiVersion": "rbac.authorization.k8s.io/v1",
        "kind": "RoleBinding",
        "metadata": {"name": name, "namespace": namespace},
        "roleRef": {"apiGroup": "rbac.authorization.k8s.io", "kind": "ClusterRole", "name": "cf-role"},
        "subjects": [{"kind": subject_kind, "name": subject}]
    })
}

/// Namespace permissions backed by fixed sets, which only become visible after
/// `visible_after` calls to simulate RBAC propagation lag
#[derive(Default)]
pub struct FakePermissions {
    orgs: HashSet<String>,
    spaces: HashSet<String>,
    visible_after: usize,
    calls: AtomicUsize,
}

impl FakePermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orgs(mut self, orgs: &[&str]) -> Self {
        self.orgs = orgs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_spaces(mut self, spaces: &[&str]) -> Self {
        self.spaces = spaces.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn visible_after(mut self, calls: usize) -> Self {
        self.visible_after = calls;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn snapshot(&self, set: &HashSet<String>) -> AuthorizedNamespaces {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.visible_after {
            HashSet::new()
        } else {
            set.clone()
        }
    }
}

#[async_trait]
impl NamespacePermissions for FakePermissions {
    async fn authorized_org_namespaces(&self, _auth: &AuthInfo) -> RepoResult<AuthorizedNamespaces> {
        Ok(self.snapshot(&self.orgs))
    }

    async fn authorized_space_namespaces(
        &self,
        _auth: &AuthInfo,
    ) -> RepoResult<AuthorizedNamespaces> {
        Ok(self.snapshot(&self.spaces))
    }
}

/// Hands out the same (mock) client for every caller
pub struct StaticClientFactory(pub Client);

impl UserClientFactory for StaticClientFactory {
    fn build_client(&self, _auth: &AuthInfo) -> RepoResult<Client> {
        Ok(self.0.clone())
    }
}

/// Resolves guids from a fixed map, anything else is not found
#[derive(Default)]
pub struct FakeNamespaceRetriever {
    namespaces: HashMap<String, String>,
}

impl FakeNamespaceRetriever {
    pub fn with(mut self, guid: &str, namespace: &str) -> Self {
        self.namespaces
            .insert(guid.to_string(), namespace.to_string());
        self
    }
}

#[async_trait]
impl NamespaceRetriever for FakeNamespaceRetriever {
    async fn namespace_for(&self, guid: &str, resource_type: ResourceType) -> RepoResult<String> {
        self.namespaces
            .get(guid)
            .cloned()
            .ok_or(RepositoryError::NotFound(resource_type))
    }
}

pub fn auth() -> AuthInfo {
    AuthInfo::from_token("caller-token")
}
