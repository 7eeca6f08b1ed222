// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::{RepositoryError, Result};
use async_trait::async_trait;
use k8s_openapi::api::authentication::v1::{TokenReview, TokenReviewSpec};
use k8s_openapi::api::rbac::v1::Subject;
use kube::{api::PostParams, Api, Client};
use std::fmt;
use tracing::{debug, instrument};

const SERVICE_ACCOUNT_USER_PREFIX: &str = "system:serviceaccount:";

/// Credentials of the authenticated caller, threaded through every repository call
#[derive(Clone)]
pub struct AuthInfo {
    pub token: String,
}

impl AuthInfo {
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for AuthInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthInfo").field("token", &"<redacted>").finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    User,
    ServiceAccount,
}

/// The RBAC subject a caller authenticates as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub kind: IdentityKind,
    pub name: String,
    /// Only set for service accounts
    pub namespace: Option<String>,
}

impl Identity {
    /// Parse a Kubernetes username, recognising `system:serviceaccount:<ns>:<name>`
    pub fn from_username(username: &str) -> Self {
        if let Some(rest) = username.strip_prefix(SERVICE_ACCOUNT_USER_PREFIX) {
            if let Some((namespace, name)) = rest.split_once(':') {
                return Identity {
                    kind: IdentityKind::ServiceAccount,
                    name: name.to_string(),
                    namespace: Some(namespace.to_string()),
                };
            }
        }

        Identity {
            kind: IdentityKind::User,
            name: username.to_string(),
            namespace: None,
        }
    }

    /// Check whether a role binding subject refers to this identity
    pub fn matches_subject(&self, subject: &Subject) -> bool {
        match self.kind {
            IdentityKind::User => subject.kind == "User" && subject.name == self.name,
            IdentityKind::ServiceAccount => {
                subject.kind == "ServiceAccount"
                    && subject.name == self.name
                    && subject.namespace == self.namespace
            }
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn identity(&self, auth: &AuthInfo) -> Result<Identity>;
}

/// Resolves bearer tokens through the TokenReview API using the privileged client
pub struct TokenReviewIdentityProvider {
    client: Client,
}

impl TokenReviewIdentityProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityProvider for TokenReviewIdentityProvider {
    #[instrument(skip_all)]
    async fn identity(&self, auth: &AuthInfo) -> Result<Identity> {
        let reviews: Api<TokenReview> = Api::all(self.client.clone());
        let review = TokenReview {
            spec: TokenReviewSpec {
                token: Some(auth.token.clone()),
                ..Default::default()
            },
            ..Default::default()
        };

        let result = reviews
            .create(&PostParams::default(), &review)
            .await
            .map_err(|e| RepositoryError::transport("failed to review caller token", e))?;

        let Some(status) = result.status else {
            return Err(RepositoryError::InvalidAuth(
                "token review returned no status".to_string(),
            ));
        };

        if !status.authenticated.unwrap_or(false) {
            return Err(RepositoryError::InvalidAuth(
                status
                    .error
                    .unwrap_or_else(|| "token not authenticated".to_string()),
            ));
        }

        let Some(username) = status.user.and_then(|u| u.username) else {
            return Err(RepositoryError::InvalidAuth(
                "token review returned no username".to_string(),
            ));
        };

        debug!("Resolved caller identity {}", username);
        Ok(Identity::from_username(&username))
    }
}
