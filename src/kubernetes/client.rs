// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Caller-scoped client creation

use crate::authorization::AuthInfo;
use crate::error::{RepositoryError, Result};
use kube::config::AuthInfo as KubeAuthInfo;
use kube::{Client, Config as KConfig};
use secrecy::SecretString;
use tracing::debug;

/// Builds clients that act with the caller's credentials, so cluster admission
/// and RBAC govern every write
pub trait UserClientFactory: Send + Sync {
    fn build_client(&self, auth: &AuthInfo) -> Result<Client>;
}

/// Reuses the connection settings of a base config but authenticates with the caller's token
pub struct TokenClientFactory {
    base: KConfig,
}

impl TokenClientFactory {
    pub fn new(base: KConfig) -> Self {
        Self { base }
    }

    /// Infer the base config from the environment (kubeconfig or in-cluster)
    pub async fn infer() -> Result<Self> {
        let base = KConfig::infer()
            .await
            .map_err(|e| RepositoryError::ClientBuild(format!("Failed to infer config: {}", e)))?;
        Ok(Self::new(base))
    }

    fn config_for(&self, auth: &AuthInfo) -> KConfig {
        let mut config = self.base.clone();
        config.auth_info = KubeAuthInfo {
            token: Some(SecretString::from(auth.token.clone())),
            ..Default::default()
        };
        config
    }
}

impl UserClientFactory for TokenClientFactory {
    fn build_client(&self, auth: &AuthInfo) -> Result<Client> {
        let config = self.config_for(auth);
        debug!("Building user client for {}", config.cluster_url);
        Client::try_from(config)
            .map_err(|e| RepositoryError::ClientBuild(format!("Failed to create client: {}", e)))
    }
}
