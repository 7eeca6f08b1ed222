// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::types::ResourceType;
use std::time::Duration;
use thiserror::Error;

const ADMISSION_DENIED_MARKER: &str = "denied the request: ";

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(ResourceType),

    #[error("forbidden: not allowed to access {0}")]
    Forbidden(ResourceType),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{resource_type} did not reach state 'ok' within timeout period {} ms", elapsed.as_millis())]
    ConvergenceTimeout {
        resource_type: ResourceType,
        elapsed: Duration,
    },

    #[error("failed establishing permissions in new namespace {namespace} after {elapsed:?}")]
    PermissionPropagationTimeout { namespace: String, elapsed: Duration },

    #[error("failed to get parent organization: {0}")]
    ParentOrganization(#[source] Box<RepositoryError>),

    #[error("invalid authentication: {0}")]
    InvalidAuth(String),

    #[error("duplicate {resource_type} records exist for {guid}")]
    DuplicateRecords {
        resource_type: ResourceType,
        guid: String,
    },

    #[error("failed to build user client: {0}")]
    ClientBuild(String),

    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: kube::Error,
    },
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

impl RepositoryError {
    /// Translate a Kubernetes API failure into the repository error taxonomy
    pub fn from_kube(err: kube::Error, resource_type: ResourceType) -> Self {
        if let kube::Error::Api(resp) = &err {
            if let Some(message) = admission_denial(&resp.message) {
                return RepositoryError::Validation(message.to_string());
            }
            match resp.code {
                404 => return RepositoryError::NotFound(resource_type),
                403 => return RepositoryError::Forbidden(resource_type),
                422 => return RepositoryError::Validation(resp.message.clone()),
                _ => {}
            }
        }

        RepositoryError::Transport {
            context: format!("{} request failed", resource_type),
            source: err,
        }
    }

    pub fn transport(context: impl Into<String>, source: kube::Error) -> Self {
        RepositoryError::Transport {
            context: context.into(),
            source,
        }
    }

    /// Lookups never reveal whether an object exists in a namespace the caller cannot see
    pub fn forbidden_as_not_found(self) -> Self {
        match self {
            RepositoryError::Forbidden(resource_type) => RepositoryError::NotFound(resource_type),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound(_))
    }
}

/// Extract the webhook message from an admission rejection, if this is one
fn admission_denial(message: &str) -> Option<&str> {
    if !message.contains("admission webhook") {
        return None;
    }
    message
        .split_once(ADMISSION_DENIED_MARKER)
        .map(|(_, reason)| reason.trim())
}
