// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{provisioning, service_accounts};
use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// How organizations are represented in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrgBackend {
    /// A SubnamespaceAnchor in the root namespace plus a cascading-delete patch
    #[default]
    Anchor,
    /// A CFOrg resource whose own controller reports a Ready condition
    CfOrg,
}

impl FromStr for OrgBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "anchor" => Ok(OrgBackend::Anchor),
            "cforg" => Ok(OrgBackend::CfOrg),
            other => bail!("unknown org backend '{}', expected 'anchor' or 'cforg'", other),
        }
    }
}

/// Repository configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace under which all organization namespaces are created
    pub root_namespace: String,
    pub provisioning_timeout: Duration,
    pub permission_poll_interval: Duration,
    pub org_backend: OrgBackend,
    pub builder_service_account: String,
    pub runner_service_account: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let root_namespace =
            lookup("ROOT_NAMESPACE").context("ROOT_NAMESPACE environment variable not set")?;

        let provisioning_timeout = Duration::from_secs(parse_positive(
            &lookup,
            "PROVISIONING_TIMEOUT_SECS",
            provisioning::DEFAULT_TIMEOUT_SECS,
        )?);
        let permission_poll_interval = Duration::from_millis(parse_positive(
            &lookup,
            "PERMISSION_POLL_INTERVAL_MILLIS",
            provisioning::DEFAULT_POLL_INTERVAL_MILLIS,
        )?);

        let org_backend = match lookup("ORG_BACKEND") {
            Some(value) => value.parse()?,
            None => OrgBackend::default(),
        };

        let builder_service_account = lookup("BUILDER_SERVICE_ACCOUNT")
            .unwrap_or_else(|| service_accounts::DEFAULT_BUILDER.to_string());
        let runner_service_account = lookup("RUNNER_SERVICE_ACCOUNT")
            .unwrap_or_else(|| service_accounts::DEFAULT_RUNNER.to_string());

        Ok(Config {
            root_namespace,
            provisioning_timeout,
            permission_poll_interval,
            org_backend,
            builder_service_account,
            runner_service_account,
        })
    }
}

fn parse_positive(lookup: impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    let parsed: u64 = value
        .parse()
        .with_context(|| format!("{} must be a positive integer, got '{}'", key, value))?;
    if parsed == 0 {
        bail!("{} must be a positive integer, got '{}'", key, value);
    }
    Ok(parsed)
}
