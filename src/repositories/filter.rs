// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Shared list filtering and record helpers.

use chrono::{DateTime, Utc};
use kube::api::ObjectMeta;
use std::collections::{BTreeMap, HashSet};

/// Membership filter where an empty filter matches everything
#[derive(Debug, Default, Clone)]
pub struct Filter(HashSet<String>);

impl Filter {
    pub fn new<S: AsRef<str>>(values: &[S]) -> Self {
        Self(values.iter().map(|v| v.as_ref().to_string()).collect())
    }

    pub fn matches(&self, value: &str) -> bool {
        self.0.is_empty() || self.0.contains(value)
    }
}

/// Keep only items whose namespace key is in the caller's authorized set
pub fn retain_authorized<T>(
    records: Vec<T>,
    authorized: &HashSet<String>,
    key: impl Fn(&T) -> &str,
) -> Vec<T> {
    records
        .into_iter()
        .filter(|r| authorized.contains(key(r)))
        .collect()
}

pub fn created_at(meta: &ObjectMeta) -> DateTime<Utc> {
    meta.creation_timestamp
        .as_ref()
        .map(|t| t.0)
        .unwrap_or_else(Utc::now)
}

/// Latest managed-fields write, falling back to the creation time
pub fn updated_at(meta: &ObjectMeta) -> DateTime<Utc> {
    meta.managed_fields
        .as_ref()
        .and_then(|fields| fields.iter().filter_map(|f| f.time.as_ref()).map(|t| t.0).max())
        .unwrap_or_else(|| created_at(meta))
}

/// Copy of `map` without the keys owned by this crate
pub fn without_keys(map: Option<&BTreeMap<String, String>>, internal: &[&str]) -> BTreeMap<String, String> {
    map.map(|m| {
        m.iter()
            .filter(|(k, _)| !internal.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    })
    .unwrap_or_default()
}
