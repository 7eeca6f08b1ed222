// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for caller-scoped clients and namespace lookups.

pub mod client;
pub mod namespaces;

pub use client::{TokenClientFactory, UserClientFactory};
pub use namespaces::{ClusterNamespaceRetriever, NamespaceRetriever};
