// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Provisioning of namespace-backed resources and the waits it relies on.

pub mod provisioner;
pub mod wait;

pub use provisioner::{Provisionable, Provisioner, ProvisioningConfig};
pub use wait::{poll_until, watch_until, Outcome};
