// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Caller credentials, identity resolution and per-caller namespace visibility.

pub mod identity;
pub mod namespace_permissions;

pub use identity::{AuthInfo, Identity, IdentityKind, IdentityProvider, TokenReviewIdentityProvider};
pub use namespace_permissions::{
    AuthorizedNamespaces, NamespacePermissions, RoleBindingNamespacePermissions,
};
