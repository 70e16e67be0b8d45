// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reconcilers converge a single resolved declaration against a platform.

pub mod kubernetes;

pub use kubernetes::KubeReconciler;

use crate::error::Result;
use crate::resource::{ResourceKind, Urn};
use serde_json::Value;
use std::future::Future;

/// A declaration whose deferred inputs have all been resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedResource {
    pub urn: Urn,
    pub kind: ResourceKind,
    pub name: String,
    pub inputs: Value,
    pub provider: Option<Urn>,
}

pub trait Reconciler {
    /// Create or update the resource and return its outputs
    fn reconcile(&self, resource: &ResolvedResource) -> impl Future<Output = Result<Value>> + Send;
}
