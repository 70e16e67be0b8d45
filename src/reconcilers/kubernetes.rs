// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Server-side apply of Kubernetes manifests.

use super::{Reconciler, ResolvedResource};
use crate::constants::OPERATOR_NAME;
use crate::error::{InfraError, Result};
use crate::resource::ResourceKind;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client};
use serde_json::Value;
use tracing::{info, instrument};

/// Applies the plain manifests of a declaration graph: namespaces, service accounts
/// and Traefik routing objects. Charts and cloud resources belong to other reconcilers.
#[derive(Clone)]
pub struct KubeReconciler {
    client: Client,
}

impl KubeReconciler {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using a kubeconfig document such as the stack's `kubeconfig` output
    pub async fn from_kubeconfig(kubeconfig: Value) -> Result<Self> {
        let kubeconfig: Kubeconfig = serde_json::from_value(kubeconfig)
            .map_err(|e| InfraError::KubeconfigError(format!("Failed to parse kubeconfig: {}", e)))?;
        Self::connect(kubeconfig).await
    }

    pub async fn from_kubeconfig_yaml(kubeconfig: &str) -> Result<Self> {
        let kubeconfig: Kubeconfig = serde_yaml::from_str(kubeconfig)
            .map_err(|e| InfraError::KubeconfigError(format!("Failed to parse kubeconfig: {}", e)))?;
        Self::connect(kubeconfig).await
    }

    async fn connect(kubeconfig: Kubeconfig) -> Result<Self> {
        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| InfraError::KubeconfigError(format!("Failed to create config: {}", e)))?;
        let client = Client::try_from(config)
            .map_err(|e| InfraError::KubeconfigError(format!("Failed to create client: {}", e)))?;
        Ok(Self::new(client))
    }

    #[instrument(skip(self, resource), fields(urn = %resource.urn))]
    async fn apply_manifest(&self, resource: &ResolvedResource) -> Result<Value> {
        let manifest = &resource.inputs;
        let field = |pointer: &str| {
            manifest
                .pointer(pointer)
                .and_then(Value::as_str)
                .ok_or_else(|| InfraError::MissingInput {
                    urn: resource.urn.clone(),
                    input: pointer.trim_start_matches('/').replace('/', "."),
                })
        };
        let api_version = field("/apiVersion")?;
        let kind = field("/kind")?;
        let name = field("/metadata/name")?;
        let namespace = manifest.pointer("/metadata/namespace").and_then(Value::as_str);

        let (group, version) = api_version.split_once('/').unwrap_or(("", api_version));
        let api_resource = ApiResource::from_gvk(&GroupVersionKind::gvk(group, version, kind));
        let api: Api<DynamicObject> = match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &api_resource),
            None => Api::all_with(self.client.clone(), &api_resource),
        };

        let params = PatchParams::apply(OPERATOR_NAME).force();
        let applied = api
            .patch(name, &params, &Patch::Apply(manifest))
            .await
            .map_err(|e| InfraError::provider(&resource.urn, format!("apply failed: {}", e)))?;

        info!(
            "Applied {} {}{}",
            kind,
            namespace.map(|ns| format!("{}/", ns)).unwrap_or_default(),
            name
        );
        Ok(serde_json::to_value(applied)?)
    }
}

impl Reconciler for KubeReconciler {
    async fn reconcile(&self, resource: &ResolvedResource) -> Result<Value> {
        match resource.kind {
            ResourceKind::Namespace
            | ResourceKind::ServiceAccount
            | ResourceKind::IngressRoute
            | ResourceKind::Middleware => self.apply_manifest(resource).await,
            other => Err(InfraError::provider(
                &resource.urn,
                format!("{} is not managed by the Kubernetes reconciler", other.type_token()),
            )),
        }
    }
}
