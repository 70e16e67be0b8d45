// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Managed Kubernetes cluster.

use crate::error::{InfraError, Result};
use crate::graph::Declare;
use crate::output::Output;
use crate::resource::{Declaration, Input, ProviderRef, ResourceKind, Urn};
use crate::resources::database::DatabaseNetwork;
use kube::config::Kubeconfig;
use serde_json::{json, Value};
use tracing::info;
use url::Url;

#[derive(Debug, Clone)]
pub struct ClusterArgs {
    /// Must be decided at creation time; federated identities cannot be added later
    pub create_oidc_provider: bool,
    pub instance_type: String,
    pub desired_capacity: u32,
    pub min_size: u32,
    pub max_size: u32,
}

impl Default for ClusterArgs {
    fn default() -> Self {
        Self {
            create_oidc_provider: true,
            instance_type: "t2.medium".to_string(),
            desired_capacity: 2,
            min_size: 1,
            max_size: 2,
        }
    }
}

/// Identity-federation provider of a cluster
#[derive(Debug, Clone)]
pub struct OidcProvider {
    pub url: Output<String>,
    pub arn: Output<String>,
}

#[derive(Debug, Clone)]
pub struct Cluster {
    urn: Urn,
    oidc_provider: Option<OidcProvider>,
}

impl Cluster {
    pub fn declare(graph: &mut impl Declare, name: &str, args: ClusterArgs) -> Result<Self> {
        if args.max_size == 0
            || args.min_size > args.desired_capacity
            || args.desired_capacity > args.max_size
        {
            return Err(InfraError::config(format!(
                "cluster {} node group must satisfy 0 < min ({}) <= desired ({}) <= max ({})",
                name, args.min_size, args.desired_capacity, args.max_size
            )));
        }

        let inputs = Input::object([
            ("createOidcProvider", Input::from(args.create_oidc_provider)),
            ("instanceType", Input::from(args.instance_type)),
            ("desiredCapacity", Input::from(args.desired_capacity)),
            ("minSize", Input::from(args.min_size)),
            ("maxSize", Input::from(args.max_size)),
        ]);
        let urn = graph.declare(Declaration::new(ResourceKind::Cluster, name, inputs))?;
        info!(
            "Declared cluster {} (OIDC provider: {})",
            name, args.create_oidc_provider
        );

        let oidc_provider = args.create_oidc_provider.then(|| OidcProvider {
            url: Output::property(&urn, "/oidcProviderUrl"),
            arn: Output::property(&urn, "/oidcProviderArn"),
        });

        Ok(Self { urn, oidc_provider })
    }

    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    /// Targeting context for everything placed inside this cluster
    pub fn provider(&self) -> ProviderRef {
        ProviderRef {
            urn: self.urn.clone(),
        }
    }

    /// `None` when the cluster was created without identity federation
    pub fn oidc_provider(&self) -> Option<&OidcProvider> {
        self.oidc_provider.as_ref()
    }

    /// Security group shared by the control plane and the nodes
    pub fn cluster_security_group_id(&self) -> Output<String> {
        Output::property(&self.urn, "/clusterSecurityGroupId")
    }

    pub fn node_security_group_id(&self) -> Output<String> {
        Output::property(&self.urn, "/nodeSecurityGroupId")
    }

    /// Network reachability limited to this cluster's security groups
    pub fn database_access(&self) -> DatabaseNetwork {
        DatabaseNetwork::cluster_boundaries(
            self.cluster_security_group_id(),
            self.node_security_group_id(),
        )
    }

    pub fn kubeconfig(&self) -> Output<Value> {
        let name: Output<String> = Output::property(&self.urn, "/name");
        let endpoint: Output<String> = Output::property(&self.urn, "/endpoint");
        let ca: Output<String> = Output::property(&self.urn, "/certificateAuthority");
        name.zip(&endpoint)
            .zip(&ca)
            .try_apply(|((name, endpoint), ca)| render_kubeconfig(&name, &endpoint, &ca))
    }
}

/// Kubeconfig authenticating through `aws eks get-token`
pub fn render_kubeconfig(cluster_name: &str, endpoint: &str, ca_data: &str) -> Result<Value> {
    let server = Url::parse(endpoint)
        .map_err(|e| InfraError::KubeconfigError(format!("Invalid endpoint {}: {}", endpoint, e)))?;
    if server.scheme() != "https" {
        return Err(InfraError::KubeconfigError(format!(
            "Cluster endpoint must use https, got {}",
            endpoint
        )));
    }

    let value = json!({
        "apiVersion": "v1",
        "kind": "Config",
        "clusters": [{
            "name": "kubernetes",
            "cluster": {
                "server": endpoint,
                "certificate-authority-data": ca_data,
            },
        }],
        "contexts": [{
            "name": "aws",
            "context": { "cluster": "kubernetes", "user": "aws" },
        }],
        "current-context": "aws",
        "preferences": {},
        "users": [{
            "name": "aws",
            "user": {
                "exec": {
                    "apiVersion": "client.authentication.k8s.io/v1beta1",
                    "command": "aws",
                    "args": ["eks", "get-token", "--cluster-name", cluster_name],
                    "provideClusterInfo": false,
                },
            },
        }],
    });

    serde_json::from_value::<Kubeconfig>(value.clone())
        .map_err(|e| InfraError::KubeconfigError(format!("Rendered kubeconfig is invalid: {}", e)))?;

    Ok(value)
}
