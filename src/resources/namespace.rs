// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes namespace.

use crate::error::{InfraError, Result};
use crate::graph::Declare;
use crate::output::Output;
use crate::resource::{Declaration, Input, ProviderRef, ResourceKind, ResourceOptions, Urn};
use k8s_openapi::api::core::v1::Namespace as K8sNamespace;
use kube::api::ObjectMeta;

#[derive(Debug, Clone)]
pub struct Namespace {
    urn: Urn,
    name: String,
}

impl Namespace {
    pub fn declare(
        graph: &mut impl Declare,
        resource_name: &str,
        name: &str,
        provider: &ProviderRef,
    ) -> Result<Self> {
        validate_dns_label(name, "namespace name")?;

        let manifest = K8sNamespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let decl = Declaration::new(
            ResourceKind::Namespace,
            resource_name,
            Input::from_serialize(&manifest)?,
        )
        .with_options(ResourceOptions::with_provider(provider));

        let urn = graph.declare(decl)?;
        Ok(Self {
            urn,
            name: name.to_string(),
        })
    }

    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name as reported by the cluster; consumers depend on the namespace existing
    pub fn metadata_name(&self) -> Output<String> {
        Output::property(&self.urn, "/metadata/name")
    }
}

/// RFC 1123 label: lowercase alphanumerics and '-', at most 63 characters
pub fn validate_dns_label(value: &str, what: &str) -> Result<()> {
    let valid = !value.is_empty()
        && value.len() <= 63
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !value.starts_with('-')
        && !value.ends_with('-');
    if valid {
        Ok(())
    } else {
        Err(InfraError::config(format!(
            "{} '{}' is not a valid DNS label",
            what, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DeclarationGraph;
    use crate::resources::cluster::{Cluster, ClusterArgs};
    use crate::state::State;

    #[test]
    fn test_namespace_manifest() {
        let mut graph = DeclarationGraph::new();
        let cluster = Cluster::declare(&mut graph, "ml-cluster", ClusterArgs::default()).unwrap();
        let ns =
            Namespace::declare(&mut graph, "mlflow-namespace", "mlflow", &cluster.provider()).unwrap();

        let decl = graph.get(ns.urn()).unwrap();
        let value = decl.inputs.resolve(&State::new()).unwrap().unwrap();
        assert_eq!(value["apiVersion"], "v1");
        assert_eq!(value["kind"], "Namespace");
        assert_eq!(value["metadata"]["name"], "mlflow");
        assert_eq!(decl.dependencies().into_iter().collect::<Vec<_>>(), vec![cluster.urn().clone()]);
    }

    #[test]
    fn test_invalid_namespace_name() {
        let mut graph = DeclarationGraph::new();
        let cluster = Cluster::declare(&mut graph, "ml-cluster", ClusterArgs::default()).unwrap();
        assert!(Namespace::declare(&mut graph, "ns", "MLflow", &cluster.provider()).is_err());
        assert!(Namespace::declare(&mut graph, "ns", "-mlflow", &cluster.provider()).is_err());
    }

    #[test]
    fn test_validate_dns_label() {
        assert!(validate_dns_label("mlflow-service-account-sa", "name").is_ok());
        assert!(validate_dns_label("", "name").is_err());
        assert!(validate_dns_label(&"a".repeat(64), "name").is_err());
        assert!(validate_dns_label("ml_flow", "name").is_err());
    }
}
