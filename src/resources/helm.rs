// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Helm chart installations and the sub-resources they create.

use crate::error::{InfraError, Result};
use crate::graph::Declare;
use crate::output::Output;
use crate::resource::{
    escape_pointer, Declaration, Input, ProviderRef, ResourceKind, ResourceOptions, Urn,
};
use serde_json::Value;
use tracing::info;
use url::Url;

#[derive(Debug, Clone)]
pub struct ChartArgs {
    pub chart: String,
    pub repo: String,
    pub version: Option<String>,
    pub namespace: Option<Output<String>>,
    pub values: Option<Input>,
}

impl ChartArgs {
    pub fn new(chart: &str, repo: &str) -> Self {
        Self {
            chart: chart.to_string(),
            repo: repo.to_string(),
            version: None,
            namespace: None,
            values: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Chart {
    urn: Urn,
}

impl Chart {
    pub fn declare(
        graph: &mut impl Declare,
        name: &str,
        args: ChartArgs,
        provider: &ProviderRef,
    ) -> Result<Self> {
        if args.chart.is_empty() {
            return Err(InfraError::config(format!("chart {} needs a chart name", name)));
        }
        let repo = Url::parse(&args.repo).map_err(|e| {
            InfraError::config(format!("chart {} has invalid repository {}: {}", name, args.repo, e))
        })?;
        if !matches!(repo.scheme(), "http" | "https") {
            return Err(InfraError::config(format!(
                "chart {} repository must be served over http(s), got {}",
                name, args.repo
            )));
        }

        let mut entries = vec![
            ("chart", Input::from(args.chart.clone())),
            ("repo", Input::from(args.repo)),
        ];
        if let Some(version) = args.version {
            entries.push(("version", Input::from(version)));
        }
        if let Some(namespace) = args.namespace {
            entries.push(("namespace", Input::from(namespace)));
        }
        if let Some(values) = args.values {
            entries.push(("values", values));
        }

        let decl = Declaration::new(ResourceKind::Chart, name, Input::object(entries))
            .with_options(ResourceOptions::with_provider(provider));
        let urn = graph.declare(decl)?;
        info!("Declared chart {} ({})", name, args.chart);
        Ok(Self { urn })
    }

    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    /// Live object created by the chart, e.g. `("v1/Service", "mlflow", "mlflow")`
    pub fn get_resource(&self, group_version_kind: &str, namespace: &str, name: &str) -> Output<Value> {
        let pointer = format!(
            "/resources/{}/{}/{}",
            escape_pointer(group_version_kind),
            escape_pointer(namespace),
            escape_pointer(name)
        );
        Output::property(&self.urn, &pointer)
    }

    pub fn service(&self, namespace: &str, name: &str) -> ServiceRef {
        ServiceRef {
            name: name.to_string(),
            namespace: namespace.to_string(),
            object: self.get_resource("v1/Service", namespace, name),
        }
    }
}

/// A Service deployed by a chart
#[derive(Debug, Clone)]
pub struct ServiceRef {
    pub name: String,
    pub namespace: String,
    object: Output<Value>,
}

impl ServiceRef {
    /// First port the service exposes
    pub fn port(&self) -> Output<i32> {
        let owner = self.name.clone();
        self.object.try_apply(move |svc| {
            svc.pointer("/spec/ports/0/port")
                .and_then(Value::as_i64)
                .and_then(|p| i32::try_from(p).ok())
                .ok_or_else(|| InfraError::config(format!("service {} exposes no port", owner)))
        })
    }

    /// Hostname the cloud load balancer publishes once it is provisioned
    pub fn load_balancer_hostname(&self) -> Output<String> {
        let owner = self.name.clone();
        self.object.try_apply(move |svc| {
            svc.pointer("/status/loadBalancer/ingress/0/hostname")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    InfraError::config(format!(
                        "service {} has no load balancer hostname",
                        owner
                    ))
                })
        })
    }

}
