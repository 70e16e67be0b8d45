// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mocked Kubernetes API and an in-memory reconciler.

use crate::error::{InfraError, Result as InfraResult};
use crate::reconcilers::{Reconciler, ResolvedResource};
use crate::resource::{ResourceKind, Urn};
use http::{Request, Response};
use kube::client::Body;
use kube::Client;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

pub const TRAEFIK_HOSTNAME: &str = "a1b2c3-1234567890.eu-west-1.elb.amazonaws.com";
pub const DB_ADDRESS: &str = "mlflow-db.c9akciq32.eu-west-1.rds.amazonaws.com";
pub const OIDC_PROVIDER_ARN: &str =
    "arn:aws:iam::123456789012:oidc-provider/oidc.eks.eu-west-1.amazonaws.com/id/0A1B2C";

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Add a response for PATCH requests (server-side apply) matching the exact path
    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    /// Method and path of every request seen so far
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "https://kubernetes.default.svc")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();
        responses
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        self.requests
            .lock()
            .unwrap()
            .push((method.clone(), path.clone()));

        let response = self.find_response(&method, &path);

        Box::pin(async move {
            let (status, body) = response.unwrap_or_else(|| (404, not_found_json("resource", &path)));
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a mock namespace JSON response
pub fn namespace_json(name: &str) -> String {
    json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "uid": "test-uid"
        }
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// Reconciler that answers with canned platform outputs and records what it was asked
#[derive(Default)]
pub struct FakeReconciler {
    failing: HashSet<Urn>,
    calls: Mutex<Vec<Urn>>,
}

impl FakeReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(mut self, urn: &Urn) -> Self {
        self.failing.insert(urn.clone());
        self
    }

    pub fn calls(&self) -> Vec<Urn> {
        self.calls.lock().unwrap().clone()
    }
}

impl Reconciler for FakeReconciler {
    async fn reconcile(&self, resource: &ResolvedResource) -> InfraResult<Value> {
        self.calls.lock().unwrap().push(resource.urn.clone());
        if self.failing.contains(&resource.urn) {
            return Err(InfraError::provider(&resource.urn, "injected failure"));
        }
        Ok(fake_outputs(resource))
    }
}

/// What the platform would report for a freshly converged resource
pub fn fake_outputs(resource: &ResolvedResource) -> Value {
    let name = resource.name.as_str();
    let inputs = &resource.inputs;
    match resource.kind {
        ResourceKind::Cluster => json!({
            "name": format!("{}-eksCluster-0a1b", name),
            "endpoint": "https://0A1B2C.gr7.eu-west-1.eks.amazonaws.com",
            "certificateAuthority": "Y2VydGlmaWNhdGUtZGF0YQ==",
            "clusterSecurityGroupId": "sg-0cluster",
            "nodeSecurityGroupId": "sg-0node",
            "oidcProviderUrl": "https://oidc.eks.eu-west-1.amazonaws.com/id/0A1B2C",
            "oidcProviderArn": OIDC_PROVIDER_ARN,
        }),
        ResourceKind::DatabaseInstance => {
            let mut outputs = inputs.clone();
            outputs["address"] = json!(DB_ADDRESS);
            outputs["port"] = json!(5432);
            outputs
        }
        ResourceKind::Bucket => json!({
            "bucket": format!("{}-4f3e2d1", name),
            "arn": format!("arn:aws:s3:::{}-4f3e2d1", name),
        }),
        ResourceKind::IamRole => json!({
            "name": format!("{}-role-91c", name),
            "arn": format!("arn:aws:iam::123456789012:role/{}-role-91c", name),
        }),
        ResourceKind::Chart => chart_outputs(inputs),
        ResourceKind::DnsRecord => json!({ "fqdn": inputs["name"] }),
        _ => inputs.clone(),
    }
}

fn chart_outputs(inputs: &Value) -> Value {
    let chart = inputs["chart"].as_str().unwrap_or_default();
    let namespace = inputs["namespace"].as_str().unwrap_or("default");
    let service = match chart {
        "traefik" => json!({
            "spec": { "ports": [{ "name": "web", "port": 80 }] },
            "status": { "loadBalancer": { "ingress": [{ "hostname": TRAEFIK_HOSTNAME }] } }
        }),
        _ => json!({ "spec": { "ports": [{ "name": "http", "port": 5000 }] } }),
    };
    json!({
        "resources": {
            "v1/Service": {
                namespace: {
                    chart: service
                }
            }
        }
    })
}
