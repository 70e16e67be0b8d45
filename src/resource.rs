// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resource declarations: identity, kind, input trees and options.

use crate::error::{InfraError, Result};
use crate::output::Output;
use crate::state::State;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Placeholder rendered for values only known after provisioning
pub const COMPUTED: &str = "<computed>";
/// Placeholder rendered in place of sensitive values
pub const MASKED: &str = "[secret]";

/// Logical identity of a declaration, stable across runs
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Urn(String);

impl Urn {
    pub fn new(kind: ResourceKind, name: &str) -> Self {
        Self(format!("{}::{}", kind.type_token(), name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Urn {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Cluster,
    RandomPassword,
    Namespace,
    ServiceAccount,
    Chart,
    DatabaseInstance,
    Bucket,
    IamRole,
    IamRolePolicy,
    IngressRoute,
    Middleware,
    DnsRecord,
    /// Grouping node of a composite component
    Component(&'static str),
}

impl ResourceKind {
    pub fn type_token(&self) -> &'static str {
        match self {
            ResourceKind::Cluster => "eks:index:Cluster",
            ResourceKind::RandomPassword => "random:index:RandomPassword",
            ResourceKind::Namespace => "kubernetes:core/v1:Namespace",
            ResourceKind::ServiceAccount => "kubernetes:core/v1:ServiceAccount",
            ResourceKind::Chart => "kubernetes:helm.sh/v3:Chart",
            ResourceKind::DatabaseInstance => "aws:rds:Instance",
            ResourceKind::Bucket => "aws:s3:Bucket",
            ResourceKind::IamRole => "aws:iam:Role",
            ResourceKind::IamRolePolicy => "aws:iam:RolePolicy",
            ResourceKind::IngressRoute => "kubernetes:traefik.io/v1alpha1:IngressRoute",
            ResourceKind::Middleware => "kubernetes:traefik.io/v1alpha1:Middleware",
            ResourceKind::DnsRecord => "aws:route53:Record",
            ResourceKind::Component(token) => token,
        }
    }

    /// Top-level inputs that must be present and non-null
    pub fn required_inputs(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::Cluster => &["createOidcProvider"],
            ResourceKind::RandomPassword => &["length", "special"],
            ResourceKind::Namespace | ResourceKind::ServiceAccount => {
                &["apiVersion", "kind", "metadata"]
            }
            ResourceKind::Chart => &["chart", "repo"],
            ResourceKind::DatabaseInstance => &[
                "allocatedStorage",
                "engine",
                "engineVersion",
                "instanceClass",
                "dbName",
                "username",
                "password",
                "vpcSecurityGroupIds",
            ],
            ResourceKind::Bucket => &["acl"],
            ResourceKind::IamRole => &["assumeRolePolicy"],
            ResourceKind::IamRolePolicy => &["role", "policy"],
            ResourceKind::IngressRoute | ResourceKind::Middleware => {
                &["apiVersion", "kind", "metadata", "spec"]
            }
            ResourceKind::DnsRecord => &["zoneId", "name", "type", "ttl", "records"],
            ResourceKind::Component(_) => &[],
        }
    }

    /// Outputs the platform reports that must never be persisted in the clear
    pub fn secret_outputs(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::RandomPassword => &["/result"],
            ResourceKind::DatabaseInstance => &["/password"],
            _ => &[],
        }
    }

    /// Whether the declaration targets a Kubernetes cluster and needs its provider context
    pub fn is_kubernetes(&self) -> bool {
        matches!(
            self,
            ResourceKind::Namespace
                | ResourceKind::ServiceAccount
                | ResourceKind::Chart
                | ResourceKind::IngressRoute
                | ResourceKind::Middleware
        )
    }

    /// Whether the engine evaluates this kind in process instead of asking a reconciler
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ResourceKind::RandomPassword | ResourceKind::Component(_)
        )
    }
}

/// Targets a declaration at a specific cluster
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderRef {
    pub urn: Urn,
}

#[derive(Clone, Debug, Default)]
pub struct ResourceOptions {
    pub provider: Option<ProviderRef>,
    pub parent: Option<Urn>,
    pub depends_on: Vec<Urn>,
}

impl ResourceOptions {
    pub fn with_provider(provider: &ProviderRef) -> Self {
        Self {
            provider: Some(provider.clone()),
            ..Default::default()
        }
    }
}

/// Input tree of a declaration; leaves are known values or deferred outputs
#[derive(Clone, Debug)]
pub enum Input {
    Value(Value),
    Deferred(Output<Value>),
    Object(BTreeMap<String, Input>),
    List(Vec<Input>),
    Secret(Box<Input>),
}

impl Input {
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Input)>) -> Self {
        Input::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn list(items: impl IntoIterator<Item = Input>) -> Self {
        Input::List(items.into_iter().collect())
    }

    pub fn secret(inner: impl Into<Input>) -> Self {
        Input::Secret(Box::new(inner.into()))
    }

    /// Serialize a known value into a tree that nested paths can be set on
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::structured(serde_json::to_value(value)?))
    }

    fn structured(value: Value) -> Self {
        match value {
            Value::Object(map) => Input::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::structured(v)))
                    .collect(),
            ),
            Value::Array(items) => Input::List(items.into_iter().map(Self::structured).collect()),
            other => Input::Value(other),
        }
    }

    /// Replace the node at `path`, creating intermediate objects as needed
    pub fn set(&mut self, path: &[&str], value: Input) -> Result<()> {
        let Some((head, rest)) = path.split_first() else {
            *self = value;
            return Ok(());
        };
        match self {
            Input::Object(map) => {
                let child = map
                    .entry(head.to_string())
                    .or_insert_with(|| Input::Object(BTreeMap::new()));
                child.set(rest, value)
            }
            Input::List(items) => {
                let child = head
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get_mut(i))
                    .ok_or_else(|| InfraError::config(format!("no list element at '{}'", head)))?;
                child.set(rest, value)
            }
            Input::Secret(inner) => inner.set(path, value),
            _ => Err(InfraError::config(format!(
                "cannot set '{}' inside a scalar input",
                head
            ))),
        }
    }

    pub fn get(&self, path: &[&str]) -> Option<&Input> {
        let Some((head, rest)) = path.split_first() else {
            return Some(self);
        };
        match self {
            Input::Object(map) => map.get(*head)?.get(rest),
            Input::List(items) => items.get(head.parse::<usize>().ok()?)?.get(rest),
            Input::Secret(inner) => inner.get(path),
            _ => None,
        }
    }

    pub fn dependencies(&self) -> BTreeSet<Urn> {
        let mut deps = BTreeSet::new();
        self.collect_dependencies(&mut deps);
        deps
    }

    fn collect_dependencies(&self, deps: &mut BTreeSet<Urn>) {
        match self {
            Input::Value(_) => {}
            Input::Deferred(output) => deps.extend(output.dependencies().iter().cloned()),
            Input::Object(map) => map.values().for_each(|v| v.collect_dependencies(deps)),
            Input::List(items) => items.iter().for_each(|v| v.collect_dependencies(deps)),
            Input::Secret(inner) => inner.collect_dependencies(deps),
        }
    }

    /// JSON pointers of the sensitive nodes, relative to the resolved document
    pub fn secret_paths(&self) -> BTreeSet<String> {
        let mut paths = BTreeSet::new();
        self.collect_secret_paths(String::new(), &mut paths);
        paths
    }

    fn collect_secret_paths(&self, at: String, paths: &mut BTreeSet<String>) {
        match self {
            Input::Secret(_) => {
                paths.insert(at);
            }
            Input::Deferred(output) if output.is_secret() => {
                paths.insert(at);
            }
            Input::Object(map) => {
                for (k, v) in map {
                    v.collect_secret_paths(format!("{}/{}", at, escape_pointer(k)), paths);
                }
            }
            Input::List(items) => {
                for (i, v) in items.iter().enumerate() {
                    v.collect_secret_paths(format!("{}/{}", at, i), paths);
                }
            }
            Input::Value(_) | Input::Deferred(_) => {}
        }
    }

    /// Whether any part of the tree is sensitive
    pub fn is_secret(&self) -> bool {
        match self {
            Input::Value(_) => false,
            Input::Deferred(output) => output.is_secret(),
            Input::Object(map) => map.values().any(Input::is_secret),
            Input::List(items) => items.iter().any(Input::is_secret),
            Input::Secret(_) => true,
        }
    }

    /// Fully resolved value, `None` while any deferred leaf is pending
    pub fn resolve(&self, state: &State) -> Result<Option<Value>> {
        match self {
            Input::Value(v) => Ok(Some(v.clone())),
            Input::Deferred(output) => output.resolve(state),
            Input::Object(map) => {
                let mut resolved = Map::new();
                for (k, v) in map {
                    match v.resolve(state)? {
                        Some(value) => {
                            resolved.insert(k.clone(), value);
                        }
                        None => return Ok(None),
                    }
                }
                Ok(Some(Value::Object(resolved)))
            }
            Input::List(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    match item.resolve(state)? {
                        Some(value) => resolved.push(value),
                        None => return Ok(None),
                    }
                }
                Ok(Some(Value::Array(resolved)))
            }
            Input::Secret(inner) => inner.resolve(state),
        }
    }

    /// Display form: pending values become `<computed>`, sensitive ones `[secret]`
    pub fn render(&self, state: &State) -> Value {
        match self {
            Input::Value(v) => v.clone(),
            Input::Deferred(output) if output.is_secret() => Value::from(MASKED),
            Input::Deferred(output) => match output.resolve(state) {
                Ok(Some(v)) => v,
                _ => Value::from(COMPUTED),
            },
            Input::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.render(state)))
                    .collect(),
            ),
            Input::List(items) => Value::Array(items.iter().map(|v| v.render(state)).collect()),
            Input::Secret(_) => Value::from(MASKED),
        }
    }

    fn is_absent(&self) -> bool {
        matches!(self, Input::Value(Value::Null))
    }
}

impl From<Value> for Input {
    fn from(v: Value) -> Self {
        Input::Value(v)
    }
}

impl From<&str> for Input {
    fn from(v: &str) -> Self {
        Input::Value(Value::from(v))
    }
}

impl From<String> for Input {
    fn from(v: String) -> Self {
        Input::Value(Value::from(v))
    }
}

impl From<bool> for Input {
    fn from(v: bool) -> Self {
        Input::Value(Value::from(v))
    }
}

impl From<u16> for Input {
    fn from(v: u16) -> Self {
        Input::Value(Value::from(v))
    }
}

impl From<u32> for Input {
    fn from(v: u32) -> Self {
        Input::Value(Value::from(v))
    }
}

impl From<usize> for Input {
    fn from(v: usize) -> Self {
        Input::Value(Value::from(v))
    }
}

impl<T: Serialize + Send + Sync + 'static> From<Output<T>> for Input {
    fn from(output: Output<T>) -> Self {
        let secret = output.is_secret();
        let deferred = Input::Deferred(output.try_apply(|v| Ok(serde_json::to_value(v)?)));
        if secret {
            Input::Secret(Box::new(deferred))
        } else {
            deferred
        }
    }
}

/// Escape one JSON pointer segment
pub(crate) fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// A desired-state description of one resource
#[derive(Clone, Debug)]
pub struct Declaration {
    pub urn: Urn,
    pub kind: ResourceKind,
    pub name: String,
    pub inputs: Input,
    pub options: ResourceOptions,
}

impl Declaration {
    pub fn new(kind: ResourceKind, name: &str, inputs: Input) -> Self {
        Self {
            urn: Urn::new(kind, name),
            kind,
            name: name.to_string(),
            inputs,
            options: ResourceOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResourceOptions) -> Self {
        self.options = options;
        self
    }

    /// Every declaration that must converge before this one
    pub fn dependencies(&self) -> BTreeSet<Urn> {
        let mut deps = self.inputs.dependencies();
        if let Some(provider) = &self.options.provider {
            deps.insert(provider.urn.clone());
        }
        deps.extend(self.options.depends_on.iter().cloned());
        deps.remove(&self.urn);
        deps
    }

    /// Check required inputs and provider targeting without touching the platform
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(InfraError::config(format!(
                "{} declared with an empty name",
                self.kind.type_token()
            )));
        }
        let Input::Object(map) = &self.inputs else {
            return Err(InfraError::config(format!(
                "inputs of {} must be an object",
                self.urn
            )));
        };
        for required in self.kind.required_inputs() {
            if map.get(*required).map_or(true, Input::is_absent) {
                return Err(InfraError::MissingInput {
                    urn: self.urn.clone(),
                    input: required.to_string(),
                });
            }
        }
        if self.kind.is_kubernetes() && self.options.provider.is_none() {
            return Err(InfraError::config(format!(
                "{} targets Kubernetes but has no cluster provider",
                self.urn
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cluster_provider() -> ProviderRef {
        ProviderRef {
            urn: Urn::new(ResourceKind::Cluster, "ml-cluster"),
        }
    }

    #[test]
    fn test_secret_paths_point_at_sensitive_nodes() {
        let mut values = Input::object([
            ("postgres", Input::object([("password", Input::secret("hunter2"))])),
            ("hosts", Input::list([Input::from("a"), Input::secret("b")])),
            ("plain", Input::from("x")),
        ]);
        values
            .set(&["a/b", "token"], Input::secret("t"))
            .unwrap();

        let paths: Vec<String> = values.secret_paths().into_iter().collect();
        assert_eq!(paths, vec!["/a~1b/token", "/hosts/1", "/postgres/password"]);
    }

    #[test]
    fn test_urn_includes_type_token() {
        let urn = Urn::new(ResourceKind::Bucket, "artifact-storage");
        assert_eq!(urn.as_str(), "aws:s3:Bucket::artifact-storage");
    }

    #[test]
    fn test_validate_rejects_missing_input() {
        let decl = Declaration::new(ResourceKind::Bucket, "artifact-storage", Input::object::<&str>([]));
        let err = decl.validate().unwrap_err();
        assert!(matches!(err, InfraError::MissingInput { ref input, .. } if input == "acl"));
    }

    #[test]
    fn test_validate_rejects_null_input() {
        let decl = Declaration::new(
            ResourceKind::Bucket,
            "artifact-storage",
            Input::object([("acl", Input::Value(Value::Null))]),
        );
        assert!(decl.validate().is_err());
    }

    #[test]
    fn test_validate_requires_provider_for_kubernetes_kinds() {
        let inputs = Input::object([
            ("apiVersion", Input::from("v1")),
            ("kind", Input::from("Namespace")),
            ("metadata", Input::object([("name", Input::from("mlflow"))])),
        ]);
        let decl = Declaration::new(ResourceKind::Namespace, "mlflow-namespace", inputs);
        assert!(decl.validate().is_err());

        let decl = decl.with_options(ResourceOptions::with_provider(&cluster_provider()));
        assert!(decl.validate().is_ok());
        assert!(decl.dependencies().contains(&cluster_provider().urn));
    }

    #[test]
    fn test_set_creates_nested_objects() {
        let mut input = Input::object([("kind", Input::from("ServiceAccount"))]);
        input
            .set(&["metadata", "annotations", "eks.amazonaws.com/role-arn"], Input::from("arn"))
            .unwrap();

        let value = input.resolve(&State::new()).unwrap().unwrap();
        assert_eq!(value["metadata"]["annotations"]["eks.amazonaws.com/role-arn"], "arn");
    }

    #[test]
    fn test_set_into_list_requires_existing_index() {
        let mut input = Input::from_serialize(&json!({"ports": [{"port": 80}]})).unwrap();
        input.set(&["ports", "0", "port"], Input::from(5000u16)).unwrap();
        assert!(input.set(&["ports", "3", "port"], Input::from(1u16)).is_err());

        let value = input.resolve(&State::new()).unwrap().unwrap();
        assert_eq!(value, json!({"ports": [{"port": 5000}]}));
    }

    #[test]
    fn test_render_masks_secrets_and_marks_pending() {
        let owner = Urn::from("random:index:RandomPassword::pw");
        let password: Output<String> = Output::<String>::property(&owner, "/result").secret();
        let host: Output<String> = Output::property(&Urn::from("aws:rds:Instance::db"), "/address");
        let input = Input::object([
            ("password", Input::from(password)),
            ("host", Input::from(host)),
            ("port", Input::from(5432u16)),
        ]);

        assert!(input.is_secret());
        assert_eq!(input.dependencies().len(), 2);
        assert_eq!(
            input.render(&State::new()),
            json!({"password": MASKED, "host": COMPUTED, "port": 5432})
        );
        assert!(input.resolve(&State::new()).unwrap().is_none());
    }
}
