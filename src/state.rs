// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Last-known inputs and outputs of converged resources.
//!
//! Sensitive leaves are held in the clear only in memory. Serializing a [`State`]
//! replaces them with a SHA-256 digest, which is still enough to detect that a
//! declaration is unchanged on the next run.

use crate::resource::Urn;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// Prefix of a sealed secret in persisted state
pub const SEALED_PREFIX: &str = "sha256:";

/// Inputs a resource was converged with and the outputs the platform reported for it
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ResourceState {
    pub inputs: Value,
    pub outputs: Value,
    /// JSON pointers of sensitive leaves, applied to both inputs and outputs
    #[serde(default)]
    pub secrets: BTreeSet<String>,
}

impl ResourceState {
    pub fn new(inputs: Value, outputs: Value) -> Self {
        Self {
            inputs,
            outputs,
            secrets: BTreeSet::new(),
        }
    }

    pub fn with_secrets(mut self, secrets: BTreeSet<String>) -> Self {
        self.secrets = secrets;
        self
    }

    /// Whether `inputs` equal the recorded inputs, comparing sensitive leaves by digest
    pub fn matches(&self, inputs: &Value, secrets: &BTreeSet<String>) -> bool {
        seal(&self.inputs, secrets) == seal(inputs, secrets)
    }

    /// First sensitive leaf of `value` only known by its digest
    pub fn sealed_leaf<'a>(value: &Value, secrets: &'a BTreeSet<String>) -> Option<&'a str> {
        secrets
            .iter()
            .find(|p| value.pointer(p).is_some_and(is_sealed))
            .map(String::as_str)
    }
}

impl Serialize for ResourceState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ResourceState", 3)?;
        state.serialize_field("inputs", &seal(&self.inputs, &self.secrets))?;
        state.serialize_field("outputs", &seal(&self.outputs, &self.secrets))?;
        state.serialize_field("secrets", &self.secrets)?;
        state.end()
    }
}

/// Replace every sensitive leaf with its digest; already sealed leaves are kept
pub fn seal(value: &Value, secrets: &BTreeSet<String>) -> Value {
    let mut sealed = value.clone();
    for pointer in secrets {
        if let Some(leaf) = sealed.pointer_mut(pointer) {
            if !is_sealed(leaf) {
                let hash = digest(leaf);
                *leaf = Value::String(hash);
            }
        }
    }
    sealed
}

pub fn is_sealed(value: &Value) -> bool {
    value
        .as_str()
        .and_then(|s| s.strip_prefix(SEALED_PREFIX))
        .is_some_and(|hash| hash.len() == 64 && hash.chars().all(|c| c.is_ascii_hexdigit()))
}

fn digest(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.to_string().as_bytes());
    format!("{}{}", SEALED_PREFIX, hex::encode(hasher.finalize()))
}

/// Snapshot of every converged resource, keyed by logical identity
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct State {
    resources: BTreeMap<Urn, ResourceState>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, urn: Urn, inputs: Value, outputs: Value) {
        self.insert(urn, ResourceState::new(inputs, outputs));
    }

    pub fn insert(&mut self, urn: Urn, resource: ResourceState) {
        self.resources.insert(urn, resource);
    }

    pub fn get(&self, urn: &Urn) -> Option<&ResourceState> {
        self.resources.get(urn)
    }

    /// Outputs of a converged resource, `None` while it is still pending
    pub fn outputs(&self, urn: &Urn) -> Option<&Value> {
        self.resources.get(urn).map(|r| &r.outputs)
    }

    pub fn contains(&self, urn: &Urn) -> bool {
        self.resources.contains_key(urn)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outputs_pending_until_recorded() {
        let urn = Urn::from("aws:s3:Bucket::artifact-storage");
        let mut state = State::new();
        assert!(state.outputs(&urn).is_none());

        state.record(urn.clone(), json!({}), json!({"bucket": "artifact-storage-1"}));

        assert_eq!(state.outputs(&urn).unwrap()["bucket"], "artifact-storage-1");
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_state_serializes_with_urn_keys() {
        let mut state = State::new();
        state.record(
            Urn::from("aws:s3:Bucket::artifact-storage"),
            json!({"acl": "private"}),
            json!({"bucket": "b"}),
        );

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value["resources"]["aws:s3:Bucket::artifact-storage"]["outputs"]["bucket"],
            "b"
        );

        let back: State = serde_json::from_value(value).unwrap();
        assert_eq!(back, state);
    }

    fn password_state() -> ResourceState {
        ResourceState::new(
            json!({"username": "postgres", "password": "hunter2hunter2hu"}),
            json!({"address": "db.internal", "password": "hunter2hunter2hu"}),
        )
        .with_secrets(BTreeSet::from(["/password".to_string()]))
    }

    #[test]
    fn test_secrets_are_sealed_when_serialized() {
        let mut state = State::new();
        state.insert(Urn::from("aws:rds:Instance::mlflow-db"), password_state());

        let persisted = serde_json::to_string(&state).unwrap();
        assert!(!persisted.contains("hunter2"));
        assert!(persisted.contains("db.internal"));

        let back: State = serde_json::from_str(&persisted).unwrap();
        let restored = back.get(&Urn::from("aws:rds:Instance::mlflow-db")).unwrap();
        assert!(is_sealed(&restored.inputs["password"]));
        assert_eq!(restored.inputs["username"], "postgres");
    }

    #[test]
    fn test_sealed_state_still_matches_same_inputs() {
        let live = password_state();
        let persisted: ResourceState =
            serde_json::from_value(serde_json::to_value(&live).unwrap()).unwrap();
        let secrets = live.secrets.clone();

        assert!(live.matches(&live.inputs, &secrets));
        assert!(persisted.matches(&live.inputs, &secrets));
        assert!(!persisted.matches(
            &json!({"username": "postgres", "password": "rotated"}),
            &secrets
        ));
    }

    #[test]
    fn test_sealing_is_idempotent() {
        let secrets = BTreeSet::from(["/password".to_string()]);
        let once = seal(&json!({"password": "hunter2"}), &secrets);
        assert_eq!(seal(&once, &secrets), once);
        assert_eq!(
            ResourceState::sealed_leaf(&once, &secrets),
            Some("/password")
        );
        assert_eq!(
            ResourceState::sealed_leaf(&json!({"password": "hunter2"}), &secrets),
            None
        );
    }
}
