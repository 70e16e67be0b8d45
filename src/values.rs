// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Typed values for the MLflow chart.
//!
//! Only the keys the chart recognises can be expressed, and the tree is validated
//! before it is handed to the chart installer.

use crate::error::{InfraError, Result};
use crate::output::Output;
use crate::resource::Input;
use crate::resources::{Bucket, Database};

/// `backendStore.postgres`
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pub username: Output<String>,
    pub password: Output<String>,
    pub host: Output<String>,
    pub port: Output<u16>,
    pub database: String,
}

impl PostgresBackend {
    pub fn from_database(db: &Database) -> Self {
        Self {
            username: db.username(),
            password: db.password(),
            host: db.address(),
            port: db.port(),
            database: db.db_name().to_string(),
        }
    }
}

/// `serviceAccount`
#[derive(Debug, Clone)]
pub enum ServiceAccountValues {
    /// The chart creates its own service account
    Managed,
    /// An externally bound identity; the chart must not create another one
    External { name: Output<String> },
}

#[derive(Debug, Clone)]
pub struct MlflowValues {
    pub backend_store: PostgresBackend,
    /// `s3://<bucket>`
    pub default_artifact_root: Output<String>,
    pub service_account: ServiceAccountValues,
}

impl MlflowValues {
    pub fn validate(&self) -> Result<()> {
        if self.backend_store.database.is_empty() {
            return Err(InfraError::config(
                "backendStore.postgres.database must not be empty",
            ));
        }
        if !self.backend_store.password.is_secret() {
            return Err(InfraError::config(
                "backendStore.postgres.password must be a secret value",
            ));
        }
        Ok(())
    }

    pub fn into_input(self) -> Result<Input> {
        self.validate()?;

        let postgres = Input::object([
            ("username", Input::from(self.backend_store.username)),
            ("password", Input::from(self.backend_store.password)),
            ("host", Input::from(self.backend_store.host)),
            ("port", Input::from(self.backend_store.port)),
            ("database", Input::from(self.backend_store.database)),
        ]);
        let service_account = match self.service_account {
            ServiceAccountValues::Managed => Input::object([("create", Input::from(true))]),
            ServiceAccountValues::External { name } => Input::object([
                ("create", Input::from(false)),
                ("name", Input::from(name)),
            ]),
        };

        Ok(Input::object([
            ("backendStore", Input::object([("postgres", postgres)])),
            ("defaultArtifactRoot", Input::from(self.default_artifact_root)),
            ("serviceAccount", service_account),
        ]))
    }
}

/// Artifact root URI of a bucket, available once the bucket name is known
pub fn artifact_root(bucket: &Bucket) -> Output<String> {
    bucket.bucket().try_apply(|name| s3_uri(&name))
}

pub fn s3_uri(bucket: &str) -> Result<String> {
    let valid = (3..=63).contains(&bucket.len())
        && bucket
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        && bucket.starts_with(|c: char| c.is_ascii_alphanumeric())
        && bucket.ends_with(|c: char| c.is_ascii_alphanumeric());
    if !valid {
        return Err(InfraError::config(format!(
            "'{}' is not a valid bucket name",
            bucket
        )));
    }
    Ok(format!("s3://{}", bucket))
}

pub fn bucket_from_s3_uri(uri: &str) -> Option<&str> {
    uri.strip_prefix("s3://")
        .filter(|b| !b.is_empty() && !b.contains('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Urn;
    use crate::state::State;
    use serde_json::json;

    fn backend() -> PostgresBackend {
        PostgresBackend {
            username: Output::known("postgres".to_string()),
            password: Output::known("pw".to_string()).secret(),
            host: Output::known("db.internal".to_string()),
            port: Output::known(5432),
            database: "mlflow".to_string(),
        }
    }

    #[test]
    fn test_s3_uri_round_trip() {
        let uri = s3_uri("artifact-storage-4b1e2c7").unwrap();
        assert_eq!(uri, "s3://artifact-storage-4b1e2c7");
        assert_eq!(bucket_from_s3_uri(&uri), Some("artifact-storage-4b1e2c7"));
    }

    #[test]
    fn test_s3_uri_rejects_invalid_names() {
        assert!(s3_uri("").is_err());
        assert!(s3_uri("Upper").is_err());
        assert!(s3_uri("a/b").is_err());
        assert!(bucket_from_s3_uri("https://bucket").is_none());
    }

    #[test]
    fn test_external_service_account_disables_creation() {
        let values = MlflowValues {
            backend_store: backend(),
            default_artifact_root: Output::known("s3://bucket".to_string()),
            service_account: ServiceAccountValues::External {
                name: Output::known("mlflow-service-account-sa".to_string()),
            },
        };

        let input = values.into_input().unwrap();
        let value = input.resolve(&State::new()).unwrap().unwrap();
        assert_eq!(
            value["serviceAccount"],
            json!({"create": false, "name": "mlflow-service-account-sa"})
        );
        assert_eq!(value["backendStore"]["postgres"]["port"], 5432);
        assert_eq!(value["defaultArtifactRoot"], "s3://bucket");
        assert_eq!(
            input.render(&State::new())["backendStore"]["postgres"]["password"],
            crate::resource::MASKED
        );
    }

    #[test]
    fn test_managed_service_account() {
        let values = MlflowValues {
            backend_store: backend(),
            default_artifact_root: Output::known("s3://bucket".to_string()),
            service_account: ServiceAccountValues::Managed,
        };
        let value = values
            .into_input()
            .unwrap()
            .resolve(&State::new())
            .unwrap()
            .unwrap();
        assert_eq!(value["serviceAccount"], json!({"create": true}));
    }

    #[test]
    fn test_plaintext_password_is_rejected() {
        let mut store = backend();
        store.password = Output::known("pw".to_string());
        let values = MlflowValues {
            backend_store: store,
            default_artifact_root: Output::known("s3://bucket".to_string()),
            service_account: ServiceAccountValues::Managed,
        };
        assert!(values.into_input().is_err());
    }

    #[test]
    fn test_empty_database_is_rejected() {
        let mut store = backend();
        store.database = String::new();
        let values = MlflowValues {
            backend_store: store,
            default_artifact_root: Output::known("s3://bucket".to_string()),
            service_account: ServiceAccountValues::Managed,
        };
        assert!(values.validate().is_err());
    }

    #[test]
    fn test_artifact_root_from_bucket_output() {
        let mut graph = crate::graph::DeclarationGraph::new();
        let bucket =
            Bucket::declare(&mut graph, "artifact-storage", Default::default()).unwrap();
        let root = artifact_root(&bucket);

        let mut state = State::new();
        state.record(
            Urn::from(bucket.urn().as_str()),
            json!({}),
            json!({"bucket": "artifact-storage-9a8b"}),
        );
        assert_eq!(
            root.resolve(&state).unwrap().as_deref(),
            Some("s3://artifact-storage-9a8b")
        );
    }
}
