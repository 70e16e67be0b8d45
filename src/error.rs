// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::resource::Urn;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InfraError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Resource {urn} is missing required input '{input}'")]
    MissingInput { urn: Urn, input: String },

    #[error("Resource {0} is declared more than once")]
    DuplicateResource(Urn),

    #[error("Resource {resource} depends on {dependency}, which has not been declared")]
    UnknownDependency { resource: Urn, dependency: Urn },

    #[error("Cyclic dependency detected at {0}")]
    DependencyCycle(Urn),

    #[error("Provider failed for {urn}: {message}")]
    ProviderError { urn: Urn, message: String },

    #[error("Resource {urn} skipped because dependency {dependency} did not converge")]
    DependencyFailed { urn: Urn, dependency: Urn },

    #[error("Output '{property}' of {urn} is not available")]
    MissingOutput { urn: Urn, property: String },

    #[error("Failed to parse kubeconfig: {0}")]
    KubeconfigError(String),

    #[error("Serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML rendering failed: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl InfraError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn provider(urn: &Urn, msg: impl Into<String>) -> Self {
        Self::ProviderError {
            urn: urn.clone(),
            message: msg.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, InfraError>;
