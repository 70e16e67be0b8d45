// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Field manager used for server-side apply
pub const OPERATOR_NAME: &str = "ml-infra";

/// Kubernetes annotation keys
pub mod annotations {
    /// IAM role a service account assumes through the cluster's OIDC provider
    pub const EKS_ROLE_ARN: &str = "eks.amazonaws.com/role-arn";
}

/// Helm charts installed into the cluster
pub mod charts {
    pub const TRAEFIK_CHART: &str = "traefik";
    pub const TRAEFIK_REPO: &str = "https://helm.traefik.io/traefik";
    /// Namespace the chart places its resources in when none is given
    pub const TRAEFIK_NAMESPACE: &str = "default";
    pub const TRAEFIK_SERVICE: &str = "traefik";

    pub const MLFLOW_CHART: &str = "mlflow";
    pub const MLFLOW_REPO: &str = "https://larribas.me/helm-charts";
    pub const MLFLOW_SERVICE: &str = "mlflow";
}

/// MLflow tracking backend
pub mod database {
    pub const ALLOCATED_STORAGE_GB: u32 = 10;
    pub const ENGINE_VERSION: &str = "11.15";
    pub const INSTANCE_CLASS: &str = "db.t3.micro";
    pub const NAME: &str = "mlflow";
    pub const USERNAME: &str = "postgres";
    pub const PASSWORD_LENGTH: usize = 16;
}

/// Public entry point of the stack
pub mod dns {
    pub const DEFAULT_TTL: u32 = 300;
}

/// Traefik routing
pub mod routes {
    pub const MLFLOW_PREFIX: &str = "/mlflow";
    pub const ENTRY_POINT: &str = "web";
}

/// OIDC federation
pub mod oidc {
    pub const ASSUME_ROLE_ACTION: &str = "sts:AssumeRoleWithWebIdentity";
    pub const POLICY_VERSION: &str = "2012-10-17";
}
