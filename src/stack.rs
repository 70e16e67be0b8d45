// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The MLflow platform: cluster, tracking database, artifact store, identity binding,
//! tracking server, ingress route and public DNS name.

use crate::components::{S3ServiceAccount, S3ServiceAccountArgs, TraefikRoute, TraefikRouteArgs};
use crate::config::Config;
use crate::constants::{charts, database, routes};
use crate::error::Result;
use crate::graph::DeclarationGraph;
use crate::resources::{
    Bucket, Chart, ChartArgs, Cluster, ClusterArgs, Database, DatabaseArgs, DnsRecord,
    DnsRecordArgs, Namespace, RandomPassword, RandomPasswordArgs, RecordType,
};
use crate::values::{artifact_root, MlflowValues, PostgresBackend, ServiceAccountValues};
use tracing::{info, instrument};

/// Name of the only stack output
pub const KUBECONFIG_OUTPUT: &str = "kubeconfig";

/// Handles to everything the stack declares
#[derive(Debug, Clone)]
pub struct MlStack {
    pub cluster: Cluster,
    pub namespace: Namespace,
    pub db_password: RandomPassword,
    pub ingress_controller: Chart,
    pub database: Database,
    pub artifact_storage: Bucket,
    pub service_account: S3ServiceAccount,
    pub mlflow: Chart,
    pub route: TraefikRoute,
    pub dns_record: DnsRecord,
}

#[instrument(skip(config), fields(hostname = %config.dns_hostname))]
pub fn build(config: &Config) -> Result<(DeclarationGraph, MlStack)> {
    let mut graph = DeclarationGraph::new();

    let cluster = Cluster::declare(&mut graph, "ml-cluster", ClusterArgs::default())?;
    let provider = cluster.provider();

    let namespace = Namespace::declare(&mut graph, "mlflow-namespace", "mlflow", &provider)?;

    let db_password = RandomPassword::declare(
        &mut graph,
        "mlflow-db-password",
        RandomPasswordArgs {
            length: database::PASSWORD_LENGTH,
            special: false,
        },
    )?;

    let ingress_controller = Chart::declare(
        &mut graph,
        "traefik",
        ChartArgs::new(charts::TRAEFIK_CHART, charts::TRAEFIK_REPO),
        &provider,
    )?;

    let database = Database::declare(
        &mut graph,
        "mlflow-db",
        DatabaseArgs::postgres(db_password.result(), cluster.database_access()),
    )?;

    let artifact_storage = Bucket::declare(&mut graph, "artifact-storage", config.bucket_acl)?;

    let service_account = S3ServiceAccount::new(
        &mut graph,
        "mlflow-service-account",
        S3ServiceAccountArgs {
            namespace: namespace.metadata_name(),
            oidc_provider: cluster.oidc_provider().cloned(),
            bucket: artifact_storage.bucket(),
            read_only: false,
        },
        &provider,
    )?;

    let values = MlflowValues {
        backend_store: PostgresBackend::from_database(&database),
        default_artifact_root: artifact_root(&artifact_storage),
        service_account: ServiceAccountValues::External {
            name: service_account.name.clone(),
        },
    };
    let mlflow = Chart::declare(
        &mut graph,
        "mlflow",
        ChartArgs {
            namespace: Some(namespace.metadata_name()),
            values: Some(values.into_input()?),
            ..ChartArgs::new(charts::MLFLOW_CHART, charts::MLFLOW_REPO)
        },
        &provider,
    )?;

    let route = TraefikRoute::new(
        &mut graph,
        "mlflow",
        TraefikRouteArgs {
            prefix: routes::MLFLOW_PREFIX.to_string(),
            service: mlflow.service(namespace.name(), charts::MLFLOW_SERVICE),
            namespace: namespace.metadata_name(),
        },
        &provider,
    )?;

    let ingress_hostname = ingress_controller
        .service(charts::TRAEFIK_NAMESPACE, charts::TRAEFIK_SERVICE)
        .load_balancer_hostname();
    let dns_record = DnsRecord::declare(
        &mut graph,
        "dns-record",
        DnsRecordArgs {
            zone_id: config.dns_zone_id.clone(),
            name: config.dns_hostname.clone(),
            record_type: RecordType::Cname,
            ttl: config.dns_ttl,
            records: vec![ingress_hostname],
        },
    )?;

    graph.export(KUBECONFIG_OUTPUT, cluster.kubeconfig())?;

    info!("Declared {} resources", graph.len());

    Ok((
        graph,
        MlStack {
            cluster,
            namespace,
            db_password,
            ingress_controller,
            database,
            artifact_storage,
            service_account,
            mlflow,
            route,
            dns_record,
        },
    ))
}
