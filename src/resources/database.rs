// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Managed relational database.

use crate::constants::database;
use crate::error::{InfraError, Result};
use crate::graph::Declare;
use crate::output::Output;
use crate::resource::{Declaration, Input, ResourceKind, Urn};
use tracing::info;

/// Security groups allowed to reach the database. Only a cluster can hand one out,
/// so a database can never be opened to arbitrary networks.
#[derive(Debug, Clone)]
pub struct DatabaseNetwork {
    security_group_ids: Vec<Output<String>>,
}

impl DatabaseNetwork {
    pub(crate) fn cluster_boundaries(shared: Output<String>, node: Output<String>) -> Self {
        Self {
            security_group_ids: vec![shared, node],
        }
    }

    pub fn security_group_ids(&self) -> &[Output<String>] {
        &self.security_group_ids
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseEngine {
    Postgres,
}

impl DatabaseEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseEngine::Postgres => "postgres",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseArgs {
    pub allocated_storage_gb: u32,
    pub engine: DatabaseEngine,
    pub engine_version: String,
    pub instance_class: String,
    pub db_name: String,
    pub username: String,
    pub password: Output<String>,
    pub network: DatabaseNetwork,
    pub skip_final_snapshot: bool,
}

impl DatabaseArgs {
    /// Small postgres instance backing the MLflow tracking server
    pub fn postgres(password: Output<String>, network: DatabaseNetwork) -> Self {
        Self {
            allocated_storage_gb: database::ALLOCATED_STORAGE_GB,
            engine: DatabaseEngine::Postgres,
            engine_version: database::ENGINE_VERSION.to_string(),
            instance_class: database::INSTANCE_CLASS.to_string(),
            db_name: database::NAME.to_string(),
            username: database::USERNAME.to_string(),
            password,
            network,
            skip_final_snapshot: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Database {
    urn: Urn,
    db_name: String,
    password: Output<String>,
}

impl Database {
    pub fn declare(graph: &mut impl Declare, name: &str, args: DatabaseArgs) -> Result<Self> {
        if args.allocated_storage_gb == 0 {
            return Err(InfraError::config(format!(
                "database {} needs allocated storage",
                name
            )));
        }
        if args.db_name.is_empty() || !args.db_name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(InfraError::config(format!(
                "database {} has invalid database name '{}'",
                name, args.db_name
            )));
        }
        if args.username.is_empty() {
            return Err(InfraError::config(format!("database {} needs a username", name)));
        }
        if args.network.security_group_ids.is_empty() {
            return Err(InfraError::config(format!(
                "database {} must be restricted to at least one security group",
                name
            )));
        }

        let password = args.password.clone().secret();
        let inputs = Input::object([
            ("allocatedStorage", Input::from(args.allocated_storage_gb)),
            ("engine", Input::from(args.engine.as_str())),
            ("engineVersion", Input::from(args.engine_version)),
            ("instanceClass", Input::from(args.instance_class)),
            ("dbName", Input::from(args.db_name.clone())),
            ("username", Input::from(args.username)),
            ("password", Input::from(password.clone())),
            ("skipFinalSnapshot", Input::from(args.skip_final_snapshot)),
            ("publiclyAccessible", Input::from(false)),
            (
                "vpcSecurityGroupIds",
                Input::list(args.network.security_group_ids.into_iter().map(Input::from)),
            ),
        ]);

        let urn = graph.declare(Declaration::new(ResourceKind::DatabaseInstance, name, inputs))?;
        info!("Declared {} database {}", args.engine.as_str(), name);

        Ok(Self {
            urn,
            db_name: args.db_name,
            password,
        })
    }

    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn address(&self) -> Output<String> {
        Output::property(&self.urn, "/address")
    }

    pub fn port(&self) -> Output<u16> {
        Output::property(&self.urn, "/port")
    }

    pub fn username(&self) -> Output<String> {
        Output::property(&self.urn, "/username")
    }

    pub fn password(&self) -> Output<String> {
        self.password.clone()
    }
}
