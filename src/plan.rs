// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reviewable preview of a declaration graph.

use crate::config::PlanFormat;
use crate::error::Result;
use crate::graph::DeclarationGraph;
use crate::resource::Urn;
use crate::state::State;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedResource {
    pub urn: Urn,
    #[serde(rename = "type")]
    pub type_token: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Urn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<Urn>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Urn>,
    /// Inputs as known from `state`; secrets are always masked
    pub inputs: Value,
}

/// Declarations in convergence order, followed by the stack outputs
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub resources: Vec<PlannedResource>,
    pub outputs: BTreeMap<String, Value>,
}

impl Plan {
    pub fn preview(graph: &DeclarationGraph, state: &State) -> Result<Self> {
        graph.validate()?;
        let resources = graph
            .order()?
            .into_iter()
            .map(|decl| PlannedResource {
                urn: decl.urn.clone(),
                type_token: decl.kind.type_token().to_string(),
                name: decl.name.clone(),
                parent: decl.options.parent.clone(),
                provider: decl.options.provider.as_ref().map(|p| p.urn.clone()),
                dependencies: decl.dependencies().into_iter().collect(),
                inputs: decl.inputs.render(state),
            })
            .collect();
        let outputs = graph
            .exports()
            .iter()
            .map(|(name, value)| (name.clone(), value.render(state)))
            .collect();
        Ok(Self { resources, outputs })
    }

    pub fn resource(&self, urn: &Urn) -> Option<&PlannedResource> {
        self.resources.iter().find(|r| &r.urn == urn)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render(&self, format: PlanFormat) -> Result<String> {
        match format {
            PlanFormat::Yaml => self.to_yaml(),
            PlanFormat::Json => self.to_json(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ResourceKind, COMPUTED, MASKED};
    use crate::resources::{
        Cluster, ClusterArgs, Database, DatabaseArgs, RandomPassword, RandomPasswordArgs,
    };
    use serde_json::json;

    fn database_graph() -> (DeclarationGraph, Cluster, Database) {
        let mut graph = DeclarationGraph::new();
        let cluster = Cluster::declare(&mut graph, "ml-cluster", ClusterArgs::default()).unwrap();
        let password = RandomPassword::declare(
            &mut graph,
            "mlflow-db-password",
            RandomPasswordArgs {
                length: 16,
                special: false,
            },
        )
        .unwrap();
        let db = Database::declare(
            &mut graph,
            "mlflow-db",
            DatabaseArgs::postgres(password.result(), cluster.database_access()),
        )
        .unwrap();
        graph.export("kubeconfig", cluster.kubeconfig()).unwrap();
        (graph, cluster, db)
    }

    #[test]
    fn test_pending_values_are_computed_and_secrets_masked() {
        let (graph, _, db) = database_graph();
        let plan = Plan::preview(&graph, &State::new()).unwrap();

        let planned = plan.resource(db.urn()).unwrap();
        assert_eq!(planned.type_token, "aws:rds:Instance");
        assert_eq!(planned.inputs["password"], MASKED);
        assert_eq!(planned.inputs["vpcSecurityGroupIds"], json!([COMPUTED, COMPUTED]));
        assert_eq!(planned.inputs["publiclyAccessible"], false);
        assert_eq!(plan.outputs["kubeconfig"], COMPUTED);
    }

    #[test]
    fn test_known_values_are_shown_but_secrets_stay_masked() {
        let (graph, cluster, db) = database_graph();
        let mut state = State::new();
        state.record(
            cluster.urn().clone(),
            json!({}),
            json!({"clusterSecurityGroupId": "sg-shared", "nodeSecurityGroupId": "sg-node"}),
        );
        state.record(
            Urn::new(ResourceKind::RandomPassword, "mlflow-db-password"),
            json!({}),
            json!({"result": "hunter2hunter2hu"}),
        );

        let plan = Plan::preview(&graph, &state).unwrap();
        let planned = plan.resource(db.urn()).unwrap();
        assert_eq!(planned.inputs["vpcSecurityGroupIds"], json!(["sg-shared", "sg-node"]));
        assert_eq!(planned.inputs["password"], MASKED);
        assert!(!plan.to_json().unwrap().contains("hunter2"));
        assert!(!plan.to_yaml().unwrap().contains("hunter2"));
    }

    #[test]
    fn test_resources_follow_convergence_order() {
        let (graph, cluster, db) = database_graph();
        let plan = Plan::preview(&graph, &State::new()).unwrap();

        let position = |urn: &Urn| plan.resources.iter().position(|r| &r.urn == urn).unwrap();
        assert!(position(cluster.urn()) < position(db.urn()));
        assert!(plan.resource(db.urn()).unwrap().dependencies.contains(cluster.urn()));
    }

    #[test]
    fn test_render_formats() {
        let (graph, _, _) = database_graph();
        let plan = Plan::preview(&graph, &State::new()).unwrap();

        let yaml: Value = serde_yaml::from_str(&plan.render(PlanFormat::Yaml).unwrap()).unwrap();
        let json: Value = serde_json::from_str(&plan.render(PlanFormat::Json).unwrap()).unwrap();
        assert_eq!(yaml, json);
        assert!(json["resources"]
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r["type"] == "eks:index:Cluster"));
    }
}
