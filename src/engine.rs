// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Drives a declaration graph to convergence through a [`Reconciler`].
//!
//! The whole graph is validated before the first reconciler call. Declarations then
//! converge in dependency waves; everything in a wave is independent and runs
//! concurrently. A failure only skips the declarations that depend on it. Nothing is
//! retried here.

use crate::error::{InfraError, Result};
use crate::graph::DeclarationGraph;
use crate::reconcilers::{Reconciler, ResolvedResource};
use crate::resource::{Declaration, ResourceKind, Urn};
use crate::resources::random;
use crate::state::{ResourceState, State};
use futures::future::join_all;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created,
    Updated,
    /// Inputs matched the prior state; outputs were carried over
    Unchanged,
    Failed(String),
    Skipped { dependency: Urn },
}

impl Outcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, Outcome::Created | Outcome::Updated | Outcome::Unchanged)
    }
}

#[derive(Debug, Default)]
pub struct Report {
    pub state: State,
    pub outcomes: BTreeMap<Urn, Outcome>,
    /// Stack outputs; `None` when they could not be resolved
    pub outputs: BTreeMap<String, Option<Value>>,
}

impl Report {
    pub fn outcome(&self, urn: &Urn) -> Option<&Outcome> {
        self.outcomes.get(urn)
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(Outcome::is_converged)
    }

    pub fn failures(&self) -> Vec<(&Urn, &str)> {
        self.outcomes
            .iter()
            .filter_map(|(urn, o)| match o {
                Outcome::Failed(msg) => Some((urn, msg.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn skipped(&self) -> Vec<&Urn> {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::Skipped { .. }))
            .map(|(urn, _)| urn)
            .collect()
    }

    /// The converged state, or the root error of the run; failures win over skips
    pub fn into_result(self) -> Result<State> {
        let mut skipped = None;
        for (urn, outcome) in self.outcomes {
            match outcome {
                Outcome::Failed(message) => return Err(InfraError::ProviderError { urn, message }),
                Outcome::Skipped { dependency } if skipped.is_none() => {
                    skipped = Some(InfraError::DependencyFailed { urn, dependency });
                }
                _ => {}
            }
        }
        match skipped {
            Some(err) => Err(err),
            None => Ok(self.state),
        }
    }

    fn settle(&mut self, urn: &Urn, outcome: Outcome) {
        self.outcomes.insert(urn.clone(), outcome);
    }

    /// Settle a resource that did not converge; its last-known state survives the run
    fn settle_unconverged(&mut self, urn: &Urn, outcome: Outcome, prior: &State) {
        if let Some(previous) = prior.get(urn) {
            self.state.insert(urn.clone(), previous.clone());
        }
        self.settle(urn, outcome);
    }
}

pub struct Engine<'a, R> {
    graph: &'a DeclarationGraph,
    reconciler: &'a R,
}

impl<'a, R: Reconciler + Sync> Engine<'a, R> {
    pub fn new(graph: &'a DeclarationGraph, reconciler: &'a R) -> Self {
        Self { graph, reconciler }
    }

    #[instrument(skip_all, fields(resources = self.graph.len()))]
    pub async fn apply(&self, prior: &State) -> Result<Report> {
        self.graph.validate()?;
        let mut remaining = self.graph.order()?;
        let mut report = Report::default();

        while !remaining.is_empty() {
            let (ready, blocked): (Vec<&Declaration>, Vec<&Declaration>) =
                remaining.into_iter().partition(|d| {
                    d.dependencies()
                        .iter()
                        .all(|dep| report.outcomes.contains_key(dep))
                });
            if ready.is_empty() {
                return Err(InfraError::DependencyCycle(blocked[0].urn.clone()));
            }
            remaining = blocked;
            debug!("Converging wave of {} resources", ready.len());

            let mut pending = Vec::new();
            for decl in ready {
                if let Some(resource) = self.prepare(decl, prior, &mut report) {
                    pending.push(resource);
                }
            }

            let results = join_all(
                pending
                    .iter()
                    .map(|(resource, _, _)| self.reconciler.reconcile(resource)),
            )
            .await;

            for ((resource, outcome, secrets), result) in pending.into_iter().zip(results) {
                match result {
                    Ok(outputs) => {
                        info!("{} {:?}", resource.urn, outcome);
                        report.settle(&resource.urn, outcome);
                        report.state.insert(
                            resource.urn,
                            ResourceState::new(resource.inputs, outputs).with_secrets(secrets),
                        );
                    }
                    Err(e) => {
                        error!("Failed to converge {}: {}", resource.urn, e);
                        report.settle_unconverged(
                            &resource.urn,
                            Outcome::Failed(e.to_string()),
                            prior,
                        );
                    }
                }
            }
        }

        for (name, value) in self.graph.exports() {
            let resolved = value.resolve(&report.state).unwrap_or_else(|e| {
                warn!("Output {} could not be resolved: {}", name, e);
                None
            });
            report.outputs.insert(name.clone(), resolved);
        }

        info!(
            "Run finished: {} converged, {} failed, {} skipped",
            report.outcomes.values().filter(|o| o.is_converged()).count(),
            report.failures().len(),
            report.skipped().len()
        );
        Ok(report)
    }

    /// Settle what can be settled without the reconciler; return the rest
    fn prepare(
        &self,
        decl: &Declaration,
        prior: &State,
        report: &mut Report,
    ) -> Option<(ResolvedResource, Outcome, BTreeSet<String>)> {
        let failed_dependency = decl.dependencies().into_iter().find(|dep| {
            report
                .outcomes
                .get(dep)
                .is_some_and(|o| !o.is_converged())
        });
        if let Some(dependency) = failed_dependency {
            warn!("Skipping {}: dependency {} did not converge", decl.urn, dependency);
            report.settle_unconverged(&decl.urn, Outcome::Skipped { dependency }, prior);
            return None;
        }

        let inputs = match decl.inputs.resolve(&report.state) {
            Ok(Some(inputs)) => inputs,
            Ok(None) => {
                let outcome = Outcome::Failed("inputs did not resolve".to_string());
                report.settle_unconverged(&decl.urn, outcome, prior);
                return None;
            }
            Err(e) => {
                error!("Failed to resolve inputs of {}: {}", decl.urn, e);
                report.settle_unconverged(&decl.urn, Outcome::Failed(e.to_string()), prior);
                return None;
            }
        };

        let mut secrets = decl.inputs.secret_paths();
        secrets.extend(decl.kind.secret_outputs().iter().map(|p| p.to_string()));

        let previous = prior.get(&decl.urn);
        if let Some(previous) = previous.filter(|p| p.matches(&inputs, &secrets)) {
            debug!("{} unchanged", decl.urn);
            report.settle(&decl.urn, Outcome::Unchanged);
            report.state.insert(
                decl.urn.clone(),
                ResourceState::new(inputs, previous.outputs.clone()).with_secrets(secrets),
            );
            return None;
        }
        // a secret restored from persisted state is only a digest and cannot be sent anywhere
        if let Some(pointer) = ResourceState::sealed_leaf(&inputs, &secrets) {
            let outcome = Outcome::Failed(format!(
                "secret input {} is only known sealed from persisted state",
                pointer
            ));
            report.settle_unconverged(&decl.urn, outcome, prior);
            return None;
        }
        let outcome = if previous.is_some() {
            Outcome::Updated
        } else {
            Outcome::Created
        };

        if decl.kind.is_local() {
            match evaluate_local(decl, &inputs) {
                Ok(outputs) => {
                    report.settle(&decl.urn, outcome);
                    report.state.insert(
                        decl.urn.clone(),
                        ResourceState::new(inputs, outputs).with_secrets(secrets),
                    );
                }
                Err(e) => {
                    report.settle_unconverged(&decl.urn, Outcome::Failed(e.to_string()), prior)
                }
            }
            return None;
        }

        Some((
            ResolvedResource {
                urn: decl.urn.clone(),
                kind: decl.kind,
                name: decl.name.clone(),
                inputs,
                provider: decl.options.provider.as_ref().map(|p| p.urn.clone()),
            },
            outcome,
            secrets,
        ))
    }
}

fn evaluate_local(decl: &Declaration, inputs: &Value) -> Result<Value> {
    match decl.kind {
        ResourceKind::RandomPassword => random::evaluate(&decl.urn, inputs),
        ResourceKind::Component(_) => Ok(json!({})),
        other => Err(InfraError::provider(
            &decl.urn,
            format!("{} cannot be evaluated locally", other.type_token()),
        )),
    }
}
