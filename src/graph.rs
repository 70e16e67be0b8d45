// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Explicit dependency graph of resource declarations.
//!
//! Nodes are declarations, edges point from a dependency to its dependent so a
//! topological sort yields a valid convergence order. A declaration can only be added
//! once everything it consumes is already in the graph.

use crate::error::{InfraError, Result};
use crate::resource::{Declaration, Input, ProviderRef, ResourceKind, ResourceOptions, Urn};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Anything declarations can be added to: the graph itself or a component under construction
pub trait Declare {
    fn declare(&mut self, decl: Declaration) -> Result<Urn>;
}

#[derive(Debug, Default)]
pub struct DeclarationGraph {
    graph: DiGraph<Declaration, ()>,
    index: HashMap<Urn, NodeIndex>,
    exports: BTreeMap<String, Input>,
}

impl DeclarationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, urn: &Urn) -> bool {
        self.index.contains_key(urn)
    }

    pub fn get(&self, urn: &Urn) -> Option<&Declaration> {
        self.index.get(urn).map(|&idx| &self.graph[idx])
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Declarations in the order they were added
    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// Declarations that directly consume `urn`
    pub fn dependents(&self, urn: &Urn) -> Vec<&Urn> {
        let Some(&idx) = self.index.get(urn) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| &self.graph[n].urn)
            .collect()
    }

    pub fn exports(&self) -> &BTreeMap<String, Input> {
        &self.exports
    }

    /// Publish a stack output
    pub fn export(&mut self, name: &str, value: impl Into<Input>) -> Result<()> {
        let value = value.into();
        if self.exports.contains_key(name) {
            return Err(InfraError::config(format!("output '{}' exported twice", name)));
        }
        if let Some(missing) = value.dependencies().into_iter().find(|d| !self.contains(d)) {
            return Err(InfraError::config(format!(
                "output '{}' depends on undeclared resource {}",
                name, missing
            )));
        }
        self.exports.insert(name.to_string(), value);
        Ok(())
    }

    /// Topological convergence order; dependencies come first
    pub fn order(&self) -> Result<Vec<&Declaration>> {
        let sorted = toposort(&self.graph, None)
            .map_err(|cycle| InfraError::DependencyCycle(self.graph[cycle.node_id()].urn.clone()))?;
        Ok(sorted.into_iter().map(|idx| &self.graph[idx]).collect())
    }

    /// Re-check the whole graph; run before anything reaches the platform
    pub fn validate(&self) -> Result<()> {
        self.order()?;
        for decl in self.declarations() {
            decl.validate()?;
            if let Some(dependency) = decl.dependencies().into_iter().find(|d| !self.contains(d)) {
                return Err(InfraError::UnknownDependency {
                    resource: decl.urn.clone(),
                    dependency,
                });
            }
        }
        Ok(())
    }

    /// Build a composite component. Its children are staged and only committed, together
    /// with a grouping node, when `build` succeeds; on error the graph is left untouched.
    pub fn component<C>(
        &mut self,
        token: &'static str,
        name: &str,
        options: ResourceOptions,
        build: impl FnOnce(&mut ComponentScope<'_>) -> Result<C>,
    ) -> Result<C> {
        let kind = ResourceKind::Component(token);
        let urn = Urn::new(kind, name);
        if self.contains(&urn) {
            return Err(InfraError::DuplicateResource(urn));
        }

        let mut scope = ComponentScope {
            graph: &*self,
            urn,
            options,
            staged: Vec::new(),
        };
        let built = build(&mut scope)?;
        let ComponentScope {
            options, staged, ..
        } = scope;

        let group = Declaration::new(kind, name, Input::object::<&str>([])).with_options(
            ResourceOptions {
                provider: options.provider,
                parent: options.parent,
                depends_on: staged.iter().map(|d| d.urn.clone()).collect(),
            },
        );
        self.check(&group, &staged)?;

        debug!(
            "Committing component {} with {} resources",
            group.urn,
            staged.len()
        );
        for decl in staged {
            self.insert(decl);
        }
        self.insert(group);
        Ok(built)
    }

    fn check(&self, decl: &Declaration, staged: &[Declaration]) -> Result<()> {
        decl.validate()?;
        let is_known = |urn: &Urn| self.contains(urn) || staged.iter().any(|d| &d.urn == urn);
        if is_known(&decl.urn) {
            return Err(InfraError::DuplicateResource(decl.urn.clone()));
        }
        if let Some(dependency) = decl.dependencies().into_iter().find(|d| !is_known(d)) {
            return Err(InfraError::UnknownDependency {
                resource: decl.urn.clone(),
                dependency,
            });
        }
        Ok(())
    }

    fn insert(&mut self, decl: Declaration) -> Urn {
        let urn = decl.urn.clone();
        let deps = decl.dependencies();
        let idx = self.graph.add_node(decl);
        self.index.insert(urn.clone(), idx);
        for dep in deps {
            if let Some(&from) = self.index.get(&dep) {
                self.graph.add_edge(from, idx, ());
            }
        }
        urn
    }

    /// Add a declaration without construction checks
    #[cfg(test)]
    pub(crate) fn insert_unchecked(&mut self, decl: Declaration) -> Urn {
        self.insert(decl)
    }
}

impl Declare for DeclarationGraph {
    fn declare(&mut self, decl: Declaration) -> Result<Urn> {
        self.check(&decl, &[])?;
        debug!("Declared {}", decl.urn);
        Ok(self.insert(decl))
    }
}

/// Staging area for the resources of one component
pub struct ComponentScope<'g> {
    graph: &'g DeclarationGraph,
    urn: Urn,
    options: ResourceOptions,
    staged: Vec<Declaration>,
}

impl ComponentScope<'_> {
    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    pub fn provider(&self) -> Option<&ProviderRef> {
        self.options.provider.as_ref()
    }
}

impl Declare for ComponentScope<'_> {
    fn declare(&mut self, mut decl: Declaration) -> Result<Urn> {
        decl.options.parent = Some(self.urn.clone());
        if decl.options.provider.is_none() && decl.kind.is_kubernetes() {
            decl.options.provider = self.options.provider.clone();
        }
        self.graph.check(&decl, &self.staged)?;
        let urn = decl.urn.clone();
        self.staged.push(decl);
        Ok(urn)
    }
}
