// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deferred values produced by the platform once a resource has converged.
//!
//! An [`Output`] can only be observed by resolving it against a [`State`]. Consumers
//! transform it with [`Output::apply`] and friends; the transformation runs once the
//! owning resources have reported their outputs.

use crate::error::{InfraError, Result};
use crate::resource::Urn;
use crate::state::State;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

type Eval<T> = dyn Fn(&State) -> Result<Option<T>> + Send + Sync;

pub struct Output<T> {
    deps: BTreeSet<Urn>,
    secret: bool,
    eval: Arc<Eval<T>>,
}

impl<T> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self {
            deps: self.deps.clone(),
            secret: self.secret,
            eval: Arc::clone(&self.eval),
        }
    }
}

impl<T> fmt::Debug for Output<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("deps", &self.deps)
            .field("secret", &self.secret)
            .finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> Output<T> {
    /// A value that is available before anything has been provisioned
    pub fn known(value: T) -> Self
    where
        T: Clone,
    {
        Self {
            deps: BTreeSet::new(),
            secret: false,
            eval: Arc::new(move |_| Ok(Some(value.clone()))),
        }
    }

    /// Read a property of a resource's outputs through a JSON pointer
    pub(crate) fn property(urn: &Urn, pointer: &str) -> Self
    where
        T: DeserializeOwned,
    {
        let owner = urn.clone();
        let pointer = pointer.to_string();
        Self {
            deps: BTreeSet::from([urn.clone()]),
            secret: false,
            eval: Arc::new(move |state| {
                let Some(outputs) = state.outputs(&owner) else {
                    return Ok(None);
                };
                let value = outputs
                    .pointer(&pointer)
                    .filter(|v| !v.is_null())
                    .ok_or_else(|| InfraError::MissingOutput {
                        urn: owner.clone(),
                        property: pointer.clone(),
                    })?;
                Ok(Some(serde_json::from_value(value.clone())?))
            }),
        }
    }

    pub fn apply<U, F>(&self, f: F) -> Output<U>
    where
        U: Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.try_apply(move |v| Ok(f(v)))
    }

    /// Like [`Output::apply`], for transformations that can reject the resolved value
    pub fn try_apply<U, F>(&self, f: F) -> Output<U>
    where
        U: Send + Sync + 'static,
        F: Fn(T) -> Result<U> + Send + Sync + 'static,
    {
        let eval = Arc::clone(&self.eval);
        Output {
            deps: self.deps.clone(),
            secret: self.secret,
            eval: Arc::new(move |state| match eval(state)? {
                Some(v) => f(v).map(Some),
                None => Ok(None),
            }),
        }
    }

    pub fn zip<U>(&self, other: &Output<U>) -> Output<(T, U)>
    where
        U: Send + Sync + 'static,
    {
        let left = Arc::clone(&self.eval);
        let right = Arc::clone(&other.eval);
        Output {
            deps: self.deps.union(&other.deps).cloned().collect(),
            secret: self.secret || other.secret,
            eval: Arc::new(move |state| {
                let (Some(l), Some(r)) = (left(state)?, right(state)?) else {
                    return Ok(None);
                };
                Ok(Some((l, r)))
            }),
        }
    }

    /// Mark the value as sensitive; everything derived from it stays sensitive
    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn is_secret(&self) -> bool {
        self.secret
    }

    pub fn dependencies(&self) -> &BTreeSet<Urn> {
        &self.deps
    }

    pub fn depends_on(&self, urn: &Urn) -> bool {
        self.deps.contains(urn)
    }

    /// Resolve against converged state; `Ok(None)` while any owner is still pending
    pub fn resolve(&self, state: &State) -> Result<Option<T>> {
        (self.eval)(state)
    }
}

/// Combine outputs into one that resolves when all of them have
pub fn all<T: Send + Sync + 'static>(outputs: Vec<Output<T>>) -> Output<Vec<T>> {
    let deps = outputs.iter().flat_map(|o| o.deps.iter().cloned()).collect();
    let secret = outputs.iter().any(|o| o.secret);
    let evals: Vec<Arc<Eval<T>>> = outputs.into_iter().map(|o| o.eval).collect();
    Output {
        deps,
        secret,
        eval: Arc::new(move |state| {
            let mut values = Vec::with_capacity(evals.len());
            for eval in &evals {
                match eval(state)? {
                    Some(v) => values.push(v),
                    None => return Ok(None),
                }
            }
            Ok(Some(values))
        }),
    }
}
