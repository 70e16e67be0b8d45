// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Path-prefix route from the Traefik ingress controller to a service.
//!
//! Expands into a trailing-slash redirect middleware, a strip-prefix middleware and an
//! IngressRoute with a single `PathPrefix` rule targeting the service.

use crate::constants::routes::ENTRY_POINT;
use crate::error::{InfraError, Result};
use crate::graph::{Declare, DeclarationGraph};
use crate::output::Output;
use crate::resource::{Declaration, Input, ProviderRef, ResourceKind, ResourceOptions, Urn};
use crate::resources::helm::ServiceRef;
use crate::types::traefik::{
    path_prefix_rule, IngressRoute, IngressRouteSpec, Middleware, MiddlewareRef, MiddlewareSpec,
    RedirectRegex, Route, ServiceTarget, StripPrefix,
};
use tracing::info;

pub const TYPE: &str = "ml-infra:index:TraefikRoute";

#[derive(Debug, Clone)]
pub struct TraefikRouteArgs {
    /// e.g. `/mlflow`
    pub prefix: String,
    pub service: ServiceRef,
    pub namespace: Output<String>,
}

#[derive(Debug, Clone)]
pub struct TraefikRoute {
    urn: Urn,
    route: Urn,
    middlewares: Vec<Urn>,
    prefix: String,
}

impl TraefikRoute {
    pub fn new(
        graph: &mut DeclarationGraph,
        name: &str,
        args: TraefikRouteArgs,
        provider: &ProviderRef,
    ) -> Result<Self> {
        validate_prefix(&args.prefix)?;

        let built = graph.component(
            TYPE,
            name,
            ResourceOptions::with_provider(provider),
            |scope| {
                let trailing_slash = format!("{}-trailing-slash", name);
                let redirect = Middleware::new(
                    &trailing_slash,
                    MiddlewareSpec {
                        redirect_regex: Some(RedirectRegex {
                            regex: format!("^.*{}$", args.prefix.replace('.', "\\.")),
                            replacement: format!("{}/", args.prefix),
                            permanent: false,
                        }),
                        ..Default::default()
                    },
                );
                let redirect = scope.declare(namespaced(
                    ResourceKind::Middleware,
                    &trailing_slash,
                    Input::from_serialize(&redirect)?,
                    &args.namespace,
                )?)?;

                let strip_prefix = format!("{}-strip-prefix", name);
                let strip = Middleware::new(
                    &strip_prefix,
                    MiddlewareSpec {
                        strip_prefix: Some(StripPrefix {
                            prefixes: vec![args.prefix.clone()],
                        }),
                        ..Default::default()
                    },
                );
                let strip = scope.declare(namespaced(
                    ResourceKind::Middleware,
                    &strip_prefix,
                    Input::from_serialize(&strip)?,
                    &args.namespace,
                )?)?;

                let route_name = format!("{}-ingress-route", name);
                let route = IngressRoute::new(
                    &route_name,
                    IngressRouteSpec {
                        entry_points: Some(vec![ENTRY_POINT.to_string()]),
                        routes: vec![Route {
                            match_rule: path_prefix_rule(&args.prefix),
                            kind: "Rule".to_string(),
                            services: vec![ServiceTarget {
                                name: args.service.name.clone(),
                                namespace: Some(args.service.namespace.clone()),
                                port: None,
                            }],
                            middlewares: Some(vec![
                                MiddlewareRef {
                                    name: trailing_slash.clone(),
                                },
                                MiddlewareRef {
                                    name: strip_prefix.clone(),
                                },
                            ]),
                        }],
                    },
                );
                let mut manifest = Input::from_serialize(&route)?;
                manifest.set(
                    &["spec", "routes", "0", "services", "0", "port"],
                    Input::from(args.service.port()),
                )?;
                let mut decl =
                    namespaced(ResourceKind::IngressRoute, &route_name, manifest, &args.namespace)?;
                decl.options.depends_on = vec![redirect.clone(), strip.clone()];
                let route = scope.declare(decl)?;

                Ok(Self {
                    urn: scope.urn().clone(),
                    route,
                    middlewares: vec![redirect, strip],
                    prefix: args.prefix.clone(),
                })
            },
        )?;

        info!(
            "Declared route {} -> {}/{}",
            built.prefix, args.service.namespace, args.service.name
        );
        Ok(built)
    }

    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    pub fn route_urn(&self) -> &Urn {
        &self.route
    }

    pub fn middleware_urns(&self) -> &[Urn] {
        &self.middlewares
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn match_rule(&self) -> String {
        path_prefix_rule(&self.prefix)
    }
}

fn namespaced(
    kind: ResourceKind,
    name: &str,
    mut manifest: Input,
    namespace: &Output<String>,
) -> Result<Declaration> {
    manifest.set(&["metadata", "namespace"], Input::from(namespace.clone()))?;
    Ok(Declaration::new(kind, name, manifest))
}

/// Prefixes must be absolute, non-root, without a trailing slash, and safe to embed in a rule
pub fn validate_prefix(prefix: &str) -> Result<()> {
    let valid = prefix.len() > 1
        && prefix.starts_with('/')
        && !prefix.ends_with('/')
        && !prefix.contains("//")
        && prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(InfraError::config(format!(
            "route prefix '{}' must look like '/segment'",
            prefix
        )))
    }
}
