// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes service account bound to an IAM role with access to one bucket.
//!
//! Expands into:
//! - an IAM role trusting the cluster's OIDC provider for exactly this service account
//! - an inline role policy scoped to the bucket (read-only or read-write)
//! - the service account, annotated with the role ARN

use crate::constants::annotations::EKS_ROLE_ARN;
use crate::constants::oidc::ASSUME_ROLE_ACTION;
use crate::error::{InfraError, Result};
use crate::graph::{Declare, DeclarationGraph};
use crate::output::Output;
use crate::resource::{Declaration, Input, ProviderRef, ResourceKind, ResourceOptions, Urn};
use crate::resources::cluster::OidcProvider;
use crate::resources::namespace::validate_dns_label;
use crate::types::iam::{Effect, PolicyDocument, Principal, Statement};
use k8s_openapi::api::core::v1::ServiceAccount;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use tracing::info;

pub const TYPE: &str = "ml-infra:index:S3ServiceAccount";

pub const READ_ACTIONS: &[&str] = &["s3:GetObject", "s3:ListBucket", "s3:GetBucketLocation"];
pub const WRITE_ACTIONS: &[&str] = &["s3:PutObject", "s3:DeleteObject", "s3:AbortMultipartUpload"];

#[derive(Debug, Clone)]
pub struct S3ServiceAccountArgs {
    pub namespace: Output<String>,
    pub oidc_provider: Option<OidcProvider>,
    pub bucket: Output<String>,
    pub read_only: bool,
}

#[derive(Debug, Clone)]
pub struct S3ServiceAccount {
    urn: Urn,
    role: Urn,
    policy: Urn,
    account: Urn,
    /// Name of the Kubernetes service account workloads should run as
    pub name: Output<String>,
    pub role_arn: Output<String>,
}

impl S3ServiceAccount {
    pub fn new(
        graph: &mut DeclarationGraph,
        name: &str,
        args: S3ServiceAccountArgs,
        provider: &ProviderRef,
    ) -> Result<Self> {
        let account_name = format!("{}-sa", name);
        let read_only = args.read_only;

        let built = graph.component(
            TYPE,
            name,
            ResourceOptions::with_provider(provider),
            |scope| {
                let oidc = args.oidc_provider.ok_or_else(|| {
                    InfraError::config(format!(
                        "S3ServiceAccount {} requires the cluster's identity-federation provider",
                        name
                    ))
                })?;
                validate_dns_label(&account_name, "service account name")?;

                let subject = account_name.clone();
                let trust = oidc.url.zip(&oidc.arn).zip(&args.namespace).try_apply(
                    move |((url, arn), namespace)| {
                        validate_dns_label(&namespace, "namespace")?;
                        trust_policy(&url, &arn, &namespace, &subject)
                    },
                );
                let role = scope.declare(Declaration::new(
                    ResourceKind::IamRole,
                    &account_name,
                    Input::object([("assumeRolePolicy", Input::from(trust))]),
                ))?;
                let role_name: Output<String> = Output::property(&role, "/name");
                let role_arn: Output<String> = Output::property(&role, "/arn");

                let document = args
                    .bucket
                    .try_apply(move |bucket| bucket_policy(&bucket, read_only));
                let policy = scope.declare(Declaration::new(
                    ResourceKind::IamRolePolicy,
                    &format!("{}-s3", account_name),
                    Input::object([
                        ("role", Input::from(role_name)),
                        ("policy", Input::from(document)),
                    ]),
                ))?;

                let mut manifest = Input::from_serialize(&ServiceAccount {
                    metadata: ObjectMeta {
                        name: Some(account_name.clone()),
                        ..Default::default()
                    },
                    ..Default::default()
                })?;
                manifest.set(&["metadata", "namespace"], Input::from(args.namespace.clone()))?;
                manifest.set(
                    &["metadata", "annotations", EKS_ROLE_ARN],
                    Input::from(role_arn.clone()),
                )?;
                // the role must carry its policy before pods can assume it
                let account = scope.declare(
                    Declaration::new(ResourceKind::ServiceAccount, &account_name, manifest)
                        .with_options(ResourceOptions {
                            depends_on: vec![policy.clone()],
                            ..Default::default()
                        }),
                )?;

                Ok(Self {
                    urn: scope.urn().clone(),
                    name: Output::property(&account, "/metadata/name"),
                    role_arn,
                    role,
                    policy,
                    account,
                })
            },
        )?;

        info!(
            "Declared service account {} with {} bucket access",
            account_name,
            if read_only { "read-only" } else { "read-write" }
        );
        Ok(built)
    }

    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    pub fn role_urn(&self) -> &Urn {
        &self.role
    }

    pub fn policy_urn(&self) -> &Urn {
        &self.policy
    }

    pub fn service_account_urn(&self) -> &Urn {
        &self.account
    }
}

/// Inline policy granting bucket access; read-only grants no write-class action
pub fn bucket_policy(bucket: &str, read_only: bool) -> Result<String> {
    let mut actions: Vec<String> = READ_ACTIONS.iter().map(|a| a.to_string()).collect();
    if !read_only {
        actions.extend(WRITE_ACTIONS.iter().map(|a| a.to_string()));
    }
    let document = PolicyDocument::new(vec![Statement {
        effect: Effect::Allow,
        action: actions,
        resource: Some(vec![
            format!("arn:aws:s3:::{}", bucket),
            format!("arn:aws:s3:::{}/*", bucket),
        ]),
        principal: None,
        condition: None,
    }]);
    Ok(serde_json::to_string(&document)?)
}

/// Trust policy letting exactly `system:serviceaccount:<namespace>:<account>` assume the role
pub fn trust_policy(
    oidc_url: &str,
    oidc_arn: &str,
    namespace: &str,
    account: &str,
) -> Result<String> {
    let issuer = oidc_url.trim_start_matches("https://");
    let condition = BTreeMap::from([(
        "StringEquals".to_string(),
        BTreeMap::from([(
            format!("{}:sub", issuer),
            format!("system:serviceaccount:{}:{}", namespace, account),
        )]),
    )]);
    let document = PolicyDocument::new(vec![Statement {
        effect: Effect::Allow,
        action: vec![ASSUME_ROLE_ACTION.to_string()],
        resource: None,
        principal: Some(Principal {
            federated: oidc_arn.to_string(),
        }),
        condition: Some(condition),
    }]);
    Ok(serde_json::to_string(&document)?)
}
