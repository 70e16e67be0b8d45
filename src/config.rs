// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::dns::DEFAULT_TTL;
use crate::resources::storage::BucketAcl;
use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

/// Rendering of the declaration plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanFormat {
    #[default]
    Yaml,
    Json,
}

/// Stack configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Hosted zone the public record is created in
    pub dns_zone_id: String,
    /// Public hostname pointing at the ingress load balancer
    pub dns_hostname: String,
    pub dns_ttl: u32,
    pub bucket_acl: BucketAcl,
    pub plan_format: PlanFormat,
    /// Where to write the plan; stdout when unset
    pub plan_output: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let dns_zone_id =
            env::var("DNS_ZONE_ID").context("DNS_ZONE_ID environment variable not set")?;
        let dns_hostname =
            env::var("DNS_HOSTNAME").context("DNS_HOSTNAME environment variable not set")?;

        let dns_ttl = match env::var("DNS_TTL") {
            Ok(v) => v.parse().context("DNS_TTL must be a positive integer")?,
            Err(_) => DEFAULT_TTL,
        };

        let bucket_acl = match env::var("ARTIFACT_BUCKET_ACL") {
            Ok(v) => v.parse()?,
            Err(_) => BucketAcl::default(),
        };

        let plan_format = match env::var("PLAN_FORMAT").as_deref() {
            Ok("json") => PlanFormat::Json,
            Ok("yaml") | Err(_) => PlanFormat::Yaml,
            Ok(other) => bail!("PLAN_FORMAT must be 'yaml' or 'json', got '{}'", other),
        };

        let plan_output = env::var("PLAN_OUTPUT").ok().map(PathBuf::from);

        Ok(Config {
            dns_zone_id,
            dns_hostname,
            dns_ttl,
            bucket_acl,
            plan_format,
            plan_output,
        })
    }
}
