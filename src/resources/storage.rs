// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Object storage bucket.

use crate::error::{InfraError, Result};
use crate::graph::Declare;
use crate::output::Output;
use crate::resource::{Declaration, Input, ResourceKind, Urn};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Canned ACL applied to the bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BucketAcl {
    /// Reachable only through IAM, i.e. the workload's federated identity
    #[default]
    Private,
    PublicRead,
    PublicReadWrite,
}

impl BucketAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketAcl::Private => "private",
            BucketAcl::PublicRead => "public-read",
            BucketAcl::PublicReadWrite => "public-read-write",
        }
    }

    pub fn is_public(&self) -> bool {
        !matches!(self, BucketAcl::Private)
    }
}

impl fmt::Display for BucketAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BucketAcl {
    type Err = InfraError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "private" => Ok(BucketAcl::Private),
            "public-read" => Ok(BucketAcl::PublicRead),
            "public-read-write" => Ok(BucketAcl::PublicReadWrite),
            other => Err(InfraError::config(format!("unknown bucket ACL '{}'", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bucket {
    urn: Urn,
}

impl Bucket {
    pub fn declare(graph: &mut impl Declare, name: &str, acl: BucketAcl) -> Result<Self> {
        if acl.is_public() {
            warn!(
                "Bucket {} uses ACL '{}': objects are reachable without the workload identity",
                name, acl
            );
        }
        let inputs = Input::object([("acl", Input::from(acl.as_str()))]);
        let urn = graph.declare(Declaration::new(ResourceKind::Bucket, name, inputs))?;
        info!("Declared bucket {} with ACL {}", name, acl);
        Ok(Self { urn })
    }

    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    /// Generated bucket name
    pub fn bucket(&self) -> Output<String> {
        Output::property(&self.urn, "/bucket")
    }
}
