// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Public DNS record.

use crate::error::{InfraError, Result};
use crate::graph::Declare;
use crate::output::Output;
use crate::resource::{Declaration, Input, ResourceKind, Urn};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    A,
    Cname,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Cname => "CNAME",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DnsRecordArgs {
    pub zone_id: String,
    pub name: String,
    pub record_type: RecordType,
    pub ttl: u32,
    /// Targets, typically only known once a load balancer exists
    pub records: Vec<Output<String>>,
}

#[derive(Debug, Clone)]
pub struct DnsRecord {
    urn: Urn,
    fqdn: String,
}

impl DnsRecord {
    pub fn declare(graph: &mut impl Declare, name: &str, args: DnsRecordArgs) -> Result<Self> {
        if args.zone_id.is_empty() || !args.zone_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(InfraError::config(format!(
                "record {} has invalid hosted zone id '{}'",
                name, args.zone_id
            )));
        }
        validate_hostname(&args.name)?;
        if args.ttl == 0 {
            return Err(InfraError::config(format!("record {} needs a positive TTL", name)));
        }
        if args.records.is_empty() {
            return Err(InfraError::config(format!("record {} has no targets", name)));
        }
        if args.record_type == RecordType::Cname && args.records.len() != 1 {
            return Err(InfraError::config(format!(
                "CNAME record {} must have exactly one target",
                name
            )));
        }

        let inputs = Input::object([
            ("zoneId", Input::from(args.zone_id)),
            ("name", Input::from(args.name.clone())),
            ("type", Input::from(args.record_type.as_str())),
            ("ttl", Input::from(args.ttl)),
            ("records", Input::list(args.records.into_iter().map(Input::from))),
        ]);
        let urn = graph.declare(Declaration::new(ResourceKind::DnsRecord, name, inputs))?;
        info!(
            "Declared {} record {}",
            args.record_type.as_str(),
            args.name
        );
        Ok(Self {
            urn,
            fqdn: args.name,
        })
    }

    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }
}

fn validate_hostname(hostname: &str) -> Result<()> {
    let labels: Vec<&str> = hostname.trim_end_matches('.').split('.').collect();
    let valid = hostname.len() <= 253
        && labels.len() >= 2
        && labels.iter().all(|l| {
            !l.is_empty()
                && l.len() <= 63
                && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
                && !l.starts_with('-')
                && !l.ends_with('-')
        });
    if valid {
        Ok(())
    } else {
        Err(InfraError::config(format!("'{}' is not a valid hostname", hostname)))
    }
}
