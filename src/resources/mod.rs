// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Typed handles for the platform resources the stack declares.

pub mod cluster;
pub mod database;
pub mod dns;
pub mod helm;
pub mod namespace;
pub mod random;
pub mod storage;

pub use cluster::{Cluster, ClusterArgs, OidcProvider};
pub use database::{Database, DatabaseArgs, DatabaseNetwork};
pub use dns::{DnsRecord, DnsRecordArgs, RecordType};
pub use helm::{Chart, ChartArgs, ServiceRef};
pub use namespace::Namespace;
pub use random::{RandomPassword, RandomPasswordArgs};
pub use storage::{Bucket, BucketAcl};
