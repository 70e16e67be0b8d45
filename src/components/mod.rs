// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Composite components: one logical declaration expanding into a fixed bundle of
//! platform resources.

pub mod s3_service_account;
pub mod traefik_route;

pub use s3_service_account::{S3ServiceAccount, S3ServiceAccountArgs};
pub use traefik_route::{TraefikRoute, TraefikRouteArgs};
