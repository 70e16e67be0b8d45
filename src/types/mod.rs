// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Typed documents rendered into declaration inputs.

pub mod iam;
pub mod traefik;
