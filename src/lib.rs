// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod components;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod graph;
pub mod output;
pub mod plan;
pub mod reconcilers;
pub mod resource;
pub mod resources;
pub mod stack;
pub mod state;
pub mod types;
pub mod values;

#[cfg(test)]
pub mod test_utils;
