// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ml_infra::config::Config;
use ml_infra::plan::Plan;
use ml_infra::stack;
use ml_infra::state::State;

fn main() -> Result<()> {
    // Logs go to stderr so the plan can be piped from stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Building ML platform declarations");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: hostname={}, zone={}, bucket_acl={}",
        config.dns_hostname, config.dns_zone_id, config.bucket_acl
    );

    let (graph, stack) = stack::build(&config)?;
    let plan = Plan::preview(&graph, &State::new())?;
    let rendered = plan.render(config.plan_format)?;

    match &config.plan_output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write plan to {}", path.display()))?;
            info!("Plan written to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    info!(
        "Planned {} resources; {} will point at the ingress load balancer",
        plan.resources.len(),
        stack.dns_record.fqdn()
    );
    Ok(())
}
