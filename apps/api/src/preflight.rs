//! Pre-deployment verification: `navigator-api preflight`.
//!
//! Runs every capability probe and forces every deferred loader once,
//! printing pass/fail per subsystem. Exits nonzero if any critical
//! subsystem fails. LLM providers are optional (the chain degrades), so an
//! empty provider list is reported but never fatal.

use std::process::ExitCode;

use anyhow::Result;
use tracing::{error, info};

use crate::config::Config;
use crate::routes::health::collect_components;
use crate::state::AppState;

pub async fn run(config: Config) -> Result<ExitCode> {
    info!("==== startup verification ====");

    let state = AppState::from_config(config)?;

    let providers = state.chain.configured_providers();
    if providers.is_empty() {
        info!("providers configured: none (chain will return degraded replies)");
    } else {
        info!("providers configured: {}", providers.join(", "));
    }

    let components = collect_components(&state).await;
    let mut all_passed = true;
    for component in &components {
        if component.is_ok() {
            println!("PASS  {}", component.name);
        } else {
            all_passed = false;
            println!("FAIL  {}: {}", component.name, component.summary());
        }
    }

    if all_passed {
        info!("all checks passed, ready to deploy");
        Ok(ExitCode::SUCCESS)
    } else {
        error!("some checks failed, fix issues before deploying");
        Ok(ExitCode::FAILURE)
    }
}
