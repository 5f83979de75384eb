//! The `status` command

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use warden_broker::{BrokerConfig, PermissionBroker, ScriptedRequester};

/// Arguments for the status command
#[derive(Args)]
pub struct StatusArgs {
    /// Status file to read, overriding the configuration
    #[clap(long)]
    pub store: Option<PathBuf>,

    /// Print JSON instead of a table
    #[clap(long)]
    pub json: bool,
}

/// Print the state of every registered category
pub async fn execute(args: &StatusArgs, mut config: BrokerConfig) -> Result<()> {
    if let Some(store) = &args.store {
        config.store_path = Some(store.clone());
    }

    let broker = PermissionBroker::builder()
        .config(config)
        .requester_for_all(Arc::new(ScriptedRequester::granting()))
        .build()
        .await
        .context("failed to start the permission broker")?;

    let states = broker.states();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&states)?);
        return Ok(());
    }

    for state in states {
        println!(
            "{:<6} {:<22} {}",
            state.category.code(),
            state.category.name(),
            state.status
        );
    }
    Ok(())
}
