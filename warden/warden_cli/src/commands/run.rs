//! The `run` command
//!
//! Runs a coordinator sequence against the scripted platform and prints every
//! event published on the bus.

use super::ArgumentError;
use anyhow::{Context, Result};
use clap::Args;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use warden_broker::{
    BrokerConfig, BrokerEvent, PermissionBroker, RequestOutcome, ScriptedOutcome,
    ScriptedRequester, SequenceReport,
};
use warden_core::{Category, Preconfiguration, Status};

/// Arguments for the run command
#[derive(Args)]
pub struct RunArgs {
    /// Categories to request, in order (codes or names)
    pub categories: Vec<String>,

    /// Simulated platform answer, as <category>=<outcome>
    /// (granted, denied, restricted, unavailable, error or hang)
    #[clap(long = "outcome", value_parser = parse_outcome)]
    pub outcomes: Vec<(Category, ScriptedOutcome)>,

    /// Account option for a category, as <category>:<key>=<value>
    #[clap(long = "account-option", value_parser = parse_account_option)]
    pub account_options: Vec<(Category, String, String)>,

    /// Status file to use, overriding the configuration
    #[clap(long)]
    pub store: Option<PathBuf>,

    /// Platform timeout in milliseconds, overriding the configuration
    #[clap(long)]
    pub timeout_ms: Option<u64>,

    /// Print events as JSON lines
    #[clap(long)]
    pub json: bool,
}

fn parse_outcome(value: &str) -> Result<(Category, ScriptedOutcome), ArgumentError> {
    let (category, outcome) = value
        .split_once('=')
        .ok_or_else(|| ArgumentError::MalformedOutcome(value.to_string()))?;
    let category = Category::from_str(category)?;

    let outcome = match outcome.trim().to_lowercase().as_str() {
        "hang" => ScriptedOutcome::Hang,
        other => RequestOutcome::from_str(other)
            .map_err(|_| ArgumentError::UnknownOutcome(other.to_string()))?
            .into(),
    };
    Ok((category, outcome))
}

fn parse_account_option(value: &str) -> Result<(Category, String, String), ArgumentError> {
    let malformed = || ArgumentError::MalformedOption(value.to_string());
    let (category, option) = value.split_once(':').ok_or_else(malformed)?;
    let (key, val) = option.split_once('=').ok_or_else(malformed)?;
    if key.is_empty() {
        return Err(malformed());
    }
    Ok((Category::from_str(category)?, key.to_string(), val.to_string()))
}

/// Run a coordinator sequence
pub async fn execute(args: &RunArgs, mut config: BrokerConfig) -> Result<()> {
    if let Some(store) = &args.store {
        config.store_path = Some(store.clone());
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.platform_timeout_ms = timeout_ms;
    }
    config.validate()?;

    let categories = args
        .categories
        .iter()
        .map(|c| Category::from_str(c))
        .collect::<Result<Vec<_>, _>>()?;

    let requester = ScriptedRequester::granting();
    for (category, outcome) in &args.outcomes {
        requester.set_outcome(*category, outcome.clone());
    }

    let broker = PermissionBroker::builder()
        .config(config)
        .requester_for_all(Arc::new(requester))
        .build()
        .await
        .context("failed to start the permission broker")?;

    let mut options: BTreeMap<Category, Vec<(String, String)>> = BTreeMap::new();
    for (category, key, value) in &args.account_options {
        options
            .entry(*category)
            .or_default()
            .push((key.clone(), value.clone()));
    }
    for (category, pairs) in options {
        broker.configure(category, Preconfiguration::account_options(pairs))?;
    }

    // Validate before anything is printed.
    let session = broker.coordinator().begin(categories)?;
    debug!(session = %session.id(), "starting sequence");

    let json = args.json;
    let total = session.categories().len();
    broker.subscribe(move |event| {
        if json {
            println!("{}", serde_json::to_string(event)?);
        } else {
            print_event(event, total);
        }
        Ok(())
    });

    let report = session.run().await;
    if !json {
        print_summary(&report);
    }
    Ok(())
}

fn print_event(event: &BrokerEvent, total: usize) {
    match event {
        BrokerEvent::StepStarted {
            index, category, ..
        } => {
            println!("[{}/{}] requesting {}", index + 1, total, category);
        }
        BrokerEvent::Transitioned(transition) => match &transition.diagnostic {
            Some(diagnostic) => println!(
                "      {}: {} -> {} ({})",
                transition.category, transition.previous, transition.current, diagnostic
            ),
            None => println!(
                "      {}: {} -> {}",
                transition.category, transition.previous, transition.current
            ),
        },
        BrokerEvent::StepCompleted { resolution, .. } => {
            println!("      {} is {}", resolution.category, resolution.status);
        }
        BrokerEvent::SequenceFinished(report) => {
            println!("sequence {:?} after {} step(s)", report.outcome, report.steps.len());
        }
    }
}

fn print_summary(report: &SequenceReport) {
    let authorized = report
        .steps
        .iter()
        .filter(|r| r.status == Status::Authorized)
        .count();
    println!();
    println!("{} of {} authorized", authorized, report.steps.len());
    for resolution in &report.steps {
        let name = resolution.category.name();
        match resolution.clone().into_result() {
            Ok(state) => println!("  {:<22} {}", name, state.status),
            Err(e) => println!("  {:<22} {} ({})", name, resolution.status, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_outcome() {
        assert_eq!(
            parse_outcome("microphone=denied").unwrap(),
            (Category::Microphone, ScriptedOutcome::Respond(RequestOutcome::Denied))
        );
        assert_eq!(
            parse_outcome("3200=HANG").unwrap(),
            (Category::LocationWhenInUse, ScriptedOutcome::Hang)
        );
        assert!(matches!(
            parse_outcome("microphone"),
            Err(ArgumentError::MalformedOutcome(_))
        ));
        assert!(matches!(
            parse_outcome("microphone=maybe"),
            Err(ArgumentError::UnknownOutcome(_))
        ));
        assert!(matches!(
            parse_outcome("teleport=granted"),
            Err(ArgumentError::Category(_))
        ));
    }

    #[test]
    fn test_parse_account_option() {
        assert_eq!(
            parse_account_option("social-facebook:app_id=42").unwrap(),
            (Category::SocialFacebook, "app_id".to_string(), "42".to_string())
        );
        assert!(parse_account_option("social-facebook:=42").is_err());
        assert!(parse_account_option("social-facebook").is_err());
    }
}
