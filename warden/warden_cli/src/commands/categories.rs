//! The `categories` command

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use warden_broker::BrokerConfig;
use warden_core::{Category, CategoryFamily, ConfigurationKind};

/// Arguments for the categories command
#[derive(Args)]
pub struct CategoriesArgs {
    /// Print JSON instead of a table
    #[clap(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct CategoryRow {
    code: u32,
    name: &'static str,
    display_name: &'static str,
    family: CategoryFamily,
    allows_repeated_prompting: bool,
    requires_preconfiguration: bool,
    supports_silent_query: bool,
    configuration: Option<ConfigurationKind>,
}

impl From<Category> for CategoryRow {
    fn from(category: Category) -> Self {
        let info = category.info();
        Self {
            code: category.code(),
            name: category.name(),
            display_name: info.display_name,
            family: info.family,
            allows_repeated_prompting: info.allows_repeated_prompting,
            requires_preconfiguration: info.requires_preconfiguration,
            supports_silent_query: info.supports_silent_query,
            configuration: info.configuration,
        }
    }
}

/// List the registered categories
pub fn execute(args: &CategoriesArgs, config: &BrokerConfig) -> Result<()> {
    let rows: Vec<CategoryRow> = config.registry().iter().map(CategoryRow::from).collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{:<6} {:<22} {:<15} FLAGS", "CODE", "NAME", "FAMILY");
    for row in rows {
        let mut flags = Vec::new();
        if row.allows_repeated_prompting {
            flags.push("repeat");
        }
        if row.requires_preconfiguration {
            flags.push("needs-config");
        } else if row.configuration.is_some() {
            flags.push("config");
        }
        if !row.supports_silent_query {
            flags.push("no-silent-query");
        }

        println!(
            "{:<6} {:<22} {:<15} {}",
            row.code,
            row.name,
            row.family.as_str(),
            flags.join(",")
        );
    }
    Ok(())
}
