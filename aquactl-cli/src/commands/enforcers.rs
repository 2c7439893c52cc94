//! Enforcer fleet counts.

use anyhow::Result;
use aquactl_client::enforcers;
use comfy_table::Table;

use crate::cli::{Cli, EnforcersCommands};
use crate::context;
use crate::output::{json::print_json, table::print_table};

pub async fn run(cli: &Cli, command: &EnforcersCommands) -> Result<()> {
    match command {
        EnforcersCommands::Count => count(cli).await,
    }
}

async fn count(cli: &Cli) -> Result<()> {
    let client = context::connect(cli.profile.as_deref()).await?;
    let breakdown = enforcers::enforcer_breakdown(&client, None).await?;

    if !cli.verbose {
        return print_json(&breakdown);
    }

    let mut table = Table::new();
    table.set_header(vec!["type", "connected"]);
    table.add_row(vec!["agent".to_string(), breakdown.agent.to_string()]);
    table.add_row(vec!["kube_enforcer".to_string(), breakdown.kube_enforcer.to_string()]);
    table.add_row(vec!["host_enforcer".to_string(), breakdown.host_enforcer.to_string()]);
    table.add_row(vec!["micro_enforcer".to_string(), breakdown.micro_enforcer.to_string()]);
    table.add_row(vec!["nano_enforcer".to_string(), breakdown.nano_enforcer.to_string()]);
    table.add_row(vec!["pod_enforcer".to_string(), breakdown.pod_enforcer.to_string()]);
    print_table(table)?;
    println!("Total connected: {}", breakdown.total());
    Ok(())
}
