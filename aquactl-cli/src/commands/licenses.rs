//! License utilization breakdown.

use anyhow::{Context, Result};
use aquactl_client::licenses::{self, ScopeBreakdownRow};
use comfy_table::Table;
use std::path::Path;

use crate::cli::{Cli, LicensesCommands};
use crate::context;
use crate::output::{json::print_json, table::print_table};

pub async fn run(cli: &Cli, command: &LicensesCommands) -> Result<()> {
    match command {
        LicensesCommands::Show => show(cli).await,
        LicensesCommands::Breakdown { output } => breakdown(cli, output.as_deref()).await,
    }
}

async fn show(cli: &Cli) -> Result<()> {
    let client = context::connect(cli.profile.as_deref()).await?;
    let document = licenses::get_licenses(&client).await?;
    print_json(&document)
}

async fn breakdown(cli: &Cli, output: Option<&Path>) -> Result<()> {
    let client = context::connect(cli.profile.as_deref()).await?;
    let rows = licenses::license_breakdown(&client).await?;

    if let Some(path) = output {
        write_csv(&rows, path)
            .with_context(|| format!("writing breakdown to {}", path.display()))?;
        if cli.verbose {
            println!("Breakdown written to {}.", path.display());
        }
        return Ok(());
    }

    if !cli.verbose {
        return print_json(&rows);
    }

    let mut table = Table::new();
    table.set_header(vec![
        "scope", "images", "code", "agents", "kube", "host", "micro", "nano", "pod",
    ]);
    for row in &rows {
        table.add_row(vec![
            row.scope.clone(),
            row.repos.to_string(),
            row.code_repos.map(|c| c.to_string()).unwrap_or_default(),
            row.enforcers.agent.to_string(),
            row.enforcers.kube_enforcer.to_string(),
            row.enforcers.host_enforcer.to_string(),
            row.enforcers.micro_enforcer.to_string(),
            row.enforcers.nano_enforcer.to_string(),
            row.enforcers.pod_enforcer.to_string(),
        ]);
    }
    print_table(table)
}

fn write_csv(rows: &[ScopeBreakdownRow], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "scope", "images", "code", "agents", "kube", "host", "micro", "nano", "pod",
    ])?;
    for row in rows {
        writer.write_record([
            row.scope.clone(),
            row.repos.to_string(),
            row.code_repos.unwrap_or(0).to_string(),
            row.enforcers.agent.to_string(),
            row.enforcers.kube_enforcer.to_string(),
            row.enforcers.host_enforcer.to_string(),
            row.enforcers.micro_enforcer.to_string(),
            row.enforcers.nano_enforcer.to_string(),
            row.enforcers.pod_enforcer.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
