//! Cloud VM inventory listing and statistics.

use anyhow::{Context, Result, bail};
use aquactl_client::vms::{self, VmInventory};
use aquactl_core::paginate::drain_pages;
use aquactl_core::{Filter, FilterPipeline, ListItem};
use comfy_table::Table;
use serde::Serialize;
use serde_json::{Value, json};
use std::path::Path;
use tracing::debug;

use crate::cli::{Cli, VmListArgs, VmsCommands};
use crate::context;
use crate::output::{json::print_json, table::print_table};

pub async fn run(cli: &Cli, command: &VmsCommands) -> Result<()> {
    match command {
        VmsCommands::List(args) => list(cli, args).await,
        VmsCommands::Count { scope } => count(cli, scope.clone()).await,
    }
}

/// One line of `vms list` output; string fields mirror the listing table.
#[derive(Serialize)]
struct VmRow {
    name: String,
    cloud_provider: String,
    region: String,
    os: String,
    highest_risk: String,
    covered_by: String,
    compliant: String,
}

async fn list(cli: &Cli, args: &VmListArgs) -> Result<()> {
    // Validate the risk label before touching the network.
    let max_risk = match &args.max_risk {
        Some(level) => match vms::risk_ordinal(level) {
            Some(ordinal) => Some(ordinal),
            None => bail!(
                "unknown risk level '{}'; expected one of: {}",
                level,
                vms::RISK_LEVELS.join(", ")
            ),
        },
        None => None,
    };

    let client = context::connect(cli.profile.as_deref()).await?;
    let inventory = VmInventory::new(&client).scope(args.scope.clone());

    let verbose = cli.verbose;
    let fetched = drain_pages(&inventory, 100, |count| {
        if verbose {
            eprintln!("fetched {} VMs...", count);
        }
    })
    .await?;

    let mut pipeline = FilterPipeline::new();
    if args.no_enforcer {
        pipeline.push(Filter::lacks_coverage());
    }
    if let Some(cloud) = &args.cloud {
        pipeline.push(Filter::attr_equals("cloud_provider", json!(cloud)));
    }
    if let Some(region) = &args.region {
        pipeline.push(Filter::attr_equals("region", json!(region)));
    }
    if let Some(ordinal) = max_risk {
        pipeline.push(Filter::max_risk(ordinal));
    }

    let mut selected = Vec::new();
    for vm in fetched {
        match pipeline.explain(&vm) {
            None => selected.push(vm),
            Some(reason) => {
                debug!(vm = %vm.display_name(), reason, "excluded");
            }
        }
    }

    let rows: Vec<VmRow> = selected.iter().map(row).collect();

    if let Some(path) = &args.csv {
        write_csv(&rows, path)
            .with_context(|| format!("writing VM listing to {}", path.display()))?;
        if cli.verbose {
            println!("{} VMs written to {}.", rows.len(), path.display());
        }
        return Ok(());
    }

    if !cli.verbose {
        return print_json(&rows);
    }

    let mut table = Table::new();
    table.set_header(vec![
        "name", "cloud", "region", "os", "risk", "coverage", "compliant",
    ]);
    for row in &rows {
        table.add_row(vec![
            row.name.clone(),
            row.cloud_provider.clone(),
            row.region.clone(),
            row.os.clone(),
            row.highest_risk.clone(),
            row.covered_by.clone(),
            row.compliant.clone(),
        ]);
    }
    print_table(table)?;
    println!("{} VMs.", rows.len());
    Ok(())
}

async fn count(cli: &Cli, scope: Option<String>) -> Result<()> {
    let client = context::connect(cli.profile.as_deref()).await?;
    let stats = vms::vm_stats(&client, scope).await?;

    if !cli.verbose {
        return print_json(&stats);
    }

    let mut table = Table::new();
    table.set_header(vec!["metric", "count"]);
    table.add_row(vec!["total VMs".to_string(), stats.total_vms.to_string()]);
    table.add_row(vec![
        "with enforcer".to_string(),
        stats.vms_with_enforcer.to_string(),
    ]);
    table.add_row(vec![
        "without enforcer".to_string(),
        stats.vms_without_enforcer.to_string(),
    ]);
    for (cloud, n) in &stats.cloud_provider_breakdown {
        table.add_row(vec![format!("cloud: {}", cloud), n.to_string()]);
    }
    for (risk, n) in &stats.risk_level_breakdown {
        table.add_row(vec![format!("risk: {}", risk), n.to_string()]);
    }
    for (coverage, n) in &stats.coverage_breakdown {
        table.add_row(vec![format!("coverage: {}", coverage), n.to_string()]);
    }
    print_table(table)
}

fn row(vm: &ListItem) -> VmRow {
    let covered_by = vm
        .attr("covered_by")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(";")
        })
        .unwrap_or_default();

    VmRow {
        name: vm
            .attr_str("name")
            .map(str::to_string)
            .unwrap_or_else(|| vm.identity.to_string()),
        cloud_provider: text_attr(vm, "cloud_provider"),
        region: text_attr(vm, "region"),
        os: text_attr(vm, "os"),
        highest_risk: text_attr(vm, "highest_risk"),
        covered_by,
        compliant: vm
            .attr_bool("compliant")
            .map(|c| if c { "yes" } else { "no" }.to_string())
            .unwrap_or_default(),
    }
}

fn text_attr(vm: &ListItem, key: &str) -> String {
    vm.attr_str(key).unwrap_or("").to_string()
}

fn write_csv(rows: &[VmRow], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "name",
        "cloud_provider",
        "region",
        "os",
        "highest_risk",
        "covered_by",
        "compliant",
    ])?;
    for row in rows {
        writer.write_record([
            row.name.as_str(),
            row.cloud_provider.as_str(),
            row.region.as_str(),
            row.os.as_str(),
            row.highest_risk.as_str(),
            row.covered_by.as_str(),
            row.compliant.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
