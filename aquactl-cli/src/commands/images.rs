//! Image cleanup: paginate, filter, batch delete under the apply gate.

use anyhow::Result;
use aquactl_client::{ImageDeleter, ImageInventory};
use aquactl_core::batch::{BatchActionRunner, RunMode};
use aquactl_core::csvio;
use aquactl_core::paginate::drain_pages;
use aquactl_core::{AquactlError, Filter, FilterPipeline, ListItem};
use tracing::{debug, info};

use crate::cli::{CleanupArgs, Cli, ImagesCommands};
use crate::context;
use crate::output::report::print_report;

pub async fn run(cli: &Cli, command: &ImagesCommands) -> Result<()> {
    match command {
        ImagesCommands::Cleanup(args) => cleanup(cli, args).await,
    }
}

async fn cleanup(cli: &Cli, args: &CleanupArgs) -> Result<()> {
    let client = context::connect(cli.profile.as_deref()).await?;

    let targets = match &args.file {
        Some(path) => {
            let import = csvio::read_image_rows(path).map_err(AquactlError::Csv)?;
            if import.skipped > 0 {
                info!(skipped = import.skipped, "skipped malformed CSV rows");
            }
            import.items
        }
        None => fetch_targets(cli, args, &client).await?,
    };

    let mode = RunMode::from_apply_flag(args.apply);
    let deleter = ImageDeleter::new(&client);
    let runner = BatchActionRunner::new(mode).with_batch_size(args.batch_size);
    let report = runner.run(&targets, &deleter).await;

    print_report(&report, cli.verbose)
}

/// Drain the inventory with server-side filters, then re-check locally.
///
/// The server narrows the listing, but age and workload state are
/// re-verified here so a lagging index cannot slip a live image into the
/// delete set.
async fn fetch_targets(
    cli: &Cli,
    args: &CleanupArgs,
    client: &aquactl_client::ApiClient,
) -> Result<Vec<ListItem>> {
    let inventory = ImageInventory::new(client)
        .older_than_days(args.days)
        .registry(args.registry.clone())
        .scope(args.scope.clone())
        .without_workloads();

    let verbose = cli.verbose;
    let items = drain_pages(&inventory, 100, |count| {
        if verbose {
            eprintln!("fetched {} images...", count);
        }
    })
    .await?;

    let mut pipeline = FilterPipeline::new()
        .with(Filter::older_than_days(args.days))
        .with(Filter::without_workloads());
    if let Some(registry) = &args.registry {
        pipeline.push(Filter::registry(registry));
    }

    let mut targets = Vec::new();
    for item in items {
        match pipeline.explain(&item) {
            None => targets.push(item),
            Some(reason) => {
                debug!(item = %item.display_name(), reason, "excluded");
            }
        }
    }
    Ok(targets)
}
