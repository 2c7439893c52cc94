//! Repository deletion.

use anyhow::Result;
use aquactl_client::{RepoDeleter, RepositoryList};
use aquactl_core::batch::{BatchActionRunner, RunMode};
use aquactl_core::paginate::drain_pages;
use aquactl_core::{Filter, FilterPipeline};
use serde_json::json;

use crate::cli::{Cli, RepoDeleteArgs, ReposCommands};
use crate::context;
use crate::output::report::print_report;

pub async fn run(cli: &Cli, command: &ReposCommands) -> Result<()> {
    match command {
        ReposCommands::Delete(args) => delete(cli, args).await,
    }
}

async fn delete(cli: &Cli, args: &RepoDeleteArgs) -> Result<()> {
    let client = context::connect(cli.profile.as_deref()).await?;

    let listing = RepositoryList::new(&client).registry(args.registry.clone());
    let verbose = cli.verbose;
    let repos = drain_pages(&listing, 100, |count| {
        if verbose {
            eprintln!("fetched {} repositories...", count);
        }
    })
    .await?;

    let mut pipeline = FilterPipeline::new();
    if args.empty_only {
        pipeline.push(Filter::attr_equals("num_images", json!(0)));
    }
    let targets = pipeline.apply(repos);

    // The repositories endpoint deletes one repository per call; batch
    // size 1 keeps failure granularity per item.
    let mode = RunMode::from_apply_flag(args.apply);
    let deleter = RepoDeleter::new(&client);
    let runner = BatchActionRunner::new(mode).with_batch_size(1);
    let report = runner.run(&targets, &deleter).await;

    print_report(&report, cli.verbose)
}
