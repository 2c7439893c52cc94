//! Rendering of batch run reports.

use anyhow::Result;
use aquactl_core::batch::{OutcomeStatus, RunMode, RunReport};
use comfy_table::Table;

use super::{json::print_json, table::print_table};

/// Print a run report: JSON by default, a table plus summary with `-v`.
pub fn print_report(report: &RunReport, verbose: bool) -> Result<()> {
    if !verbose {
        return print_json(report);
    }

    if !report.outcomes.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["item", "status", "error"]);
        for outcome in &report.outcomes {
            table.add_row(vec![
                outcome.identity.to_string(),
                status_label(outcome.status).to_string(),
                outcome.error.clone().unwrap_or_default(),
            ]);
        }
        print_table(table)?;
    }

    match report.mode {
        RunMode::Preview => {
            println!(
                "Dry run: {} of {} items would be deleted. Re-run with --apply to delete.",
                report.would_apply, report.scanned
            );
        }
        RunMode::Apply => {
            println!(
                "Deleted {} of {} items ({} failed).",
                report.applied, report.scanned, report.failed
            );
        }
    }
    Ok(())
}

fn status_label(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::WouldApply => "would delete",
        OutcomeStatus::Applied => "deleted",
        OutcomeStatus::Failed => "failed",
    }
}
