//! Dry-run / apply gated batch execution of destructive actions.
//!
//! Every destructive utility funnels through [`BatchActionRunner`]: items
//! are grouped into bounded-size batches, the action runs per batch under
//! an explicit apply gate, and per-item outcomes are accumulated. A failed
//! batch marks only its own items as failed and never aborts processing of
//! subsequent batches; one bad batch must not lose results already
//! collected.

use crate::model::{ItemId, ListItem};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Default batch size, matching the platform's bulk-delete page size.
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// A destructive action failed at batch granularity.
///
/// Recorded in outcomes rather than propagated; the run continues with the
/// next batch.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ActionError {
    pub message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A destructive action applied to one batch of items.
///
/// Implementations must treat an already-absent target as success
/// (idempotent delete), so repeated runs over the same input are safe.
#[async_trait]
pub trait BatchAction {
    async fn apply_batch(&self, items: &[ListItem]) -> Result<(), ActionError>;
}

/// Whether a run previews or performs its action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Record what would happen; issue zero mutating calls. The default.
    Preview,

    /// Actually perform the action. Requires explicit opt-in.
    Apply,
}

impl RunMode {
    /// Map the conventional `--apply` CLI flag.
    pub fn from_apply_flag(apply: bool) -> Self {
        if apply { Self::Apply } else { Self::Preview }
    }

    pub fn is_apply(self) -> bool {
        matches!(self, Self::Apply)
    }
}

/// Per-item result.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub identity: ItemId,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    WouldApply,
    Applied,
    Failed,
}

/// Full result of one runner invocation: the ordered outcome sequence plus
/// aggregate counts.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub scanned: usize,
    pub would_apply: usize,
    pub applied: usize,
    pub failed: usize,
    pub outcomes: Vec<ActionOutcome>,
}

impl RunReport {
    fn from_outcomes(mode: RunMode, scanned: usize, outcomes: Vec<ActionOutcome>) -> Self {
        let mut would_apply = 0;
        let mut applied = 0;
        let mut failed = 0;
        for outcome in &outcomes {
            match outcome.status {
                OutcomeStatus::WouldApply => would_apply += 1,
                OutcomeStatus::Applied => applied += 1,
                OutcomeStatus::Failed => failed += 1,
            }
        }
        Self {
            mode,
            scanned,
            would_apply,
            applied,
            failed,
            outcomes,
        }
    }
}

/// Executes a destructive action over filtered records in bounded-size
/// batches under the dry-run/apply gate.
#[derive(Debug, Clone)]
pub struct BatchActionRunner {
    mode: RunMode,
    batch_size: usize,
}

impl BatchActionRunner {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Run the action over `items`.
    ///
    /// Outcomes are appended in the same order items were offered; the
    /// outcome count always equals the item count.
    pub async fn run<A>(&self, items: &[ListItem], action: &A) -> RunReport
    where
        A: BatchAction + Sync,
    {
        let scanned = items.len();

        if !self.mode.is_apply() {
            let outcomes = items
                .iter()
                .map(|item| ActionOutcome {
                    identity: item.identity.clone(),
                    status: OutcomeStatus::WouldApply,
                    error: None,
                })
                .collect();
            return RunReport::from_outcomes(self.mode, scanned, outcomes);
        }

        let mut outcomes = Vec::with_capacity(scanned);
        for batch in items.chunks(self.batch_size) {
            match action.apply_batch(batch).await {
                Ok(()) => {
                    debug!(batch_len = batch.len(), "batch applied");
                    outcomes.extend(batch.iter().map(|item| ActionOutcome {
                        identity: item.identity.clone(),
                        status: OutcomeStatus::Applied,
                        error: None,
                    }));
                }
                Err(err) => {
                    warn!(batch_len = batch.len(), error = %err, "batch failed");
                    outcomes.extend(batch.iter().map(|item| ActionOutcome {
                        identity: item.identity.clone(),
                        status: OutcomeStatus::Failed,
                        error: Some(err.message.clone()),
                    }));
                }
            }
        }

        RunReport::from_outcomes(self.mode, scanned, outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every batch it is offered; fails batches listed in
    /// `failing_batches` (1-based).
    struct RecordingAction {
        calls: Mutex<Vec<Vec<ItemId>>>,
        failing_batches: Vec<usize>,
    }

    impl RecordingAction {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                failing_batches: Vec::new(),
            }
        }

        fn failing(batches: &[usize]) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                failing_batches: batches.to_vec(),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl BatchAction for RecordingAction {
        async fn apply_batch(&self, items: &[ListItem]) -> Result<(), ActionError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(items.iter().map(|i| i.identity.clone()).collect());
            let batch_number = calls.len();
            drop(calls);

            if self.failing_batches.contains(&batch_number) {
                Err(ActionError::new("HTTP 500: delete failed"))
            } else {
                Ok(())
            }
        }
    }

    fn items(n: usize) -> Vec<ListItem> {
        (0..n as i64).map(ListItem::new).collect()
    }

    #[tokio::test]
    async fn preview_issues_zero_calls_and_marks_all_would_apply() {
        let action = RecordingAction::new();
        let runner = BatchActionRunner::new(RunMode::Preview);

        let report = runner.run(&items(500), &action).await;

        assert_eq!(action.call_count(), 0);
        assert_eq!(report.scanned, 500);
        assert_eq!(report.would_apply, 500);
        assert_eq!(report.applied, 0);
        assert_eq!(report.failed, 0);
        assert!(report
            .outcomes
            .iter()
            .all(|o| o.status == OutcomeStatus::WouldApply));
    }

    #[tokio::test]
    async fn apply_chunks_into_batches() {
        let action = RecordingAction::new();
        let runner = BatchActionRunner::new(RunMode::Apply).with_batch_size(2);

        let report = runner.run(&items(5), &action).await;

        assert_eq!(action.call_count(), 3);
        assert_eq!(report.applied, 5);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn failed_batch_is_isolated() {
        let action = RecordingAction::failing(&[2]);
        let runner = BatchActionRunner::new(RunMode::Apply).with_batch_size(2);

        let report = runner.run(&items(5), &action).await;

        assert_eq!(action.call_count(), 3);
        assert_eq!(report.scanned, 5);
        assert_eq!(report.applied, 3);
        assert_eq!(report.failed, 2);

        // Batches 1 (items 0,1) and 3 (item 4) applied; batch 2 (items
        // 2,3) failed with the error recorded per item.
        let statuses: Vec<_> = report.outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                OutcomeStatus::Applied,
                OutcomeStatus::Applied,
                OutcomeStatus::Failed,
                OutcomeStatus::Failed,
                OutcomeStatus::Applied,
            ]
        );
        assert!(report.outcomes[2]
            .error
            .as_deref()
            .unwrap()
            .contains("HTTP 500"));
    }

    #[tokio::test]
    async fn outcome_count_equals_offered_count() {
        for mode in [RunMode::Preview, RunMode::Apply] {
            let action = RecordingAction::failing(&[1]);
            let runner = BatchActionRunner::new(mode).with_batch_size(3);
            let report = runner.run(&items(7), &action).await;
            assert_eq!(report.outcomes.len(), 7);
        }
    }

    #[tokio::test]
    async fn outcomes_preserve_offered_order() {
        let action = RecordingAction::new();
        let runner = BatchActionRunner::new(RunMode::Apply).with_batch_size(3);

        let input = items(7);
        let report = runner.run(&input, &action).await;

        let offered: Vec<_> = input.iter().map(|i| i.identity.clone()).collect();
        let recorded: Vec<_> = report.outcomes.iter().map(|o| o.identity.clone()).collect();
        assert_eq!(offered, recorded);
    }

    /// Action simulating targets already deleted by a prior run: the
    /// platform answers 404, which implementations map to success.
    struct IdempotentDelete;

    #[async_trait]
    impl BatchAction for IdempotentDelete {
        async fn apply_batch(&self, _items: &[ListItem]) -> Result<(), ActionError> {
            // 404 from the platform: target absent, treated as success.
            Ok(())
        }
    }

    #[tokio::test]
    async fn rerun_over_deleted_targets_is_all_applied() {
        let runner = BatchActionRunner::new(RunMode::Apply).with_batch_size(2);
        let report = runner.run(&items(5), &IdempotentDelete).await;
        assert_eq!(report.applied, 5);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn mode_from_apply_flag() {
        assert_eq!(RunMode::from_apply_flag(false), RunMode::Preview);
        assert_eq!(RunMode::from_apply_flag(true), RunMode::Apply);
    }
}
