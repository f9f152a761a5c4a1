//! Execution statistics for the action queue.
//!
//! `StatsRecorder` is updated by the drain loop; callers read
//! point-in-time copies through [`QueueStats`].

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::ActionInfo;

/// Result of one action execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Action body completed
    Success,
    /// Action body returned an error message
    Failed(String),
}

/// Snapshot of queue activity since creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStats {
    /// Actions accepted by `enqueue`/`register`
    pub enqueued: u64,
    /// Actions whose body ran to completion
    pub executed: u64,
    /// Actions dropped by reduction before they ran
    pub coalesced: u64,
    /// Actions whose body returned an error
    pub failed: u64,
    /// Completed drain passes (including ones stopped by a failure)
    pub drains: u64,
    /// Most recently executed action
    pub last_action: Option<ActionInfo>,
    /// Duration of the most recent action in milliseconds
    pub last_duration_ms: Option<u64>,
    /// Outcome of the most recent action
    pub last_outcome: Option<ActionOutcome>,
    /// When the most recent drain pass finished
    pub last_drain_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    stats: RwLock<QueueStats>,
}

impl StatsRecorder {
    pub(crate) fn record_enqueued(&self) {
        self.write(|stats| stats.enqueued += 1);
    }

    pub(crate) fn record_coalesced(&self, dropped: usize) {
        self.write(|stats| stats.coalesced += dropped as u64);
    }

    pub(crate) fn record_outcome(&self, info: &ActionInfo, outcome: ActionOutcome, elapsed: Duration) {
        self.write(|stats| {
            match outcome {
                ActionOutcome::Success => stats.executed += 1,
                ActionOutcome::Failed(_) => stats.failed += 1,
            }
            stats.last_action = Some(info.clone());
            stats.last_duration_ms = Some(elapsed.as_millis() as u64);
            stats.last_outcome = Some(outcome);
        });
    }

    pub(crate) fn record_drain_finished(&self) {
        self.write(|stats| {
            stats.drains += 1;
            stats.last_drain_at = Some(Utc::now());
        });
    }

    pub(crate) fn snapshot(&self) -> QueueStats {
        self.stats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write(&self, update: impl FnOnce(&mut QueueStats)) {
        let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
        update(&mut stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, ActionTrigger};

    fn info(id: u64) -> ActionInfo {
        ActionInfo {
            id,
            kind: ActionKind::Update,
            trigger: ActionTrigger::DidChange,
            uri: None,
            comment: None,
        }
    }

    #[test]
    fn test_record_success_and_failure() {
        let recorder = StatsRecorder::default();
        recorder.record_enqueued();
        recorder.record_enqueued();
        recorder.record_outcome(&info(1), ActionOutcome::Success, Duration::from_millis(15));
        recorder.record_outcome(
            &info(2),
            ActionOutcome::Failed("timeout".into()),
            Duration::from_millis(40),
        );

        let stats = recorder.snapshot();
        assert_eq!(stats.enqueued, 2);
        assert_eq!(stats.executed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.last_action.map(|a| a.id), Some(2));
        assert_eq!(stats.last_duration_ms, Some(40));
        assert_eq!(stats.last_outcome, Some(ActionOutcome::Failed("timeout".into())));
    }

    #[test]
    fn test_record_drain() {
        let recorder = StatsRecorder::default();
        assert!(recorder.snapshot().last_drain_at.is_none());

        recorder.record_coalesced(3);
        recorder.record_drain_finished();

        let stats = recorder.snapshot();
        assert_eq!(stats.coalesced, 3);
        assert_eq!(stats.drains, 1);
        assert!(stats.last_drain_at.is_some());
    }
}
