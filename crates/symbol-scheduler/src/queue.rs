//! Single-consumer action queue with type-aware coalescing.
//!
//! The queue owns the pending actions, the busy flag and the previously
//! executed action behind one mutex, so deciding whether a drain has to
//! start is a single step. The drain loop reduces the queue, pops the
//! front and awaits it, until the queue is empty. Actions registered
//! while an action is running join the same drain pass.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::broadcast;
use tracing::{debug, error, info, trace};

use crate::action::{Action, ActionInfo, ActionKind};
use crate::config::QueueConfig;
use crate::error::SchedulerError;
use crate::stats::{ActionOutcome, QueueStats, StatsRecorder};

/// Lifecycle notifications published by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// A drain pass is starting
    WillProcess,
    /// The given action was popped and is about to run
    WillExecuteAction(ActionInfo),
    /// The drain pass ended, successfully or not. Always precedes the
    /// next `WillProcess`.
    DidProcess,
}

#[derive(Debug, Default)]
struct QueueState {
    actions: VecDeque<Action>,
    previous: Option<ActionInfo>,
    last_id: u64,
    busy: bool,
}

impl QueueState {
    fn enqueue(&mut self, mut action: Action) -> u64 {
        self.last_id += 1;
        action.assign_id(self.last_id);
        self.actions.push_back(action);
        self.last_id
    }

    /// Rewrite the pending list, returning how many actions were dropped.
    ///
    /// Order is fixed: rebuilds, then updates, then removals.
    fn reduce(&mut self) -> usize {
        let before = self.actions.len();
        self.reduce_rebuilds();
        self.reduce_by_path(ActionKind::Update);
        self.reduce_by_path(ActionKind::Remove);
        before - self.actions.len()
    }

    fn reduce_rebuilds(&mut self) {
        if matches!(&self.previous, Some(prev) if prev.kind == ActionKind::Rebuild) {
            self.actions.clear();
            return;
        }

        let latest = self
            .actions
            .iter()
            .enumerate()
            .filter(|(_, action)| action.kind() == ActionKind::Rebuild)
            .max_by_key(|(_, action)| action.id())
            .map(|(index, _)| index);

        if let Some(index) = latest {
            if let Some(rebuild) = self.actions.remove(index) {
                self.actions.clear();
                self.actions.push_back(rebuild);
            }
        }
    }

    /// Keep only the newest action of `kind` per path. Actions without a
    /// path are never grouped.
    fn reduce_by_path(&mut self, kind: ActionKind) {
        let mut newest: HashMap<PathBuf, u64> = HashMap::new();
        for action in self.actions.iter().filter(|a| a.kind() == kind) {
            if let Some(uri) = action.uri() {
                let id = newest.entry(uri.to_path_buf()).or_insert(action.id());
                if action.id() > *id {
                    *id = action.id();
                }
            }
        }

        self.actions.retain(|action| {
            if action.kind() != kind {
                return true;
            }
            match action.uri() {
                Some(uri) => newest.get(uri) == Some(&action.id()),
                None => true,
            }
        });
    }
}

/// Coalescing single-consumer action queue.
///
/// Share it behind an `Arc`; all methods take `&self`.
pub struct ActionQueue {
    state: Mutex<QueueState>,
    events: broadcast::Sender<QueueEvent>,
    stats: StatsRecorder,
}

impl ActionQueue {
    /// Create an empty, idle queue.
    pub fn new(config: QueueConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            state: Mutex::new(QueueState::default()),
            events,
            stats: StatsRecorder::default(),
        }
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Assign the next id and append the action. Does not start a drain.
    pub fn enqueue(&self, action: Action) -> u64 {
        let id = self.state().enqueue(action);
        self.stats.record_enqueued();
        trace!(action_id = id, "Enqueued action");
        id
    }

    /// Enqueue the action and drain the queue unless a drain is already
    /// in flight, in which case the running drain picks it up.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::ActionFailed` if an action run by this
    /// call's drain pass fails.
    pub async fn register(&self, action: Action) -> Result<(), SchedulerError> {
        let (id, start) = {
            let mut state = self.state();
            let id = state.enqueue(action);
            let start = !state.busy;
            state.busy = true;
            (id, start)
        };
        self.stats.record_enqueued();

        if start {
            debug!(action_id = id, "Registered action, starting drain");
            self.drain().await
        } else {
            debug!(action_id = id, "Registered action, drain already in progress");
            Ok(())
        }
    }

    /// Drain the queue if no drain is in flight.
    pub async fn process(&self) -> Result<(), SchedulerError> {
        {
            let mut state = self.state();
            if state.busy {
                return Ok(());
            }
            state.busy = true;
        }
        self.drain().await
    }

    /// Run the reduction pass on the pending actions now.
    ///
    /// Returns the number of actions dropped.
    pub fn reduce(&self) -> usize {
        let dropped = self.state().reduce();
        if dropped > 0 {
            self.stats.record_coalesced(dropped);
        }
        dropped
    }

    /// Snapshots of the pending actions, front first.
    pub fn pending(&self) -> Vec<ActionInfo> {
        self.state().actions.iter().map(Action::info).collect()
    }

    /// Number of pending actions.
    pub fn len(&self) -> usize {
        self.state().actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a drain pass is in flight.
    pub fn is_busy(&self) -> bool {
        self.state().busy
    }

    /// The action currently (or most recently, within this drain) executed.
    pub fn previous_action(&self) -> Option<ActionInfo> {
        self.state().previous.clone()
    }

    /// Point-in-time execution statistics.
    pub fn stats(&self) -> QueueStats {
        self.stats.snapshot()
    }

    async fn drain(&self) -> Result<(), SchedulerError> {
        let mut guard = DrainGuard {
            queue: self,
            started: Instant::now(),
            completed: false,
        };

        self.emit(QueueEvent::WillProcess);
        info!("Processing action queue");

        loop {
            let action = {
                let mut state = self.state();
                let dropped = state.reduce();
                if dropped > 0 {
                    self.stats.record_coalesced(dropped);
                    debug!(dropped = dropped, remaining = state.actions.len(), "Coalesced queued actions");
                }

                match state.actions.pop_front() {
                    Some(action) => {
                        state.previous = Some(action.info());
                        action
                    }
                    None => {
                        // Cleared under the same lock a registering caller
                        // checks, so no action can be stranded and the next
                        // drain's WillProcess follows this DidProcess.
                        guard.release(&mut state);
                        break;
                    }
                }
            };

            let info = action.info();
            self.emit(QueueEvent::WillExecuteAction(info.clone()));
            debug!(
                action_id = info.id,
                kind = %info.kind,
                trigger = %info.trigger,
                uri = ?info.uri,
                "Executing action"
            );

            let start = Instant::now();
            let result = action.execute().await;
            let elapsed = start.elapsed();

            if let Err(e) = result {
                let message = format!("{e:#}");
                error!(action_id = info.id, kind = %info.kind, error = %message, "Action failed");
                self.stats
                    .record_outcome(&info, ActionOutcome::Failed(message.clone()), elapsed);
                return Err(SchedulerError::ActionFailed {
                    id: info.id,
                    kind: info.kind,
                    message,
                });
            }

            self.stats.record_outcome(&info, ActionOutcome::Success, elapsed);
        }

        Ok(())
    }

    fn emit(&self, event: QueueEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ActionQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

/// Ends a drain pass on every exit path, including errors and panics
/// inside an action body.
struct DrainGuard<'a> {
    queue: &'a ActionQueue,
    started: Instant,
    completed: bool,
}

impl DrainGuard<'_> {
    /// Emit `DidProcess` and drop the busy flag under the state lock.
    fn release(&mut self, state: &mut QueueState) {
        self.queue.emit(QueueEvent::DidProcess);
        state.busy = false;
        state.previous = None;
        self.completed = true;
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        let completed = self.completed;
        if !completed {
            // The drain loop still owns the busy flag here.
            let queue = self.queue;
            let mut state = queue.state();
            self.release(&mut state);
        }

        self.queue.stats.record_drain_finished();
        info!(
            duration_ms = self.started.elapsed().as_millis() as u64,
            completed = completed,
            "Action queue drained"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionTrigger;
    use std::path::Path;
    use std::sync::Arc;
    use tokio::sync::oneshot;

    fn noop_rebuild() -> Action {
        Action::rebuild(ActionTrigger::Search, || async { Ok(()) })
    }

    fn noop_update(path: &str) -> Action {
        Action::update(ActionTrigger::DidChange, path, || async { Ok(()) })
    }

    fn noop_remove(path: &str) -> Action {
        Action::remove(ActionTrigger::DidDelete, path, || async { Ok(()) })
    }

    fn recording(kind: ActionKind, path: Option<&str>, log: &Arc<Mutex<Vec<String>>>, tag: &str) -> Action {
        let log = log.clone();
        let tag = tag.to_string();
        let action = Action::new(kind, ActionTrigger::DidChange, move || async move {
            log.lock().unwrap().push(tag);
            Ok(())
        });
        match path {
            Some(path) => action.with_uri(path),
            None => action,
        }
    }

    fn kinds(queue: &ActionQueue) -> Vec<ActionKind> {
        queue.pending().iter().map(|a| a.kind).collect()
    }

    fn drain_events(rx: &mut broadcast::Receiver<QueueEvent>) -> Vec<QueueEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_enqueue_assigns_monotonic_ids() {
        let queue = ActionQueue::default();
        let a = queue.enqueue(noop_update("/ws/a.ts"));
        let b = queue.enqueue(noop_rebuild());
        let c = queue.enqueue(noop_remove("/ws/a.ts"));

        assert!(a < b && b < c);
        assert_eq!(queue.len(), 3);
        assert!(!queue.is_busy());
        assert_eq!(queue.stats().enqueued, 3);
    }

    #[test]
    fn test_many_rebuilds_collapse_to_last() {
        let queue = ActionQueue::default();
        let mut last = 0;
        for _ in 0..5 {
            last = queue.enqueue(noop_rebuild());
        }

        assert_eq!(queue.reduce(), 4);
        let pending = queue.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, last);
        assert_eq!(pending[0].kind, ActionKind::Rebuild);
    }

    #[test]
    fn test_updates_coalesce_per_path() {
        let queue = ActionQueue::default();
        queue.enqueue(noop_update("/ws/a.ts"));
        let b = queue.enqueue(noop_update("/ws/b.ts"));
        let a2 = queue.enqueue(noop_update("/ws/a.ts"));

        queue.reduce();

        let pending = queue.pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, b);
        assert_eq!(pending[1].id, a2);
        assert_eq!(pending[1].uri.as_deref(), Some(Path::new("/ws/a.ts")));
    }

    #[test]
    fn test_rebuild_absorbs_everything() {
        let queue = ActionQueue::default();
        queue.enqueue(noop_update("/ws/a.ts"));
        queue.enqueue(noop_remove("/ws/b.ts"));
        let rebuild = queue.enqueue(noop_rebuild());
        queue.enqueue(noop_update("/ws/c.ts"));

        queue.reduce();

        let pending = queue.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, rebuild);
    }

    #[test]
    fn test_queue_cleared_after_previous_rebuild() {
        let queue = ActionQueue::default();
        queue.state().previous = Some(noop_rebuild().info());
        queue.enqueue(noop_update("/ws/a.ts"));
        queue.enqueue(noop_rebuild());

        assert_eq!(queue.reduce(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_removes_coalesce_per_path() {
        let queue = ActionQueue::default();
        queue.enqueue(noop_remove("/ws/a.ts"));
        queue.enqueue(noop_remove("/ws/a.ts"));
        let last = queue.enqueue(noop_remove("/ws/a.ts"));

        queue.reduce();

        let pending = queue.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, last);
    }

    #[test]
    fn test_update_and_remove_on_same_path_both_survive() {
        let queue = ActionQueue::default();
        queue.enqueue(noop_update("/ws/a.ts"));
        queue.enqueue(noop_remove("/ws/a.ts"));

        assert_eq!(queue.reduce(), 0);
        assert_eq!(kinds(&queue), vec![ActionKind::Update, ActionKind::Remove]);
    }

    #[test]
    fn test_actions_without_path_are_not_grouped() {
        let queue = ActionQueue::default();
        queue.enqueue(Action::new(ActionKind::Update, ActionTrigger::Reload, || async { Ok(()) }));
        queue.enqueue(Action::new(ActionKind::Update, ActionTrigger::Reload, || async { Ok(()) }));

        assert_eq!(queue.reduce(), 0);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_reduce_records_coalesced_stats() {
        let queue = ActionQueue::default();
        queue.enqueue(noop_update("/ws/a.ts"));
        queue.enqueue(noop_update("/ws/a.ts"));
        queue.reduce();

        assert_eq!(queue.stats().coalesced, 1);
    }

    #[tokio::test]
    async fn test_register_drains_in_order() {
        let queue = ActionQueue::default();
        let log = Arc::new(Mutex::new(Vec::new()));

        queue.enqueue(recording(ActionKind::Update, Some("/ws/a.ts"), &log, "a"));
        queue.enqueue(recording(ActionKind::Update, Some("/ws/b.ts"), &log, "b"));
        queue
            .register(recording(ActionKind::Remove, Some("/ws/c.ts"), &log, "c"))
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert!(queue.is_empty());
        assert!(!queue.is_busy());
        assert!(queue.previous_action().is_none());

        let stats = queue.stats();
        assert_eq!(stats.executed, 3);
        assert_eq!(stats.drains, 1);
    }

    #[tokio::test]
    async fn test_lifecycle_events() {
        let queue = ActionQueue::default();
        let mut rx = queue.subscribe();

        queue.register(noop_update("/ws/a.ts")).await.unwrap();

        let events = drain_events(&mut rx);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], QueueEvent::WillProcess);
        match &events[1] {
            QueueEvent::WillExecuteAction(info) => {
                assert_eq!(info.kind, ActionKind::Update);
                assert_eq!(info.uri.as_deref(), Some(Path::new("/ws/a.ts")));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(events[2], QueueEvent::DidProcess);
    }

    #[tokio::test]
    async fn test_actions_enqueued_during_run_join_the_same_drain() {
        let queue = Arc::new(ActionQueue::default());
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut rx = queue.subscribe();

        let inner_queue = queue.clone();
        let inner_log = log.clone();
        let first = Action::rebuild(ActionTrigger::Startup, move || async move {
            inner_log.lock().unwrap().push("rebuild".to_string());
            // Superseded on the next pop: the previous action was a rebuild.
            inner_queue.enqueue(recording(ActionKind::Update, Some("/ws/a.ts"), &inner_log, "stale"));
            Ok(())
        });
        queue.register(first).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["rebuild"]);
        assert!(queue.is_empty());

        let will_process = drain_events(&mut rx)
            .into_iter()
            .filter(|e| *e == QueueEvent::WillProcess)
            .count();
        assert_eq!(will_process, 1);
    }

    #[tokio::test]
    async fn test_update_enqueued_during_update_runs_in_same_drain() {
        let queue = Arc::new(ActionQueue::default());
        let log = Arc::new(Mutex::new(Vec::new()));

        let inner_queue = queue.clone();
        let inner_log = log.clone();
        let first = Action::update(ActionTrigger::DidChange, "/ws/a.ts", move || async move {
            inner_log.lock().unwrap().push("a".to_string());
            inner_queue.enqueue(recording(ActionKind::Update, Some("/ws/b.ts"), &inner_log, "b1"));
            inner_queue.enqueue(recording(ActionKind::Update, Some("/ws/b.ts"), &inner_log, "b2"));
            Ok(())
        });
        queue.register(first).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["a", "b2"]);
        assert_eq!(queue.stats().coalesced, 1);
    }

    #[tokio::test]
    async fn test_register_during_drain_starts_no_second_drain() {
        let queue = Arc::new(ActionQueue::default());
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut rx = queue.subscribe();

        let (started_tx, started_rx) = oneshot::channel::<()>();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let first_log = log.clone();
        let first = Action::update(ActionTrigger::DidChange, "/ws/a.ts", move || async move {
            let _ = started_tx.send(());
            let _ = release_rx.await;
            first_log.lock().unwrap().push("a".to_string());
            Ok(())
        });

        let drain_queue = queue.clone();
        let drain = tokio::spawn(async move { drain_queue.register(first).await });

        started_rx.await.unwrap();
        assert!(queue.is_busy());

        // Returns without running anything; the in-flight drain owns the queue.
        queue
            .register(recording(ActionKind::Update, Some("/ws/b.ts"), &log, "b"))
            .await
            .unwrap();
        assert_eq!(queue.len(), 1);
        assert!(log.lock().unwrap().is_empty());

        // process() is a no-op while busy as well.
        queue.process().await.unwrap();
        assert_eq!(queue.len(), 1);

        release_tx.send(()).unwrap();
        drain.await.unwrap().unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
        assert!(!queue.is_busy());

        let events = drain_events(&mut rx);
        let count = |wanted: &QueueEvent| events.iter().filter(|e| *e == wanted).count();
        assert_eq!(count(&QueueEvent::WillProcess), 1);
        assert_eq!(count(&QueueEvent::DidProcess), 1);
    }

    #[tokio::test]
    async fn test_failed_action_does_not_wedge_queue() {
        let queue = ActionQueue::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut rx = queue.subscribe();

        queue.enqueue(Action::update(ActionTrigger::DidChange, "/ws/a.ts", || async {
            Err::<(), _>(anyhow::anyhow!("provider crashed"))
        }));
        queue.enqueue(recording(ActionKind::Update, Some("/ws/b.ts"), &log, "b"));

        let err = queue.process().await.unwrap_err();
        match err {
            SchedulerError::ActionFailed { kind, message, .. } => {
                assert_eq!(kind, ActionKind::Update);
                assert!(message.contains("provider crashed"));
            }
        }

        assert!(!queue.is_busy());
        assert!(queue.previous_action().is_none());
        assert_eq!(queue.len(), 1);
        assert!(drain_events(&mut rx).contains(&QueueEvent::DidProcess));

        // The next registration drains what was left behind.
        queue
            .register(recording(ActionKind::Update, Some("/ws/c.ts"), &log, "c"))
            .await
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["b", "c"]);

        let stats = queue.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.executed, 2);
        assert_eq!(stats.drains, 2);
    }

    #[tokio::test]
    #[allow(unreachable_code)]
    async fn test_panicking_action_releases_busy_flag() {
        let queue = Arc::new(ActionQueue::default());
        queue.enqueue(Action::rebuild(ActionTrigger::Startup, || async {
            panic!("action blew up");
            Ok(())
        }));

        let panicking = queue.clone();
        let result = tokio::spawn(async move { panicking.process().await }).await;
        assert!(result.is_err());

        assert!(!queue.is_busy());
        queue.register(noop_update("/ws/a.ts")).await.unwrap();
        assert!(queue.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registers_never_overlap_drains() {
        let queue = Arc::new(ActionQueue::new(QueueConfig { event_capacity: 1024 }));
        let mut rx = queue.subscribe();

        let mut handles = Vec::new();
        for i in 0..64 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                let action = Action::update(ActionTrigger::DidChange, format!("/ws/{i}.ts"), || async {
                    tokio::task::yield_now().await;
                    Ok(())
                });
                queue.register(action).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let lifecycle: Vec<_> = drain_events(&mut rx)
            .into_iter()
            .filter(|event| matches!(event, QueueEvent::WillProcess | QueueEvent::DidProcess))
            .collect();
        assert!(!lifecycle.is_empty());
        for (i, event) in lifecycle.iter().enumerate() {
            let expected = if i % 2 == 0 {
                QueueEvent::WillProcess
            } else {
                QueueEvent::DidProcess
            };
            assert_eq!(*event, expected, "lifecycle event {i} out of order");
        }
        assert!(queue.is_empty());
        assert!(!queue.is_busy());
        assert_eq!(queue.stats().drains as usize, lifecycle.len() / 2);
    }

    #[tokio::test]
    async fn test_process_on_empty_queue() {
        let queue = ActionQueue::default();
        let mut rx = queue.subscribe();

        queue.process().await.unwrap();

        assert_eq!(
            drain_events(&mut rx),
            vec![QueueEvent::WillProcess, QueueEvent::DidProcess]
        );
    }
}
