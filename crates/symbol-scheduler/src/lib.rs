//! Coalescing action queue for the symbol index.
//!
//! Every piece of indexing work (full rebuilds, per-file updates and
//! removals) enters the index as an [`Action`] registered with an
//! [`ActionQueue`]. The queue runs actions strictly one at a time and
//! rewrites its pending list before each pop so that redundant work is
//! dropped:
//!
//! - a queued `Rebuild` replaces everything else in the queue
//! - a `Rebuild` right after a `Rebuild` clears the queue
//! - only the newest `Update`/`Remove` per path survives
//!
//! # Example
//!
//! ```ignore
//! use symbol_scheduler::{Action, ActionQueue, ActionTrigger};
//!
//! let queue = ActionQueue::default();
//! let mut events = queue.subscribe();
//!
//! queue
//!     .register(Action::rebuild(ActionTrigger::Startup, || async {
//!         rebuild_index().await
//!     }))
//!     .await?;
//! ```

mod action;
mod config;
mod error;
mod queue;
mod stats;

pub use action::{Action, ActionInfo, ActionKind, ActionTrigger};
pub use config::QueueConfig;
pub use error::SchedulerError;
pub use queue::{ActionQueue, QueueEvent};
pub use stats::{ActionOutcome, QueueStats};
