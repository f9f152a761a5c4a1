//! Queued units of indexing work.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Coalescing class of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Full reindex; supersedes all pending finer-grained work
    Rebuild,
    /// Reindex of a single path
    Update,
    /// Removal of a single path (file or folder) from the index
    Remove,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Rebuild => "rebuild",
            ActionKind::Update => "update",
            ActionKind::Remove => "remove",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event that caused an action to be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTrigger {
    Startup,
    Search,
    Reload,
    ConfigChange,
    FoldersChange,
    DidChange,
    DidCreate,
    DidDelete,
    DidRename,
}

impl ActionTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionTrigger::Startup => "startup",
            ActionTrigger::Search => "search",
            ActionTrigger::Reload => "reload",
            ActionTrigger::ConfigChange => "config_change",
            ActionTrigger::FoldersChange => "folders_change",
            ActionTrigger::DidChange => "did_change",
            ActionTrigger::DidCreate => "did_create",
            ActionTrigger::DidDelete => "did_delete",
            ActionTrigger::DidRename => "did_rename",
        }
    }
}

impl fmt::Display for ActionTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type ActionFn = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// One unit of queued asynchronous work.
///
/// Everything except `id` is fixed at construction; the id is assigned
/// by the queue on enqueue.
pub struct Action {
    id: u64,
    kind: ActionKind,
    trigger: ActionTrigger,
    uri: Option<PathBuf>,
    comment: Option<String>,
    run: ActionFn,
}

impl Action {
    /// Create an action of `kind` running `run` when popped.
    pub fn new<F, Fut>(kind: ActionKind, trigger: ActionTrigger, run: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            id: 0,
            kind,
            trigger,
            uri: None,
            comment: None,
            run: Box::new(move || Box::pin(run())),
        }
    }

    /// Full reindex action.
    pub fn rebuild<F, Fut>(trigger: ActionTrigger, run: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(ActionKind::Rebuild, trigger, run)
    }

    /// Single-path update action.
    pub fn update<F, Fut>(trigger: ActionTrigger, uri: impl Into<PathBuf>, run: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(ActionKind::Update, trigger, run).with_uri(uri)
    }

    /// Single-path removal action.
    pub fn remove<F, Fut>(trigger: ActionTrigger, uri: impl Into<PathBuf>, run: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(ActionKind::Remove, trigger, run).with_uri(uri)
    }

    /// Attach the path this action is about.
    pub fn with_uri(mut self, uri: impl Into<PathBuf>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Attach a free-form comment for logs.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn trigger(&self) -> ActionTrigger {
        self.trigger
    }

    pub fn uri(&self) -> Option<&Path> {
        self.uri.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Snapshot of this action without its body.
    pub fn info(&self) -> ActionInfo {
        ActionInfo {
            id: self.id,
            kind: self.kind,
            trigger: self.trigger,
            uri: self.uri.clone(),
            comment: self.comment.clone(),
        }
    }

    pub(crate) fn assign_id(&mut self, id: u64) {
        self.id = id;
    }

    /// Consume the action and run its body.
    pub(crate) async fn execute(self) -> anyhow::Result<()> {
        (self.run)().await
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("trigger", &self.trigger)
            .field("uri", &self.uri)
            .field("comment", &self.comment)
            .finish_non_exhaustive()
    }
}

/// Cloneable description of an action, used in events and stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionInfo {
    pub id: u64,
    pub kind: ActionKind,
    pub trigger: ActionTrigger,
    pub uri: Option<PathBuf>,
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_kind_and_uri() {
        let rebuild = Action::rebuild(ActionTrigger::Startup, || async { Ok(()) });
        assert_eq!(rebuild.kind(), ActionKind::Rebuild);
        assert!(rebuild.uri().is_none());

        let update = Action::update(ActionTrigger::DidChange, "/ws/a.ts", || async { Ok(()) });
        assert_eq!(update.kind(), ActionKind::Update);
        assert_eq!(update.uri(), Some(Path::new("/ws/a.ts")));

        let remove = Action::remove(ActionTrigger::DidDelete, "/ws/b.ts", || async { Ok(()) })
            .with_comment("deleted on disk");
        assert_eq!(remove.kind(), ActionKind::Remove);
        assert_eq!(remove.comment(), Some("deleted on disk"));
    }

    #[test]
    fn test_info_snapshot() {
        let mut action = Action::update(ActionTrigger::DidCreate, "/ws/a.ts", || async { Ok(()) });
        action.assign_id(3);

        let info = action.info();
        assert_eq!(info.id, 3);
        assert_eq!(info.kind, ActionKind::Update);
        assert_eq!(info.trigger, ActionTrigger::DidCreate);
        assert_eq!(info.uri, Some(PathBuf::from("/ws/a.ts")));
    }

    #[tokio::test]
    async fn test_execute_runs_body() {
        let action = Action::rebuild(ActionTrigger::Reload, || async {
            Err::<(), _>(anyhow::anyhow!("boom"))
        });
        let err = action.execute().await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_display() {
        assert_eq!(ActionKind::Rebuild.to_string(), "rebuild");
        assert_eq!(ActionTrigger::ConfigChange.to_string(), "config_change");
    }
}
