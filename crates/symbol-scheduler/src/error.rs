//! Error types for the scheduler crate.

use thiserror::Error;

use crate::action::ActionKind;

/// Errors that can occur while draining the action queue.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// An action's body returned an error; the drain pass stopped there
    #[error("Action {id} ({kind}) failed: {message}")]
    ActionFailed {
        id: u64,
        kind: ActionKind,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchedulerError::ActionFailed {
            id: 7,
            kind: ActionKind::Update,
            message: "provider crashed".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("Action 7"));
        assert!(text.contains("update"));
        assert!(text.contains("provider crashed"));
    }
}
