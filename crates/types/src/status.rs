//! Workflow-document and task status state machines.

use serde::{Deserialize, Serialize};

/// Document-level status.
///
/// `Ready → InProgress → Complete`; `Closed` is only reached when a new
/// document instance replaces an open one. `Complete` and `Closed` are
/// terminal and never reopened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowStatus {
    #[default]
    #[serde(rename = "READY")]
    Ready,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETE")]
    Complete,
    #[serde(rename = "CLOSED")]
    Closed,
}

impl WorkflowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Ready => "READY",
            WorkflowStatus::InProgress => "IN_PROGRESS",
            WorkflowStatus::Complete => "COMPLETE",
            WorkflowStatus::Closed => "CLOSED",
        }
    }

    /// Terminal documents are immutable.
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowStatus::Complete | WorkflowStatus::Closed)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task-level status.
///
/// `Created → Requested | InProgress → Complete`. An input-slot match moves
/// a task to `Requested`; an output-slot match to `InProgress`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "CREATED")]
    Created,
    #[serde(rename = "REQUESTED")]
    Requested,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETE")]
    Complete,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Created => "CREATED",
            TaskStatus::Requested => "REQUESTED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Complete => "COMPLETE",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_status_serialises_to_wire_names() {
        let json = serde_json::to_string(&WorkflowStatus::InProgress).expect("serialise");
        assert_eq!(json, "\"IN_PROGRESS\"");
        let back: WorkflowStatus = serde_json::from_str("\"CLOSED\"").expect("deserialise");
        assert_eq!(back, WorkflowStatus::Closed);
    }

    #[test]
    fn only_complete_and_closed_are_terminal() {
        assert!(!WorkflowStatus::Ready.is_terminal());
        assert!(!WorkflowStatus::InProgress.is_terminal());
        assert!(WorkflowStatus::Complete.is_terminal());
        assert!(WorkflowStatus::Closed.is_terminal());
    }
}
