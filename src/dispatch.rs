//! Turning a finished drag into a persistence intent, and settling the
//! outcome of the asynchronous write.

use crate::drag::DragSession;
use crate::error::Result;
use crate::kanban_board::BoardSnapshot;
use crate::persistence::BoardPersistence;
use crate::preview::placement;
use crate::task::{ColumnId, ProjectId, Task, TaskId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Classified result of a drag gesture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intent {
    NoOp,
    CrossColumnMove {
        task_id: TaskId,
        source_column_id: ColumnId,
        target_column_id: ColumnId,
        /// Insertion index in the target column
        index: usize,
    },
    SameColumnReorder {
        column_id: ColumnId,
        task_id: TaskId,
        new_index: usize,
    },
}

/// What to do with the optimistic state when a commit is rejected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackPolicy {
    /// Leave the local change in place and only raise a notice
    #[default]
    KeepOptimistic,
    /// Restore the board as it was before the commit
    Revert,
}

/// Classify a finished drag. `enforce_limits` rejects moves into full columns.
pub fn classify(snapshot: &BoardSnapshot, session: &DragSession, enforce_limits: bool) -> Intent {
    let Some(spot) = placement(snapshot, session) else {
        debug!(
            task = %session.active_task_id,
            over = ?session.current_over,
            "drop target did not resolve"
        );
        return Intent::NoOp;
    };
    if spot.is_unchanged() {
        return Intent::NoOp;
    }
    let source = &snapshot.columns[spot.source_column];
    if spot.is_same_column() {
        return Intent::SameColumnReorder {
            column_id: source.id.clone(),
            task_id: session.active_task_id.clone(),
            new_index: spot.index,
        };
    }
    let target = &snapshot.columns[spot.target_column];
    if enforce_limits && target.is_full() {
        debug!(column = %target.id, "drop rejected: column at task limit");
        return Intent::NoOp;
    }
    Intent::CrossColumnMove {
        task_id: session.active_task_id.clone(),
        source_column_id: source.id.clone(),
        target_column_id: target.id.clone(),
        index: spot.index,
    }
}

/// A write that has been applied locally and handed to persistence
#[derive(Debug, Clone, PartialEq)]
pub enum Commit {
    Gesture(Intent),
    Add { column_id: ColumnId, task: Task },
    Delete { column_id: ColumnId, task_id: TaskId },
}

impl Commit {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Gesture(Intent::CrossColumnMove { .. }) => "move",
            Self::Gesture(Intent::SameColumnReorder { .. }) => "reorder",
            Self::Gesture(Intent::NoOp) => "noop",
            Self::Add { .. } => "add",
            Self::Delete { .. } => "delete",
        }
    }

    /// Run the matching persistence operation exactly once
    pub async fn send<P>(
        &self,
        persistence: &P,
        project_id: &ProjectId,
    ) -> Result<Option<BoardSnapshot>>
    where
        P: BoardPersistence + ?Sized,
    {
        match self {
            Self::Gesture(Intent::NoOp) => Ok(None),
            Self::Gesture(Intent::CrossColumnMove {
                task_id,
                source_column_id,
                target_column_id,
                index,
            }) => {
                persistence
                    .move_task(project_id, source_column_id, target_column_id, task_id, *index)
                    .await
            }
            Self::Gesture(Intent::SameColumnReorder {
                column_id,
                task_id,
                new_index,
            }) => {
                persistence
                    .reorder_tasks(project_id, column_id, task_id, *new_index)
                    .await
            }
            Self::Add { column_id, task } => {
                persistence
                    .add_task(project_id, column_id, task.clone())
                    .await
                    .map(Some)
            }
            Self::Delete { column_id, task_id } => {
                persistence
                    .delete_task(project_id, column_id, task_id)
                    .await
                    .map(|()| None)
            }
        }
    }
}

/// Outcome of one in-flight commit, delivered back to the controller
#[derive(Debug)]
pub struct Settlement {
    pub commit: Commit,
    /// Store version produced by the optimistic update
    pub version: u64,
    /// Committed board before the optimistic update
    pub before: BoardSnapshot,
    pub result: Result<Option<BoardSnapshot>>,
}

/// What the controller did with a settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Persistence succeeded and returned nothing to merge
    Acknowledged,
    /// Server board replaced the local copy
    Confirmed,
    /// Server board arrived after newer local changes and was dropped
    Stale,
    /// Failure; optimistic state left in place
    FailedKept,
    /// Failure; board restored to its pre-commit state
    RolledBack,
    /// Failure; rollback skipped because newer local changes exist
    FailedStale,
}
