//! Shadow snapshots for an in-progress drag.
//!
//! The preview is always derived from the committed snapshot, never from a
//! previous preview, so hovering the same target twice gives the same board.

use crate::drag::DragSession;
use crate::kanban_board::BoardSnapshot;
use serde::{Deserialize, Serialize};

/// How hovering inside the task's own column is previewed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderPreview {
    /// Same-column reorders only show up once dropped
    #[default]
    Deferred,
    /// Splice the task into the hovered slot while dragging
    Live,
}

/// A drop target id resolved against a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropTarget {
    pub column_index: usize,
    /// Index of the hovered task, `None` when hovering the column itself
    pub over_task_index: Option<usize>,
}

/// Resolve `over_id` as a column id first, then as a task id.
pub fn resolve_drop_target(snapshot: &BoardSnapshot, over_id: &str) -> Option<DropTarget> {
    if let Some(ci) = snapshot.columns.iter().position(|c| c.id == *over_id) {
        return Some(DropTarget {
            column_index: ci,
            over_task_index: None,
        });
    }
    snapshot
        .locate_str(over_id)
        .map(|(ci, ti)| DropTarget {
            column_index: ci,
            over_task_index: Some(ti),
        })
}

/// Where the dragged task would land if released now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub source_column: usize,
    pub source_index: usize,
    pub target_column: usize,
    /// Final index of the task in the target column after the move
    pub index: usize,
}

impl Placement {
    pub fn is_same_column(&self) -> bool {
        self.source_column == self.target_column
    }

    /// True when releasing here would leave the board unchanged
    pub fn is_unchanged(&self) -> bool {
        self.is_same_column() && self.source_index == self.index
    }
}

/// Compute the landing spot for the session's task, or `None` if the task or
/// the drop target cannot be resolved.
pub fn placement(snapshot: &BoardSnapshot, session: &DragSession) -> Option<Placement> {
    let over_id = session.current_over.as_deref()?;
    if session.active_task_id == *over_id {
        return None;
    }
    let source_column = snapshot
        .columns
        .iter()
        .position(|c| &c.id == session.source_column_id())?;
    let source_index = snapshot.columns[source_column].position(&session.active_task_id)?;
    let target = resolve_drop_target(snapshot, over_id)?;

    let index = if target.column_index == source_column {
        // Dragged task is removed first, then reinserted at the hovered slot,
        // so the hovered index is also the final index.
        let last = snapshot.columns[source_column].tasks.len() - 1;
        target.over_task_index.unwrap_or(last)
    } else {
        let len = snapshot.columns[target.column_index].tasks.len();
        target.over_task_index.unwrap_or(len)
    };

    Some(Placement {
        source_column,
        source_index,
        target_column: target.column_index,
        index,
    })
}

/// Board as it would look if the drag ended now. Does not touch `base`.
///
/// Tasks moved across columns keep their old `column_id` here; owners are
/// only recomputed when a change is committed.
pub fn preview(base: &BoardSnapshot, session: &DragSession, mode: ReorderPreview) -> BoardSnapshot {
    let mut shadow = base.clone();
    let Some(spot) = placement(base, session) else {
        return shadow;
    };
    if spot.is_unchanged() || (spot.is_same_column() && mode == ReorderPreview::Deferred) {
        return shadow;
    }
    let task = shadow.columns[spot.source_column]
        .tasks
        .remove(spot.source_index);
    let target = &mut shadow.columns[spot.target_column].tasks;
    let at = spot.index.min(target.len());
    target.insert(at, task);
    shadow
}
