//! Drag session tracking: `Idle -> Active -> Idle`.

use crate::kanban_board::BoardSnapshot;
use crate::task::{ColumnId, TaskId};
use tracing::debug;

/// State of one in-progress drag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub active_task_id: TaskId,
    source_column_id: ColumnId,
    /// Last drop target: a column id or a task id
    pub current_over: Option<String>,
    pub preview_applied: bool,
}

impl DragSession {
    pub fn new(active_task_id: TaskId, source_column_id: ColumnId) -> Self {
        Self {
            active_task_id,
            source_column_id,
            current_over: None,
            preview_applied: false,
        }
    }

    /// Column the task currently sits in on the committed board
    pub fn source_column_id(&self) -> &ColumnId {
        &self.source_column_id
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Active(DragSession),
}

#[derive(Debug, Default)]
pub struct DragTracker {
    state: DragState,
}

impl DragTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn session(&self) -> Option<&DragSession> {
        match &self.state {
            DragState::Active(session) => Some(session),
            DragState::Idle => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut DragSession> {
        match &mut self.state {
            DragState::Active(session) => Some(session),
            DragState::Idle => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, DragState::Active(_))
    }

    /// Begin dragging `task_id`. Returns false (and stays idle) when the task
    /// is not on the board or another drag is already running.
    pub fn start(&mut self, snapshot: &BoardSnapshot, task_id: &str) -> bool {
        if self.is_active() {
            debug!(task = task_id, "drag start ignored: session already active");
            return false;
        }
        let Some((ci, ti)) = snapshot.locate_str(task_id) else {
            debug!(task = task_id, "drag start ignored: task not on board");
            return false;
        };
        let column = &snapshot.columns[ci];
        self.state = DragState::Active(DragSession::new(
            column.tasks[ti].id.clone(),
            column.id.clone(),
        ));
        debug!(task = task_id, column = %column.id, "drag started");
        true
    }

    /// Record the current drop target. Returns true if it changed.
    pub fn over(&mut self, target_id: &str) -> bool {
        let Some(session) = self.session_mut() else {
            return false;
        };
        if session.active_task_id == *target_id {
            return false;
        }
        if session.current_over.as_deref() == Some(target_id) {
            return false;
        }
        session.current_over = Some(target_id.to_string());
        true
    }

    /// Pointer left every drop target
    pub fn clear_over(&mut self) {
        if let Some(session) = self.session_mut() {
            session.current_over = None;
        }
    }

    /// Finish the drag, yielding the session if one was active
    pub fn end(&mut self) -> Option<DragSession> {
        match std::mem::take(&mut self.state) {
            DragState::Active(session) => Some(session),
            DragState::Idle => {
                debug!("drag end with no active session");
                None
            }
        }
    }

    /// Re-locate the dragged task on a replaced board. Cancels the drag and
    /// returns false when the task is gone.
    pub fn rebase(&mut self, snapshot: &BoardSnapshot) -> bool {
        let Some(session) = self.session_mut() else {
            return false;
        };
        match snapshot.locate(&session.active_task_id) {
            Some((ci, _)) => {
                session.source_column_id = snapshot.columns[ci].id.clone();
                true
            }
            None => {
                self.cancel();
                false
            }
        }
    }

    pub fn cancel(&mut self) {
        if let DragState::Active(session) = std::mem::take(&mut self.state) {
            debug!(task = %session.active_task_id, "drag cancelled");
        }
    }
}
