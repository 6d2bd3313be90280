//! Board snapshot and the store that owns the committed copy of it.

use crate::dispatch::Intent;
use crate::error::{BoardError, Result};
use crate::task::{ColumnId, ProjectId, Task, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// A workflow stage holding an ordered list of tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(rename = "taskLimit", default, skip_serializing_if = "Option::is_none")]
    pub task_limit: Option<usize>,
}

impl Column {
    pub fn new(id: impl Into<ColumnId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            tasks: Vec::new(),
            task_limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.task_limit = Some(limit);
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn position(&self, task_id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| &t.id == task_id)
    }

    pub fn is_full(&self) -> bool {
        self.task_limit.is_some_and(|limit| self.tasks.len() >= limit)
    }
}

/// Full ordered state of a board at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    #[serde(rename = "projectId")]
    pub project_id: ProjectId,
    pub columns: Vec<Column>,
}

impl BoardSnapshot {
    pub fn new(project_id: impl Into<ProjectId>, columns: Vec<Column>) -> Self {
        let mut snapshot = Self {
            project_id: project_id.into(),
            columns,
        };
        snapshot.relink();
        snapshot
    }

    /// Empty board with the classic three stages
    pub fn with_default_columns(project_id: impl Into<ProjectId>) -> Self {
        Self::new(
            project_id,
            vec![
                Column::new("todo", "TODO"),
                Column::new("doing", "DOING"),
                Column::new("done", "DONE"),
            ],
        )
    }

    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| &c.id == id)
    }

    pub fn column_by_str(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == *id)
    }

    fn column_mut(&mut self, id: &ColumnId) -> Result<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| BoardError::column_not_found(id.as_str()))
    }

    /// Locate a task as `(column index, task index)` by linear search
    pub fn locate(&self, task_id: &TaskId) -> Option<(usize, usize)> {
        self.columns
            .iter()
            .enumerate()
            .find_map(|(ci, c)| c.position(task_id).map(|ti| (ci, ti)))
    }

    pub fn locate_str(&self, task_id: &str) -> Option<(usize, usize)> {
        self.columns.iter().enumerate().find_map(|(ci, c)| {
            c.tasks
                .iter()
                .position(|t| t.id == *task_id)
                .map(|ti| (ci, ti))
        })
    }

    pub fn task(&self, task_id: &TaskId) -> Option<&Task> {
        self.locate(task_id)
            .map(|(ci, ti)| &self.columns[ci].tasks[ti])
    }

    pub fn task_count(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }

    /// Task ids of a column in order; empty if the column is unknown
    pub fn task_ids(&self, column_id: &str) -> Vec<&str> {
        self.column_by_str(column_id)
            .map(|c| c.tasks.iter().map(|t| t.id.as_str()).collect())
            .unwrap_or_default()
    }

    /// Recompute every task's `column_id` from the column that holds it.
    pub fn relink(&mut self) {
        for column in &mut self.columns {
            for task in &mut column.tasks {
                if task.column_id != column.id {
                    task.column_id = column.id.clone();
                }
            }
        }
    }

    /// Check that no task id appears twice on the board
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for task in self.columns.iter().flat_map(|c| c.tasks.iter()) {
            if !seen.insert(&task.id) {
                return Err(BoardError::DuplicateTask {
                    id: task.id.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Apply a classified intent in place. Fails without mutating on bad ids.
    pub fn apply(&mut self, intent: &Intent) -> Result<()> {
        match intent {
            Intent::NoOp => Ok(()),
            Intent::CrossColumnMove {
                task_id,
                source_column_id,
                target_column_id,
                index,
            } => {
                self.column(target_column_id)
                    .ok_or_else(|| BoardError::column_not_found(target_column_id.as_str()))?;
                let source = self.column_mut(source_column_id)?;
                let from = source
                    .position(task_id)
                    .ok_or_else(|| BoardError::task_not_found(task_id.as_str()))?;
                let mut task = source.tasks.remove(from);
                task.column_id = target_column_id.clone();
                let target = self.column_mut(target_column_id)?;
                let at = (*index).min(target.tasks.len());
                target.tasks.insert(at, task);
                Ok(())
            }
            Intent::SameColumnReorder {
                column_id,
                task_id,
                new_index,
            } => {
                let column = self.column_mut(column_id)?;
                let from = column
                    .position(task_id)
                    .ok_or_else(|| BoardError::task_not_found(task_id.as_str()))?;
                let task = column.tasks.remove(from);
                let at = (*new_index).min(column.tasks.len());
                column.tasks.insert(at, task);
                Ok(())
            }
        }
    }

    /// Insert a task at `index` (or the end) of a column
    pub fn insert_task(
        &mut self,
        column_id: &ColumnId,
        mut task: Task,
        index: Option<usize>,
    ) -> Result<()> {
        if self.locate(&task.id).is_some() {
            return Err(BoardError::DuplicateTask {
                id: task.id.to_string(),
            });
        }
        let column = self.column_mut(column_id)?;
        task.column_id = column.id.clone();
        let at = index.unwrap_or(column.tasks.len()).min(column.tasks.len());
        column.tasks.insert(at, task);
        Ok(())
    }

    /// Remove a task wherever it lives
    pub fn remove_task(&mut self, task_id: &TaskId) -> Result<Task> {
        let (ci, ti) = self
            .locate(task_id)
            .ok_or_else(|| BoardError::task_not_found(task_id.as_str()))?;
        Ok(self.columns[ci].tasks.remove(ti))
    }
}

/// Owner of the committed snapshot and its monotonic version
#[derive(Debug)]
pub struct BoardStore {
    snapshot: BoardSnapshot,
    version: u64,
}

impl BoardStore {
    pub fn new(mut snapshot: BoardSnapshot) -> Self {
        snapshot.relink();
        Self {
            snapshot,
            version: 0,
        }
    }

    /// Replace the stored board wholesale
    pub fn load(&mut self, mut snapshot: BoardSnapshot) -> u64 {
        snapshot.relink();
        info!(
            project = %snapshot.project_id,
            tasks = snapshot.task_count(),
            "loaded board"
        );
        self.snapshot = snapshot;
        self.bump()
    }

    pub fn snapshot(&self) -> &BoardSnapshot {
        &self.snapshot
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn apply_committed_change(&mut self, intent: &Intent) -> Result<u64> {
        if matches!(intent, Intent::NoOp) {
            return Ok(self.version);
        }
        let mut next = self.snapshot.clone();
        next.apply(intent)?;
        next.relink();
        self.snapshot = next;
        Ok(self.bump())
    }

    pub fn insert_task(&mut self, column_id: &ColumnId, task: Task) -> Result<u64> {
        self.snapshot.insert_task(column_id, task, None)?;
        Ok(self.bump())
    }

    pub fn remove_task(&mut self, task_id: &TaskId) -> Result<(Task, u64)> {
        let task = self.snapshot.remove_task(task_id)?;
        Ok((task, self.bump()))
    }

    /// Accept a server-confirmed board if nothing changed locally since
    /// `expected_version`. Returns false for stale confirmations.
    pub fn confirm(&mut self, expected_version: u64, snapshot: BoardSnapshot) -> bool {
        self.replace_if_current(expected_version, snapshot, "confirmation")
    }

    /// Roll back to a pre-commit board under the same staleness rule as
    /// [`BoardStore::confirm`].
    pub fn restore(&mut self, expected_version: u64, snapshot: BoardSnapshot) -> bool {
        self.replace_if_current(expected_version, snapshot, "rollback")
    }

    fn replace_if_current(
        &mut self,
        expected_version: u64,
        mut snapshot: BoardSnapshot,
        what: &str,
    ) -> bool {
        if expected_version != self.version || snapshot.project_id != self.snapshot.project_id {
            debug!(
                expected = expected_version,
                current = self.version,
                "ignoring stale {what}"
            );
            return false;
        }
        snapshot.relink();
        self.snapshot = snapshot;
        self.bump();
        true
    }

    fn bump(&mut self) -> u64 {
        self.version += 1;
        self.version
    }
}
