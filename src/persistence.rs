//! Persistence collaborator: the source of truth the board reconciles with.

use crate::dispatch::Intent;
use crate::error::{BoardError, Result};
use crate::kanban_board::BoardSnapshot;
use crate::task::{ColumnId, ProjectId, Task, TaskId};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Operations the board issues against its backing store.
///
/// Responses that carry a board are merged into the local copy; `None`
/// means the write succeeded with nothing to merge.
#[async_trait]
pub trait BoardPersistence: Send + Sync {
    async fn load_board(&self, project_id: &ProjectId) -> Result<BoardSnapshot>;

    async fn move_task(
        &self,
        project_id: &ProjectId,
        source_column_id: &ColumnId,
        target_column_id: &ColumnId,
        task_id: &TaskId,
        index: usize,
    ) -> Result<Option<BoardSnapshot>>;

    async fn reorder_tasks(
        &self,
        project_id: &ProjectId,
        column_id: &ColumnId,
        task_id: &TaskId,
        new_index: usize,
    ) -> Result<Option<BoardSnapshot>>;

    async fn add_task(
        &self,
        project_id: &ProjectId,
        column_id: &ColumnId,
        task: Task,
    ) -> Result<BoardSnapshot>;

    async fn delete_task(
        &self,
        project_id: &ProjectId,
        column_id: &ColumnId,
        task_id: &TaskId,
    ) -> Result<()>;
}

/// Board stored as pretty-printed JSON in a single file
#[derive(Debug)]
pub struct JsonFilePersistence {
    path: PathBuf,
    // serializes read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl JsonFilePersistence {
    pub const DEFAULT_FILE: &'static str = "kanban_board.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the board, or a default three-column board when the file is absent
    pub async fn load_from_file(&self, project_id: &ProjectId) -> Result<BoardSnapshot> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => {
                let mut snapshot: BoardSnapshot = serde_json::from_str(&data)?;
                snapshot.relink();
                snapshot.validate()?;
                Ok(snapshot)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no board file, starting empty");
                Ok(BoardSnapshot::with_default_columns(project_id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn save_to_file(&self, snapshot: &BoardSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_string_pretty(snapshot)?;
        tokio::fs::write(&self.path, data).await?;
        Ok(())
    }

    async fn update<F>(&self, project_id: &ProjectId, op: &str, mutate: F) -> Result<BoardSnapshot>
    where
        F: FnOnce(&mut BoardSnapshot) -> Result<()> + Send,
    {
        let _guard = self.lock.lock().await;
        let mut snapshot = self.load_from_file(project_id).await?;
        if &snapshot.project_id != project_id {
            return Err(BoardError::persistence(format!(
                "board file belongs to project {}, not {}",
                snapshot.project_id, project_id
            )));
        }
        mutate(&mut snapshot)?;
        snapshot.relink();
        self.save_to_file(&snapshot).await?;
        info!(op, path = %self.path.display(), "board saved");
        Ok(snapshot)
    }
}

#[async_trait]
impl BoardPersistence for JsonFilePersistence {
    async fn load_board(&self, project_id: &ProjectId) -> Result<BoardSnapshot> {
        let _guard = self.lock.lock().await;
        self.load_from_file(project_id).await
    }

    async fn move_task(
        &self,
        project_id: &ProjectId,
        source_column_id: &ColumnId,
        target_column_id: &ColumnId,
        task_id: &TaskId,
        index: usize,
    ) -> Result<Option<BoardSnapshot>> {
        let intent = Intent::CrossColumnMove {
            task_id: task_id.clone(),
            source_column_id: source_column_id.clone(),
            target_column_id: target_column_id.clone(),
            index,
        };
        self.update(project_id, "move", |board| board.apply(&intent))
            .await
            .map(Some)
    }

    async fn reorder_tasks(
        &self,
        project_id: &ProjectId,
        column_id: &ColumnId,
        task_id: &TaskId,
        new_index: usize,
    ) -> Result<Option<BoardSnapshot>> {
        let intent = Intent::SameColumnReorder {
            column_id: column_id.clone(),
            task_id: task_id.clone(),
            new_index,
        };
        self.update(project_id, "reorder", |board| board.apply(&intent))
            .await
            .map(Some)
    }

    async fn add_task(
        &self,
        project_id: &ProjectId,
        column_id: &ColumnId,
        task: Task,
    ) -> Result<BoardSnapshot> {
        self.update(project_id, "add", |board| board.insert_task(column_id, task, None))
            .await
    }

    async fn delete_task(
        &self,
        project_id: &ProjectId,
        column_id: &ColumnId,
        task_id: &TaskId,
    ) -> Result<()> {
        self.update(project_id, "delete", |board| {
            let owner = board
                .locate(task_id)
                .map(|(ci, _)| board.columns[ci].id.clone());
            match owner {
                Some(owner) if &owner == column_id => board.remove_task(task_id).map(drop),
                Some(_) | None => Err(BoardError::task_not_found(task_id.as_str())),
            }
        })
        .await
        .map(drop)
    }
}

/// Board kept in memory; every write answers with the updated board
#[derive(Debug)]
pub struct MemoryPersistence {
    board: Mutex<BoardSnapshot>,
}

impl MemoryPersistence {
    pub fn new(board: BoardSnapshot) -> Self {
        Self {
            board: Mutex::new(board),
        }
    }

    pub async fn board(&self) -> BoardSnapshot {
        self.board.lock().await.clone()
    }

    async fn update<F>(&self, project_id: &ProjectId, mutate: F) -> Result<BoardSnapshot>
    where
        F: FnOnce(&mut BoardSnapshot) -> Result<()> + Send,
    {
        let mut board = self.board.lock().await;
        if &board.project_id != project_id {
            return Err(BoardError::persistence(format!("unknown project {project_id}")));
        }
        let mut next = board.clone();
        mutate(&mut next)?;
        next.relink();
        *board = next.clone();
        Ok(next)
    }
}

#[async_trait]
impl BoardPersistence for MemoryPersistence {
    async fn load_board(&self, project_id: &ProjectId) -> Result<BoardSnapshot> {
        let board = self.board.lock().await;
        if &board.project_id != project_id {
            return Err(BoardError::persistence(format!("unknown project {project_id}")));
        }
        Ok(board.clone())
    }

    async fn move_task(
        &self,
        project_id: &ProjectId,
        source_column_id: &ColumnId,
        target_column_id: &ColumnId,
        task_id: &TaskId,
        index: usize,
    ) -> Result<Option<BoardSnapshot>> {
        let intent = Intent::CrossColumnMove {
            task_id: task_id.clone(),
            source_column_id: source_column_id.clone(),
            target_column_id: target_column_id.clone(),
            index,
        };
        self.update(project_id, |board| board.apply(&intent)).await.map(Some)
    }

    async fn reorder_tasks(
        &self,
        project_id: &ProjectId,
        column_id: &ColumnId,
        task_id: &TaskId,
        new_index: usize,
    ) -> Result<Option<BoardSnapshot>> {
        let intent = Intent::SameColumnReorder {
            column_id: column_id.clone(),
            task_id: task_id.clone(),
            new_index,
        };
        self.update(project_id, |board| board.apply(&intent)).await.map(Some)
    }

    async fn add_task(
        &self,
        project_id: &ProjectId,
        column_id: &ColumnId,
        task: Task,
    ) -> Result<BoardSnapshot> {
        self.update(project_id, |board| board.insert_task(column_id, task, None)).await
    }

    async fn delete_task(
        &self,
        project_id: &ProjectId,
        _column_id: &ColumnId,
        task_id: &TaskId,
    ) -> Result<()> {
        self.update(project_id, |board| board.remove_task(task_id).map(drop))
            .await
            .map(drop)
    }
}
