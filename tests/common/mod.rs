#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskers::{
    BoardController, BoardError, BoardPersistence, BoardSnapshot, Column, ColumnId,
    ControllerOptions, ProjectId, Result, Task, TaskId,
};

/// How the scripted backend answers a call for a given task
#[derive(Debug, Clone)]
pub enum Reply {
    Ack,
    Board(BoardSnapshot),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Script {
    delay: Duration,
    reply: Reply,
}

/// Persistence double that records calls and answers per task id
#[derive(Debug, Default)]
pub struct ScriptedPersistence {
    pub calls: Mutex<Vec<String>>,
    scripts: Mutex<HashMap<String, Script>>,
    board: Mutex<Option<BoardSnapshot>>,
}

impl ScriptedPersistence {
    pub fn with_board(board: BoardSnapshot) -> Self {
        Self {
            board: Mutex::new(Some(board)),
            ..Self::default()
        }
    }

    pub fn script(&self, task_id: &str, delay_ms: u64, reply: Reply) {
        self.scripts.lock().unwrap().insert(
            task_id.to_string(),
            Script {
                delay: Duration::from_millis(delay_ms),
                reply,
            },
        );
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn answer(&self, call: String, task_id: &TaskId) -> Result<Option<BoardSnapshot>> {
        self.calls.lock().unwrap().push(call);
        let script = self.scripts.lock().unwrap().get(task_id.as_str()).cloned();
        let Some(script) = script else {
            return Ok(None);
        };
        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        match script.reply {
            Reply::Ack => Ok(None),
            Reply::Board(board) => Ok(Some(board)),
            Reply::Fail(message) => Err(BoardError::persistence(message)),
        }
    }
}

#[async_trait]
impl BoardPersistence for ScriptedPersistence {
    async fn load_board(&self, project_id: &ProjectId) -> Result<BoardSnapshot> {
        self.board
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| BoardError::persistence(format!("no board for {project_id}")))
    }

    async fn move_task(
        &self,
        project_id: &ProjectId,
        source_column_id: &ColumnId,
        target_column_id: &ColumnId,
        task_id: &TaskId,
        index: usize,
    ) -> Result<Option<BoardSnapshot>> {
        let call =
            format!("move {project_id} {task_id} {source_column_id}->{target_column_id}@{index}");
        self.answer(call, task_id).await
    }

    async fn reorder_tasks(
        &self,
        project_id: &ProjectId,
        column_id: &ColumnId,
        task_id: &TaskId,
        new_index: usize,
    ) -> Result<Option<BoardSnapshot>> {
        let call = format!("reorder {project_id} {column_id} {task_id}@{new_index}");
        self.answer(call, task_id).await
    }

    async fn add_task(
        &self,
        project_id: &ProjectId,
        column_id: &ColumnId,
        task: Task,
    ) -> Result<BoardSnapshot> {
        let call = format!("add {project_id} {column_id} {}", task.title);
        let task_id = task.id.clone();
        match self.answer(call, &task_id).await? {
            Some(board) => Ok(board),
            None => {
                let mut board = self
                    .board
                    .lock()
                    .unwrap()
                    .clone()
                    .ok_or_else(|| BoardError::persistence("no board"))?;
                board.insert_task(column_id, task, None)?;
                Ok(board)
            }
        }
    }

    async fn delete_task(
        &self,
        project_id: &ProjectId,
        column_id: &ColumnId,
        task_id: &TaskId,
    ) -> Result<()> {
        let call = format!("delete {project_id} {column_id} {task_id}");
        self.answer(call, task_id).await.map(drop)
    }
}

/// Board with columns `a` and `b`, each holding the given task ids
pub fn board(a: &[&str], b: &[&str]) -> BoardSnapshot {
    let column = |id: &str, tasks: &[&str]| {
        tasks
            .iter()
            .fold(Column::new(id, id.to_uppercase()), |c, t| {
                c.with_task(Task::new(*t, id, format!("task {t}")))
            })
    };
    BoardSnapshot::new("proj", vec![column("a", a), column("b", b)])
}

pub fn controller(
    board: BoardSnapshot,
    options: ControllerOptions,
) -> (Arc<ScriptedPersistence>, BoardController<ScriptedPersistence>) {
    let persistence = Arc::new(ScriptedPersistence::with_board(board.clone()));
    let controller = BoardController::new(Arc::clone(&persistence), board, options);
    (persistence, controller)
}
