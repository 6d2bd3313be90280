//! The board controller: one owner for the committed board, the drag session,
//! its preview, and the commits in flight to persistence.

use crate::config::Config;
use crate::dispatch::{classify, Commit, Intent, RollbackPolicy, SettleOutcome, Settlement};
use crate::drag::{DragSession, DragTracker};
use crate::error::{BoardError, Result};
use crate::kanban_board::{BoardSnapshot, BoardStore};
use crate::persistence::BoardPersistence;
use crate::preview::{preview, ReorderPreview};
use crate::task::{ColumnId, NewTask, ProjectId, TaskId};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerOptions {
    pub rollback: RollbackPolicy,
    pub reorder_preview: ReorderPreview,
    pub enforce_task_limits: bool,
}

impl From<&Config> for ControllerOptions {
    fn from(config: &Config) -> Self {
        Self {
            rollback: config.rollback,
            reorder_preview: config.reorder_preview,
            enforce_task_limits: config.enforce_task_limits,
        }
    }
}

/// User-facing error notification raised when a commit fails
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub at: DateTime<Utc>,
    pub message: String,
}

pub struct BoardController<P: BoardPersistence + 'static> {
    store: BoardStore,
    tracker: DragTracker,
    shadow: Option<BoardSnapshot>,
    persistence: Arc<P>,
    options: ControllerOptions,
    tx: mpsc::UnboundedSender<Settlement>,
    rx: mpsc::UnboundedReceiver<Settlement>,
    /// Store versions of commits still awaiting persistence
    pending: BTreeSet<u64>,
    notices: Vec<Notice>,
}

impl<P: BoardPersistence + 'static> BoardController<P> {
    pub fn new(persistence: Arc<P>, snapshot: BoardSnapshot, options: ControllerOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store: BoardStore::new(snapshot),
            tracker: DragTracker::new(),
            shadow: None,
            persistence,
            options,
            tx,
            rx,
            pending: BTreeSet::new(),
            notices: Vec::new(),
        }
    }

    /// Fetch the board for `project_id` from persistence and wrap it
    pub async fn open(
        persistence: Arc<P>,
        project_id: &ProjectId,
        options: ControllerOptions,
    ) -> Result<Self> {
        let snapshot = persistence.load_board(project_id).await?;
        Ok(Self::new(persistence, snapshot, options))
    }

    /// Replace the board wholesale. Any drag in progress is cancelled first.
    pub fn load(&mut self, snapshot: BoardSnapshot) {
        if self.tracker.is_active() {
            debug!("cancelling drag before board reload");
            self.drag_cancel();
        }
        self.store.load(snapshot);
    }

    /// Re-read the board from persistence
    pub async fn reload(&mut self) -> Result<()> {
        let project_id = self.store.snapshot().project_id.clone();
        let snapshot = self.persistence.load_board(&project_id).await?;
        self.load(snapshot);
        Ok(())
    }

    pub fn snapshot(&self) -> &BoardSnapshot {
        self.store.snapshot()
    }

    pub fn version(&self) -> u64 {
        self.store.version()
    }

    /// What to render: the drag preview if one is showing, else the board
    pub fn view(&self) -> &BoardSnapshot {
        self.shadow.as_ref().unwrap_or_else(|| self.store.snapshot())
    }

    pub fn drag_session(&self) -> Option<&DragSession> {
        self.tracker.session()
    }

    pub fn options(&self) -> ControllerOptions {
        self.options
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn drag_start(&mut self, task_id: &str) -> bool {
        self.shadow = None;
        self.tracker.start(self.store.snapshot(), task_id)
    }

    /// Pointer moved over `target_id` (a column or task id)
    pub fn drag_over(&mut self, target_id: &str) -> bool {
        if !self.tracker.over(target_id) {
            return false;
        }
        self.refresh_preview();
        true
    }

    /// Pointer left every drop target
    pub fn drag_leave(&mut self) {
        self.tracker.clear_over();
        self.refresh_preview();
    }

    pub fn drag_cancel(&mut self) {
        self.tracker.cancel();
        self.shadow = None;
    }

    /// Finish the drag: classify, apply locally, and send to persistence.
    /// The session is cleared whatever the outcome.
    pub fn drag_end(&mut self) -> Intent {
        self.shadow = None;
        let Some(session) = self.tracker.end() else {
            return Intent::NoOp;
        };
        let intent = classify(self.store.snapshot(), &session, self.options.enforce_task_limits);
        if intent == Intent::NoOp {
            return intent;
        }
        let before = self.store.snapshot().clone();
        match self.store.apply_committed_change(&intent) {
            Ok(version) => {
                info!(?intent, version, "drop committed locally");
                self.dispatch(Commit::Gesture(intent.clone()), version, before);
                intent
            }
            Err(err) => {
                debug!(%err, "drop could not be applied");
                Intent::NoOp
            }
        }
    }

    /// Optimistically append a task to `column_id` and persist it
    pub fn add_task(&mut self, column_id: &ColumnId, new_task: NewTask) -> Result<TaskId> {
        let column = self
            .store
            .snapshot()
            .column(column_id)
            .ok_or_else(|| BoardError::column_not_found(column_id.as_str()))?;
        if self.options.enforce_task_limits && column.is_full() {
            return Err(BoardError::ColumnFull {
                id: column_id.to_string(),
                limit: column.task_limit.unwrap_or_default(),
            });
        }
        let task = new_task.into_task(TaskId::generate(), column_id.clone());
        let task_id = task.id.clone();
        let before = self.store.snapshot().clone();
        let version = self.store.insert_task(column_id, task.clone())?;
        self.dispatch(
            Commit::Add {
                column_id: column_id.clone(),
                task,
            },
            version,
            before,
        );
        Ok(task_id)
    }

    /// Optimistically remove a task and persist the deletion
    pub fn delete_task(&mut self, task_id: &TaskId) -> Result<()> {
        if self
            .tracker
            .session()
            .is_some_and(|s| &s.active_task_id == task_id)
        {
            self.drag_cancel();
        }
        let column_id = self
            .store
            .snapshot()
            .locate(task_id)
            .map(|(ci, _)| self.store.snapshot().columns[ci].id.clone())
            .ok_or_else(|| BoardError::task_not_found(task_id.as_str()))?;
        let before = self.store.snapshot().clone();
        let (_, version) = self.store.remove_task(task_id)?;
        self.dispatch(
            Commit::Delete {
                column_id,
                task_id: task_id.clone(),
            },
            version,
            before,
        );
        Ok(())
    }

    /// Wait for the next in-flight commit to finish and apply its outcome.
    /// Returns `None` when nothing is in flight.
    pub async fn next_settlement(&mut self) -> Option<SettleOutcome> {
        if self.pending.is_empty() {
            return None;
        }
        let settlement = self.rx.recv().await?;
        Some(self.settle(settlement))
    }

    /// Wait for every in-flight commit
    pub async fn settle_all(&mut self) -> Vec<SettleOutcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.next_settlement().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Apply whatever has already completed without waiting
    pub fn drain_settlements(&mut self) -> Vec<SettleOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(settlement) = self.rx.try_recv() {
            outcomes.push(self.settle(settlement));
        }
        outcomes
    }

    fn refresh_preview(&mut self) {
        let mode = self.options.reorder_preview;
        let base = self.store.snapshot();
        let Some(session) = self.tracker.session_mut() else {
            self.shadow = None;
            return;
        };
        let shadow = preview(base, session, mode);
        session.preview_applied = &shadow != base;
        self.shadow = Some(shadow);
    }

    fn dispatch(&mut self, commit: Commit, version: u64, before: BoardSnapshot) {
        self.pending.insert(version);
        let persistence = Arc::clone(&self.persistence);
        let project_id = before.project_id.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = commit.send(persistence.as_ref(), &project_id).await;
            let settlement = Settlement {
                commit,
                version,
                before,
                result,
            };
            if tx.send(settlement).is_err() {
                debug!("controller dropped before commit settled");
            }
        });
    }

    fn settle(&mut self, settlement: Settlement) -> SettleOutcome {
        let Settlement {
            commit,
            version,
            before,
            result,
        } = settlement;
        self.pending.remove(&version);
        let outcome = match result {
            Ok(None) => SettleOutcome::Acknowledged,
            Ok(Some(board)) => {
                // an older write may not be in this board yet
                let older = self.pending.first().is_some_and(|v| *v < version);
                if older {
                    debug!(version, "confirmation overtook an older commit");
                    SettleOutcome::Stale
                } else if self.store.confirm(version, board) {
                    SettleOutcome::Confirmed
                } else {
                    SettleOutcome::Stale
                }
            }
            Err(err) => {
                warn!(op = commit.label(), %err, "commit failed");
                self.notices.push(Notice {
                    at: Utc::now(),
                    message: format!("{} failed: {err}", commit.label()),
                });
                match self.options.rollback {
                    RollbackPolicy::KeepOptimistic => SettleOutcome::FailedKept,
                    RollbackPolicy::Revert => {
                        if self.store.restore(version, before) {
                            info!(op = commit.label(), "rolled back");
                            SettleOutcome::RolledBack
                        } else {
                            SettleOutcome::FailedStale
                        }
                    }
                }
            }
        };
        if matches!(outcome, SettleOutcome::Confirmed | SettleOutcome::RolledBack) {
            self.rebase_drag();
        }
        outcome
    }

    /// Board changed under an active drag: follow the task or drop the drag
    fn rebase_drag(&mut self) {
        if !self.tracker.is_active() {
            return;
        }
        if self.tracker.rebase(self.store.snapshot()) {
            self.refresh_preview();
        } else {
            self.shadow = None;
        }
    }
}
