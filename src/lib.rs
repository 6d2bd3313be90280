//! Kanban board engine with optimistic drag-and-drop reconciliation.
//!
//! The board is held by a [`BoardController`], which owns the committed
//! snapshot, the single active drag session and its preview, and the writes
//! in flight to a [`BoardPersistence`] backend.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskers::{BoardController, ControllerOptions, JsonFilePersistence, ProjectId};
//!
//! # async fn example() -> taskers::Result<()> {
//! let persistence = Arc::new(JsonFilePersistence::new("kanban_board.json"));
//! let project = ProjectId::from("demo");
//! let mut board =
//!     BoardController::open(persistence, &project, ControllerOptions::default()).await?;
//!
//! if board.drag_start("task-1") {
//!     board.drag_over("done");
//!     let intent = board.drag_end();
//!     println!("{intent:?}");
//! }
//! board.settle_all().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod drag;
mod error;
pub mod kanban_board;
pub mod persistence;
pub mod preview;
pub mod task;
pub mod ui;

pub use config::Config;
pub use controller::{BoardController, ControllerOptions, Notice};
pub use dispatch::{classify, Intent, RollbackPolicy, SettleOutcome};
pub use drag::{DragSession, DragState, DragTracker};
pub use error::{BoardError, Result};
pub use kanban_board::{BoardSnapshot, BoardStore, Column};
pub use persistence::{BoardPersistence, JsonFilePersistence, MemoryPersistence};
pub use preview::{preview, ReorderPreview};
pub use task::{ColumnId, NewTask, Priority, ProjectId, Task, TaskId};
