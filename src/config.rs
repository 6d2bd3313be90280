//! Board configuration, stored as `.kanban_config.json`.

use crate::dispatch::RollbackPolicy;
use crate::error::{BoardError, Result};
use crate::preview::ReorderPreview;
use crate::task::ProjectId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project_id: ProjectId,
    pub board_file: PathBuf,
    pub rollback: RollbackPolicy,
    pub reorder_preview: ReorderPreview,
    pub enforce_task_limits: bool,
    pub log_file: PathBuf,
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_id: ProjectId::from("default"),
            board_file: PathBuf::from("kanban_board.json"),
            rollback: RollbackPolicy::default(),
            reorder_preview: ReorderPreview::default(),
            enforce_task_limits: true,
            log_file: PathBuf::from("taskers.log"),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    pub const FILE_NAME: &'static str = ".kanban_config.json";

    /// Read the config at `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| BoardError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Write a default config into `dir`. Returns false if one already exists.
    pub fn init(dir: &Path) -> Result<bool> {
        let config_path = dir.join(Self::FILE_NAME);
        if config_path.exists() {
            return Ok(false);
        }
        fs::create_dir_all(dir)?;
        fs::write(&config_path, serde_json::to_string_pretty(&Self::default())?)?;
        Ok(true)
    }

    /// Resolve relative paths against the directory holding the config
    pub fn rooted_at(mut self, dir: &Path) -> Self {
        if self.board_file.is_relative() {
            self.board_file = dir.join(&self.board_file);
        }
        if self.log_file.is_relative() {
            self.log_file = dir.join(&self.log_file);
        }
        self
    }
}
