use crate::controller::BoardController;
use crate::dispatch::{Intent, SettleOutcome};
use crate::kanban_board::BoardSnapshot;
use crate::persistence::BoardPersistence;
use crate::task::{NewTask, Priority, Task, TaskId};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, MouseButton, MouseEvent, MouseEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame, Terminal,
};
use std::{io, time::Duration};
use tracing::warn;

const HELP: &str =
    "space: grab  arrows: move  enter: drop  esc: cancel  a: add  d: delete  r: reload  q: quit";

/// What the event loop must do after a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    None,
    Quit,
    AddTask,
    Reload,
}

pub struct BoardApp<P: BoardPersistence + 'static> {
    pub controller: BoardController<P>,
    pub selected_column: usize,
    pub selected_task: usize,
    /// Keyboard drop cursor as (column, slot); a slot past the last task
    /// targets the column itself.
    drop_cursor: Option<(usize, usize)>,
    column_areas: Vec<Rect>,
    status: String,
}

impl<P: BoardPersistence + 'static> BoardApp<P> {
    pub fn new(controller: BoardController<P>) -> Self {
        Self {
            controller,
            selected_column: 0,
            selected_task: 0,
            drop_cursor: None,
            column_areas: Vec::new(),
            status: HELP.into(),
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    fn board(&self) -> &BoardSnapshot {
        self.controller.snapshot()
    }

    fn column_len(&self, column: usize) -> usize {
        self.board().columns.get(column).map_or(0, |c| c.tasks.len())
    }

    pub fn selected_task_id(&self) -> Option<TaskId> {
        self.board()
            .columns
            .get(self.selected_column)?
            .tasks
            .get(self.selected_task)
            .map(|t| t.id.clone())
    }

    pub fn handle_key(&mut self, code: KeyCode) -> UiAction {
        if self.controller.drag_session().is_some() {
            match code {
                KeyCode::Left => self.move_drop_cursor(-1, 0),
                KeyCode::Right => self.move_drop_cursor(1, 0),
                KeyCode::Up => self.move_drop_cursor(0, -1),
                KeyCode::Down => self.move_drop_cursor(0, 1),
                KeyCode::Enter | KeyCode::Char(' ') => self.drop_task(),
                KeyCode::Esc => {
                    self.controller.drag_cancel();
                    self.drop_cursor = None;
                    self.status = "drag cancelled".into();
                }
                _ => {}
            }
            return UiAction::None;
        }

        match key_action(code) {
            UiAction::None => {}
            action => return action,
        }
        let columns = self.board().columns.len();
        match code {
            KeyCode::Left => {
                self.selected_column = self.selected_column.saturating_sub(1);
                self.clamp_selection();
            }
            KeyCode::Right => {
                if self.selected_column + 1 < columns {
                    self.selected_column += 1;
                }
                self.clamp_selection();
            }
            KeyCode::Up => self.selected_task = self.selected_task.saturating_sub(1),
            KeyCode::Down => {
                if self.selected_task + 1 < self.column_len(self.selected_column) {
                    self.selected_task += 1;
                }
            }
            KeyCode::Char(' ') => self.grab_selected(),
            KeyCode::Char('d') => self.delete_selected(),
            _ => {}
        }
        UiAction::None
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let Some((column, row)) = self.hit_cell(mouse.column, mouse.row) else {
                    return;
                };
                self.selected_column = column;
                if let Some(row) = row.filter(|r| *r < self.column_len(column)) {
                    self.selected_task = row;
                    self.grab_selected();
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                match self.hit_target(mouse.column, mouse.row) {
                    Some(target) => {
                        self.controller.drag_over(&target);
                    }
                    None => self.controller.drag_leave(),
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if self.controller.drag_session().is_some() {
                    self.drop_task();
                }
            }
            _ => {}
        }
    }

    /// Column index and row inside it under a screen cell. The row is `None`
    /// on the column border.
    fn hit_cell(&self, x: u16, y: u16) -> Option<(usize, Option<usize>)> {
        let column = self.column_areas.iter().position(|area| {
            x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
        })?;
        let area = self.column_areas[column];
        let row = (y > area.y && y + 1 < area.y + area.height).then(|| usize::from(y - area.y - 1));
        Some((column, row))
    }

    /// Drop target id under a screen cell, hit-tested against what is rendered
    pub fn hit_target(&self, x: u16, y: u16) -> Option<String> {
        let (column, row) = self.hit_cell(x, y)?;
        let view = self.controller.view().columns.get(column)?;
        match row.and_then(|r| view.tasks.get(r)) {
            Some(task) => Some(task.id.to_string()),
            None => Some(view.id.to_string()),
        }
    }

    pub fn set_column_areas(&mut self, areas: Vec<Rect>) {
        self.column_areas = areas;
    }

    fn clamp_selection(&mut self) {
        let len = self.column_len(self.selected_column);
        self.selected_task = self.selected_task.min(len.saturating_sub(1));
    }

    fn grab_selected(&mut self) {
        let Some(task_id) = self.selected_task_id() else {
            return;
        };
        if self.controller.drag_start(task_id.as_str()) {
            self.drop_cursor = Some((self.selected_column, self.selected_task));
            self.status = format!("dragging {task_id}");
        }
    }

    fn move_drop_cursor(&mut self, dx: isize, dy: isize) {
        let Some((column, slot)) = self.drop_cursor else {
            return;
        };
        let columns = self.board().columns.len();
        let column = column
            .saturating_add_signed(dx)
            .min(columns.saturating_sub(1));
        let len = self.column_len(column);
        let slot = slot.saturating_add_signed(dy).min(len);
        self.drop_cursor = Some((column, slot));

        let target = {
            let col = &self.board().columns[column];
            col.tasks
                .get(slot)
                .map_or_else(|| col.id.to_string(), |t| t.id.to_string())
        };
        let dragging_self = self
            .controller
            .drag_session()
            .is_some_and(|s| s.active_task_id == *target.as_str());
        if dragging_self {
            self.controller.drag_leave();
        } else {
            self.controller.drag_over(&target);
        }
    }

    fn drop_task(&mut self) {
        let task_id = self.controller.drag_session().map(|s| s.active_task_id.clone());
        self.drop_cursor = None;
        let intent = self.controller.drag_end();
        self.status = describe(&intent);
        if let Some((ci, ti)) = task_id.and_then(|id| self.board().locate(&id)) {
            self.selected_column = ci;
            self.selected_task = ti;
        }
    }

    fn delete_selected(&mut self) {
        let Some(task_id) = self.selected_task_id() else {
            return;
        };
        match self.controller.delete_task(&task_id) {
            Ok(()) => self.status = format!("deleted {task_id}"),
            Err(err) => self.status = err.to_string(),
        }
        self.clamp_selection();
    }

    pub fn add_task(&mut self, new_task: NewTask) {
        let column = self.board().columns.get(self.selected_column);
        let Some(column_id) = column.map(|c| c.id.clone()) else {
            return;
        };
        match self.controller.add_task(&column_id, new_task) {
            Ok(id) => self.status = format!("added {id}"),
            Err(err) => self.status = err.to_string(),
        }
    }

    /// Fold finished commits into the board and surface failures
    pub fn absorb_settlements(&mut self) {
        let outcomes = self.controller.drain_settlements();
        if outcomes.is_empty() {
            return;
        }
        if let Some(notice) = self.controller.take_notices().pop() {
            self.status = notice.message;
        } else if outcomes.contains(&SettleOutcome::Confirmed) {
            self.status = "saved".into();
        }
        self.clamp_selection();
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(f.area());

        let view = self.controller.view();
        let count = view.columns.len().max(1) as u32;
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, count); view.columns.len()])
            .split(rows[0]);

        let dragging = self.controller.drag_session().map(|s| s.active_task_id.clone());
        let drop_column = self.drop_cursor.map(|(c, _)| c);

        for (i, column) in view.columns.iter().enumerate() {
            let items: Vec<ListItem> = column
                .tasks
                .iter()
                .enumerate()
                .map(|(ti, task)| {
                    let style = if dragging.as_ref() == Some(&task.id) {
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                    } else if dragging.is_none()
                        && i == self.selected_column
                        && ti == self.selected_task
                    {
                        Style::default().add_modifier(Modifier::REVERSED)
                    } else {
                        Style::default().fg(Color::White)
                    };
                    task_item(task, style)
                })
                .collect();

            let title = match column.task_limit {
                Some(limit) => format!("{} ({}/{})", column.title, column.tasks.len(), limit),
                None => format!("{} ({})", column.title, column.tasks.len()),
            };
            let border = if drop_column == Some(i) {
                Style::default().fg(Color::Yellow)
            } else if self.selected_column == i {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            let list = List::new(items).block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(border),
            );
            f.render_widget(list, chunks[i]);
        }

        let mut footer = vec![Span::raw(self.status.clone())];
        if self.controller.in_flight() > 0 {
            footer.push(Span::styled(
                format!("  [saving {}]", self.controller.in_flight()),
                Style::default().fg(Color::DarkGray),
            ));
        }
        if let Some(notice) = self.controller.notices().last() {
            footer.push(Span::styled(
                format!("  {}", notice.message),
                Style::default().fg(Color::Red),
            ));
        }
        f.render_widget(Paragraph::new(Line::from(footer)), rows[1]);

        self.column_areas = chunks.to_vec();
    }
}

fn key_action(code: KeyCode) -> UiAction {
    match code {
        KeyCode::Char('q') => UiAction::Quit,
        KeyCode::Char('a') => UiAction::AddTask,
        KeyCode::Char('r') => UiAction::Reload,
        _ => UiAction::None,
    }
}

fn task_item(task: &Task, style: Style) -> ListItem<'_> {
    let mut spans = Vec::new();
    if let Some(priority) = task.priority {
        let color = match priority {
            Priority::Low => Color::Gray,
            Priority::Medium => Color::Blue,
            Priority::High => Color::Magenta,
            Priority::Urgent => Color::Red,
        };
        spans.push(Span::styled(
            format!("[{}] ", format!("{priority:?}").to_lowercase()),
            Style::default().fg(color),
        ));
    }
    spans.push(Span::styled(task.title.as_str(), style));
    for tag in &task.tags {
        spans.push(Span::styled(format!(" #{tag}"), Style::default().fg(Color::Green)));
    }
    ListItem::new(Line::from(spans))
}

pub fn describe(intent: &Intent) -> String {
    match intent {
        Intent::NoOp => "nothing to move".into(),
        Intent::CrossColumnMove {
            task_id,
            source_column_id,
            target_column_id,
            ..
        } => format!("moved {task_id} from {source_column_id} to {target_column_id}"),
        Intent::SameColumnReorder {
            column_id,
            task_id,
            new_index,
        } => format!("moved {task_id} to position {} in {column_id}", new_index + 1),
    }
}

pub async fn run_app<B: Backend, P: BoardPersistence + 'static>(
    terminal: &mut Terminal<B>,
    app: &mut BoardApp<P>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| app.draw(f))?;
        app.absorb_settlements();

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match app.handle_key(key.code) {
                UiAction::Quit => return Ok(()),
                UiAction::AddTask => {
                    if let Some(title) = prompt("Enter task title").filter(|t| !t.is_empty()) {
                        let mut new_task = NewTask::new(title);
                        let priority = prompt("Priority (low/medium/high/urgent, blank for none)")
                            .and_then(|p| p.parse::<Priority>().ok());
                        if let Some(priority) = priority {
                            new_task = new_task.with_priority(priority);
                        }
                        app.add_task(new_task);
                    }
                    terminal.clear()?;
                }
                UiAction::Reload => {
                    if let Err(err) = app.controller.reload().await {
                        warn!(%err, "reload failed");
                        app.status = err.to_string();
                    }
                }
                UiAction::None => {}
            },
            Event::Mouse(mouse) => app.handle_mouse(mouse),
            _ => {}
        }
    }
}

fn prompt(message: &str) -> Option<String> {
    disable_raw_mode().ok();
    println!("{}", message);
    let mut input = String::new();
    let result = io::stdin().read_line(&mut input);
    enable_raw_mode().ok();
    result.ok().map(|_| input.trim().to_string())
}
