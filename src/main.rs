use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fs::OpenOptions,
    io,
    path::PathBuf,
    sync::{Arc, Mutex},
};
use taskers::{
    ui::{self, BoardApp},
    BoardController, Config, ControllerOptions, JsonFilePersistence, NewTask, Priority,
    SettleOutcome, TaskId,
};
use tracing_subscriber::{fmt::writer::BoxMakeWriter, EnvFilter};

#[derive(Parser)]
#[command(name = "taskers", version, about = "Terminal Kanban board")]
struct Cli {
    /// Directory holding the board and its config
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Config file (defaults to <dir>/.kanban_config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a board in the directory
    Init,
    /// Print the board
    Show,
    /// Add a task to a column
    Add {
        column: String,
        title: String,
        #[arg(short = 'D', long)]
        description: Option<String>,
        #[arg(short, long)]
        priority: Option<Priority>,
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// Drop a task onto a column or onto another task
    Move { task: String, target: String },
    /// Delete a task
    Delete { task: String },
    /// Interactive board (default)
    Tui,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut cli = Cli::parse();
    let command = cli.command.take().unwrap_or(Commands::Tui);

    match command {
        Commands::Init => {
            if Config::init(&cli.dir)? {
                println!("Kanban initialized in {}", cli.dir.display());
            } else {
                println!("Kanban already initialized in this directory.");
            }
        }
        Commands::Show => print_board(&open_board(&cli, false).await?),
        Commands::Add {
            column,
            title,
            description,
            priority,
            tags,
        } => {
            let mut board = open_board(&cli, false).await?;
            let mut new_task = NewTask::new(title);
            new_task.description = description;
            new_task.priority = priority;
            new_task.tags.extend(tags);
            let id = board.add_task(&column.into(), new_task)?;
            report(&mut board).await?;
            println!("Added {id}");
        }
        Commands::Move { task, target } => {
            let mut board = open_board(&cli, false).await?;
            if !board.drag_start(&task) {
                return Err(format!("task not found: {task}").into());
            }
            board.drag_over(&target);
            let intent = board.drag_end();
            report(&mut board).await?;
            println!("{}", ui::describe(&intent));
        }
        Commands::Delete { task } => {
            let mut board = open_board(&cli, false).await?;
            board.delete_task(&TaskId::from(task.as_str()))?;
            report(&mut board).await?;
            println!("Deleted {task}");
        }
        Commands::Tui => run_tui(open_board(&cli, true).await?).await?,
    }
    Ok(())
}

/// Load config, start logging, and open the configured board
async fn open_board(
    cli: &Cli,
    tui: bool,
) -> Result<BoardController<JsonFilePersistence>, Box<dyn std::error::Error>> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.dir.join(Config::FILE_NAME));
    let config = Config::load(&config_path)?.rooted_at(&cli.dir);
    init_tracing(&config, tui)?;

    let persistence = Arc::new(JsonFilePersistence::new(&config.board_file));
    let options = ControllerOptions::from(&config);
    Ok(BoardController::open(persistence, &config.project_id, options).await?)
}

fn init_tracing(config: &Config, to_file: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    // the TUI owns the terminal, so logs go to a file while it runs
    let writer = if to_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)?;
        BoxMakeWriter::new(Mutex::new(file))
    } else {
        BoxMakeWriter::new(io::stderr)
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(!to_file)
        .init();
    Ok(())
}

/// Wait for pending writes and turn a failed commit into an error
async fn report(
    board: &mut BoardController<JsonFilePersistence>,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcomes = board.settle_all().await;
    let failed = outcomes.iter().any(|o| {
        matches!(
            o,
            SettleOutcome::FailedKept | SettleOutcome::RolledBack | SettleOutcome::FailedStale
        )
    });
    match board.take_notices().pop() {
        Some(notice) if failed => Err(notice.message.into()),
        _ => Ok(()),
    }
}

fn print_board(board: &BoardController<JsonFilePersistence>) {
    for column in &board.snapshot().columns {
        match column.task_limit {
            Some(limit) => println!(
                "{} [{}] ({}/{}):",
                column.title,
                column.id,
                column.tasks.len(),
                limit
            ),
            None => println!("{} [{}]:", column.title, column.id),
        }
        for task in &column.tasks {
            let tags: Vec<&str> = task.tags.iter().map(String::as_str).collect();
            println!("- [{}] {} ({})", task.id, task.title, tags.join(", "));
        }
    }
}

async fn run_tui(
    board: BoardController<JsonFilePersistence>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = BoardApp::new(board);
    let result = ui::run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // Let pending writes land before exiting
    app.controller.settle_all().await;

    if let Err(err) = result {
        eprintln!("{:?}", err);
    }
    Ok(())
}
