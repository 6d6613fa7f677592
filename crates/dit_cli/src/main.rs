//! `dit` command-line entry point.
//!
//! # Responsibility
//! - Compose a store backend from environment and flags.
//! - Run todo use cases and print the contribution graph or widget grid.

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand, ValueEnum};
use dit_core::db::open_db;
use dit_core::{
    init_logging_from_config, ContributionAggregator, DitConfig, DocumentTodoStore,
    MemoryTodoStore, SqliteTodoStore, StoreBackend, TodoId, TodoItem, TodoListQuery, TodoService,
    TodoStore, WidgetFamily, WidgetTimelineProducer, PROFILE_WINDOW_DAYS,
};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

mod render;

const DEFAULT_MAX_TICK_WAIT_SECS: u64 = 60;

#[derive(Parser)]
#[command(name = "dit", version, about = "Todos drawn as a contribution graph")]
struct Cli {
    /// SQLite database path (overrides DIT_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Log level (overrides DIT_LOG_LEVEL)
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevelArg>,
    /// Absolute log directory (overrides DIT_LOG_DIR)
    #[arg(long, global = true)]
    log_dir: Option<String>,
    /// Storage backend (overrides DIT_BACKEND)
    #[arg(long, global = true, value_enum)]
    backend: Option<BackendArg>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a pending todo
    Add {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Commit a todo today
    Commit { id: String },
    /// Move a committed todo back to pending
    Reset { id: String },
    /// Delete a pending todo
    Delete { id: String },
    /// Show today's todos
    List {
        /// List every todo instead of today's sections
        #[arg(long)]
        all: bool,
    },
    /// Print per-day commit counts
    Graph {
        #[arg(long, default_value_t = PROFILE_WINDOW_DAYS)]
        days: u32,
    },
    /// Render the widget grid, refreshing on the widget schedule
    Widget {
        #[arg(long, value_enum, default_value = "small")]
        family: FamilyArg,
        /// Number of snapshots to render
        #[arg(long, default_value_t = 1)]
        ticks: u32,
        /// Longest pause between ticks; the widget itself may ask to wait
        /// until local midnight
        #[arg(long, default_value_t = DEFAULT_MAX_TICK_WAIT_SECS)]
        max_wait_secs: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Sqlite,
    Memory,
    Document,
}

impl From<BackendArg> for StoreBackend {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::Sqlite => StoreBackend::Sqlite,
            BackendArg::Memory => StoreBackend::Memory,
            BackendArg::Document => StoreBackend::Document,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevelArg {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevelArg {
    fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FamilyArg {
    Small,
    Medium,
}

impl From<FamilyArg> for WidgetFamily {
    fn from(value: FamilyArg) -> Self {
        match value {
            FamilyArg::Small => WidgetFamily::Small,
            FamilyArg::Medium => WidgetFamily::Medium,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = resolve_config(&cli)?;
    init_logging_from_config(&config)?;

    match config.backend {
        StoreBackend::Sqlite => {
            let conn = open_db(&config.db_path)?;
            let store = SqliteTodoStore::try_new(&conn)?;
            execute(cli.command, &store)
        }
        StoreBackend::Memory => execute(cli.command, &MemoryTodoStore::new()),
        StoreBackend::Document => {
            let store = DocumentTodoStore::new(&config.document_path, config.user_id.as_str())?;
            execute(cli.command, &store)
        }
    }
}

/// Environment first, flags on top.
fn resolve_config(cli: &Cli) -> Result<DitConfig, Box<dyn Error>> {
    let mut config = DitConfig::from_env()?;
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(level) = cli.log_level {
        config.log_level = level.as_str();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    if let Some(backend) = cli.backend {
        config.backend = backend.into();
    }
    Ok(config)
}

fn execute(command: Commands, store: &dyn TodoStore) -> Result<(), Box<dyn Error>> {
    let service = TodoService::new(store);
    let aggregator = ContributionAggregator::local();

    match command {
        Commands::Add { text } => {
            let todo = service.add(&text.join(" "), now_ms())?;
            println!("added {}", render::todo_line(&todo));
        }
        Commands::Commit { id } => {
            let todo = service.commit(parse_id(&id)?, now_ms())?;
            println!("committed {}", render::todo_line(&todo));
        }
        Commands::Reset { id } => {
            let todo = service.reset(parse_id(&id)?, now_ms())?;
            println!("reset {}", render::todo_line(&todo));
        }
        Commands::Delete { id } => {
            let id = parse_id(&id)?;
            service.delete(id)?;
            println!("deleted {id}");
        }
        Commands::List { all: true } => {
            for todo in service.list(&TodoListQuery::default())? {
                println!("{}", render::todo_line(&todo));
            }
        }
        Commands::List { all: false } => {
            let view = service.today(&aggregator, &aggregator.now())?;
            print_section(&view.pending_title(), &view.pending);
            println!();
            print_section(&view.committed_title(), &view.committed_today);
        }
        Commands::Graph { days } => {
            let window = aggregator.compute_window_now(store, days)?;
            print!("{}", render::graph(&window));
        }
        Commands::Widget {
            family,
            ticks,
            max_wait_secs,
        } => run_widget(
            store,
            aggregator,
            family.into(),
            ticks,
            Duration::from_secs(max_wait_secs),
        ),
    }

    info!("event=cli_command module=cli status=ok");
    Ok(())
}

/// Plays the host scheduler: render, then sleep until the requested refresh.
fn run_widget(
    store: &dyn TodoStore,
    aggregator: ContributionAggregator<Local>,
    family: WidgetFamily,
    ticks: u32,
    max_wait: Duration,
) {
    let mut producer = WidgetTimelineProducer::new(aggregator, family);
    for tick in 0..ticks {
        let now = Local::now();
        let timeline = producer.timeline(store, &now);
        for entry in &timeline.entries {
            print!("{}", render::widget(entry));
        }
        let next = Local
            .timestamp_millis_opt(timeline.next_refresh_at_ms)
            .earliest()
            .map_or_else(|| timeline.next_refresh_at_ms.to_string(), |at| at.to_rfc3339());
        println!("next refresh at {next}");

        if tick + 1 < ticks {
            std::thread::sleep(tick_wait(timeline.next_refresh_at_ms, now_ms(), max_wait));
        }
    }
}

/// Time until `next_refresh_at_ms`, never negative and never above `max_wait`.
fn tick_wait(next_refresh_at_ms: i64, now_ms: i64, max_wait: Duration) -> Duration {
    let until_refresh = u64::try_from(next_refresh_at_ms - now_ms).unwrap_or(0);
    Duration::from_millis(until_refresh).min(max_wait)
}

fn print_section(title: &str, todos: &[TodoItem]) {
    println!("{title}");
    for todo in todos {
        println!("  {}", render::todo_line(todo));
    }
}

fn parse_id(raw: &str) -> Result<TodoId, Box<dyn Error>> {
    TodoId::parse_str(raw.trim()).map_err(|err| format!("invalid todo id `{raw}`: {err}").into())
}

fn now_ms() -> i64 {
    Local::now().timestamp_millis()
}
