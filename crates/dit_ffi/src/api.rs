//! FFI use-case API for the host app and its widget extension.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Compose the configured store backend for every call.
//! - Keep one widget timeline producer per family for the process.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failures surface as `ok = false` envelopes with a message.
//! - Every successful mutation requests a reload of all widget families.

use chrono::Local;
use dit_core::db::open_db;
use dit_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    ContributionAggregator, ContributionWindow, DitConfig, DocumentTodoStore, MemoryTodoStore,
    Palette, SqliteTodoStore, StoreBackend, StoreResult, TodoId, TodoItem, TodoService, TodoStore,
    WidgetFamily, WidgetTimelineProducer, WindowStatus,
};
use log::warn;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock};

static CONFIG: OnceLock<Result<DitConfig, String>> = OnceLock::new();
static MEMORY_STORE: OnceLock<MemoryTodoStore> = OnceLock::new();
static WIDGET_SLOTS: OnceLock<WidgetSlots> = OnceLock::new();
/// Bumped on every reload request; slots compare it before refreshing.
static RELOAD_GENERATION: AtomicU64 = AtomicU64::new(0);

/// One producer per family plus the reload generation it has seen.
struct WidgetSlot {
    producer: WidgetTimelineProducer<Local>,
    seen_generation: u64,
}

impl WidgetSlot {
    fn new(family: WidgetFamily) -> Mutex<Self> {
        Mutex::new(Self {
            producer: WidgetTimelineProducer::new(ContributionAggregator::local(), family),
            seen_generation: RELOAD_GENERATION.load(Ordering::Acquire),
        })
    }
}

struct WidgetSlots {
    small: Mutex<WidgetSlot>,
    medium: Mutex<WidgetSlot>,
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Todo projection handed to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoItemDto {
    pub id: String,
    pub text: String,
    pub is_done: bool,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl From<TodoItem> for TodoItemDto {
    fn from(todo: TodoItem) -> Self {
        Self {
            id: todo.id.to_string(),
            text: todo.text,
            is_done: todo.is_done,
            created_at_ms: todo.created_at,
            updated_at_ms: todo.updated_at,
        }
    }
}

/// Action response envelope for todo mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Todo after the mutation; `None` on failure and after delete.
    pub todo: Option<TodoItemDto>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl TodoActionResponse {
    fn success(message: impl Into<String>, todo: Option<TodoItem>) -> Self {
        Self {
            ok: true,
            todo: todo.map(TodoItemDto::from),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            todo: None,
            message: message.into(),
        }
    }
}

/// Today screen envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodayResponse {
    pub ok: bool,
    pub pending: Vec<TodoItemDto>,
    pub committed_today: Vec<TodoItemDto>,
    /// e.g. `3 todos to commit`.
    pub pending_title: String,
    /// e.g. `2 commits today`.
    pub committed_title: String,
    pub badge_count: u32,
    pub message: String,
}

/// One heat-map cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCellDto {
    /// `yyyy-MM-dd`.
    pub date: String,
    pub commit_count: u32,
    /// `0..=5`.
    pub severity: u8,
    /// `#RRGGBB`, or `None` for an unfilled cell.
    pub color_hex: Option<String>,
    pub detail_label: String,
}

/// Contribution window envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionWindowResponse {
    pub ok: bool,
    /// `true` when storage was unreachable and cells are zero-filled.
    pub degraded: bool,
    /// Oldest first.
    pub cells: Vec<DayCellDto>,
    pub message: String,
}

/// Widget snapshot envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetSnapshotResponse {
    pub ok: bool,
    pub family: String,
    pub generated_at_ms: i64,
    /// Epoch ms when the host should request the next snapshot.
    pub next_refresh_at_ms: i64,
    pub stale: bool,
    pub degraded: bool,
    pub cells: Vec<DayCellDto>,
    pub message: String,
}

/// Adds a pending todo.
///
/// # FFI contract
/// - Sync call, store-backed execution.
/// - Never panics.
/// - Returns the created todo on success.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_add(text: String) -> TodoActionResponse {
    let now = now_ms();
    match with_service(|service| service.add(&text, now)) {
        Ok(todo) => {
            reload_widgets();
            TodoActionResponse::success("Todo added.", Some(todo))
        }
        Err(err) => TodoActionResponse::failure(format!("todo_add failed: {err}")),
    }
}

/// Commits a todo on the current local day.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_commit(id: String) -> TodoActionResponse {
    mutate("todo_commit", "Todo committed.", &id, |service, id| {
        service.commit(id, now_ms()).map(Some)
    })
}

/// Moves a committed todo back to pending.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_reset(id: String) -> TodoActionResponse {
    mutate("todo_reset", "Todo reset.", &id, |service, id| {
        service.reset(id, now_ms()).map(Some)
    })
}

/// Deletes a pending todo. Committed todos are rejected.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_delete(id: String) -> TodoActionResponse {
    mutate("todo_delete", "Todo deleted.", &id, |service, id| {
        service.delete(id).map(|()| None)
    })
}

/// Loads the today screen sections and badge count.
///
/// # FFI contract
/// - Sync call, store-backed execution.
/// - Never panics; failures return empty sections with `ok = false`.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_today() -> TodayResponse {
    let aggregator = ContributionAggregator::local();
    let now = aggregator.now();
    match with_service(|service| service.today(&aggregator, &now)) {
        Ok(view) => TodayResponse {
            ok: true,
            pending_title: view.pending_title(),
            committed_title: view.committed_title(),
            badge_count: u32::try_from(view.badge_count()).unwrap_or(u32::MAX),
            pending: view.pending.into_iter().map(TodoItemDto::from).collect(),
            committed_today: view
                .committed_today
                .into_iter()
                .map(TodoItemDto::from)
                .collect(),
            message: String::new(),
        },
        Err(err) => TodayResponse {
            ok: false,
            pending: Vec::new(),
            committed_today: Vec::new(),
            pending_title: String::new(),
            committed_title: String::new(),
            badge_count: 0,
            message: format!("todo_today failed: {err}"),
        },
    }
}

/// Computes the `days`-long contribution window ending today.
///
/// # FFI contract
/// - Sync call, store-backed execution.
/// - Invalid `days` returns `ok = false`.
/// - Storage failure returns `ok = true, degraded = true` with zero cells.
#[flutter_rust_bridge::frb(sync)]
pub fn contribution_window(days: u32) -> ContributionWindowResponse {
    let aggregator = ContributionAggregator::local();
    let result = with_store(|store| Ok(aggregator.compute_window_now(store, days)));
    let window = match result {
        Ok(Ok(window)) => window,
        Ok(Err(err)) => return window_failure(format!("contribution_window failed: {err}")),
        Err(err) => match aggregator.empty_window(&aggregator.now(), days) {
            Ok(window) => {
                warn!(
                    "event=contribution_window module=ffi status=degraded days={} error={}",
                    days, err
                );
                return ContributionWindowResponse {
                    ok: true,
                    degraded: true,
                    cells: to_cells(&window),
                    message: format!("storage unavailable: {err}"),
                };
            }
            Err(range_err) => {
                return window_failure(format!("contribution_window failed: {range_err}"))
            }
        },
    };

    ContributionWindowResponse {
        ok: true,
        degraded: window.is_degraded(),
        cells: to_cells(&window),
        message: window_message(&window),
    }
}

/// Returns the current snapshot for a widget family (`small|medium`).
///
/// # FFI contract
/// - Sync call; reads storage at most once per refresh interval unless a
///   reload was requested.
/// - Never panics; an unknown family returns `ok = false`.
#[flutter_rust_bridge::frb(sync)]
pub fn widget_snapshot(family: String) -> WidgetSnapshotResponse {
    let Some(family) = WidgetFamily::parse(&family) else {
        return WidgetSnapshotResponse {
            ok: false,
            family,
            generated_at_ms: 0,
            next_refresh_at_ms: 0,
            stale: false,
            degraded: false,
            cells: Vec::new(),
            message: "widget_snapshot failed: expected family small|medium".to_string(),
        };
    };

    let mut slot = lock_slot(family);
    let generation = RELOAD_GENERATION.load(Ordering::Acquire);
    if slot.seen_generation != generation {
        slot.producer.request_reload();
        slot.seen_generation = generation;
    }
    let now = Local::now();
    let producer = &mut slot.producer;
    let (timeline, message) = match with_store(|store| Ok(producer.timeline(store, &now))) {
        Ok(timeline) => (timeline, String::new()),
        Err(err) => {
            warn!(
                "event=widget_snapshot module=ffi status=degraded family={} error={}",
                family.as_str(),
                err
            );
            let message = format!("storage unavailable: {err}");
            (producer.degraded_timeline(&now, &err), message)
        }
    };
    drop(slot);

    match timeline.entries.into_iter().next() {
        Some(entry) => WidgetSnapshotResponse {
            ok: true,
            family: family.as_str().to_string(),
            generated_at_ms: entry.generated_at_ms,
            next_refresh_at_ms: timeline.next_refresh_at_ms,
            stale: entry.stale,
            degraded: entry.window.is_degraded() || !message.is_empty(),
            cells: to_cells(&entry.window),
            message,
        },
        None => WidgetSnapshotResponse {
            ok: false,
            family: family.as_str().to_string(),
            generated_at_ms: 0,
            next_refresh_at_ms: timeline.next_refresh_at_ms,
            stale: false,
            degraded: false,
            cells: Vec::new(),
            message: "widget_snapshot failed: empty timeline".to_string(),
        },
    }
}

/// Requests a recompute for every widget family on its next snapshot.
///
/// Returns empty string on success.
#[flutter_rust_bridge::frb(sync)]
pub fn widget_reload_all() -> String {
    reload_widgets();
    String::new()
}

fn mutate(
    op: &str,
    success_message: &str,
    raw_id: &str,
    f: impl FnOnce(&TodoService<&dyn TodoStore>, TodoId) -> StoreResult<Option<TodoItem>>,
) -> TodoActionResponse {
    let id = match parse_todo_id(raw_id) {
        Ok(id) => id,
        Err(err) => return TodoActionResponse::failure(format!("{op} failed: {err}")),
    };
    match with_service(|service| f(service, id)) {
        Ok(todo) => {
            reload_widgets();
            TodoActionResponse::success(success_message, todo)
        }
        Err(err) => TodoActionResponse::failure(format!("{op} failed: {err}")),
    }
}

fn parse_todo_id(raw: &str) -> Result<TodoId, String> {
    TodoId::parse_str(raw.trim()).map_err(|err| format!("invalid todo id `{raw}`: {err}"))
}

fn resolve_config() -> Result<&'static DitConfig, String> {
    CONFIG
        .get_or_init(|| DitConfig::from_env().map_err(|err| err.to_string()))
        .as_ref()
        .map_err(Clone::clone)
}

/// Runs `f` against the configured backend.
fn with_store<T>(f: impl FnOnce(&dyn TodoStore) -> StoreResult<T>) -> Result<T, String> {
    let config = resolve_config()?;
    match config.backend {
        StoreBackend::Sqlite => {
            let conn = open_db(&config.db_path).map_err(|err| format!("DB open failed: {err}"))?;
            let store = SqliteTodoStore::try_new(&conn)
                .map_err(|err| format!("store init failed: {err}"))?;
            f(&store).map_err(|err| err.to_string())
        }
        StoreBackend::Memory => {
            let store = MEMORY_STORE.get_or_init(MemoryTodoStore::new);
            f(store).map_err(|err| err.to_string())
        }
        StoreBackend::Document => {
            let store = DocumentTodoStore::new(&config.document_path, config.user_id.as_str())
                .map_err(|err| format!("store init failed: {err}"))?;
            f(&store).map_err(|err| err.to_string())
        }
    }
}

fn with_service<T>(
    f: impl FnOnce(&TodoService<&dyn TodoStore>) -> StoreResult<T>,
) -> Result<T, String> {
    with_store(|store| f(&TodoService::new(store)))
}

/// Locks one family's slot. Other families and reload requests never wait
/// on it.
fn lock_slot(family: WidgetFamily) -> MutexGuard<'static, WidgetSlot> {
    let slots = WIDGET_SLOTS.get_or_init(|| WidgetSlots {
        small: WidgetSlot::new(WidgetFamily::Small),
        medium: WidgetSlot::new(WidgetFamily::Medium),
    });
    let slot = match family {
        WidgetFamily::Small => &slots.small,
        WidgetFamily::Medium => &slots.medium,
    };
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn reload_widgets() {
    RELOAD_GENERATION.fetch_add(1, Ordering::AcqRel);
}

fn now_ms() -> i64 {
    Local::now().timestamp_millis()
}

fn to_cells(window: &ContributionWindow) -> Vec<DayCellDto> {
    let palette = Palette::GREEN;
    window
        .buckets
        .iter()
        .map(|bucket| {
            let severity = bucket.severity();
            DayCellDto {
                date: bucket.date.format("%Y-%m-%d").to_string(),
                commit_count: bucket.commit_count,
                severity: severity.level(),
                color_hex: palette.color_for(severity).map(|rgb| rgb.to_hex()),
                detail_label: bucket.detail_label(),
            }
        })
        .collect()
}

fn window_message(window: &ContributionWindow) -> String {
    match &window.status {
        WindowStatus::Fresh => format!("{} commits", window.total_commits()),
        WindowStatus::StorageUnavailable { reason } => {
            format!("storage unavailable: {reason}")
        }
    }
}

fn window_failure(message: String) -> ContributionWindowResponse {
    ContributionWindowResponse {
        ok: false,
        degraded: false,
        cells: Vec::new(),
        message,
    }
}
