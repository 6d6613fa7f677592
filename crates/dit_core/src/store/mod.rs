//! Todo storage contract and its interchangeable backends.
//!
//! # Responsibility
//! - Define the `TodoStore` capability set consumed by services and the
//!   contribution aggregator.
//! - Provide flat in-memory, SQLite and JSON document implementations.
//!
//! # Invariants
//! - Write paths call `TodoItem::validate()` before persisting.
//! - A committed todo (`is_done == true`) cannot be deleted.
//! - `query_done_between` uses half-open `[start, end)` on `updated_at`.
//! - Every backend returns list results ordered by `created_at ASC, id ASC`.

use crate::db::DbError;
use crate::model::todo::{TodoId, TodoItem, TodoValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod document;
pub mod memory;
pub mod sqlite;

pub use document::DocumentTodoStore;
pub use memory::MemoryTodoStore;
pub use sqlite::SqliteTodoStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage error shared by every backend.
#[derive(Debug)]
pub enum StoreError {
    Validation(TodoValidationError),
    Db(DbError),
    Io(std::io::Error),
    Serde(serde_json::Error),
    NotFound(TodoId),
    /// Deleting is only allowed while a todo is still pending.
    AlreadyCommitted(TodoId),
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "todo document io failed: {err}"),
            Self::Serde(err) => write!(f, "todo document decode failed: {err}"),
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::AlreadyCommitted(id) => {
                write!(f, "todo {id} is committed; reset it before deleting")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted todo data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Serde(err) => Some(err),
            Self::NotFound(_) | Self::AlreadyCommitted(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<TodoValidationError> for StoreError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

/// List filter for todo queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TodoListQuery {
    /// `Some(done)` restricts to one state; `None` lists everything.
    pub is_done: Option<bool>,
}

impl TodoListQuery {
    pub fn pending() -> Self {
        Self {
            is_done: Some(false),
        }
    }

    pub fn committed() -> Self {
        Self { is_done: Some(true) }
    }

    fn matches(&self, item: &TodoItem) -> bool {
        self.is_done.map_or(true, |done| item.is_done == done)
    }
}

/// Storage capability set for todo records.
///
/// Timestamps are Unix epoch milliseconds supplied by the caller, so backends
/// never read the clock themselves.
pub trait TodoStore {
    /// Creates one pending todo and returns the persisted record.
    fn create_todo(&self, text: &str, at: i64) -> StoreResult<TodoItem>;
    /// Commits (`done = true`) or resets (`done = false`) a todo at `at`.
    ///
    /// Setting the current state again is a no-op and keeps `updated_at`.
    fn set_done(&self, id: TodoId, done: bool, at: i64) -> StoreResult<TodoItem>;
    /// Deletes a pending todo.
    fn delete_todo(&self, id: TodoId) -> StoreResult<()>;
    fn get_todo(&self, id: TodoId) -> StoreResult<Option<TodoItem>>;
    fn list_todos(&self, query: &TodoListQuery) -> StoreResult<Vec<TodoItem>>;
    /// Returns done todos whose `updated_at` falls in `[start_ms, end_ms)`.
    fn query_done_between(&self, start_ms: i64, end_ms: i64) -> StoreResult<Vec<TodoItem>>;
}

impl<S: TodoStore + ?Sized> TodoStore for &S {
    fn create_todo(&self, text: &str, at: i64) -> StoreResult<TodoItem> {
        (**self).create_todo(text, at)
    }

    fn set_done(&self, id: TodoId, done: bool, at: i64) -> StoreResult<TodoItem> {
        (**self).set_done(id, done, at)
    }

    fn delete_todo(&self, id: TodoId) -> StoreResult<()> {
        (**self).delete_todo(id)
    }

    fn get_todo(&self, id: TodoId) -> StoreResult<Option<TodoItem>> {
        (**self).get_todo(id)
    }

    fn list_todos(&self, query: &TodoListQuery) -> StoreResult<Vec<TodoItem>> {
        (**self).list_todos(query)
    }

    fn query_done_between(&self, start_ms: i64, end_ms: i64) -> StoreResult<Vec<TodoItem>> {
        (**self).query_done_between(start_ms, end_ms)
    }
}

impl<S: TodoStore + ?Sized> TodoStore for Box<S> {
    fn create_todo(&self, text: &str, at: i64) -> StoreResult<TodoItem> {
        (**self).create_todo(text, at)
    }

    fn set_done(&self, id: TodoId, done: bool, at: i64) -> StoreResult<TodoItem> {
        (**self).set_done(id, done, at)
    }

    fn delete_todo(&self, id: TodoId) -> StoreResult<()> {
        (**self).delete_todo(id)
    }

    fn get_todo(&self, id: TodoId) -> StoreResult<Option<TodoItem>> {
        (**self).get_todo(id)
    }

    fn list_todos(&self, query: &TodoListQuery) -> StoreResult<Vec<TodoItem>> {
        (**self).list_todos(query)
    }

    fn query_done_between(&self, start_ms: i64, end_ms: i64) -> StoreResult<Vec<TodoItem>> {
        (**self).query_done_between(start_ms, end_ms)
    }
}

/// Applies the shared state-transition rules to an in-memory collection.
///
/// Used by the flat and document backends, which both hold a `Vec`.
fn apply_set_done(
    todos: &mut [TodoItem],
    id: TodoId,
    done: bool,
    at: i64,
) -> StoreResult<(TodoItem, bool)> {
    let todo = todos
        .iter_mut()
        .find(|todo| todo.id == id)
        .ok_or(StoreError::NotFound(id))?;
    let changed = todo.set_done(done, at)?;
    Ok((todo.clone(), changed))
}

fn apply_delete(todos: &mut Vec<TodoItem>, id: TodoId) -> StoreResult<()> {
    let index = todos
        .iter()
        .position(|todo| todo.id == id)
        .ok_or(StoreError::NotFound(id))?;
    if todos[index].is_done {
        return Err(StoreError::AlreadyCommitted(id));
    }
    todos.remove(index);
    Ok(())
}

fn sorted(mut todos: Vec<TodoItem>) -> Vec<TodoItem> {
    todos.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    todos
}
