//! Todo domain model.
//!
//! # Responsibility
//! - Define the canonical todo record persisted by every `TodoStore`.
//! - Provide commit/reset lifecycle helpers that keep timestamps consistent.
//!
//! # Invariants
//! - `id` is stable and never nil.
//! - `text` is non-empty after normalization.
//! - `updated_at >= created_at`, both Unix epoch milliseconds.
//! - The contribution day of a done todo is the local day of `updated_at`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Stable identifier for a todo item.
pub type TodoId = Uuid;

/// Validation errors for todo invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoValidationError {
    NilId,
    EmptyText,
    UpdatedBeforeCreated { created_at: i64, updated_at: i64 },
}

impl Display for TodoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "todo id must not be nil"),
            Self::EmptyText => write!(f, "todo text must not be empty"),
            Self::UpdatedBeforeCreated {
                created_at,
                updated_at,
            } => write!(
                f,
                "updated_at ({updated_at}) must be >= created_at ({created_at})"
            ),
        }
    }
}

impl Error for TodoValidationError {}

/// Canonical todo record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTodoItem")]
pub struct TodoItem {
    pub id: TodoId,
    /// Normalized single-line text.
    pub text: String,
    pub is_done: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds, bumped on every commit/reset.
    pub updated_at: i64,
}

#[derive(Deserialize)]
struct RawTodoItem {
    id: TodoId,
    text: String,
    is_done: bool,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<RawTodoItem> for TodoItem {
    type Error = TodoValidationError;

    fn try_from(raw: RawTodoItem) -> Result<Self, Self::Error> {
        let item = Self {
            id: raw.id,
            text: raw.text,
            is_done: raw.is_done,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        };
        item.validate()?;
        Ok(item)
    }
}

impl TodoItem {
    /// Creates a pending todo with a generated id.
    ///
    /// # Errors
    /// - `EmptyText` when `text` is blank after normalization.
    pub fn new(text: &str, at: i64) -> Result<Self, TodoValidationError> {
        Self::with_id(Uuid::new_v4(), text, at)
    }

    /// Creates a pending todo with a caller-provided id.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(id: TodoId, text: &str, at: i64) -> Result<Self, TodoValidationError> {
        let item = Self {
            id,
            text: normalize_text(text).ok_or(TodoValidationError::EmptyText)?,
            is_done: false,
            created_at: at,
            updated_at: at,
        };
        item.validate()?;
        Ok(item)
    }

    /// Checks model invariants.
    pub fn validate(&self) -> Result<(), TodoValidationError> {
        if self.id.is_nil() {
            return Err(TodoValidationError::NilId);
        }
        if self.text.trim().is_empty() {
            return Err(TodoValidationError::EmptyText);
        }
        if self.updated_at < self.created_at {
            return Err(TodoValidationError::UpdatedBeforeCreated {
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        Ok(())
    }

    /// Moves the todo into `done` state at `at`.
    ///
    /// Returns `false` without touching timestamps when nothing changes, so a
    /// repeated commit never moves the contribution to a later day.
    pub fn set_done(&mut self, done: bool, at: i64) -> Result<bool, TodoValidationError> {
        if self.is_done == done {
            return Ok(false);
        }
        if at < self.created_at {
            return Err(TodoValidationError::UpdatedBeforeCreated {
                created_at: self.created_at,
                updated_at: at,
            });
        }
        self.is_done = done;
        self.updated_at = at;
        Ok(true)
    }

    /// Returns whether this todo contributes to the interval `[start, end)`.
    pub fn is_committed_within(&self, start_ms: i64, end_ms: i64) -> bool {
        self.is_done && self.updated_at >= start_ms && self.updated_at < end_ms
    }
}

/// Trims and collapses whitespace runs. Returns `None` for blank input.
pub fn normalize_text(text: &str) -> Option<String> {
    let collapsed = WHITESPACE_RE.replace_all(text.trim(), " ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.into_owned())
    }
}
