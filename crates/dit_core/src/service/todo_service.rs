//! Todo use-case service.
//!
//! # Responsibility
//! - Provide add/commit/reset/delete entry points for host surfaces.
//! - Build the "today" view: pending todos and today's commits.
//!
//! # Invariants
//! - Service APIs never bypass store validation.
//! - The service is storage-agnostic; any `TodoStore` backend works.

use crate::contribution::ContributionAggregator;
use crate::model::todo::{TodoId, TodoItem};
use crate::store::{StoreResult, TodoListQuery, TodoStore};
use chrono::{DateTime, TimeZone};
use log::info;
use serde::Serialize;

/// Today screen sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodayView {
    /// Every todo not yet committed, oldest first.
    pub pending: Vec<TodoItem>,
    /// Todos committed during the current local day.
    pub committed_today: Vec<TodoItem>,
}

impl TodayView {
    pub fn pending_title(&self) -> String {
        format!("{} todos to commit", self.pending.len())
    }

    pub fn committed_title(&self) -> String {
        format!("{} commits today", self.committed_today.len())
    }

    /// App icon badge value.
    pub fn badge_count(&self) -> usize {
        self.pending.len()
    }
}

/// Use-case service wrapper over a todo store.
pub struct TodoService<S: TodoStore> {
    store: S,
}

impl<S: TodoStore> TodoService<S> {
    /// Creates a service using the provided store implementation.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Adds a pending todo created at `at` (epoch ms).
    pub fn add(&self, text: &str, at: i64) -> StoreResult<TodoItem> {
        let todo = self.store.create_todo(text, at)?;
        info!("event=todo_add module=service status=ok todo_id={}", todo.id);
        Ok(todo)
    }

    /// Marks a todo done; its contribution lands on the local day of `at`.
    pub fn commit(&self, id: TodoId, at: i64) -> StoreResult<TodoItem> {
        let todo = self.store.set_done(id, true, at)?;
        info!("event=todo_commit module=service status=ok todo_id={id}");
        Ok(todo)
    }

    /// Moves a committed todo back to pending, removing its contribution.
    pub fn reset(&self, id: TodoId, at: i64) -> StoreResult<TodoItem> {
        let todo = self.store.set_done(id, false, at)?;
        info!("event=todo_reset module=service status=ok todo_id={id}");
        Ok(todo)
    }

    /// Deletes a pending todo.
    pub fn delete(&self, id: TodoId) -> StoreResult<()> {
        self.store.delete_todo(id)?;
        info!("event=todo_delete module=service status=ok todo_id={id}");
        Ok(())
    }

    pub fn get(&self, id: TodoId) -> StoreResult<Option<TodoItem>> {
        self.store.get_todo(id)
    }

    pub fn list(&self, query: &TodoListQuery) -> StoreResult<Vec<TodoItem>> {
        self.store.list_todos(query)
    }

    /// Builds today's sections relative to `now` in the aggregator zone.
    pub fn today<Tz: TimeZone>(
        &self,
        aggregator: &ContributionAggregator<Tz>,
        now: &DateTime<Tz>,
    ) -> StoreResult<TodayView> {
        let pending = self.store.list_todos(&TodoListQuery::pending())?;
        let committed_today = match aggregator.day_bounds_ms(now.date_naive()) {
            Some((start_ms, end_ms)) => self.store.query_done_between(start_ms, end_ms)?,
            None => Vec::new(),
        };
        Ok(TodayView {
            pending,
            committed_today,
        })
    }

    /// Number of pending todos.
    pub fn badge_count(&self) -> StoreResult<usize> {
        Ok(self.store.list_todos(&TodoListQuery::pending())?.len())
    }
}
