//! Flat in-memory todo store.
//!
//! Holds todos in a single `Vec` behind a `Mutex`. Useful for previews and as
//! the reference backend in tests.

use super::{apply_delete, apply_set_done, sorted, StoreError, StoreResult, TodoListQuery, TodoStore};
use crate::model::todo::{TodoId, TodoItem};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct MemoryTodoStore {
    todos: Mutex<Vec<TodoItem>>,
}

impl MemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with already-validated records.
    pub fn with_todos(todos: Vec<TodoItem>) -> StoreResult<Self> {
        for todo in &todos {
            todo.validate()?;
        }
        Ok(Self {
            todos: Mutex::new(todos),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Vec<TodoItem>>> {
        self.todos
            .lock()
            .map_err(|_| StoreError::InvalidData("memory store lock poisoned".to_string()))
    }
}

impl TodoStore for MemoryTodoStore {
    fn create_todo(&self, text: &str, at: i64) -> StoreResult<TodoItem> {
        let todo = TodoItem::new(text, at)?;
        self.lock()?.push(todo.clone());
        Ok(todo)
    }

    fn set_done(&self, id: TodoId, done: bool, at: i64) -> StoreResult<TodoItem> {
        let mut todos = self.lock()?;
        let (todo, _) = apply_set_done(&mut todos, id, done, at)?;
        Ok(todo)
    }

    fn delete_todo(&self, id: TodoId) -> StoreResult<()> {
        let mut todos = self.lock()?;
        apply_delete(&mut todos, id)
    }

    fn get_todo(&self, id: TodoId) -> StoreResult<Option<TodoItem>> {
        Ok(self.lock()?.iter().find(|todo| todo.id == id).cloned())
    }

    fn list_todos(&self, query: &TodoListQuery) -> StoreResult<Vec<TodoItem>> {
        let todos = self.lock()?;
        Ok(sorted(
            todos.iter().filter(|todo| query.matches(todo)).cloned().collect(),
        ))
    }

    fn query_done_between(&self, start_ms: i64, end_ms: i64) -> StoreResult<Vec<TodoItem>> {
        let todos = self.lock()?;
        Ok(sorted(
            todos
                .iter()
                .filter(|todo| todo.is_committed_within(start_ms, end_ms))
                .cloned()
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryTodoStore;
    use crate::store::{StoreError, TodoListQuery, TodoStore};

    #[test]
    fn delete_removes_pending_todo_and_keeps_committed() {
        let store = MemoryTodoStore::new();
        let pending = store.create_todo("read", 1_000).unwrap();
        let committed = store.create_todo("run", 1_000).unwrap();
        store.set_done(committed.id, true, 2_000).unwrap();

        store.delete_todo(pending.id).unwrap();
        assert!(matches!(
            store.delete_todo(committed.id).unwrap_err(),
            StoreError::AlreadyCommitted(_)
        ));

        let remaining = store.list_todos(&TodoListQuery::default()).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, committed.id);
    }
}
