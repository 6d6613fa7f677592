//! SQLite-backed todo store.
//!
//! # Responsibility
//! - Persist todos in the `todos` table created by core migrations.
//! - Keep SQL details inside the storage boundary.
//!
//! # Invariants
//! - Read-modify-write paths run inside one immediate transaction.
//! - Read paths reject invalid persisted rows instead of masking them.

use super::{StoreError, StoreResult, TodoListQuery, TodoStore};
use crate::model::todo::{TodoId, TodoItem};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const TODO_SELECT_SQL: &str = "SELECT
    uuid,
    text,
    is_done,
    created_at,
    updated_at
FROM todos";

/// SQLite-backed todo store over a migrated connection.
pub struct SqliteTodoStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTodoStore<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    ///
    /// # Errors
    /// - `InvalidData` when the `todos` table is missing.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'todos'
            );",
            [],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(StoreError::InvalidData(
                "todos table missing; open the connection through db::open_db".to_string(),
            ));
        }
        Ok(Self { conn })
    }

    fn select_one(&self, id: TodoId) -> StoreResult<Option<TodoItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TODO_SELECT_SQL} WHERE uuid = ?1;"))?;
        let row = stmt
            .query_row([id.to_string()], read_raw_row)
            .optional()?;
        row.map(RawRow::into_todo).transpose()
    }

    fn select_many(&self, sql: &str, bind: &[i64]) -> StoreResult<Vec<TodoItem>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(bind.iter()))?;
        let mut todos = Vec::new();
        while let Some(row) = rows.next()? {
            todos.push(read_raw_row(row)?.into_todo()?);
        }
        Ok(todos)
    }

    fn write_tx(&self) -> StoreResult<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl TodoStore for SqliteTodoStore<'_> {
    fn create_todo(&self, text: &str, at: i64) -> StoreResult<TodoItem> {
        let todo = TodoItem::new(text, at)?;
        self.conn.execute(
            "INSERT INTO todos (uuid, text, is_done, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                todo.id.to_string(),
                todo.text.as_str(),
                bool_to_int(todo.is_done),
                todo.created_at,
                todo.updated_at,
            ],
        )?;
        Ok(todo)
    }

    fn set_done(&self, id: TodoId, done: bool, at: i64) -> StoreResult<TodoItem> {
        let tx = self.write_tx()?;
        let mut todo = self.select_one(id)?.ok_or(StoreError::NotFound(id))?;
        if todo.set_done(done, at)? {
            tx.execute(
                "UPDATE todos SET is_done = ?1, updated_at = ?2 WHERE uuid = ?3;",
                params![bool_to_int(todo.is_done), todo.updated_at, id.to_string()],
            )?;
        }
        tx.commit()?;
        Ok(todo)
    }

    fn delete_todo(&self, id: TodoId) -> StoreResult<()> {
        let tx = self.write_tx()?;
        let todo = self.select_one(id)?.ok_or(StoreError::NotFound(id))?;
        if todo.is_done {
            return Err(StoreError::AlreadyCommitted(id));
        }
        tx.execute("DELETE FROM todos WHERE uuid = ?1;", [id.to_string()])?;
        tx.commit()?;
        Ok(())
    }

    fn get_todo(&self, id: TodoId) -> StoreResult<Option<TodoItem>> {
        self.select_one(id)
    }

    fn list_todos(&self, query: &TodoListQuery) -> StoreResult<Vec<TodoItem>> {
        match query.is_done {
            Some(done) => self.select_many(
                &format!("{TODO_SELECT_SQL} WHERE is_done = ?1 ORDER BY created_at ASC, uuid ASC;"),
                &[bool_to_int(done)],
            ),
            None => self.select_many(
                &format!("{TODO_SELECT_SQL} ORDER BY created_at ASC, uuid ASC;"),
                &[],
            ),
        }
    }

    fn query_done_between(&self, start_ms: i64, end_ms: i64) -> StoreResult<Vec<TodoItem>> {
        self.select_many(
            &format!(
                "{TODO_SELECT_SQL}
                 WHERE is_done = 1
                   AND updated_at >= ?1
                   AND updated_at < ?2
                 ORDER BY created_at ASC, uuid ASC;"
            ),
            &[start_ms, end_ms],
        )
    }
}

struct RawRow {
    uuid: String,
    text: String,
    is_done: i64,
    created_at: i64,
    updated_at: i64,
}

fn read_raw_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        uuid: row.get("uuid")?,
        text: row.get("text")?,
        is_done: row.get("is_done")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl RawRow {
    fn into_todo(self) -> StoreResult<TodoItem> {
        let id = Uuid::parse_str(&self.uuid).map_err(|_| {
            StoreError::InvalidData(format!("invalid uuid value `{}` in todos.uuid", self.uuid))
        })?;
        let is_done = match self.is_done {
            0 => false,
            1 => true,
            other => {
                return Err(StoreError::InvalidData(format!(
                    "invalid is_done value `{other}` in todos.is_done"
                )));
            }
        };
        let todo = TodoItem {
            id,
            text: self.text,
            is_done,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        todo.validate()?;
        Ok(todo)
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
