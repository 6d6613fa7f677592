//! JSON document collection store.
//!
//! # Responsibility
//! - Keep todos as documents in one collection file shared by several users.
//! - Scope every read and write to the owning `userId`.
//!
//! # Invariants
//! - The collection file is re-read on every call, so writes from another
//!   process are visible on the next read.
//! - Writes hold an exclusive advisory lock on `<path>.lock` across the
//!   whole load-modify-save cycle.
//! - Writes replace the file atomically (unique temp file + rename).
//! - Documents owned by other users are preserved untouched.

use super::{apply_delete, apply_set_done, sorted, StoreError, StoreResult, TodoListQuery, TodoStore};
use crate::model::todo::{TodoId, TodoItem};
use fs4::fs_std::FileExt;
use log::warn;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// On-disk document shape, one per todo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TodoDocument {
    uuid: TodoId,
    user_id: String,
    text: String,
    is_done: bool,
    created_at: i64,
    updated_at: i64,
}

impl TodoDocument {
    fn from_todo(todo: &TodoItem, user_id: &str) -> Self {
        Self {
            uuid: todo.id,
            user_id: user_id.to_string(),
            text: todo.text.clone(),
            is_done: todo.is_done,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
        }
    }

    fn to_todo(&self) -> StoreResult<TodoItem> {
        let todo = TodoItem {
            id: self.uuid,
            text: self.text.clone(),
            is_done: self.is_done,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        todo.validate()?;
        Ok(todo)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Collection {
    todos: Vec<TodoDocument>,
}

/// Todo store over a JSON document collection file.
#[derive(Debug, Clone)]
pub struct DocumentTodoStore {
    path: PathBuf,
    user_id: String,
}

impl DocumentTodoStore {
    /// Creates a store for `user_id` documents in the collection at `path`.
    ///
    /// The file is created lazily on first write.
    pub fn new(path: impl Into<PathBuf>, user_id: impl Into<String>) -> StoreResult<Self> {
        let user_id = user_id.into().trim().to_string();
        if user_id.is_empty() {
            return Err(StoreError::InvalidData(
                "document store user id cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            path: path.into(),
            user_id,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StoreResult<Collection> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(Collection::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Collection::default()),
            Err(err) => Err(err.into()),
        }
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Runs `write` while holding the collection's exclusive lock.
    fn with_write_lock<T>(&self, write: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
        fs::create_dir_all(self.parent_dir())?;
        let lock_file: File = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        FileExt::lock_exclusive(&lock_file)?;
        let result = write();
        if let Err(err) = FileExt::unlock(&lock_file) {
            warn!(
                "event=document_unlock module=store status=error path={} error={}",
                self.path.display(),
                err
            );
        }
        result
    }

    fn save(&self, collection: &Collection) -> StoreResult<()> {
        let mut tmp = NamedTempFile::new_in(self.parent_dir())?;
        tmp.write_all(&serde_json::to_vec_pretty(collection)?)?;
        tmp.as_file().sync_all()?;
        if let Err(err) = tmp.persist(&self.path) {
            warn!(
                "event=document_save module=store status=error path={} error={}",
                self.path.display(),
                err.error
            );
            return Err(err.error.into());
        }
        Ok(())
    }

    /// Loads the collection and splits out this user's todos.
    fn load_owned(&self) -> StoreResult<(Collection, Vec<TodoItem>)> {
        let collection = self.load()?;
        let owned = collection
            .todos
            .iter()
            .filter(|doc| doc.user_id == self.user_id)
            .map(TodoDocument::to_todo)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((collection, owned))
    }

    /// Writes back this user's todos, keeping other users' documents.
    fn save_owned(&self, mut collection: Collection, owned: &[TodoItem]) -> StoreResult<()> {
        collection.todos.retain(|doc| doc.user_id != self.user_id);
        collection.todos.extend(
            owned
                .iter()
                .map(|todo| TodoDocument::from_todo(todo, &self.user_id)),
        );
        self.save(&collection)
    }
}

impl TodoStore for DocumentTodoStore {
    fn create_todo(&self, text: &str, at: i64) -> StoreResult<TodoItem> {
        let todo = TodoItem::new(text, at)?;
        self.with_write_lock(|| {
            let mut collection = self.load()?;
            collection
                .todos
                .push(TodoDocument::from_todo(&todo, &self.user_id));
            self.save(&collection)
        })?;
        Ok(todo)
    }

    fn set_done(&self, id: TodoId, done: bool, at: i64) -> StoreResult<TodoItem> {
        self.with_write_lock(|| {
            let (collection, mut owned) = self.load_owned()?;
            let (todo, changed) = apply_set_done(&mut owned, id, done, at)?;
            if changed {
                self.save_owned(collection, &owned)?;
            }
            Ok(todo)
        })
    }

    fn delete_todo(&self, id: TodoId) -> StoreResult<()> {
        self.with_write_lock(|| {
            let (collection, mut owned) = self.load_owned()?;
            apply_delete(&mut owned, id)?;
            self.save_owned(collection, &owned)
        })
    }

    fn get_todo(&self, id: TodoId) -> StoreResult<Option<TodoItem>> {
        let (_, owned) = self.load_owned()?;
        Ok(owned.into_iter().find(|todo| todo.id == id))
    }

    fn list_todos(&self, query: &TodoListQuery) -> StoreResult<Vec<TodoItem>> {
        let (_, owned) = self.load_owned()?;
        Ok(sorted(
            owned.into_iter().filter(|todo| query.matches(todo)).collect(),
        ))
    }

    fn query_done_between(&self, start_ms: i64, end_ms: i64) -> StoreResult<Vec<TodoItem>> {
        let (_, owned) = self.load_owned()?;
        Ok(sorted(
            owned
                .into_iter()
                .filter(|todo| todo.is_committed_within(start_ms, end_ms))
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::DocumentTodoStore;
    use crate::store::{StoreError, TodoListQuery, TodoStore};

    #[test]
    fn documents_use_camel_case_fields_and_user_scope() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");
        let alice = DocumentTodoStore::new(&path, "alice").unwrap();
        let bob = DocumentTodoStore::new(&path, "bob").unwrap();

        let todo = alice.create_todo("stretch", 1_000).unwrap();
        bob.create_todo("read", 2_000).unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let first = &raw["todos"][0];
        assert_eq!(first["uuid"], todo.id.to_string());
        assert_eq!(first["userId"], "alice");
        assert_eq!(first["isDone"], false);
        assert_eq!(first["createdAt"], 1_000);
        assert_eq!(first["updatedAt"], 1_000);

        assert_eq!(alice.list_todos(&TodoListQuery::default()).unwrap().len(), 1);
        alice.set_done(todo.id, true, 3_000).unwrap();
        assert_eq!(bob.list_todos(&TodoListQuery::default()).unwrap().len(), 1);
        assert!(bob.get_todo(todo.id).unwrap().is_none());
    }

    #[test]
    fn missing_file_reads_as_empty_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentTodoStore::new(dir.path().join("absent.json"), "alice").unwrap();
        assert!(store.list_todos(&TodoListQuery::default()).unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_surfaces_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");
        std::fs::write(&path, b"{not json").unwrap();
        let store = DocumentTodoStore::new(&path, "alice").unwrap();
        let err = store.query_done_between(0, 10).unwrap_err();
        assert!(matches!(err, StoreError::Serde(_)));
    }

    #[test]
    fn concurrent_writers_keep_every_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");

        std::thread::scope(|scope| {
            for writer in 0..4 {
                let path = path.clone();
                scope.spawn(move || {
                    let store = DocumentTodoStore::new(path, "alice").unwrap();
                    for n in 0..25 {
                        store
                            .create_todo(&format!("todo {writer}-{n}"), 1_000)
                            .unwrap();
                    }
                });
            }
        });

        let store = DocumentTodoStore::new(&path, "alice").unwrap();
        assert_eq!(store.list_todos(&TodoListQuery::default()).unwrap().len(), 100);
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| {
                let name = entry.file_name();
                name != "todos.json" && name != "todos.json.lock"
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn blank_user_id_is_rejected() {
        assert!(DocumentTodoStore::new("todos.json", "  ").is_err());
    }
}
