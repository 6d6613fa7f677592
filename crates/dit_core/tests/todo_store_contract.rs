use dit_core::db::open_db_in_memory;
use dit_core::{
    DocumentTodoStore, MemoryTodoStore, SqliteTodoStore, StoreError, TodoListQuery, TodoStore,
    TodoValidationError,
};
use uuid::Uuid;

/// Runs `check` against every backend.
fn for_each_backend(check: impl Fn(&dyn TodoStore)) {
    check(&MemoryTodoStore::new());

    let conn = open_db_in_memory().unwrap();
    check(&SqliteTodoStore::try_new(&conn).unwrap());

    let dir = tempfile::tempdir().unwrap();
    check(&DocumentTodoStore::new(dir.path().join("todos.json"), "user-1").unwrap());
}

#[test]
fn create_normalizes_text_and_starts_pending() {
    for_each_backend(|store| {
        let created = store.create_todo("  read   a\nbook ", 1_000).unwrap();
        assert_eq!(created.text, "read a book");
        assert!(!created.is_done);
        assert_eq!(created.created_at, 1_000);
        assert_eq!(created.updated_at, 1_000);

        let loaded = store.get_todo(created.id).unwrap().unwrap();
        assert_eq!(loaded, created);
    });
}

#[test]
fn create_rejects_blank_text() {
    for_each_backend(|store| {
        let err = store.create_todo(" \t ", 1_000).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(TodoValidationError::EmptyText)
        ));
        assert!(store.list_todos(&TodoListQuery::default()).unwrap().is_empty());
    });
}

#[test]
fn commit_and_reset_bump_updated_at() {
    for_each_backend(|store| {
        let todo = store.create_todo("run", 1_000).unwrap();

        let committed = store.set_done(todo.id, true, 2_000).unwrap();
        assert!(committed.is_done);
        assert_eq!(committed.updated_at, 2_000);

        let reset = store.set_done(todo.id, false, 3_000).unwrap();
        assert!(!reset.is_done);
        assert_eq!(reset.updated_at, 3_000);
        assert_eq!(reset.created_at, 1_000);

        let loaded = store.get_todo(todo.id).unwrap().unwrap();
        assert_eq!(loaded, reset);
    });
}

#[test]
fn repeated_commit_keeps_original_timestamp() {
    for_each_backend(|store| {
        let todo = store.create_todo("run", 1_000).unwrap();
        store.set_done(todo.id, true, 2_000).unwrap();
        let again = store.set_done(todo.id, true, 9_000).unwrap();
        assert_eq!(again.updated_at, 2_000);
        assert_eq!(store.get_todo(todo.id).unwrap().unwrap().updated_at, 2_000);
    });
}

#[test]
fn commit_before_creation_is_rejected() {
    for_each_backend(|store| {
        let todo = store.create_todo("run", 5_000).unwrap();
        let err = store.set_done(todo.id, true, 4_999).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(TodoValidationError::UpdatedBeforeCreated { .. })
        ));
        assert!(!store.get_todo(todo.id).unwrap().unwrap().is_done);
    });
}

#[test]
fn unknown_id_returns_not_found() {
    for_each_backend(|store| {
        let missing = Uuid::new_v4();
        assert!(matches!(
            store.set_done(missing, true, 1).unwrap_err(),
            StoreError::NotFound(id) if id == missing
        ));
        assert!(matches!(
            store.delete_todo(missing).unwrap_err(),
            StoreError::NotFound(id) if id == missing
        ));
        assert!(store.get_todo(missing).unwrap().is_none());
    });
}

#[test]
fn delete_only_allowed_while_pending() {
    for_each_backend(|store| {
        let todo = store.create_todo("stretch", 1_000).unwrap();
        store.set_done(todo.id, true, 2_000).unwrap();

        let err = store.delete_todo(todo.id).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyCommitted(id) if id == todo.id));
        assert!(store.get_todo(todo.id).unwrap().is_some());

        store.set_done(todo.id, false, 3_000).unwrap();
        store.delete_todo(todo.id).unwrap();
        assert!(store.get_todo(todo.id).unwrap().is_none());
    });
}

#[test]
fn list_filters_by_state_in_creation_order() {
    for_each_backend(|store| {
        let first = store.create_todo("first", 1_000).unwrap();
        let second = store.create_todo("second", 2_000).unwrap();
        let third = store.create_todo("third", 3_000).unwrap();
        store.set_done(second.id, true, 4_000).unwrap();

        let all: Vec<_> = store
            .list_todos(&TodoListQuery::default())
            .unwrap()
            .into_iter()
            .map(|todo| todo.id)
            .collect();
        assert_eq!(all, vec![first.id, second.id, third.id]);

        let pending: Vec<_> = store
            .list_todos(&TodoListQuery::pending())
            .unwrap()
            .into_iter()
            .map(|todo| todo.id)
            .collect();
        assert_eq!(pending, vec![first.id, third.id]);

        let committed = store.list_todos(&TodoListQuery::committed()).unwrap();
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].id, second.id);
    });
}

#[test]
fn query_done_between_is_half_open_on_updated_at() {
    for_each_backend(|store| {
        let at_start = store.create_todo("at start", 0).unwrap();
        let at_end = store.create_todo("at end", 0).unwrap();
        let pending = store.create_todo("pending", 0).unwrap();
        store.set_done(at_start.id, true, 1_000).unwrap();
        store.set_done(at_end.id, true, 2_000).unwrap();
        store.set_done(pending.id, true, 1_500).unwrap();
        store.set_done(pending.id, false, 1_600).unwrap();

        let hits = store.query_done_between(1_000, 2_000).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, at_start.id);
    });
}
