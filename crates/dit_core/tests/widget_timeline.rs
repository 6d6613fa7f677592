use chrono::{DateTime, Duration, FixedOffset, TimeZone};
use dit_core::{
    ContributionAggregator, MemoryTodoStore, StoreError, StoreResult, TodoId, TodoItem,
    TodoListQuery, TodoStore, WidgetFamily, WidgetTimelineProducer, WindowStatus,
};
use std::cell::Cell;

fn kst_at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(9 * 3600)
        .unwrap()
        .with_ymd_and_hms(y, m, d, h, min, s)
        .unwrap()
}

fn producer(family: WidgetFamily) -> WidgetTimelineProducer<FixedOffset> {
    let aggregator = ContributionAggregator::new(FixedOffset::east_opt(9 * 3600).unwrap());
    WidgetTimelineProducer::new(aggregator, family)
}

/// Memory store whose reads can be switched off and that counts reads.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryTodoStore,
    offline: Cell<bool>,
    reads: Cell<u32>,
}

impl TodoStore for FlakyStore {
    fn create_todo(&self, text: &str, at: i64) -> StoreResult<TodoItem> {
        self.inner.create_todo(text, at)
    }

    fn set_done(&self, id: TodoId, done: bool, at: i64) -> StoreResult<TodoItem> {
        self.inner.set_done(id, done, at)
    }

    fn delete_todo(&self, id: TodoId) -> StoreResult<()> {
        self.inner.delete_todo(id)
    }

    fn get_todo(&self, id: TodoId) -> StoreResult<Option<TodoItem>> {
        self.inner.get_todo(id)
    }

    fn list_todos(&self, query: &TodoListQuery) -> StoreResult<Vec<TodoItem>> {
        self.inner.list_todos(query)
    }

    fn query_done_between(&self, start_ms: i64, end_ms: i64) -> StoreResult<Vec<TodoItem>> {
        self.reads.set(self.reads.get() + 1);
        if self.offline.get() {
            return Err(StoreError::InvalidData("network unreachable".to_string()));
        }
        self.inner.query_done_between(start_ms, end_ms)
    }
}

fn commit_now(store: &FlakyStore, now: &DateTime<FixedOffset>) {
    let todo = store.create_todo("commit", 0).unwrap();
    store.set_done(todo.id, true, now.timestamp_millis()).unwrap();
}

#[test]
fn placeholder_is_zero_filled_and_sized_per_family() {
    let now = kst_at(2022, 9, 8, 12, 0, 0);
    for family in WidgetFamily::ALL {
        let entry = producer(family).placeholder(&now);
        assert_eq!(entry.window.len(), family.days() as usize);
        assert_eq!(entry.window.total_commits(), 0);
        assert_eq!(entry.window.status, WindowStatus::Fresh);
        assert!(!entry.stale);
    }
}

#[test]
fn snapshot_is_cached_within_refresh_interval() {
    let store = FlakyStore::default();
    let mut producer = producer(WidgetFamily::Small);
    let now = kst_at(2022, 9, 8, 12, 0, 0);

    let first = producer.snapshot(&store, &now);
    commit_now(&store, &now);
    let second = producer.snapshot(&store, &(now + Duration::seconds(30)));

    assert_eq!(store.reads.get(), 1);
    assert_eq!(first, second);
    assert_eq!(second.window.total_commits(), 0);

    let third = producer.snapshot(&store, &(now + Duration::seconds(60)));
    assert_eq!(store.reads.get(), 2);
    assert_eq!(third.window.today().unwrap().commit_count, 1);
}

#[test]
fn reload_request_bypasses_cache() {
    let store = FlakyStore::default();
    let mut producer = producer(WidgetFamily::Medium);
    let now = kst_at(2022, 9, 8, 12, 0, 0);

    producer.snapshot(&store, &now);
    commit_now(&store, &now);
    producer.request_reload();
    let entry = producer.snapshot(&store, &(now + Duration::seconds(5)));

    assert_eq!(store.reads.get(), 2);
    assert_eq!(entry.window.len(), 105);
    assert_eq!(entry.window.today().unwrap().commit_count, 1);

    producer.snapshot(&store, &(now + Duration::seconds(10)));
    assert_eq!(store.reads.get(), 2);
}

#[test]
fn day_rollover_recomputes_even_inside_interval() {
    let store = FlakyStore::default();
    let mut producer = producer(WidgetFamily::Small);
    let before_midnight = kst_at(2022, 9, 8, 23, 59, 50);

    producer.snapshot(&store, &before_midnight);
    let after = producer.snapshot(&store, &(before_midnight + Duration::seconds(20)));

    assert_eq!(store.reads.get(), 2);
    assert_eq!(
        after.window.today().unwrap().date,
        chrono::NaiveDate::from_ymd_opt(2022, 9, 9).unwrap()
    );
}

#[test]
fn failed_refresh_serves_stale_prior_window() {
    let store = FlakyStore::default();
    let mut producer = producer(WidgetFamily::Small);
    let now = kst_at(2022, 9, 8, 12, 0, 0);
    commit_now(&store, &now);

    let fresh = producer.snapshot(&store, &now);
    store.offline.set(true);
    producer.request_reload();
    let stale = producer.snapshot(&store, &(now + Duration::seconds(5)));

    assert!(stale.stale);
    assert_eq!(stale.window, fresh.window);
    assert_eq!(stale.generated_at_ms, fresh.generated_at_ms);
}

#[test]
fn failed_cold_start_serves_flagged_zero_window() {
    let store = FlakyStore::default();
    store.offline.set(true);
    let mut producer = producer(WidgetFamily::Small);

    let entry = producer.snapshot(&store, &kst_at(2022, 9, 8, 12, 0, 0));
    assert!(!entry.stale);
    assert_eq!(entry.window.len(), 49);
    assert!(entry.window.is_degraded());
}

#[test]
fn unreachable_storage_serves_stale_prior_window() {
    let store = FlakyStore::default();
    let mut producer = producer(WidgetFamily::Small);
    let now = kst_at(2022, 9, 8, 12, 0, 0);
    commit_now(&store, &now);
    let fresh = producer.snapshot(&store, &now);

    producer.request_reload();
    let timeline = producer.degraded_timeline(&(now + Duration::seconds(5)), "db open failed");

    let entry = &timeline.entries[0];
    assert!(entry.stale);
    assert_eq!(entry.window, fresh.window);
    assert_eq!(
        timeline.next_refresh_at_ms,
        kst_at(2022, 9, 9, 0, 0, 0).timestamp_millis()
    );
}

#[test]
fn unreachable_storage_on_cold_start_flags_zero_window() {
    let mut producer = producer(WidgetFamily::Medium);
    let entry = producer.degraded(&kst_at(2022, 9, 8, 12, 0, 0), "db open failed");

    assert!(!entry.stale);
    assert_eq!(entry.window.len(), 105);
    assert_eq!(entry.window.total_commits(), 0);
    assert_eq!(
        entry.window.status,
        WindowStatus::StorageUnavailable {
            reason: "db open failed".to_string()
        }
    );
}

#[test]
fn timeline_refreshes_at_next_local_midnight() {
    let store = FlakyStore::default();
    let mut producer = producer(WidgetFamily::Small);
    let now = kst_at(2022, 9, 8, 12, 0, 0);

    let timeline = producer.timeline(&store, &now);
    assert_eq!(timeline.entries.len(), 1);
    assert_eq!(
        timeline.next_refresh_at_ms,
        kst_at(2022, 9, 9, 0, 0, 0).timestamp_millis()
    );
}

#[test]
fn timeline_never_refreshes_sooner_than_interval() {
    let store = FlakyStore::default();
    let mut producer = producer(WidgetFamily::Small);
    let now = kst_at(2022, 9, 8, 23, 59, 45);

    let timeline = producer.timeline(&store, &now);
    assert_eq!(
        timeline.next_refresh_at_ms,
        now.timestamp_millis() + 60_000
    );
}
