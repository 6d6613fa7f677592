//! Core domain logic for Dit, a todo tracker drawn as a contribution graph.
//! This crate is the single source of truth for todo invariants and for how
//! commits are counted per day.

pub mod config;
pub mod contribution;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;
pub mod widget;

pub use config::{ConfigError, DitConfig, StoreBackend};
pub use contribution::{
    bucket_for, ContributionAggregator, ContributionError, ContributionWindow, DayBucket,
    Palette, Rgb, Severity, WindowStatus, MAX_WINDOW_DAYS, PROFILE_WINDOW_DAYS,
};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::todo::{normalize_text, TodoId, TodoItem, TodoValidationError};
pub use service::todo_service::{TodayView, TodoService};
pub use store::{
    DocumentTodoStore, MemoryTodoStore, SqliteTodoStore, StoreError, StoreResult,
    TodoListQuery, TodoStore,
};
pub use widget::{
    Timeline, TimelineEntry, WidgetFamily, WidgetTimelineProducer, MIN_REFRESH_INTERVAL_SECS,
};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
