//! Home-screen widget snapshots.
//!
//! # Responsibility
//! - Size contribution windows per widget family.
//! - Rate-limit recomputation and honor host reload signals.
//!
//! # Invariants
//! - Producers hold no store; the store is passed per call.
//! - A cold start never blocks on storage.

pub mod timeline;

pub use timeline::{
    Timeline, TimelineEntry, WidgetFamily, WidgetTimelineProducer, MIN_REFRESH_INTERVAL_SECS,
};
