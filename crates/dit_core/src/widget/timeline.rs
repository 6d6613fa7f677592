//! Widget timeline production over the contribution aggregator.

use crate::contribution::{ContributionAggregator, ContributionWindow, WindowStatus};
use crate::store::TodoStore;
use chrono::{DateTime, TimeDelta, TimeZone};
use log::{error, info};
use serde::{Deserialize, Serialize};

/// Lower bound between two recomputations without a reload signal.
pub const MIN_REFRESH_INTERVAL_SECS: i64 = 60;

const GRID_ROWS: u32 = 7;

/// Supported widget sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetFamily {
    /// 7 x 7 grid.
    Small,
    /// 7 x 15 grid.
    Medium,
}

impl WidgetFamily {
    pub const ALL: [WidgetFamily; 2] = [WidgetFamily::Small, WidgetFamily::Medium];

    pub fn rows(self) -> u32 {
        GRID_ROWS
    }

    pub fn columns(self) -> u32 {
        match self {
            Self::Small => 7,
            Self::Medium => 15,
        }
    }

    /// Number of days shown, one per cell.
    pub fn days(self) -> u32 {
        self.rows() * self.columns()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            _ => None,
        }
    }
}

/// One glanceable snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub family: WidgetFamily,
    /// Epoch milliseconds when the snapshot was produced.
    pub generated_at_ms: i64,
    pub window: ContributionWindow,
    /// `true` when a failed refresh fell back to an earlier fresh window.
    pub stale: bool,
}

/// Entries plus the instant the host should ask again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub entries: Vec<TimelineEntry>,
    pub next_refresh_at_ms: i64,
}

/// Produces widget snapshots for one family.
///
/// The scheduling side (host timeline callback, CLI loop) only calls
/// `snapshot`/`timeline`; counting stays in the aggregator.
pub struct WidgetTimelineProducer<Tz: TimeZone = chrono::Local> {
    aggregator: ContributionAggregator<Tz>,
    family: WidgetFamily,
    min_refresh: TimeDelta,
    /// Last served entry and the epoch ms of the attempt that produced it.
    last_served: Option<(i64, TimelineEntry)>,
    last_fresh: Option<TimelineEntry>,
    reload_requested: bool,
}

impl<Tz: TimeZone> WidgetTimelineProducer<Tz> {
    pub fn new(aggregator: ContributionAggregator<Tz>, family: WidgetFamily) -> Self {
        Self {
            aggregator,
            family,
            min_refresh: TimeDelta::seconds(MIN_REFRESH_INTERVAL_SECS),
            last_served: None,
            last_fresh: None,
            reload_requested: false,
        }
    }

    pub fn family(&self) -> WidgetFamily {
        self.family
    }

    /// Host signal: todos changed, recompute on the next snapshot.
    pub fn request_reload(&mut self) {
        self.reload_requested = true;
    }

    /// All-zero entry for cold start; never reads storage.
    pub fn placeholder(&self, now: &DateTime<Tz>) -> TimelineEntry {
        let window = self
            .aggregator
            .empty_window(now, self.family.days())
            .unwrap_or(ContributionWindow {
                buckets: Vec::new(),
                status: WindowStatus::Fresh,
            });
        TimelineEntry {
            family: self.family,
            generated_at_ms: now.timestamp_millis(),
            window,
            stale: false,
        }
    }

    /// Returns the current snapshot, recomputing when due.
    ///
    /// A cached entry is reused while it is younger than the refresh
    /// interval, still covers today and no reload was requested. A degraded
    /// recompute falls back to the last fresh entry when there is one.
    pub fn snapshot<S: TodoStore + ?Sized>(
        &mut self,
        store: &S,
        now: &DateTime<Tz>,
    ) -> TimelineEntry {
        if let Some(cached) = self.reusable(now) {
            return cached.clone();
        }

        let days = self.family.days();
        let entry = match self.aggregator.compute_window(store, now, days) {
            Ok(window) if !window.is_degraded() => {
                let entry = TimelineEntry {
                    family: self.family,
                    generated_at_ms: now.timestamp_millis(),
                    window,
                    stale: false,
                };
                self.last_fresh = Some(entry.clone());
                entry
            }
            Ok(window) => self.fallback(now, window),
            Err(err) => {
                error!(
                    "event=widget_snapshot module=widget status=error family={} error={}",
                    self.family.as_str(),
                    err
                );
                self.placeholder(now)
            }
        };
        self.record(now, entry)
    }

    /// Snapshot for a refresh that could not reach storage at all.
    ///
    /// Serves the last fresh entry marked stale, or a zero window flagged
    /// `StorageUnavailable` on cold start.
    pub fn degraded(&mut self, now: &DateTime<Tz>, reason: &str) -> TimelineEntry {
        let mut window = self.placeholder(now).window;
        window.status = WindowStatus::StorageUnavailable {
            reason: reason.to_string(),
        };
        let entry = self.fallback(now, window);
        self.record(now, entry)
    }

    /// `degraded` wrapped in a timeline.
    pub fn degraded_timeline(&mut self, now: &DateTime<Tz>, reason: &str) -> Timeline {
        let entry = self.degraded(now, reason);
        Timeline {
            entries: vec![entry],
            next_refresh_at_ms: self.next_refresh_at_ms(now),
        }
    }

    /// The later of the next local midnight and `now` plus the interval.
    pub fn next_refresh_at_ms(&self, now: &DateTime<Tz>) -> i64 {
        let earliest = now.timestamp_millis() + self.min_refresh.num_milliseconds();
        self.aggregator
            .next_day_start(now)
            .map_or(earliest, |midnight| midnight.timestamp_millis().max(earliest))
    }

    /// One-entry timeline refreshing at the next local midnight, and never
    /// sooner than the refresh interval.
    pub fn timeline<S: TodoStore + ?Sized>(&mut self, store: &S, now: &DateTime<Tz>) -> Timeline {
        let entry = self.snapshot(store, now);
        Timeline {
            entries: vec![entry],
            next_refresh_at_ms: self.next_refresh_at_ms(now),
        }
    }

    fn fallback(&self, now: &DateTime<Tz>, window: ContributionWindow) -> TimelineEntry {
        match &self.last_fresh {
            Some(previous) => {
                info!(
                    "event=widget_snapshot module=widget status=stale family={} fresh_at_ms={}",
                    self.family.as_str(),
                    previous.generated_at_ms
                );
                TimelineEntry {
                    stale: true,
                    ..previous.clone()
                }
            }
            None => TimelineEntry {
                family: self.family,
                generated_at_ms: now.timestamp_millis(),
                window,
                stale: false,
            },
        }
    }

    fn record(&mut self, now: &DateTime<Tz>, entry: TimelineEntry) -> TimelineEntry {
        self.reload_requested = false;
        self.last_served = Some((now.timestamp_millis(), entry.clone()));
        entry
    }

    fn reusable(&self, now: &DateTime<Tz>) -> Option<&TimelineEntry> {
        if self.reload_requested {
            return None;
        }
        let (attempted_at_ms, cached) = self.last_served.as_ref()?;
        let age_ms = now.timestamp_millis() - attempted_at_ms;
        if age_ms < 0 || age_ms >= self.min_refresh.num_milliseconds() {
            return None;
        }
        let covers_today = cached
            .window
            .today()
            .is_some_and(|bucket| bucket.date == now.date_naive());
        covers_today.then_some(cached)
    }
}
