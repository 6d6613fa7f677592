//! Per-day commit aggregation over a window of local calendar days.
//!
//! # Responsibility
//! - Resolve local day boundaries for a time zone (Gregorian calendar).
//! - Count done todos per day with one store read per window.
//!
//! # Invariants
//! - Day `i` spans `[start_of_day(first + i), start_of_day(first + i + 1))`.
//! - Buckets are consecutive dates, strictly increasing, no gaps.
//! - `created_at` never influences counts.

use crate::contribution::severity::{bucket_for, Severity};
use crate::model::todo::TodoItem;
use crate::store::TodoStore;
use chrono::{
    DateTime, Days, LocalResult, NaiveDate, NaiveTime, Offset, TimeDelta, TimeZone, Utc,
};
use log::{debug, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Largest window the aggregator accepts (ten years of days).
pub const MAX_WINDOW_DAYS: u32 = 3660;
/// Window shown on the profile screen (5 weeks).
pub const PROFILE_WINDOW_DAYS: u32 = 35;

/// Caller errors for window computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContributionError {
    InvalidRange { days: u32 },
}

impl Display for ContributionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRange { days } => write!(
                f,
                "invalid contribution range: {days} days (expected 1..={MAX_WINDOW_DAYS})"
            ),
        }
    }
}

impl Error for ContributionError {}

/// Commit count for one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub commit_count: u32,
}

impl DayBucket {
    pub fn severity(&self) -> Severity {
        bucket_for(i64::from(self.commit_count))
    }

    /// Cell detail text, e.g. `2022-09-08(Thu)\n3 commits`.
    pub fn detail_label(&self) -> String {
        format!(
            "{}\n{} commits",
            self.date.format("%Y-%m-%d(%a)"),
            self.commit_count
        )
    }
}

/// Whether a window reflects storage or a fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WindowStatus {
    Fresh,
    /// The store read failed; every bucket is zero.
    StorageUnavailable { reason: String },
}

/// Ordered per-day commit counts ending at "today".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributionWindow {
    /// Oldest first.
    pub buckets: Vec<DayBucket>,
    pub status: WindowStatus,
}

impl ContributionWindow {
    fn zeroed(first: NaiveDate, days: u32, status: WindowStatus) -> Self {
        let buckets = first
            .iter_days()
            .take(days as usize)
            .map(|date| DayBucket {
                date,
                commit_count: 0,
            })
            .collect();
        Self { buckets, status }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// `true` when counts come from a fallback rather than storage.
    pub fn is_degraded(&self) -> bool {
        !matches!(self.status, WindowStatus::Fresh)
    }

    pub fn total_commits(&self) -> u64 {
        self.buckets
            .iter()
            .map(|bucket| u64::from(bucket.commit_count))
            .sum()
    }

    /// The newest bucket.
    pub fn today(&self) -> Option<&DayBucket> {
        self.buckets.last()
    }

    pub fn bucket_on(&self, date: NaiveDate) -> Option<&DayBucket> {
        let first = self.buckets.first()?.date;
        let offset = usize::try_from((date - first).num_days()).ok()?;
        self.buckets.get(offset)
    }

    pub fn severities(&self) -> Vec<Severity> {
        self.buckets.iter().map(DayBucket::severity).collect()
    }
}

/// Computes contribution windows in a fixed time zone.
///
/// Stateless; the store is passed on every call.
#[derive(Debug, Clone)]
pub struct ContributionAggregator<Tz: TimeZone = chrono::Local> {
    tz: Tz,
}

impl ContributionAggregator<chrono::Local> {
    /// Aggregator using the device's local time zone.
    pub fn local() -> Self {
        Self::new(chrono::Local)
    }
}

impl<Tz: TimeZone> ContributionAggregator<Tz> {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn time_zone(&self) -> &Tz {
        &self.tz
    }

    /// Current instant in the aggregator time zone.
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    /// Computes the `days`-long window ending on the local day of `end`.
    ///
    /// # Errors
    /// - `InvalidRange` when `days` is `0` or above `MAX_WINDOW_DAYS`.
    ///
    /// A failed store read is not an error: the window is zero-filled and its
    /// status is `StorageUnavailable`.
    pub fn compute_window<S: TodoStore + ?Sized>(
        &self,
        store: &S,
        end: &DateTime<Tz>,
        days: u32,
    ) -> Result<ContributionWindow, ContributionError> {
        let started_at = Instant::now();
        let (first, last) = self.window_dates(end, days)?;
        let start_ms = self.start_of_day_ms(first);
        let end_ms = self.start_of_day_ms(next_day(last, days)?);

        let todos = match store.query_done_between(start_ms, end_ms) {
            Ok(todos) => todos,
            Err(err) => {
                warn!(
                    "event=contribution_window module=contribution status=degraded days={} duration_ms={} error={}",
                    days,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Ok(ContributionWindow::zeroed(
                    first,
                    days,
                    WindowStatus::StorageUnavailable {
                        reason: err.to_string(),
                    },
                ));
            }
        };

        let mut window = ContributionWindow::zeroed(first, days, WindowStatus::Fresh);
        for todo in &todos {
            self.count_into(&mut window, todo, first, start_ms, end_ms);
        }

        debug!(
            "event=contribution_window module=contribution status=ok days={} rows={} commits={} duration_ms={}",
            days,
            todos.len(),
            window.total_commits(),
            started_at.elapsed().as_millis()
        );
        Ok(window)
    }

    /// `compute_window` ending at the current instant.
    pub fn compute_window_now<S: TodoStore + ?Sized>(
        &self,
        store: &S,
        days: u32,
    ) -> Result<ContributionWindow, ContributionError> {
        self.compute_window(store, &self.now(), days)
    }

    /// All-zero fresh window; never touches storage.
    pub fn empty_window(
        &self,
        end: &DateTime<Tz>,
        days: u32,
    ) -> Result<ContributionWindow, ContributionError> {
        let (first, _) = self.window_dates(end, days)?;
        Ok(ContributionWindow::zeroed(first, days, WindowStatus::Fresh))
    }

    /// Epoch-millisecond bounds `[start, end)` of one local day.
    pub fn day_bounds_ms(&self, date: NaiveDate) -> Option<(i64, i64)> {
        let next = date.succ_opt()?;
        Some((self.start_of_day_ms(date), self.start_of_day_ms(next)))
    }

    /// Local calendar day containing `epoch_ms`.
    pub fn local_date(&self, epoch_ms: i64) -> Option<NaiveDate> {
        match self.tz.timestamp_millis_opt(epoch_ms) {
            LocalResult::Single(dt) => Some(dt.date_naive()),
            LocalResult::Ambiguous(earliest, _) => Some(earliest.date_naive()),
            LocalResult::None => None,
        }
    }

    /// First instant of the next local day after `now`.
    pub fn next_day_start(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let next = now.date_naive().succ_opt()?;
        self.tz
            .timestamp_millis_opt(self.start_of_day_ms(next))
            .earliest()
    }

    fn window_dates(
        &self,
        end: &DateTime<Tz>,
        days: u32,
    ) -> Result<(NaiveDate, NaiveDate), ContributionError> {
        if days == 0 || days > MAX_WINDOW_DAYS {
            return Err(ContributionError::InvalidRange { days });
        }
        let last = end.date_naive();
        let first = last
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .ok_or(ContributionError::InvalidRange { days })?;
        Ok((first, last))
    }

    fn count_into(
        &self,
        window: &mut ContributionWindow,
        todo: &TodoItem,
        first: NaiveDate,
        start_ms: i64,
        end_ms: i64,
    ) {
        if !todo.is_committed_within(start_ms, end_ms) {
            return;
        }
        let Some(date) = self.local_date(todo.updated_at) else {
            return;
        };
        let Ok(offset) = usize::try_from((date - first).num_days()) else {
            return;
        };
        if let Some(bucket) = window.buckets.get_mut(offset) {
            bucket.commit_count = bucket.commit_count.saturating_add(1);
        }
    }

    /// Local midnight of `date`, or the first instant after a DST gap that
    /// swallows midnight.
    fn start_of_day_ms(&self, date: NaiveDate) -> i64 {
        let midnight = date.and_time(NaiveTime::MIN);
        match self.tz.from_local_datetime(&midnight) {
            LocalResult::Single(dt) => dt.timestamp_millis(),
            LocalResult::Ambiguous(earliest, _) => earliest.timestamp_millis(),
            LocalResult::None => {
                let before = self
                    .tz
                    .offset_from_utc_datetime(&(midnight - TimeDelta::days(1)))
                    .fix();
                (midnight - TimeDelta::seconds(i64::from(before.local_minus_utc())))
                    .and_utc()
                    .timestamp_millis()
            }
        }
    }
}

fn next_day(date: NaiveDate, days: u32) -> Result<NaiveDate, ContributionError> {
    date.succ_opt()
        .ok_or(ContributionError::InvalidRange { days })
}

#[cfg(test)]
mod tests {
    use super::{ContributionAggregator, DayBucket};
    use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};

    #[test]
    fn day_bounds_follow_time_zone_offset() {
        let kst = FixedOffset::east_opt(9 * 3600).unwrap();
        let aggregator = ContributionAggregator::new(kst);
        let date = NaiveDate::from_ymd_opt(2022, 9, 8).unwrap();

        let (start, end) = aggregator.day_bounds_ms(date).unwrap();
        let expected_start = Utc
            .with_ymd_and_hms(2022, 9, 7, 15, 0, 0)
            .unwrap()
            .timestamp_millis();
        assert_eq!(start, expected_start);
        assert_eq!(end - start, 24 * 60 * 60 * 1000);
    }

    #[test]
    fn local_date_uses_aggregator_zone() {
        let kst = FixedOffset::east_opt(9 * 3600).unwrap();
        let aggregator = ContributionAggregator::new(kst);
        let late_utc = Utc
            .with_ymd_and_hms(2022, 9, 7, 16, 0, 0)
            .unwrap()
            .timestamp_millis();
        assert_eq!(
            aggregator.local_date(late_utc),
            NaiveDate::from_ymd_opt(2022, 9, 8)
        );
    }

    #[test]
    fn next_day_start_is_following_midnight() {
        let aggregator = ContributionAggregator::new(Utc);
        let now = Utc.with_ymd_and_hms(2022, 9, 8, 13, 30, 0).unwrap();
        assert_eq!(
            aggregator.next_day_start(&now),
            Some(Utc.with_ymd_and_hms(2022, 9, 9, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn detail_label_formats_date_and_count() {
        let bucket = DayBucket {
            date: NaiveDate::from_ymd_opt(2022, 9, 8).unwrap(),
            commit_count: 3,
        };
        assert_eq!(bucket.detail_label(), "2022-09-08(Thu)\n3 commits");
    }
}
