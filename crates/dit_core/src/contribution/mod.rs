//! Contribution graph aggregation.
//!
//! # Responsibility
//! - Turn done todos into per-day commit counts over a window of local days.
//! - Map commit counts to discrete severity levels for heat-map cells.
//!
//! # Invariants
//! - A window of `days` always yields exactly `days` buckets, oldest first.
//! - The day of record for a commit is the local day of `updated_at`.
//! - Storage failures degrade to a zero window and never propagate.

pub mod severity;
pub mod window;

pub use severity::{bucket_for, Palette, Rgb, Severity};
pub use window::{
    ContributionAggregator, ContributionError, ContributionWindow, DayBucket, WindowStatus,
    MAX_WINDOW_DAYS, PROFILE_WINDOW_DAYS,
};
