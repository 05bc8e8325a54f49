//! crates/wellness_core/src/stats.rs
//!
//! Pure aggregation helpers shared by the success messages, the stats
//! charts, the weekly summary and the reminder scheduler.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};

use crate::domain::ActivityEvent;

/// Change against the previous rating in the trailing 24 hours.
///
/// `window` holds every reading in that window, including the one just
/// logged; with fewer than two readings there is nothing to compare
/// against. The comparison point is the second-most-recent reading.
pub fn rating_delta(window: &[ActivityEvent], new_value: i64) -> Option<i64> {
    if window.len() < 2 {
        return None;
    }
    let mut sorted: Vec<&ActivityEvent> = window.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let previous = sorted[1].value.as_f64()? as i64;
    Some(new_value - previous)
}

/// Buckets events by calendar date, summing their numeric values.
/// Text events contribute nothing. Output is date-ordered.
pub fn daily_sums(events: &[ActivityEvent]) -> Vec<(NaiveDate, f64)> {
    let mut buckets: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for event in events {
        if let Some(v) = event.value.as_f64() {
            *buckets.entry(event.date()).or_insert(0.0) += v;
        }
    }
    buckets.into_iter().collect()
}

/// Raw chronological (timestamp, value) series for rating charts.
pub fn rating_series(events: &[ActivityEvent]) -> Vec<(DateTime<Utc>, f64)> {
    let mut points: Vec<(DateTime<Utc>, f64)> = events
        .iter()
        .filter_map(|e| Some((e.created_at, e.value.as_f64()?)))
        .collect();
    points.sort_by_key(|(at, _)| *at);
    points
}

/// X-axis limits for a chart: an explicit bound wins, an open bound falls
/// back to the earliest/latest date in the data. `None` when there is no
/// way to pick limits (open bounds and no data).
pub fn chart_bounds(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    dates: &[NaiveDate],
) -> Option<(NaiveDate, NaiveDate)> {
    let lower = start.or_else(|| dates.iter().min().copied())?;
    let upper = end.or_else(|| dates.iter().max().copied())?;
    Some((lower, upper))
}

/// Aggregates for the 7-day email digest.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySummary {
    pub meditation_minutes: f64,
    pub exercise_count: usize,
    pub sleep_mean: f64,
    pub happiness_mean: f64,
    pub anxiety_mean: f64,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let collected: Vec<f64> = values.collect();
    collected.iter().sum::<f64>() / collected.len().max(1) as f64
}

/// Folds the trailing-week event slices into the digest numbers.
pub fn weekly_summary(
    meditation: &[ActivityEvent],
    exercise: &[ActivityEvent],
    sleep: &[ActivityEvent],
    happiness: &[ActivityEvent],
    anxiety: &[ActivityEvent],
) -> WeeklySummary {
    WeeklySummary {
        meditation_minutes: meditation.iter().filter_map(|e| e.value.as_f64()).sum(),
        exercise_count: exercise.len(),
        sleep_mean: mean(sleep.iter().filter_map(|e| e.value.as_f64())),
        happiness_mean: mean(happiness.iter().filter_map(|e| e.value.as_f64())),
        anxiety_mean: mean(anxiety.iter().filter_map(|e| e.value.as_f64())),
    }
}

/// Start of "today" for a reminder subscriber. Their day begins at
/// `midnight_hour` UTC; if that hour has not yet passed today, the
/// current window started yesterday.
pub fn reminder_window_start(now: DateTime<Utc>, midnight_hour: u32) -> DateTime<Utc> {
    let base = if midnight_hour > now.hour() {
        now - Duration::days(1)
    } else {
        now
    };
    base.with_hour(midnight_hour)
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(base)
}
