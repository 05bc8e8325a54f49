//! crates/wellness_core/src/streak.rs
//!
//! The streak engine: how many consecutive complete days, ending
//! yesterday, the user logged at least one qualifying event.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};

/// No activity predates the bot, so the gap scan never has to look
/// further back than this.
pub fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 1, 1).expect("valid epoch date")
}

/// Computes the streak from the distinct set of dates the user logged on.
///
/// Equivalent to the gap-scan formulation: find the most recent day in
/// `[epoch, yesterday]` with no event, then count the distinct logged days
/// strictly after it. Walking backward from yesterday over the date set
/// gives the same number without materializing the calendar.
///
/// Only complete days count: events dated today (or later) never affect
/// the result, so logging mid-day does not inflate the streak.
pub fn streak_on(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let logged: BTreeSet<NaiveDate> = dates.iter().copied().collect();
    let epoch = epoch();

    let mut streak = 0;
    let mut day = today - Duration::days(1);
    while day >= epoch && logged.contains(&day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}
