//! services/bot/src/bot/reminders.rs
//!
//! Meditation reminders: the `/reminders` command that registers per-hour
//! subscriptions, and the hourly background task that delivers them.

use std::sync::{Arc, LazyLock};

use chrono::{TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use regex::Regex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wellness_core::ports::EventFilter;
use wellness_core::stats::reminder_window_start;
use wellness_core::EventKind;

use crate::adapters::ChatUpdate;
use crate::bot::state::AppState;
use crate::error::BotError;

/// Offset after the top of the hour for the first tick, so the scheduler
/// never clusters with other on-the-hour work.
const TICK_OFFSET_SECS: u64 = 10;

/// Fixed reference date for local-to-UTC hour conversion. Matching the
/// stored offsets to current DST rules is out of scope; subscribers in
/// DST zones drift by an hour twice a year.
const REFERENCE_DATE: (i32, u32, u32) = (2018, 3, 23);

/// Accepted hour tokens: `7AM`, `11pm`.
static HOUR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(1[0-2]|[1-9])(AM|PM|am|pm)$").expect("valid hour pattern"));

//=========================================================================================
// The /reminders Command
//=========================================================================================

/// `/reminders <hours...> <tz>` registers one subscription per hour;
/// `/reminders off` removes them all.
pub async fn reminders_command(
    state: &AppState,
    update: &ChatUpdate,
    args: &[&str],
) -> Result<(), BotError> {
    if args == ["off"] {
        state.store.clear_reminders(update.from.id).await?;
        state
            .say(
                update.from.id,
                "Okay, you won't receive reminders anymore! \u{270C}\u{FE0F}",
            )
            .await;
        return Ok(());
    }

    let Some((tz_token, hour_tokens)) = args.split_last() else {
        state
            .say(
                update.from.id,
                "Please give the hours and your timezone, like this: `/reminders 1PM 5PM 11PM UTC`, \
                 or `/reminders off` to stop.",
            )
            .await;
        return Ok(());
    };

    let Ok(tz) = tz_token.parse::<Tz>() else {
        state
            .say(
                update.from.id,
                &format!(
                    "Sorry, I didn't understand the timezone you specified: `{tz_token}`. \
                     It can be a plain zone like `UTC` or a region like `Europe/Amsterdam`. \
                     The whole command should look similar to this: `/reminders 1PM 5PM 11PM UTC`. \
                     You can specify as many hours as you like."
                ),
            )
            .await;
        return Ok(());
    };

    let mut subscriptions = Vec::new();
    for token in hour_tokens {
        let Some(captures) = HOUR_RE.captures(token) else {
            state
                .say(
                    update.from.id,
                    &format!(
                        "Sorry, I didn't understand this hour: `{token}`. It should look similar \
                         to this: `11AM`. The whole command should look similar to this: \
                         `/reminders 1PM 5PM 11PM UTC`. You can specify as many hours as you like."
                    ),
                )
                .await;
            return Ok(());
        };
        let hour12: u32 = captures[1].parse().unwrap_or(0);
        let pm = captures[2].eq_ignore_ascii_case("pm");
        let local_hour = (hour12 % 12) + if pm { 12 } else { 0 };

        let Some(hours) = to_utc_hours(tz, local_hour) else {
            state
                .say(
                    update.from.id,
                    &format!("Sorry, `{token}` doesn't exist in {tz_token} and can't be scheduled."),
                )
                .await;
            return Ok(());
        };
        subscriptions.push(hours);
    }

    if subscriptions.is_empty() {
        state
            .say(
                update.from.id,
                "Please give at least one hour, like this: `/reminders 1PM 5PM 11PM UTC`.",
            )
            .await;
        return Ok(());
    }

    let user = state.ensure_user(update).await?;
    for (notify_hour, midnight_hour) in subscriptions {
        state
            .store
            .add_reminder(user.id, notify_hour, midnight_hour)
            .await?;
    }

    let name = user.display_name();
    let text = if user.has_private_channel {
        format!("Okay {name}, I've scheduled those reminders for you! \u{1F551}")
    } else {
        format!(
            "Okay {name}, I've scheduled those reminders for you! \u{1F551} If you haven't \
             already, please send me a private message so that I can deliver them!"
        )
    };
    state.say(update.from.id, &text).await;
    Ok(())
}

/// Converts a local wall-clock hour to `(notify_hour, midnight_hour)` in
/// UTC, evaluated at the fixed reference date.
fn to_utc_hours(tz: Tz, local_hour: u32) -> Option<(u32, u32)> {
    let (y, m, d) = REFERENCE_DATE;
    let notify = tz
        .with_ymd_and_hms(y, m, d, local_hour, 0, 0)
        .earliest()?
        .with_timezone(&Utc)
        .hour();
    let midnight = tz
        .with_ymd_and_hms(y, m, d, 0, 0, 0)
        .earliest()?
        .with_timezone(&Utc)
        .hour();
    Some((notify, midnight))
}

//=========================================================================================
// The Hourly Scheduler Task
//=========================================================================================

/// Spawns the reminder scheduler. It lives until `token` is cancelled and
/// never lets one bad tick or one unreachable user end the loop.
pub fn spawn_scheduler(state: Arc<AppState>, token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Reminder scheduler started.");
        loop {
            let delay = next_tick_delay();
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            if let Err(e) = run_tick(&state).await {
                warn!("Reminder tick failed: {}", e);
            }
        }
        info!("Reminder scheduler stopped.");
    })
}

/// Time until the next top of the hour, plus the fixed offset.
fn next_tick_delay() -> std::time::Duration {
    let now = Utc::now();
    let seconds_into_hour = u64::from(now.minute()) * 60 + u64::from(now.second());
    std::time::Duration::from_secs(3600 - seconds_into_hour + TICK_OFFSET_SECS)
}

/// One scheduler pass: notify every subscriber of the current UTC hour
/// who has not yet meditated in their personal "today".
pub async fn run_tick(state: &AppState) -> Result<(), BotError> {
    let now = Utc::now();
    let due = state.store.reminders_at_hour(now.hour()).await?;

    for subscription in due {
        let window_start = reminder_window_start(now, subscription.midnight_hour);
        let filter = EventFilter::for_user(subscription.user_id)
            .between(Some(window_start), Some(now));
        match state.store.events(EventKind::Meditation, filter).await {
            Ok(events) if events.is_empty() => {
                state
                    .say(
                        subscription.user_id,
                        "Hey! You asked me to remind you to meditate! \u{1F64F} You can turn \
                         these notifications off with `/reminders off`. \u{1F551}",
                    )
                    .await;
            }
            Ok(_) => {} // Already meditated today.
            Err(e) => {
                warn!(
                    "Reminder check failed for user {}: {}",
                    subscription.user_id, e
                );
            }
        }
    }
    Ok(())
}
