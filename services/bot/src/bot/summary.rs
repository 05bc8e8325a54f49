//! services/bot/src/bot/summary.rs
//!
//! Email digests: `/summary <email|off|now>` and the 7-day digest itself.

use chrono::{Duration, Utc};
use tracing::warn;
use wellness_core::domain::EventKind;
use wellness_core::ports::EventFilter;
use wellness_core::stats::weekly_summary;

use crate::adapters::ChatUpdate;
use crate::bot::current_streak;
use crate::bot::state::AppState;
use crate::error::BotError;

pub async fn summary_command(
    state: &AppState,
    update: &ChatUpdate,
    args: &[&str],
) -> Result<(), BotError> {
    state.ensure_user(update).await?;
    state.scrub(update).await;

    let [argument] = args else {
        state
            .say(
                update.from.id,
                "\u{1F4E7} Please give your email address, `off`, or `now`!",
            )
            .await;
        return Ok(());
    };

    match *argument {
        "now" => send_summary_now(state, update).await,
        "off" => {
            state.store.clear_email(update.from.id).await?;
            state
                .say(
                    update.from.id,
                    "\u{1F4E7} Okay, you'll no longer receive weekly summaries!",
                )
                .await;
            Ok(())
        }
        address => {
            let Some(address) = normalize_email(address) else {
                state
                    .say(
                        update.from.id,
                        &format!(
                            "\u{1F4E7} It doesn't seem like your email address ({address}) is valid!"
                        ),
                    )
                    .await;
                return Ok(());
            };
            state.store.set_email(update.from.id, &address).await?;
            state
                .say(
                    update.from.id,
                    &format!("\u{1F4E7} Great! You'll start receiving summaries to {address}"),
                )
                .await;
            Ok(())
        }
    }
}

/// Light address normalization: unwrap an optional `Name <addr>` form and
/// require an `@`. Anything stricter is the mail relay's problem.
fn normalize_email(raw: &str) -> Option<String> {
    let inner = match (raw.find('<'), raw.rfind('>')) {
        (Some(open), Some(close)) if open < close => &raw[open + 1..close],
        _ => raw,
    };
    let inner = inner.trim();
    if inner.contains('@') && !inner.contains(char::is_whitespace) {
        Some(inner.to_string())
    } else {
        None
    }
}

/// Renders and sends the trailing-7-day digest to the caller's registered
/// address. Delivery failure is reported and leaves `last_emailed` alone.
async fn send_summary_now(state: &AppState, update: &ChatUpdate) -> Result<(), BotError> {
    let user_id = update.from.id;
    let Some(subscription) = state.store.email_subscription(user_id).await? else {
        state
            .say(update.chat_id, "\u{1F4E7} Please set your email!")
            .await;
        return Ok(());
    };

    let now = Utc::now();
    let week_start = (now - Duration::days(7))
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc();
    let window = |kind| {
        state.store.events(
            kind,
            EventFilter::for_user(user_id).between(Some(week_start), Some(now)),
        )
    };

    let meditation = window(EventKind::Meditation).await?;
    let exercise = window(EventKind::Exercise).await?;
    let sleep = window(EventKind::Sleep).await?;
    let happiness = window(EventKind::Happiness).await?;
    let anxiety = window(EventKind::Anxiety).await?;

    let digest = weekly_summary(&meditation, &exercise, &sleep, &happiness, &anxiety);
    let (streak, _) = current_streak(state.store.as_ref(), user_id).await?;

    let body = format!(
        "Hi {first_name}!\n\
         \n\
         Here are your logged stats for the last seven days:\n\
         \n\
         \u{1F64F} Meditated {minutes:.0} total minutes\n\
         \u{1F525} Meditation streak is at {streak} days in a row\n\
         \u{1F634} Slept on average {sleep:.1} hours per night\n\
         \u{1F642} Average happiness level was {happy:.1}\n\
         \u{1F605} Average anxiety level was {anxious:.1}\n\
         \u{1F4AA} Exercised {workouts} times\n",
        first_name = update.from.first_name,
        minutes = digest.meditation_minutes,
        sleep = digest.sleep_mean,
        happy = digest.happiness_mean,
        anxious = digest.anxiety_mean,
        workouts = digest.exercise_count,
    );

    let Some(mail) = &state.mail else {
        warn!("Summary requested but no mail transport is configured.");
        state
            .say(update.chat_id, "\u{1F4E7} Couldn't send email summary!")
            .await;
        return Ok(());
    };

    match mail
        .send(&subscription.email, "\u{26E9} Weekly Summary", &body)
        .await
    {
        Ok(()) => {
            state.store.mark_summary_sent(user_id, now).await?;
            state
                .say(update.chat_id, "\u{2705} Summary email sent!")
                .await;
        }
        Err(e) => {
            warn!("Summary mail to user {} failed: {}", user_id, e);
            state
                .say(update.chat_id, "\u{1F4E7} Couldn't send email summary!")
                .await;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::normalize_email;

    #[test]
    fn plain_addresses_pass() {
        assert_eq!(
            normalize_email("ada@example.org"),
            Some("ada@example.org".to_string())
        );
    }

    #[test]
    fn display_name_form_is_unwrapped() {
        assert_eq!(
            normalize_email("Ada <ada@example.org>"),
            Some("ada@example.org".to_string())
        );
    }

    #[test]
    fn addresses_without_at_fail() {
        assert_eq!(normalize_email("not-an-address"), None);
    }
}
