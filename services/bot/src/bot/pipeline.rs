//! services/bot/src/bot/pipeline.rs
//!
//! The shared logging pipeline every "log an activity" command runs
//! through: ensure the user exists, peel an optional backdate off the
//! token list, validate, persist, acknowledge.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;
use wellness_core::backdate::{parse_backdate, BackdateOutcome};
use wellness_core::domain::{ActivityValue, EventKind, User};
use wellness_core::ports::EventFilter;
use wellness_core::stats::rating_delta;
use wellness_core::validate::{validate, ValidationError};

use crate::adapters::ChatUpdate;
use crate::bot::state::AppState;
use crate::bot::current_streak;
use crate::error::BotError;

/// Per-kind wiring for the shared pipeline: the kind itself plus the chat
/// messages for each way the input can be wrong.
pub struct LogSpec {
    pub kind: EventKind,
    pub missing_value: &'static str,
    pub out_of_range: &'static str,
    pub format_error: &'static str,
}

/// Runs the shared pipeline for one log command. Every rejection is
/// reported to the user privately and leaves no partial write behind.
pub async fn handle_log(
    state: &AppState,
    update: &ChatUpdate,
    args: &[&str],
    spec: &LogSpec,
) -> Result<(), BotError> {
    let user = state.ensure_user(update).await?;

    if args.is_empty() {
        state.say(update.from.id, spec.missing_value).await;
        return Ok(());
    }

    // A trailing token may backdate the record. Only tried when there is
    // more than one token, so a bare date is still a value (and fails
    // validation as such, not as a backdate).
    let mut tokens = args;
    let mut backdate: Option<DateTime<Utc>> = None;
    if tokens.len() > 1 {
        let last = tokens[tokens.len() - 1];
        match parse_backdate(last, Utc::now().date_naive()) {
            BackdateOutcome::NotADate => {}
            BackdateOutcome::OutOfRange(date) => {
                state
                    .say(
                        update.from.id,
                        &format!(
                            "The backdated date {} (from `{}`) did not take place in the last month.",
                            date.format("%Y-%m-%d"),
                            last
                        ),
                    )
                    .await;
                return Ok(());
            }
            BackdateOutcome::Backdated(at) => {
                tokens = &tokens[..tokens.len() - 1];
                backdate = Some(at);
            }
        }
    }

    let value = match validate(spec.kind, tokens) {
        Ok(value) => value,
        Err(ValidationError::MissingValue) => {
            state.say(update.from.id, spec.missing_value).await;
            return Ok(());
        }
        Err(ValidationError::OutOfRange) => {
            state.say(update.from.id, spec.out_of_range).await;
            return Ok(());
        }
        Err(ValidationError::Format) => {
            state.say(update.from.id, spec.format_error).await;
            return Ok(());
        }
    };

    if let Err(e) = state
        .store
        .append(update.from.id, spec.kind, &value, backdate)
        .await
    {
        warn!("Failed to persist {} event: {}", spec.kind.stream(), e);
        state
            .say(update.from.id, "Sorry, something went wrong saving that.")
            .await;
        return Ok(());
    }

    state.scrub(update).await;

    let text = success_message(state, &user, spec.kind, &value, backdate).await?;
    state.say(update.chat_id, &text).await;
    Ok(())
}

/// The kind-specific acknowledgement. Meditation reports the recomputed
/// streak; ratings report the change against the previous reading in the
/// trailing 24 hours.
async fn success_message(
    state: &AppState,
    user: &User,
    kind: EventKind,
    value: &ActivityValue,
    backdate: Option<DateTime<Utc>>,
) -> Result<String, BotError> {
    let name = user.display_name();
    let historic = match backdate {
        Some(at) => format!(" on {}", at.format("%Y-%m-%d")),
        None => String::new(),
    };

    let text = match kind {
        EventKind::Meditation => {
            let (streak, tier) = current_streak(state.store.as_ref(), user.id).await?;
            format!(
                "\u{2705} {name} meditated for {value} minutes{historic} ({streak}{}) \u{1F64F}",
                tier.emoji()
            )
        }
        EventKind::Anxiety | EventKind::Happiness => {
            let rating = match value {
                ActivityValue::Rating(v) => *v,
                _ => 0,
            };
            let delta = rating_change(state, user.id, kind, rating).await;
            let mood = mood_emoji(kind, rating);
            let noun = kind.stream();
            format!("{mood} {name} rated their {noun} at {rating}{delta}{historic} {mood}")
        }
        EventKind::Sleep => format!("\u{2705} {name} slept for {value} hours{historic} \u{1F4A4}"),
        EventKind::Fasting => {
            format!("\u{2705} {name} fasted for {value} hours{historic} \u{1F37D}")
        }
        EventKind::Exercise => format!("\u{2705} {name} exercised{historic}: {value}"),
        EventKind::Done => format!("\u{2705} {name} completed{historic}: {value}"),
        EventKind::Journal => {
            format!("\u{2705} {name} logged a journal entry{historic}! \u{270F}\u{FE0F}")
        }
    };
    Ok(text)
}

/// Formats the delta against the previous rating in the trailing 24
/// hours, or nothing when there is no previous reading. Query failures
/// only cost the annotation, never the acknowledgement.
async fn rating_change(state: &AppState, user_id: i64, kind: EventKind, new_value: i64) -> String {
    let now = Utc::now();
    // Closed at `now`: a rating backdated to midday today may sit ahead of
    // the clock and must not become the comparison point.
    let filter = EventFilter::for_user(user_id).between(Some(now - Duration::days(1)), Some(now));
    let window = match state.store.events(kind, filter).await {
        Ok(window) => window,
        Err(e) => {
            warn!("Failed to load rating window: {}", e);
            return String::new();
        }
    };

    match rating_delta(&window, new_value) {
        Some(0) => " (no change)".to_string(),
        Some(delta) => format!(" ({delta:+})"),
        None => String::new(),
    }
}

fn mood_emoji(kind: EventKind, rating: i64) -> &'static str {
    match kind {
        EventKind::Anxiety => match rating {
            9..=10 => "\u{1F62D}",
            7..=8 => "\u{1F626}",
            5..=6 => "\u{1F610}",
            3..=4 => "\u{1F642}",
            _ => "\u{1F60E}",
        },
        _ => match rating {
            9..=10 => "\u{1F60E}",
            7..=8 => "\u{1F604}",
            5..=6 => "\u{1F642}",
            4 => "\u{1F610}",
            3 => "\u{1F615}",
            1..=2 => "\u{1F626}",
            _ => "\u{1F62D}",
        },
    }
}
