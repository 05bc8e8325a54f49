//! services/bot/src/bot/handlers.rs
//!
//! The per-command handlers: one `LogSpec` per activity kind feeding the
//! shared pipeline, plus the streak and leaderboard commands and the
//! private-chat fallback.

use wellness_core::domain::{ActivityValue, EventKind};

use crate::adapters::ChatUpdate;
use crate::bot::current_streak;
use crate::bot::pipeline::{handle_log, LogSpec};
use crate::bot::state::AppState;
use crate::error::BotError;

//=========================================================================================
// Log Commands
//=========================================================================================

const MEDITATE: LogSpec = LogSpec {
    kind: EventKind::Meditation,
    missing_value: "\u{1F64F} How many minutes did you meditate? \u{1F64F}",
    out_of_range: "\u{1F64F} Meditation time must be between 5 and 1440 minutes. \u{1F64F}",
    format_error: "\u{1F64F} You need to specify the minutes as a number! \u{1F64F}",
};

const ANXIETY: LogSpec = LogSpec {
    kind: EventKind::Anxiety,
    missing_value: "Please give your anxiety levels.",
    out_of_range: "Please rate your anxiety between 0 (low) and 10 (high).",
    format_error: "You need to specify the value as a whole number (eg. 7)",
};

const HAPPINESS: LogSpec = LogSpec {
    kind: EventKind::Happiness,
    missing_value: "Please rate your happiness level between 0-10",
    out_of_range: "Please rate your happiness level 0-10",
    format_error: "You need to specify the value as a whole number (eg. 7)",
};

const SLEEP: LogSpec = LogSpec {
    kind: EventKind::Sleep,
    missing_value: "\u{1F4A4} Please give how many hours you slept. \u{1F4A4}",
    out_of_range: "\u{1F4A4} Sleep must be between 0 and 24 hours. \u{1F4A4}",
    format_error: "\u{1F4A4} You need to specify the value as a decimal number (eg. 7.5) \u{1F4A4}",
};

const FASTING: LogSpec = LogSpec {
    kind: EventKind::Fasting,
    missing_value: "\u{1F37D} Please give how many hours you fasted for. \u{1F37D}",
    out_of_range: "\u{1F37D} Fasting hours can't be negative. \u{1F37D}",
    format_error: "\u{1F37D} You need to specify the value as a decimal number (eg. 18.5) \u{1F37D}",
};

const EXERCISE: LogSpec = LogSpec {
    kind: EventKind::Exercise,
    missing_value: "\u{1F4AA} Please specify your exercise. \u{1F4AA}",
    out_of_range: "\u{1F4AA} Please list your activity between 1 and 4000 characters! \u{1F4AA}",
    format_error: "\u{1F4AA} Please list your activity between 1 and 4000 characters! \u{1F4AA}",
};

const DONE: LogSpec = LogSpec {
    kind: EventKind::Done,
    missing_value: "Please list what you completed!",
    out_of_range: "There is a limit of 4000 characters!",
    format_error: "There is a limit of 4000 characters!",
};

const JOURNAL: LogSpec = LogSpec {
    kind: EventKind::Journal,
    missing_value: "\u{270F}\u{FE0F} Please give a journal entry. \u{270F}\u{FE0F}",
    out_of_range: "\u{270F}\u{FE0F} Please give a journal entry between 1 and 4000 characters! \u{270F}\u{FE0F}",
    format_error: "\u{270F}\u{FE0F} Please give a valid journal entry. \u{270F}\u{FE0F}",
};

pub async fn meditate(state: &AppState, update: &ChatUpdate, args: &[&str]) -> Result<(), BotError> {
    handle_log(state, update, args, &MEDITATE).await
}

pub async fn anxiety(state: &AppState, update: &ChatUpdate, args: &[&str]) -> Result<(), BotError> {
    handle_log(state, update, args, &ANXIETY).await
}

pub async fn happiness(state: &AppState, update: &ChatUpdate, args: &[&str]) -> Result<(), BotError> {
    handle_log(state, update, args, &HAPPINESS).await
}

pub async fn sleep(state: &AppState, update: &ChatUpdate, args: &[&str]) -> Result<(), BotError> {
    handle_log(state, update, args, &SLEEP).await
}

pub async fn fasting(state: &AppState, update: &ChatUpdate, args: &[&str]) -> Result<(), BotError> {
    handle_log(state, update, args, &FASTING).await
}

pub async fn exercise(state: &AppState, update: &ChatUpdate, args: &[&str]) -> Result<(), BotError> {
    handle_log(state, update, args, &EXERCISE).await
}

pub async fn done(state: &AppState, update: &ChatUpdate, args: &[&str]) -> Result<(), BotError> {
    handle_log(state, update, args, &DONE).await
}

pub async fn journal(state: &AppState, update: &ChatUpdate, args: &[&str]) -> Result<(), BotError> {
    handle_log(state, update, args, &JOURNAL).await
}

/// `/rest` logs a fixed exercise entry, no arguments.
pub async fn rest(state: &AppState, update: &ChatUpdate) -> Result<(), BotError> {
    let user = state.ensure_user(update).await?;
    state
        .store
        .append(
            user.id,
            EventKind::Exercise,
            &ActivityValue::Text("rest".to_string()),
            None,
        )
        .await?;
    state.scrub(update).await;
    state
        .say(
            update.chat_id,
            &format!("\u{2705} {} is resting today!", user.display_name()),
        )
        .await;
    Ok(())
}

//=========================================================================================
// Streak and Leaderboard
//=========================================================================================

pub async fn streak(state: &AppState, update: &ChatUpdate) -> Result<(), BotError> {
    let user = state.ensure_user(update).await?;
    let (streak, tier) = current_streak(state.store.as_ref(), user.id).await?;

    state.scrub(update).await;
    state
        .say(
            update.chat_id,
            &format!(
                "{} has a meditation streak of {}! {}",
                user.display_name(),
                streak,
                tier.emoji()
            ),
        )
        .await;
    Ok(())
}

const TOP_DEFAULT: usize = 5;
const TOP_MAX: usize = 20;

/// `/top [n]` ranks everyone by streak. A non-numeric argument falls back
/// to the default.
pub async fn top(state: &AppState, update: &ChatUpdate, args: &[&str]) -> Result<(), BotError> {
    state.ensure_user(update).await?;

    let count = args
        .first()
        .and_then(|arg| arg.parse::<usize>().ok())
        .map(|n| n.max(1))
        .unwrap_or(TOP_DEFAULT)
        .min(TOP_MAX);

    let mut ranked = Vec::new();
    for user in state.store.all_users().await? {
        let (streak, tier) = current_streak(state.store.as_ref(), user.id).await?;
        ranked.push((user, streak, tier));
    }
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let lines: Vec<String> = ranked
        .iter()
        .take(count)
        .enumerate()
        .map(|(i, (user, streak, tier))| {
            format!(
                "{}. {}   ({}{})",
                i + 1,
                user.display_name(),
                streak,
                tier.emoji()
            )
        })
        .collect();

    state.scrub(update).await;
    state.say(update.chat_id, &lines.join("\n")).await;
    Ok(())
}

//=========================================================================================
// Private-chat Fallback
//=========================================================================================

/// Any non-command private message. The first contact from a user without
/// a private channel opens one; afterwards it is just an unknown message.
pub async fn private_fallback(state: &AppState, update: &ChatUpdate) -> Result<(), BotError> {
    let user = state.ensure_user(update).await?;

    if user.has_private_channel {
        state
            .say(update.from.id, "Sorry, I didn't understand that!")
            .await;
    } else {
        state.store.mark_private_channel(user.id).await?;
        state
            .say(
                update.from.id,
                "Thanks for messaging me! \u{1F44B} Now I can send you private messages. \
                 \u{1F4E8} Please don't delete this chat or I won't be able to reach you anymore. \
                 Any command you can run in the group also works here, so you can keep things \
                 private with me! \u{1F496}",
            )
            .await;
    }
    Ok(())
}
