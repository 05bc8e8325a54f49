//! services/bot/src/bot/router.rs
//!
//! Maps incoming chat updates to handlers. Each update is handled to
//! completion; handler errors are logged and reported generically so one
//! bad command never takes the poll loop down.

use tracing::{info, warn};

use crate::adapters::ChatUpdate;
use crate::bot::state::AppState;
use crate::bot::{handlers, help, reminders, reports, summary};
use crate::error::BotError;

/// Handles one incoming update end to end.
pub async fn handle_update(state: &AppState, update: &ChatUpdate) {
    if let Err(e) = dispatch(state, update).await {
        warn!("Command `{}` failed: {}", update.text, e);
        state
            .say(update.from.id, "Sorry, something went wrong with that command.")
            .await;
    }
}

async fn dispatch(state: &AppState, update: &ChatUpdate) -> Result<(), BotError> {
    let text = update.text.trim();

    let Some(stripped) = text.strip_prefix('/') else {
        // Plain text only matters in a private chat, where the first
        // contact opens the private channel.
        if update.is_private {
            return handlers::private_fallback(state, update).await;
        }
        return Ok(());
    };

    let mut parts = stripped.split_whitespace();
    // A command may carry an @botname suffix in group chats.
    let command = parts
        .next()
        .and_then(|word| word.split('@').next())
        .unwrap_or("");
    let args: Vec<&str> = parts.collect();

    info!("Dispatching /{} for user {}", command, update.from.id);

    match command {
        "meditate" | "meditation" => handlers::meditate(state, update, &args).await,
        "anxiety" => handlers::anxiety(state, update, &args).await,
        "happiness" => handlers::happiness(state, update, &args).await,
        "sleep" => handlers::sleep(state, update, &args).await,
        "fasting" | "fast" => handlers::fasting(state, update, &args).await,
        "exercise" => handlers::exercise(state, update, &args).await,
        "done" => handlers::done(state, update, &args).await,
        "journal" => handlers::journal(state, update, &args).await,
        "rest" => handlers::rest(state, update).await,
        "streak" => handlers::streak(state, update).await,
        "top" => handlers::top(state, update, &args).await,
        "summary" => summary::summary_command(state, update, &args).await,
        "reminders" => reminders::reminders_command(state, update, &args).await,
        "journalentries" => reports::journal_entries(state, update, &args).await,
        "meditatestats" | "sleepstats" | "fastingstats" | "groupstats" | "anxietystats"
        | "happystats" | "happinessstats" => reports::stats(state, update, command, &args).await,
        "help" => help::help(state, update).await,
        _ => {
            if update.is_private {
                handlers::private_fallback(state, update).await
            } else {
                Ok(())
            }
        }
    }
}
