//! services/bot/src/bot/reports.rs
//!
//! The charted-history commands (`*stats`) and the journal lookup.

use chrono::{Duration, Utc};
use wellness_core::backdate::parse_strict_date;
use wellness_core::domain::EventKind;
use wellness_core::ports::EventFilter;
use wellness_core::stats::{chart_bounds, daily_sums, rating_series};

use crate::adapters::ChatUpdate;
use crate::bot::state::AppState;
use crate::error::BotError;

/// How a bar chart's headline number is aggregated.
#[derive(Clone, Copy, PartialEq)]
enum Headline {
    Total,
    Average,
}

/// Dispatches one of the stats commands. The optional argument picks the
/// reporting period; anything unrecognized falls back to a week.
pub async fn stats(
    state: &AppState,
    update: &ChatUpdate,
    command: &str,
    args: &[&str],
) -> Result<(), BotError> {
    let user = state.ensure_user(update).await?;

    let period_days = match args.first().copied() {
        Some("biweekly") => Some(14),
        Some("monthly") => Some(31),
        Some("all") => None,
        _ => Some(7),
    };
    let now = Utc::now();
    let start = period_days.map(|days| now - Duration::days(days));

    let png = match command {
        "meditatestats" => {
            bar_chart(state, EventKind::Meditation, Some(user.id), &user.display_name(), start, Headline::Total).await?
        }
        "sleepstats" => {
            bar_chart(state, EventKind::Sleep, Some(user.id), &user.display_name(), start, Headline::Average).await?
        }
        "fastingstats" => {
            bar_chart(state, EventKind::Fasting, Some(user.id), &user.display_name(), start, Headline::Total).await?
        }
        "groupstats" => {
            bar_chart(state, EventKind::Meditation, None, "Group", start, Headline::Total).await?
        }
        "anxietystats" => {
            line_chart(state, EventKind::Anxiety, user.id, &user.display_name(), start).await?
        }
        // Both spellings are registered.
        "happystats" | "happinessstats" => {
            line_chart(state, EventKind::Happiness, user.id, &user.display_name(), start).await?
        }
        _ => return Ok(()),
    };

    state.scrub(update).await;
    match png {
        Some(png) => state.say_photo(update.chat_id, &png).await,
        None => {
            state
                .say(update.chat_id, "Nothing logged yet, so there is nothing to chart!")
                .await
        }
    }
    Ok(())
}

/// Per-day summed bar chart. `None` when an open-ended range has no data
/// to pin the axis to.
async fn bar_chart(
    state: &AppState,
    kind: EventKind,
    user_id: Option<i64>,
    name: &str,
    start: Option<chrono::DateTime<Utc>>,
    headline: Headline,
) -> Result<Option<Vec<u8>>, BotError> {
    let filter = EventFilter {
        user_id,
        ..EventFilter::default()
    }
    .between(start, Some(Utc::now()));
    let events = state.store.events(kind, filter).await?;

    let series = daily_sums(&events);
    let dates: Vec<_> = series.iter().map(|(d, _)| *d).collect();
    let Some(bounds) = chart_bounds(
        start.map(|t| t.date_naive()),
        Some(Utc::now().date_naive()),
        &dates,
    ) else {
        return Ok(None);
    };

    let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
    let sum: f64 = values.iter().sum();
    let headline_text = match headline {
        Headline::Total => format!("Total: {:.1}", sum),
        Headline::Average => format!("Average: {:.1}", sum / values.len().max(1) as f64),
    };
    let interval = (bounds.1 - bounds.0).num_days();
    let units = kind.unit().unwrap_or("");
    let title = format!(
        "{name}'s {} chart - {interval} days report. {headline_text} {units}",
        kind.stream()
    );

    let png = state
        .charts
        .render_bar(&series, bounds, &title, kind.stream())?;
    Ok(Some(png))
}

/// Raw chronological rating line, y-axis pinned to the rating scale.
async fn line_chart(
    state: &AppState,
    kind: EventKind,
    user_id: i64,
    name: &str,
    start: Option<chrono::DateTime<Utc>>,
) -> Result<Option<Vec<u8>>, BotError> {
    let filter = EventFilter::for_user(user_id).between(start, Some(Utc::now()));
    let events = state.store.events(kind, filter).await?;

    let points = rating_series(&events);
    let dates: Vec<_> = points.iter().map(|(t, _)| t.date_naive()).collect();
    let Some(bounds) = chart_bounds(
        start.map(|t| t.date_naive()),
        Some(Utc::now().date_naive()),
        &dates,
    ) else {
        return Ok(None);
    };

    let average = points.iter().map(|(_, v)| *v).sum::<f64>() / points.len().max(1) as f64;
    let interval = (bounds.1 - bounds.0).num_days();
    let title = format!(
        "{name}'s {} chart - {interval} days report. Average: {average:.2}",
        kind.stream()
    );

    let png = state
        .charts
        .render_line(&points, bounds, &title, kind.stream(), (0.0, 10.0))?;
    Ok(Some(png))
}

/// `/journalentries <date>`: every journal entry from that calendar day,
/// one message each so long entries don't hit transport length limits.
pub async fn journal_entries(
    state: &AppState,
    update: &ChatUpdate,
    args: &[&str],
) -> Result<(), BotError> {
    let user = state.ensure_user(update).await?;

    let date = args.first().and_then(|token| parse_strict_date(token));
    let Some(date) = date else {
        state
            .say(
                update.from.id,
                "Sorry, I couldn't understand that date format. \u{1F914}",
            )
            .await;
        return Ok(());
    };

    let day_start = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let day_end = day_start + Duration::days(1);
    let filter = EventFilter::for_user(user.id).between(Some(day_start), Some(day_end));
    let entries = state.store.events(EventKind::Journal, filter).await?;

    state.scrub(update).await;

    let name = user.display_name();
    if entries.is_empty() {
        state
            .say(
                update.chat_id,
                &format!("\u{1F4D3} {name} had no journal entries on {date}. \u{1F4D3}"),
            )
            .await;
        return Ok(());
    }

    for entry in entries {
        state
            .say(
                update.chat_id,
                &format!(
                    "\u{1F4D3} Journal entry by {name}, dated {}: {}",
                    entry.created_at.format("%a. %d %B %Y %I:%M%p"),
                    entry.value
                ),
            )
            .await;
    }
    Ok(())
}
