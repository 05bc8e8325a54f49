pub mod handlers;
pub mod help;
pub mod pipeline;
pub mod reminders;
pub mod reports;
pub mod router;
pub mod state;
pub mod summary;

pub use router::handle_update;
pub use state::AppState;

use chrono::Utc;
use wellness_core::domain::StreakTier;
use wellness_core::ports::{EventStore, PortResult};
use wellness_core::streak::streak_on;
use wellness_core::EventKind;

/// Recomputes the caller's meditation streak and its display tier.
pub(crate) async fn current_streak(
    store: &dyn EventStore,
    user_id: i64,
) -> PortResult<(u32, StreakTier)> {
    let dates = store
        .distinct_activity_dates(user_id, EventKind::Meditation)
        .await?;
    let streak = streak_on(&dates, Utc::now().date_naive());
    Ok((streak, StreakTier::for_streak(streak)))
}
