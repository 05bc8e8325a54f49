//! crates/wellness_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};

/// Row identifier assigned by the event store on append.
pub type EventId = i64;

/// A community member, created on first interaction with the bot.
#[derive(Debug, Clone)]
pub struct User {
    /// Stable numeric identity assigned by the chat transport.
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    /// Whether the bot may message this user directly. Once true, never
    /// reverts to false.
    pub has_private_channel: bool,
}

impl User {
    /// The name shown in replies: `@username` when set, otherwise the
    /// full name.
    pub fn display_name(&self) -> String {
        if let Some(username) = &self.username {
            format!("@{username}")
        } else {
            match &self.last_name {
                Some(last) => format!("{} {}", self.first_name, last),
                None => self.first_name.clone(),
            }
        }
    }
}

/// The identity fields the chat transport attaches to every message.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

/// The fixed set of trackable activities. Each kind has its own storage
/// stream and its own validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Meditation,
    Anxiety,
    Happiness,
    Sleep,
    Fasting,
    Exercise,
    Done,
    Journal,
}

impl EventKind {
    /// Storage stream name for this kind. This is the only place a kind
    /// maps to an identifier, so the store never builds SQL from
    /// caller-supplied strings.
    pub fn stream(self) -> &'static str {
        match self {
            EventKind::Meditation => "meditation",
            EventKind::Anxiety => "anxiety",
            EventKind::Happiness => "happiness",
            EventKind::Sleep => "sleep",
            EventKind::Fasting => "fasting",
            EventKind::Exercise => "exercise",
            EventKind::Done => "done",
            EventKind::Journal => "journal",
        }
    }

    /// Unit shown in chart titles and replies, where one applies.
    pub fn unit(self) -> Option<&'static str> {
        match self {
            EventKind::Meditation => Some("minutes"),
            EventKind::Sleep | EventKind::Fasting => Some("hours"),
            _ => None,
        }
    }
}

/// The typed payload of an activity event. The variant is fixed per kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityValue {
    /// Whole minutes (meditation).
    Minutes(i64),
    /// A 0-10 rating (anxiety, happiness).
    Rating(i64),
    /// Fractional hours (sleep, fasting).
    Hours(f64),
    /// Free text (exercise, done, journal).
    Text(String),
}

impl ActivityValue {
    /// Numeric view of the value, used for chart bucketing and summary
    /// aggregation. Text values have no numeric reading.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ActivityValue::Minutes(v) | ActivityValue::Rating(v) => Some(*v as f64),
            ActivityValue::Hours(v) => Some(*v),
            ActivityValue::Text(_) => None,
        }
    }
}

impl std::fmt::Display for ActivityValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityValue::Minutes(v) | ActivityValue::Rating(v) => write!(f, "{v}"),
            ActivityValue::Hours(v) => write!(f, "{v}"),
            ActivityValue::Text(v) => write!(f, "{v}"),
        }
    }
}

/// One logged activity. Immutable once created; the event log is
/// append-only.
#[derive(Debug, Clone)]
pub struct ActivityEvent {
    pub id: EventId,
    pub user_id: i64,
    pub kind: EventKind,
    pub value: ActivityValue,
    pub created_at: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn date(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

/// A registered meditation reminder. A user may hold several, one per
/// requested local hour.
#[derive(Debug, Clone)]
pub struct ReminderSubscription {
    pub user_id: i64,
    /// UTC hour (0-23) at which to notify.
    pub notify_hour: u32,
    /// UTC hour (0-23) that is local midnight for this user; needed to
    /// decide whether they already logged "today".
    pub midnight_hour: u32,
}

/// A registered weekly-summary email address. At most one per user.
#[derive(Debug, Clone)]
pub struct EmailSubscription {
    pub user_id: i64,
    pub email: String,
    pub last_emailed: DateTime<Utc>,
}

/// Display bucket for a streak count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakTier {
    Shrug,
    Fire,
    Spicy,
}

impl StreakTier {
    pub fn for_streak(streak: u32) -> Self {
        if streak == 0 {
            StreakTier::Shrug
        } else if streak < 50 {
            StreakTier::Fire
        } else {
            StreakTier::Spicy
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            StreakTier::Shrug => "\u{1F914}",
            StreakTier::Fire => "\u{1F525}",
            StreakTier::Spicy => "\u{1F336}\u{FE0F}",
        }
    }
}
