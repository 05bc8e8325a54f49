//! crates/wellness_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases,
//! chat transports, chart renderers, or mail relays.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{
    ActivityEvent, ActivityValue, EmailSubscription, EventId, EventKind, ReminderSubscription,
    User, UserProfile,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Referenced user does not exist: {0}")]
    ForeignKeyViolation(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Event Store Port
//=========================================================================================

/// Filters for an event query. Any field left unset matches everything.
/// Time bounds are strict: only events with `after < created_at < before`
/// are returned.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub user_id: Option<i64>,
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
    /// Exact-match value filter.
    pub value: Option<ActivityValue>,
}

impl EventFilter {
    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn between(mut self, after: Option<DateTime<Utc>>, before: Option<DateTime<Utc>>) -> Self {
        self.after = after;
        self.before = before;
        self
    }
}

/// The durable, append-only store of users, activity events and
/// subscriptions.
#[async_trait]
pub trait EventStore: Send + Sync {
    // --- User Management ---

    /// Create-on-first-sight. Returns the stored user and whether this
    /// call created it. An existing row is left as-is (in particular
    /// `has_private_channel` stays true once set).
    async fn upsert_user(
        &self,
        profile: &UserProfile,
        has_private_channel: bool,
    ) -> PortResult<(User, bool)>;

    /// One-way flip of `has_private_channel` to true.
    async fn mark_private_channel(&self, user_id: i64) -> PortResult<()>;

    async fn all_users(&self) -> PortResult<Vec<User>>;

    // --- Activity Events ---

    /// Appends one event. `at` overrides the creation timestamp (backdating);
    /// `None` means now. Fails with `ForeignKeyViolation` for an unknown
    /// user; value-range validation happens upstream of this layer.
    async fn append(
        &self,
        user_id: i64,
        kind: EventKind,
        value: &ActivityValue,
        at: Option<DateTime<Utc>>,
    ) -> PortResult<EventId>;

    /// All events of `kind` matching `filter`, ordered by creation time.
    async fn events(&self, kind: EventKind, filter: EventFilter) -> PortResult<Vec<ActivityEvent>>;

    /// The distinct calendar dates on which the user logged `kind`.
    async fn distinct_activity_dates(
        &self,
        user_id: i64,
        kind: EventKind,
    ) -> PortResult<Vec<NaiveDate>>;

    // --- Reminder Subscriptions ---

    async fn add_reminder(&self, user_id: i64, notify_hour: u32, midnight_hour: u32)
        -> PortResult<()>;

    /// Deletes all of the user's reminders.
    async fn clear_reminders(&self, user_id: i64) -> PortResult<()>;

    async fn reminders_at_hour(&self, notify_hour: u32) -> PortResult<Vec<ReminderSubscription>>;

    // --- Email Subscriptions ---

    /// Registers or replaces the user's summary email address.
    async fn set_email(&self, user_id: i64, email: &str) -> PortResult<()>;

    async fn email_subscription(&self, user_id: i64) -> PortResult<Option<EmailSubscription>>;

    async fn clear_email(&self, user_id: i64) -> PortResult<()>;

    async fn mark_summary_sent(&self, user_id: i64, at: DateTime<Utc>) -> PortResult<()>;
}

//=========================================================================================
// Outbound Service Ports
//=========================================================================================

/// The chat transport the bot replies through.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> PortResult<()>;

    /// Sends a one-off PNG attachment.
    async fn send_photo(&self, chat_id: i64, png: &[u8]) -> PortResult<()>;

    /// Best-effort removal of a message. "Already gone" is not an error.
    async fn delete_message(&self, chat_id: i64, message_id: i64) -> PortResult<()>;
}

/// Synchronous, may-fail mail delivery. The sender address is part of the
/// adapter's configuration.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> PortResult<()>;
}

/// Renders chart images for the stats commands.
pub trait ChartRenderer: Send + Sync {
    /// A bar chart of per-day summed values. Returns encoded PNG bytes.
    fn render_bar(
        &self,
        series: &[(NaiveDate, f64)],
        x_range: (NaiveDate, NaiveDate),
        title: &str,
        y_label: &str,
    ) -> PortResult<Vec<u8>>;

    /// A line chart of raw chronological points with a fixed y-axis.
    fn render_line(
        &self,
        points: &[(DateTime<Utc>, f64)],
        x_range: (NaiveDate, NaiveDate),
        title: &str,
        y_label: &str,
        y_range: (f64, f64),
    ) -> PortResult<Vec<u8>>;
}
