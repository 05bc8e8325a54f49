pub mod backdate;
pub mod domain;
pub mod ports;
pub mod stats;
pub mod streak;
pub mod validate;

pub use domain::{
    ActivityEvent, ActivityValue, EmailSubscription, EventId, EventKind, ReminderSubscription,
    StreakTier, User, UserProfile,
};
pub use ports::{
    ChartRenderer, ChatTransport, EventFilter, EventStore, MailTransport, PortError, PortResult,
};
