//! services/bot/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `EventStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Activity kinds live in one table per kind (same shape, different value
//! type). Table names come only from `EventKind::stream()`, a total match
//! on the enum, so the dynamic SQL here never embeds caller-supplied
//! strings. That dynamism is also why this adapter uses the runtime query
//! API rather than the compile-time macros.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use wellness_core::domain::{
    ActivityEvent, ActivityValue, EmailSubscription, EventId, EventKind, ReminderSubscription,
    User, UserProfile,
};
use wellness_core::ports::{EventFilter, EventStore, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `EventStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Postgres error code for a foreign key violation.
const FK_VIOLATION: &str = "23503";

fn store_error(e: sqlx::Error) -> PortError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some(FK_VIOLATION) {
            return PortError::ForeignKeyViolation(db_err.to_string());
        }
    }
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    first_name: String,
    last_name: Option<String>,
    username: Option<String>,
    has_private_channel: bool,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            username: self.username,
            has_private_channel: self.has_private_channel,
        }
    }
}

#[derive(FromRow)]
struct IntEventRecord {
    id: i64,
    user_id: i64,
    value: i64,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct FloatEventRecord {
    id: i64,
    user_id: i64,
    value: f64,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct TextEventRecord {
    id: i64,
    user_id: i64,
    value: String,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ReminderRecord {
    user_id: i64,
    notify_hour: i32,
    midnight_hour: i32,
}
impl ReminderRecord {
    fn to_domain(self) -> ReminderSubscription {
        ReminderSubscription {
            user_id: self.user_id,
            notify_hour: self.notify_hour as u32,
            midnight_hour: self.midnight_hour as u32,
        }
    }
}

#[derive(FromRow)]
struct EmailRecord {
    user_id: i64,
    email: String,
    last_emailed: DateTime<Utc>,
}
impl EmailRecord {
    fn to_domain(self) -> EmailSubscription {
        EmailSubscription {
            user_id: self.user_id,
            email: self.email,
            last_emailed: self.last_emailed,
        }
    }
}

//=========================================================================================
// Per-kind column shapes
//=========================================================================================

/// The SQL type of a kind's `value` column, used to type the optional
/// exact-match bind parameter.
fn value_sql_type(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Meditation | EventKind::Anxiety | EventKind::Happiness => "bigint",
        EventKind::Sleep | EventKind::Fasting => "double precision",
        EventKind::Exercise | EventKind::Done | EventKind::Journal => "text",
    }
}

fn select_sql(kind: EventKind) -> String {
    // Unset filters collapse to TRUE, mirroring the one-query-fits-all
    // lookup the store contract asks for. Time bounds are strict.
    format!(
        "SELECT id, user_id, value, created_at FROM {table} \
         WHERE ($1::bigint IS NULL OR user_id = $1) \
           AND ($2::timestamptz IS NULL OR created_at > $2) \
           AND ($3::timestamptz IS NULL OR created_at < $3) \
           AND ($4::{vtype} IS NULL OR value = $4) \
         ORDER BY created_at ASC",
        table = kind.stream(),
        vtype = value_sql_type(kind),
    )
}

fn insert_sql(kind: EventKind) -> String {
    format!(
        "INSERT INTO {table} (user_id, value, created_at) \
         VALUES ($1, $2, COALESCE($3::timestamptz, now())) RETURNING id",
        table = kind.stream(),
    )
}

//=========================================================================================
// `EventStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl EventStore for DbAdapter {
    async fn upsert_user(
        &self,
        profile: &UserProfile,
        has_private_channel: bool,
    ) -> PortResult<(User, bool)> {
        let existing = sqlx::query_as::<_, UserRecord>(
            "SELECT id, first_name, last_name, username, has_private_channel \
             FROM users WHERE id = $1",
        )
        .bind(profile.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        if let Some(record) = existing {
            return Ok((record.to_domain(), false));
        }

        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, first_name, last_name, username, has_private_channel) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO NOTHING \
             RETURNING id, first_name, last_name, username, has_private_channel",
        )
        .bind(profile.id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.username)
        .bind(has_private_channel)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        match record {
            Some(record) => Ok((record.to_domain(), true)),
            // Lost a create race; the row exists now.
            None => {
                let record = sqlx::query_as::<_, UserRecord>(
                    "SELECT id, first_name, last_name, username, has_private_channel \
                     FROM users WHERE id = $1",
                )
                .bind(profile.id)
                .fetch_one(&self.pool)
                .await
                .map_err(store_error)?;
                Ok((record.to_domain(), false))
            }
        }
    }

    async fn mark_private_channel(&self, user_id: i64) -> PortResult<()> {
        sqlx::query("UPDATE users SET has_private_channel = TRUE WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn all_users(&self) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(
            "SELECT id, first_name, last_name, username, has_private_channel FROM users",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(records.into_iter().map(UserRecord::to_domain).collect())
    }

    async fn append(
        &self,
        user_id: i64,
        kind: EventKind,
        value: &ActivityValue,
        at: Option<DateTime<Utc>>,
    ) -> PortResult<EventId> {
        let sql = insert_sql(kind);
        let query = sqlx::query_scalar::<_, i64>(&sql).bind(user_id);
        let query = match value {
            ActivityValue::Minutes(v) | ActivityValue::Rating(v) => query.bind(*v),
            ActivityValue::Hours(v) => query.bind(*v),
            ActivityValue::Text(v) => query.bind(v.clone()),
        };

        let id = query
            .bind(at)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(id)
    }

    async fn events(&self, kind: EventKind, filter: EventFilter) -> PortResult<Vec<ActivityEvent>> {
        let sql = select_sql(kind);

        let events = match kind {
            EventKind::Meditation | EventKind::Anxiety | EventKind::Happiness => {
                let value = match &filter.value {
                    Some(ActivityValue::Minutes(v)) | Some(ActivityValue::Rating(v)) => Some(*v),
                    _ => None,
                };
                let records = sqlx::query_as::<_, IntEventRecord>(&sql)
                    .bind(filter.user_id)
                    .bind(filter.after)
                    .bind(filter.before)
                    .bind(value)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(store_error)?;
                records
                    .into_iter()
                    .map(|r| ActivityEvent {
                        id: r.id,
                        user_id: r.user_id,
                        kind,
                        value: match kind {
                            EventKind::Meditation => ActivityValue::Minutes(r.value),
                            _ => ActivityValue::Rating(r.value),
                        },
                        created_at: r.created_at,
                    })
                    .collect()
            }
            EventKind::Sleep | EventKind::Fasting => {
                let value = match &filter.value {
                    Some(ActivityValue::Hours(v)) => Some(*v),
                    _ => None,
                };
                let records = sqlx::query_as::<_, FloatEventRecord>(&sql)
                    .bind(filter.user_id)
                    .bind(filter.after)
                    .bind(filter.before)
                    .bind(value)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(store_error)?;
                records
                    .into_iter()
                    .map(|r| ActivityEvent {
                        id: r.id,
                        user_id: r.user_id,
                        kind,
                        value: ActivityValue::Hours(r.value),
                        created_at: r.created_at,
                    })
                    .collect()
            }
            EventKind::Exercise | EventKind::Done | EventKind::Journal => {
                let value = match &filter.value {
                    Some(ActivityValue::Text(v)) => Some(v.clone()),
                    _ => None,
                };
                let records = sqlx::query_as::<_, TextEventRecord>(&sql)
                    .bind(filter.user_id)
                    .bind(filter.after)
                    .bind(filter.before)
                    .bind(value)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(store_error)?;
                records
                    .into_iter()
                    .map(|r| ActivityEvent {
                        id: r.id,
                        user_id: r.user_id,
                        kind,
                        value: ActivityValue::Text(r.value),
                        created_at: r.created_at,
                    })
                    .collect()
            }
        };

        Ok(events)
    }

    async fn distinct_activity_dates(
        &self,
        user_id: i64,
        kind: EventKind,
    ) -> PortResult<Vec<NaiveDate>> {
        let sql = format!(
            "SELECT DISTINCT (created_at AT TIME ZONE 'UTC')::date AS day \
             FROM {table} WHERE user_id = $1 ORDER BY day ASC",
            table = kind.stream(),
        );
        let dates = sqlx::query_scalar::<_, NaiveDate>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(dates)
    }

    async fn add_reminder(
        &self,
        user_id: i64,
        notify_hour: u32,
        midnight_hour: u32,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO reminders (user_id, notify_hour, midnight_hour) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(notify_hour as i32)
            .bind(midnight_hour as i32)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn clear_reminders(&self, user_id: i64) -> PortResult<()> {
        sqlx::query("DELETE FROM reminders WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn reminders_at_hour(&self, notify_hour: u32) -> PortResult<Vec<ReminderSubscription>> {
        let records = sqlx::query_as::<_, ReminderRecord>(
            "SELECT user_id, notify_hour, midnight_hour FROM reminders WHERE notify_hour = $1",
        )
        .bind(notify_hour as i32)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(records.into_iter().map(ReminderRecord::to_domain).collect())
    }

    async fn set_email(&self, user_id: i64, email: &str) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO email_subscriptions (user_id, email) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET email = EXCLUDED.email",
        )
        .bind(user_id)
        .bind(email)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn email_subscription(&self, user_id: i64) -> PortResult<Option<EmailSubscription>> {
        let record = sqlx::query_as::<_, EmailRecord>(
            "SELECT user_id, email, last_emailed FROM email_subscriptions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(record.map(EmailRecord::to_domain))
    }

    async fn clear_email(&self, user_id: i64) -> PortResult<()> {
        sqlx::query("DELETE FROM email_subscriptions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn mark_summary_sent(&self, user_id: i64, at: DateTime<Utc>) -> PortResult<()> {
        sqlx::query("UPDATE email_subscriptions SET last_emailed = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}
