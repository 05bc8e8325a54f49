//! services/bot/tests/pipeline_test.rs
//!
//! End-to-end tests for the command pipeline against in-memory port
//! implementations: parse, validate, persist, acknowledge.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};

use bot_lib::adapters::ChatUpdate;
use bot_lib::bot::reminders::run_tick;
use bot_lib::bot::{handle_update, AppState};
use wellness_core::domain::{
    ActivityEvent, ActivityValue, EmailSubscription, EventId, EventKind, ReminderSubscription,
    User, UserProfile,
};
use wellness_core::ports::{
    ChartRenderer, ChatTransport, EventFilter, EventStore, MailTransport, PortError, PortResult,
};

//=========================================================================================
// In-memory Port Fakes
//=========================================================================================

#[derive(Default)]
struct StoreData {
    users: HashMap<i64, User>,
    events: Vec<ActivityEvent>,
    next_id: EventId,
    reminders: Vec<ReminderSubscription>,
    emails: HashMap<i64, EmailSubscription>,
}

#[derive(Default)]
struct FakeStore {
    data: Mutex<StoreData>,
}

#[async_trait]
impl EventStore for FakeStore {
    async fn upsert_user(
        &self,
        profile: &UserProfile,
        has_private_channel: bool,
    ) -> PortResult<(User, bool)> {
        let mut data = self.data.lock().unwrap();
        if let Some(existing) = data.users.get(&profile.id) {
            return Ok((existing.clone(), false));
        }
        let user = User {
            id: profile.id,
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            username: profile.username.clone(),
            has_private_channel,
        };
        data.users.insert(user.id, user.clone());
        Ok((user, true))
    }

    async fn mark_private_channel(&self, user_id: i64) -> PortResult<()> {
        let mut data = self.data.lock().unwrap();
        match data.users.get_mut(&user_id) {
            Some(user) => {
                user.has_private_channel = true;
                Ok(())
            }
            None => Err(PortError::NotFound(user_id.to_string())),
        }
    }

    async fn all_users(&self) -> PortResult<Vec<User>> {
        Ok(self.data.lock().unwrap().users.values().cloned().collect())
    }

    async fn append(
        &self,
        user_id: i64,
        kind: EventKind,
        value: &ActivityValue,
        at: Option<DateTime<Utc>>,
    ) -> PortResult<EventId> {
        let mut data = self.data.lock().unwrap();
        if !data.users.contains_key(&user_id) {
            return Err(PortError::ForeignKeyViolation(user_id.to_string()));
        }
        data.next_id += 1;
        let id = data.next_id;
        data.events.push(ActivityEvent {
            id,
            user_id,
            kind,
            value: value.clone(),
            created_at: at.unwrap_or_else(Utc::now),
        });
        Ok(id)
    }

    async fn events(&self, kind: EventKind, filter: EventFilter) -> PortResult<Vec<ActivityEvent>> {
        let data = self.data.lock().unwrap();
        let mut matched: Vec<ActivityEvent> = data
            .events
            .iter()
            .filter(|e| e.kind == kind)
            .filter(|e| filter.user_id.map_or(true, |id| e.user_id == id))
            .filter(|e| filter.after.map_or(true, |t| e.created_at > t))
            .filter(|e| filter.before.map_or(true, |t| e.created_at < t))
            .filter(|e| filter.value.as_ref().map_or(true, |v| &e.value == v))
            .cloned()
            .collect();
        matched.sort_by_key(|e| e.created_at);
        Ok(matched)
    }

    async fn distinct_activity_dates(
        &self,
        user_id: i64,
        kind: EventKind,
    ) -> PortResult<Vec<NaiveDate>> {
        let data = self.data.lock().unwrap();
        let dates: BTreeSet<NaiveDate> = data
            .events
            .iter()
            .filter(|e| e.kind == kind && e.user_id == user_id)
            .map(|e| e.date())
            .collect();
        Ok(dates.into_iter().collect())
    }

    async fn add_reminder(
        &self,
        user_id: i64,
        notify_hour: u32,
        midnight_hour: u32,
    ) -> PortResult<()> {
        self.data.lock().unwrap().reminders.push(ReminderSubscription {
            user_id,
            notify_hour,
            midnight_hour,
        });
        Ok(())
    }

    async fn clear_reminders(&self, user_id: i64) -> PortResult<()> {
        self.data
            .lock()
            .unwrap()
            .reminders
            .retain(|r| r.user_id != user_id);
        Ok(())
    }

    async fn reminders_at_hour(&self, notify_hour: u32) -> PortResult<Vec<ReminderSubscription>> {
        Ok(self
            .data
            .lock()
            .unwrap()
            .reminders
            .iter()
            .filter(|r| r.notify_hour == notify_hour)
            .cloned()
            .collect())
    }

    async fn set_email(&self, user_id: i64, email: &str) -> PortResult<()> {
        self.data.lock().unwrap().emails.insert(
            user_id,
            EmailSubscription {
                user_id,
                email: email.to_string(),
                last_emailed: DateTime::<Utc>::UNIX_EPOCH,
            },
        );
        Ok(())
    }

    async fn email_subscription(&self, user_id: i64) -> PortResult<Option<EmailSubscription>> {
        Ok(self.data.lock().unwrap().emails.get(&user_id).cloned())
    }

    async fn clear_email(&self, user_id: i64) -> PortResult<()> {
        self.data.lock().unwrap().emails.remove(&user_id);
        Ok(())
    }

    async fn mark_summary_sent(&self, user_id: i64, at: DateTime<Utc>) -> PortResult<()> {
        if let Some(sub) = self.data.lock().unwrap().emails.get_mut(&user_id) {
            sub.last_emailed = at;
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeChat {
    sent: Mutex<Vec<(i64, String)>>,
    photos: Mutex<Vec<i64>>,
    /// Chat ids whose sends fail, for degraded-delivery tests.
    unreachable: Mutex<Vec<i64>>,
}

impl FakeChat {
    fn messages(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    fn last_text(&self) -> String {
        self.sent
            .lock()
            .unwrap()
            .last()
            .map(|(_, text)| text.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatTransport for FakeChat {
    async fn send_text(&self, chat_id: i64, text: &str) -> PortResult<()> {
        if self.unreachable.lock().unwrap().contains(&chat_id) {
            return Err(PortError::Unexpected("chat unreachable".to_string()));
        }
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, _png: &[u8]) -> PortResult<()> {
        self.photos.lock().unwrap().push(chat_id);
        Ok(())
    }

    async fn delete_message(&self, _chat_id: i64, _message_id: i64) -> PortResult<()> {
        Ok(())
    }
}

struct FakeCharts;

impl ChartRenderer for FakeCharts {
    fn render_bar(
        &self,
        _series: &[(NaiveDate, f64)],
        _x_range: (NaiveDate, NaiveDate),
        _title: &str,
        _y_label: &str,
    ) -> PortResult<Vec<u8>> {
        Ok(b"png".to_vec())
    }

    fn render_line(
        &self,
        _points: &[(DateTime<Utc>, f64)],
        _x_range: (NaiveDate, NaiveDate),
        _title: &str,
        _y_label: &str,
        _y_range: (f64, f64),
    ) -> PortResult<Vec<u8>> {
        Ok(b"png".to_vec())
    }
}

struct FailingMail;

#[async_trait]
impl MailTransport for FailingMail {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> PortResult<()> {
        Err(PortError::Unexpected("relay refused".to_string()))
    }
}

//=========================================================================================
// Test Harness
//=========================================================================================

fn harness() -> (AppState, Arc<FakeStore>, Arc<FakeChat>) {
    let store = Arc::new(FakeStore::default());
    let chat = Arc::new(FakeChat::default());
    let state = AppState {
        store: store.clone(),
        chat: chat.clone(),
        mail: None,
        charts: Arc::new(FakeCharts),
    };
    (state, store, chat)
}

fn profile(id: i64, username: &str) -> UserProfile {
    UserProfile {
        id,
        first_name: "Ada".to_string(),
        last_name: None,
        username: Some(username.to_string()),
    }
}

fn private_message(from: &UserProfile, text: &str) -> ChatUpdate {
    ChatUpdate {
        update_id: 1,
        chat_id: from.id,
        message_id: 100,
        from: from.clone(),
        text: text.to_string(),
        is_private: true,
    }
}

fn group_message(from: &UserProfile, text: &str) -> ChatUpdate {
    ChatUpdate {
        update_id: 1,
        chat_id: -1000,
        message_id: 100,
        from: from.clone(),
        text: text.to_string(),
        is_private: false,
    }
}

fn day_ago(days: i64) -> String {
    (Utc::now().date_naive() - Duration::days(days))
        .format("%d-%m-%Y")
        .to_string()
}

//=========================================================================================
// Logging Commands
//=========================================================================================

#[tokio::test]
async fn meditate_acknowledges_with_streak() {
    let (state, store, chat) = harness();
    let ada = profile(7, "ada");

    handle_update(&state, &private_message(&ada, "/meditate 20")).await;

    let reply = chat.last_text();
    assert!(reply.contains("@ada meditated for 20 minutes"), "{reply}");
    // Today never counts toward the streak, so the first log reports zero.
    assert!(reply.contains("(0\u{1F914})"), "{reply}");

    let events = store
        .events(EventKind::Meditation, EventFilter::for_user(7))
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].value, ActivityValue::Minutes(20));
}

#[tokio::test]
async fn backdated_logs_extend_the_streak() {
    let (state, _store, chat) = harness();
    let ada = profile(7, "ada");

    for days in 1..=3 {
        let text = format!("/meditate 15 {}", day_ago(days));
        handle_update(&state, &private_message(&ada, &text)).await;
    }
    handle_update(&state, &private_message(&ada, "/streak")).await;

    assert_eq!(
        chat.last_text(),
        "@ada has a meditation streak of 3! \u{1F525}"
    );
}

#[tokio::test]
async fn backdate_beyond_window_is_rejected() {
    let (state, store, chat) = harness();
    let ada = profile(7, "ada");

    let text = format!("/meditate 15 {}", day_ago(40));
    handle_update(&state, &private_message(&ada, &text)).await;

    assert!(
        chat.last_text()
            .contains("did not take place in the last month"),
        "{}",
        chat.last_text()
    );
    let events = store
        .events(EventKind::Meditation, EventFilter::for_user(7))
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn out_of_range_rating_is_rejected_without_persisting() {
    let (state, store, chat) = harness();
    let ada = profile(7, "ada");

    handle_update(&state, &private_message(&ada, "/anxiety 15")).await;

    assert_eq!(
        chat.last_text(),
        "Please rate your anxiety between 0 (low) and 10 (high)."
    );
    let events = store
        .events(EventKind::Anxiety, EventFilter::for_user(7))
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn rating_delta_ignores_readings_ahead_of_the_clock() {
    let (state, store, chat) = harness();
    let ada = profile(7, "ada");

    handle_update(&state, &private_message(&ada, "/anxiety 6")).await;
    // A reading stored later in the day (a backdate lands at midday) must
    // not shift the comparison point.
    store
        .append(
            7,
            EventKind::Anxiety,
            &ActivityValue::Rating(9),
            Some(Utc::now() + Duration::hours(1)),
        )
        .await
        .unwrap();
    handle_update(&state, &private_message(&ada, "/anxiety 3")).await;

    let reply = chat.last_text();
    assert!(reply.contains("rated their anxiety at 3 (-3)"), "{reply}");
}

#[tokio::test]
async fn repeated_ratings_report_the_delta() {
    let (state, _store, chat) = harness();
    let ada = profile(7, "ada");

    handle_update(&state, &private_message(&ada, "/happiness 4")).await;
    handle_update(&state, &private_message(&ada, "/happiness 7")).await;

    let reply = chat.last_text();
    assert!(reply.contains("rated their happiness at 7 (+3)"), "{reply}");
}

#[tokio::test]
async fn rest_logs_a_fixed_exercise_entry() {
    let (state, store, chat) = harness();
    let ada = profile(7, "ada");

    handle_update(&state, &private_message(&ada, "/rest")).await;

    assert_eq!(chat.last_text(), "\u{2705} @ada is resting today!");
    let rest_days = store
        .events(
            EventKind::Exercise,
            EventFilter {
                user_id: Some(7),
                value: Some(ActivityValue::Text("rest".to_string())),
                ..EventFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(rest_days.len(), 1);
}

//=========================================================================================
// User Lifecycle
//=========================================================================================

#[tokio::test]
async fn first_public_sighting_requests_a_private_channel() {
    let (state, _store, chat) = harness();
    let ada = profile(7, "ada");

    handle_update(&state, &group_message(&ada, "/meditate 20")).await;

    let messages = chat.messages();
    assert!(messages[0]
        .1
        .contains("Please send me a private message"));
    // The greeting and the acknowledgement both land in the group chat.
    assert!(messages.iter().all(|(chat_id, _)| *chat_id == -1000));
}

#[tokio::test]
async fn private_text_opens_the_channel_once() {
    let (state, store, chat) = harness();
    let ada = profile(7, "ada");

    // Seen publicly first, so no private channel yet.
    handle_update(&state, &group_message(&ada, "/meditate 20")).await;
    handle_update(&state, &private_message(&ada, "hello")).await;

    assert!(chat.last_text().contains("Thanks for messaging me!"));
    let (user, created) = store.upsert_user(&ada, false).await.unwrap();
    assert!(!created);
    assert!(user.has_private_channel);

    // A later plain message is just unknown input.
    handle_update(&state, &private_message(&ada, "hello again")).await;
    assert_eq!(chat.last_text(), "Sorry, I didn't understand that!");
}

#[tokio::test]
async fn top_ranks_users_by_streak() {
    let (state, _store, chat) = harness();
    let ada = profile(7, "ada");
    let bob = profile(8, "bob");

    for days in 1..=2 {
        let text = format!("/meditate 15 {}", day_ago(days));
        handle_update(&state, &private_message(&ada, &text)).await;
    }
    let text = format!("/meditate 15 {}", day_ago(1));
    handle_update(&state, &private_message(&bob, &text)).await;

    handle_update(&state, &private_message(&ada, "/top")).await;

    let board = chat.last_text();
    let lines: Vec<&str> = board.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("1. @ada"), "{board}");
    assert!(lines[1].starts_with("2. @bob"), "{board}");
}

//=========================================================================================
// Subscriptions
//=========================================================================================

#[tokio::test]
async fn reminders_are_stored_in_utc() {
    let (state, store, chat) = harness();
    let ada = profile(7, "ada");

    handle_update(&state, &private_message(&ada, "/reminders 1PM UTC")).await;

    let at_thirteen = store.reminders_at_hour(13).await.unwrap();
    assert_eq!(at_thirteen.len(), 1);
    assert_eq!(at_thirteen[0].midnight_hour, 0);

    handle_update(&state, &private_message(&ada, "/reminders off")).await;
    assert!(store.reminders_at_hour(13).await.unwrap().is_empty());
    assert!(chat.last_text().contains("reminder"), "{}", chat.last_text());
}

//=========================================================================================
// The Scheduler Tick
//=========================================================================================

#[tokio::test]
async fn tick_reminds_subscribers_who_have_not_meditated() {
    let (state, store, chat) = harness();
    store.upsert_user(&profile(7, "ada"), true).await.unwrap();
    store.add_reminder(7, Utc::now().hour(), 0).await.unwrap();

    run_tick(&state).await.unwrap();

    let reply = chat.last_text();
    assert!(reply.contains("remind you to meditate"), "{reply}");
    assert_eq!(chat.messages().len(), 1);
}

#[tokio::test]
async fn tick_stays_silent_after_meditating_today() {
    let (state, store, chat) = harness();
    store.upsert_user(&profile(7, "ada"), true).await.unwrap();
    store
        .append(7, EventKind::Meditation, &ActivityValue::Minutes(20), None)
        .await
        .unwrap();
    store.add_reminder(7, Utc::now().hour(), 0).await.unwrap();

    run_tick(&state).await.unwrap();

    assert!(chat.messages().is_empty());
}

#[tokio::test]
async fn tick_ignores_reminders_for_other_hours() {
    let (state, store, chat) = harness();
    store.upsert_user(&profile(7, "ada"), true).await.unwrap();
    let other_hour = (Utc::now().hour() + 1) % 24;
    store.add_reminder(7, other_hour, 0).await.unwrap();

    run_tick(&state).await.unwrap();

    assert!(chat.messages().is_empty());
}

#[tokio::test]
async fn unreachable_subscriber_does_not_stop_the_tick() {
    let (state, store, chat) = harness();
    let hour = Utc::now().hour();
    for (id, name) in [(7, "ada"), (8, "bob")] {
        store.upsert_user(&profile(id, name), true).await.unwrap();
        store.add_reminder(id, hour, 0).await.unwrap();
    }
    chat.unreachable.lock().unwrap().push(7);

    run_tick(&state).await.unwrap();

    let messages = chat.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, 8);
}

#[tokio::test]
async fn summary_requires_a_registered_email() {
    let (state, _store, chat) = harness();
    let ada = profile(7, "ada");

    handle_update(&state, &private_message(&ada, "/summary now")).await;

    assert_eq!(chat.last_text(), "\u{1F4E7} Please set your email!");
}

#[tokio::test]
async fn summary_registration_round_trip() {
    let (state, store, chat) = harness();
    let ada = profile(7, "ada");

    handle_update(&state, &private_message(&ada, "/summary ada@example.org")).await;
    assert!(chat.last_text().contains("ada@example.org"));
    assert!(store.email_subscription(7).await.unwrap().is_some());

    handle_update(&state, &private_message(&ada, "/summary off")).await;
    assert!(store.email_subscription(7).await.unwrap().is_none());
}

#[tokio::test]
async fn failed_delivery_leaves_last_emailed_untouched() {
    let (mut state, store, chat) = harness();
    state.mail = Some(Arc::new(FailingMail));
    let ada = profile(7, "ada");

    handle_update(&state, &private_message(&ada, "/summary ada@example.org")).await;
    handle_update(&state, &private_message(&ada, "/summary now")).await;

    assert_eq!(chat.last_text(), "\u{1F4E7} Couldn't send email summary!");
    let subscription = store.email_subscription(7).await.unwrap().unwrap();
    assert_eq!(subscription.last_emailed, DateTime::<Utc>::UNIX_EPOCH);
}

//=========================================================================================
// Reports
//=========================================================================================

#[tokio::test]
async fn stats_with_no_data_reports_instead_of_charting() {
    let (state, _store, chat) = harness();
    let ada = profile(7, "ada");

    handle_update(&state, &private_message(&ada, "/meditatestats all")).await;

    assert_eq!(
        chat.last_text(),
        "Nothing logged yet, so there is nothing to chart!"
    );
    assert!(chat.photos.lock().unwrap().is_empty());
}

#[tokio::test]
async fn stats_with_data_sends_a_chart() {
    let (state, _store, chat) = harness();
    let ada = profile(7, "ada");

    handle_update(&state, &private_message(&ada, "/meditate 20")).await;
    handle_update(&state, &private_message(&ada, "/meditatestats weekly")).await;

    assert_eq!(chat.photos.lock().unwrap().as_slice(), &[7]);
}

#[tokio::test]
async fn journal_entries_are_replayed_per_day() {
    let (state, _store, chat) = harness();
    let ada = profile(7, "ada");

    let yesterday = day_ago(1);
    let text = format!("/journal slept well, good walk {yesterday}");
    handle_update(&state, &private_message(&ada, &text)).await;

    let query = format!("/journalentries {yesterday}");
    handle_update(&state, &private_message(&ada, &query)).await;

    assert!(
        chat.last_text().contains("slept well, good walk"),
        "{}",
        chat.last_text()
    );
}
