//! services/bot/src/bot/state.rs
//!
//! Defines the application's shared state and the reply helpers every
//! handler goes through.

use std::sync::Arc;

use tracing::{debug, warn};
use wellness_core::domain::User;
use wellness_core::ports::{ChartRenderer, ChatTransport, EventStore, MailTransport, PortResult};

use crate::adapters::ChatUpdate;

//=========================================================================================
// AppState (Shared Across All Handlers and the Scheduler)
//=========================================================================================

/// The shared application state, created once at startup and passed to all
/// handlers. Holds only port handles; no mutable state of its own.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub chat: Arc<dyn ChatTransport>,
    /// Absent when SMTP is not configured; `/summary now` then reports a
    /// delivery failure instead of crashing.
    pub mail: Option<Arc<dyn MailTransport>>,
    pub charts: Arc<dyn ChartRenderer>,
}

impl AppState {
    /// Create-on-first-sight user lookup. A user first seen in a public
    /// chat gets asked to open a private channel so reminders can reach
    /// them.
    pub async fn ensure_user(&self, update: &ChatUpdate) -> PortResult<User> {
        let (user, created) = self
            .store
            .upsert_user(&update.from, update.is_private)
            .await?;

        if created && !update.is_private {
            self.say(
                update.chat_id,
                &format!(
                    "Hey {}! Please send me a private message so that I can PM you!",
                    user.display_name()
                ),
            )
            .await;
        }
        Ok(user)
    }

    /// Sends a text reply. Transport failures are logged, never
    /// propagated: a lost message must not take down the service.
    pub async fn say(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.chat.send_text(chat_id, text).await {
            warn!("Failed to send message to chat {}: {}", chat_id, e);
        }
    }

    /// Sends a one-off PNG attachment, logging failures like `say`.
    pub async fn say_photo(&self, chat_id: i64, png: &[u8]) {
        if let Err(e) = self.chat.send_photo(chat_id, png).await {
            warn!("Failed to send photo to chat {}: {}", chat_id, e);
        }
    }

    /// Best-effort removal of the original command message.
    pub async fn scrub(&self, update: &ChatUpdate) {
        if let Err(e) = self
            .chat
            .delete_message(update.chat_id, update.message_id)
            .await
        {
            debug!("Could not delete message {}: {}", update.message_id, e);
        }
    }
}
