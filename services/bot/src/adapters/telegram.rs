//! services/bot/src/adapters/telegram.rs
//!
//! This module contains the adapter for the Telegram Bot API. It implements
//! the `ChatTransport` port from the `core` crate and additionally exposes
//! the long-poll update feed the router consumes.

use async_trait::async_trait;
use serde::Deserialize;
use wellness_core::domain::UserProfile;
use wellness_core::ports::{ChatTransport, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ChatTransport` port using the Telegram
/// Bot API over HTTPS.
#[derive(Clone)]
pub struct TelegramAdapter {
    http: reqwest::Client,
    base_url: String,
}

/// Long-poll wait, in seconds, for `getUpdates`.
const POLL_TIMEOUT_SECS: u64 = 50;

impl TelegramAdapter {
    /// Creates a new `TelegramAdapter` for the given bot token.
    pub fn new(token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("https://api.telegram.org/bot{token}"),
        }
    }

    /// Fetches the next batch of updates, blocking server-side for up to
    /// the poll timeout. `offset` must be one past the last update already
    /// handled.
    pub async fn next_updates(&self, offset: i64) -> PortResult<Vec<ChatUpdate>> {
        let url = format!(
            "{}/getUpdates?timeout={POLL_TIMEOUT_SECS}&offset={offset}",
            self.base_url
        );
        let response: ApiResponse<Vec<WireUpdate>> = self
            .http
            .get(&url)
            .timeout(std::time::Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let updates = response.into_result()?;
        Ok(updates.into_iter().filter_map(WireUpdate::into_chat_update).collect())
    }
}

//=========================================================================================
// `ChatTransport` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatTransport for TelegramAdapter {
    async fn send_text(&self, chat_id: i64, text: &str) -> PortResult<()> {
        let url = format!("{}/sendMessage", self.base_url);
        let response: ApiResponse<serde_json::Value> = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        response.into_result().map(|_| ())
    }

    async fn send_photo(&self, chat_id: i64, png: &[u8]) -> PortResult<()> {
        let url = format!("{}/sendPhoto", self.base_url);
        let photo = reqwest::multipart::Part::bytes(png.to_vec())
            .file_name("chart.png")
            .mime_str("image/png")
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .part("photo", photo);

        let response: ApiResponse<serde_json::Value> = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        response.into_result().map(|_| ())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> PortResult<()> {
        let url = format!("{}/deleteMessage", self.base_url);
        let response: ApiResponse<serde_json::Value> = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "chat_id": chat_id, "message_id": message_id }))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // A message that is already gone is not a failure.
        match response.into_result() {
            Ok(_) => Ok(()),
            Err(PortError::Unexpected(description))
                if description.contains("message to delete not found") =>
            {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

/// One incoming command, already reduced to the fields the router needs.
#[derive(Debug, Clone)]
pub struct ChatUpdate {
    pub update_id: i64,
    pub chat_id: i64,
    pub message_id: i64,
    pub from: UserProfile,
    pub text: String,
    /// Whether the message arrived in the user's private chat with the bot.
    pub is_private: bool,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> PortResult<T> {
        if self.ok {
            self.result
                .ok_or_else(|| PortError::Unexpected("missing result payload".to_string()))
        } else {
            Err(PortError::Unexpected(
                self.description.unwrap_or_else(|| "request rejected".to_string()),
            ))
        }
    }
}

#[derive(Deserialize)]
struct WireUpdate {
    update_id: i64,
    message: Option<WireMessage>,
}

#[derive(Deserialize)]
struct WireMessage {
    message_id: i64,
    from: Option<WireUser>,
    chat: WireChat,
    text: Option<String>,
}

#[derive(Deserialize)]
struct WireUser {
    id: i64,
    first_name: String,
    last_name: Option<String>,
    username: Option<String>,
}

#[derive(Deserialize)]
struct WireChat {
    id: i64,
    #[serde(rename = "type")]
    chat_type: String,
}

impl WireUpdate {
    /// Reduces a raw update to a `ChatUpdate`, dropping anything that is
    /// not a text message from a user (edits, joins, stickers, ...).
    fn into_chat_update(self) -> Option<ChatUpdate> {
        let message = self.message?;
        let from = message.from?;
        let text = message.text?;
        Some(ChatUpdate {
            update_id: self.update_id,
            chat_id: message.chat.id,
            message_id: message.message_id,
            from: UserProfile {
                id: from.id,
                first_name: from.first_name,
                last_name: from.last_name,
                username: from.username,
            },
            text,
            is_private: message.chat.chat_type == "private",
        })
    }
}
