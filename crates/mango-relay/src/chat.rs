//! Chat surface.
//!
//! [`ChatApi`] is the narrow seam the relay needs from the chat platform:
//! send, edit, fetch, delete, and list messages in one channel.
//! [`ChatClient`] implements it against a Discord-style REST API; the
//! gateway's push delivery is an external collaborator, so the relay polls
//! `messages_after` instead of holding a gateway connection.

use crate::error::{RelayError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

/// Channel kinds used during bootstrap (Discord wire values).
const KIND_TEXT: u8 = 0;
const KIND_CATEGORY: u8 = 4;

/// Message ids arrive as decimal strings on the wire.
fn snowflake<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u64, D::Error> {
    let raw = String::deserialize(d)?;
    raw.parse().map_err(serde::de::Error::custom)
}

fn snowflake_opt<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<u64>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    match raw {
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Author {
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
    #[serde(deserialize_with = "snowflake")]
    pub channel_id: u64,
    pub content: String,
    pub author: Author,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, deserialize_with = "snowflake_opt")]
    pub parent_id: Option<u64>,
}

/// The chat operations the relay depends on.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send_message(&self, channel_id: u64, content: &str) -> Result<ChatMessage>;
    async fn edit_message(&self, channel_id: u64, message_id: u64, content: &str)
        -> Result<ChatMessage>;
    async fn fetch_message(&self, channel_id: u64, message_id: u64) -> Result<ChatMessage>;
    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<()>;
    /// Messages newer than `after` (or the most recent page when `None`),
    /// oldest first.
    async fn messages_after(&self, channel_id: u64, after: Option<u64>) -> Result<Vec<ChatMessage>>;
}

pub struct ChatClient {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl ChatClient {
    pub fn new(base: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            base: base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = response.text().await.unwrap_or_default();
        Err(RelayError::Chat {
            status: status.as_u16(),
            detail,
        })
    }

    /// The bot's own user id, used to skip its own messages when polling.
    pub async fn current_user(&self) -> Result<u64> {
        #[derive(Deserialize)]
        struct Me {
            #[serde(deserialize_with = "snowflake")]
            id: u64,
        }
        let response = self
            .http
            .get(self.url("/users/@me"))
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await?;
        let me: Me = Self::check(response).await?.json().await?;
        Ok(me.id)
    }

    pub async fn guild_channels(&self, guild_id: u64) -> Result<Vec<Channel>> {
        let response = self
            .http
            .get(self.url(&format!("/guilds/{guild_id}/channels")))
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn create_channel(
        &self,
        guild_id: u64,
        name: &str,
        kind: u8,
        parent_id: Option<u64>,
    ) -> Result<Channel> {
        let mut body = serde_json::json!({ "name": name, "type": kind });
        if let Some(parent) = parent_id {
            body["parent_id"] = serde_json::json!(parent.to_string());
        }
        let response = self
            .http
            .post(self.url(&format!("/guilds/{guild_id}/channels")))
            .header("Authorization", format!("Bot {}", self.token))
            .json(&body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Delete every message currently in the channel, newest page first.
    pub async fn purge_channel(&self, channel_id: u64) -> Result<()> {
        let messages = self.messages_after(channel_id, None).await?;
        for message in messages {
            self.delete_message(channel_id, message.id).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ChatApi for ChatClient {
    async fn send_message(&self, channel_id: u64, content: &str) -> Result<ChatMessage> {
        let response = self
            .http
            .post(self.url(&format!("/channels/{channel_id}/messages")))
            .header("Authorization", format!("Bot {}", self.token))
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn edit_message(
        &self,
        channel_id: u64,
        message_id: u64,
        content: &str,
    ) -> Result<ChatMessage> {
        let response = self
            .http
            .patch(self.url(&format!("/channels/{channel_id}/messages/{message_id}")))
            .header("Authorization", format!("Bot {}", self.token))
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn fetch_message(&self, channel_id: u64, message_id: u64) -> Result<ChatMessage> {
        let response = self
            .http
            .get(self.url(&format!("/channels/{channel_id}/messages/{message_id}")))
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RelayError::MessageNotFound(message_id));
        }
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("/channels/{channel_id}/messages/{message_id}")))
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn messages_after(&self, channel_id: u64, after: Option<u64>) -> Result<Vec<ChatMessage>> {
        let mut url = self.url(&format!("/channels/{channel_id}/messages?limit=100"));
        if let Some(id) = after {
            url.push_str(&format!("&after={id}"));
        }
        let response = self
            .http
            .get(url)
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await?;
        let mut messages: Vec<ChatMessage> = Self::check(response).await?.json().await?;
        // The API returns newest first; the relay wants chronological order.
        messages.reverse();
        Ok(messages)
    }
}

/// Find or create the designated text channel inside the designated
/// category and return its id. Runs once at relay startup.
pub async fn bootstrap_channel(
    client: &ChatClient,
    guild_id: u64,
    category_name: &str,
    channel_name: &str,
) -> Result<u64> {
    let channels = client.guild_channels(guild_id).await?;

    let category_id = match channels
        .iter()
        .find(|c| c.kind == KIND_CATEGORY && c.name == category_name)
    {
        Some(category) => category.id,
        None => {
            tracing::info!(category_name, "creating category");
            client
                .create_channel(guild_id, category_name, KIND_CATEGORY, None)
                .await?
                .id
        }
    };

    let channel_id = match channels
        .iter()
        .find(|c| c.kind == KIND_TEXT && c.name == channel_name && c.parent_id == Some(category_id))
    {
        Some(channel) => channel.id,
        None => {
            tracing::info!(channel_name, "creating channel");
            client
                .create_channel(guild_id, channel_name, KIND_TEXT, Some(category_id))
                .await?
                .id
        }
    };

    client.purge_channel(channel_id).await?;
    Ok(channel_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn client(server: &mockito::ServerGuard) -> ChatClient {
        ChatClient::new(server.url(), "test-token").unwrap()
    }

    #[tokio::test]
    async fn send_message_parses_snowflake_ids() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/channels/7/messages")
            .match_header("Authorization", "Bot test-token")
            .match_body(mockito::Matcher::PartialJson(
                serde_json::json!({"content": "hello"}),
            ))
            .with_body(
                r#"{"id": "111", "channel_id": "7", "content": "hello",
                    "author": {"id": "9", "username": "mango", "bot": true}}"#,
            )
            .create_async()
            .await;

        let message = client(&server).await.send_message(7, "hello").await.unwrap();
        assert_eq!(message.id, 111);
        assert_eq!(message.channel_id, 7);
        assert!(message.author.bot);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_missing_message_maps_to_message_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/channels/7/messages/111")
            .with_status(404)
            .create_async()
            .await;

        let err = client(&server).await.fetch_message(7, 111).await.unwrap_err();
        assert!(matches!(err, RelayError::MessageNotFound(111)));
    }

    #[tokio::test]
    async fn messages_after_returns_chronological_order() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/channels/7/messages?limit=100&after=5")
            .with_body(
                r#"[
                    {"id": "9", "channel_id": "7", "content": "second",
                     "author": {"id": "1", "username": "a"}},
                    {"id": "6", "channel_id": "7", "content": "first",
                     "author": {"id": "1", "username": "a"}}
                ]"#,
            )
            .create_async()
            .await;

        let messages = client(&server).await.messages_after(7, Some(5)).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, 6);
        assert_eq!(messages[1].id, 9);
    }

    #[tokio::test]
    async fn bootstrap_creates_category_and_channel_when_absent() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/guilds/1/channels")
            .with_body("[]")
            .create_async()
            .await;
        let create_category = server
            .mock("POST", "/guilds/1/channels")
            .match_body(mockito::Matcher::PartialJson(
                serde_json::json!({"name": "BOT", "type": 4}),
            ))
            .with_body(r#"{"id": "20", "name": "BOT", "type": 4}"#)
            .create_async()
            .await;
        let create_channel = server
            .mock("POST", "/guilds/1/channels")
            .match_body(mockito::Matcher::PartialJson(
                serde_json::json!({"name": "mango-minecraft", "type": 0, "parent_id": "20"}),
            ))
            .with_body(r#"{"id": "21", "name": "mango-minecraft", "type": 0, "parent_id": "20"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/channels/21/messages?limit=100")
            .with_body("[]")
            .create_async()
            .await;

        let id = bootstrap_channel(&client(&server).await, 1, "BOT", "mango-minecraft")
            .await
            .unwrap();
        assert_eq!(id, 21);
        create_category.assert_async().await;
        create_channel.assert_async().await;
    }

    #[tokio::test]
    async fn bootstrap_reuses_existing_channel_and_purges_it() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/guilds/1/channels")
            .with_body(
                r#"[
                    {"id": "20", "name": "BOT", "type": 4},
                    {"id": "21", "name": "mango-minecraft", "type": 0, "parent_id": "20"}
                ]"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/channels/21/messages?limit=100")
            .with_body(
                r#"[{"id": "30", "channel_id": "21", "content": "old",
                     "author": {"id": "1", "username": "a"}}]"#,
            )
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/channels/21/messages/30")
            .with_status(204)
            .create_async()
            .await;

        let id = bootstrap_channel(&client(&server).await, 1, "BOT", "mango-minecraft")
            .await
            .unwrap();
        assert_eq!(id, 21);
        delete.assert_async().await;
    }
}
