//! Control-plane command API client.
//!
//! One `POST {base}/minecraft-prod/command` per operator command with body
//! `{"command": "<name>"}`. The response's `BOT_REPLY` field, when present,
//! is what the user sees. No retries, no backoff; a failed call is reported
//! once and the command is over.

use crate::error::{RelayError, Result};
use mango_core::Command;
use serde::Deserialize;

const COMMAND_PATH: &str = "/minecraft-prod/command";

#[derive(Debug, Deserialize)]
pub struct ApiReply {
    #[serde(rename = "BOT_REPLY")]
    pub bot_reply: Option<String>,
}

pub struct CommandApi {
    http: reqwest::Client,
    base: String,
}

impl CommandApi {
    pub fn new(base: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            base: base.into().trim_end_matches('/').to_string(),
        })
    }

    pub async fn send(&self, command: Command) -> Result<ApiReply> {
        tracing::info!(%command, "forwarding command to API");
        let response = self
            .http
            .post(format!("{}{COMMAND_PATH}", self.base))
            .json(&serde_json::json!({ "command": command.name() }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RelayError::Api {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn posts_the_command_name() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/minecraft-prod/command")
            .match_body(mockito::Matcher::Json(serde_json::json!({"command": "start"})))
            .with_body(r#"{"BOT_REPLY": "Server is starting!"}"#)
            .create_async()
            .await;

        let api = CommandApi::new(server.url()).unwrap();
        let reply = api.send(Command::Start).await.unwrap();
        assert_eq!(reply.bot_reply.as_deref(), Some("Server is starting!"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_bot_reply_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/minecraft-prod/command")
            .with_body("{}")
            .create_async()
            .await;

        let api = CommandApi::new(server.url()).unwrap();
        let reply = api.send(Command::Status).await.unwrap();
        assert!(reply.bot_reply.is_none());
    }

    #[tokio::test]
    async fn non_2xx_is_an_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/minecraft-prod/command")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let api = CommandApi::new(server.url()).unwrap();
        let err = api.send(Command::Stop).await.unwrap_err();
        match err {
            RelayError::Api { status, detail } => {
                assert_eq!(status, 502);
                assert_eq!(detail, "bad gateway");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
