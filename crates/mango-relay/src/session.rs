//! Relay session: command execution and the inactivity reset.
//!
//! One [`RelaySession`] owns everything the original design kept in module
//! globals: the status tracker, the last-command clock, and the busy flag.
//! The poll loop and the periodic inactivity check run on one cooperative
//! task, so a reset can never interleave with a command in flight; the
//! busy flag makes that invariant explicit rather than structural only.

use crate::api::CommandApi;
use crate::chat::{ChatApi, ChatMessage};
use crate::error::{RelayError, Result};
use crate::tracker::StatusTracker;
use chrono::{DateTime, Utc};
use mango_core::command::{help_text, Command};
use std::time::Duration;

pub const COMMAND_PREFIX: char = '!';

/// A parsed command plus the issuing user's display name.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub command: Command,
    pub user: String,
}

fn in_progress_notice(request: &CommandRequest) -> String {
    format!("User {} used `{}` command...", request.user, request.command)
}

fn fallback_apology(user: &str) -> String {
    format!(
        "@{user}, we're sorry but we encountered a problem while processing your request. \
         Please try again in a moment.\nIf the problem persists, don't hesitate to reach \
         out to @Mango Ops for assistance."
    )
}

pub struct RelaySession<C: ChatApi> {
    chat: C,
    api: CommandApi,
    tracker: StatusTracker,
    channel_id: u64,
    own_user_id: Option<u64>,
    last_seen: Option<u64>,
    last_command: DateTime<Utc>,
    busy: bool,
    inactivity_threshold: chrono::Duration,
}

impl<C: ChatApi> RelaySession<C> {
    pub fn new(
        chat: C,
        api: CommandApi,
        tracker: StatusTracker,
        channel_id: u64,
        inactivity_threshold_secs: u64,
    ) -> Self {
        Self {
            chat,
            api,
            tracker,
            channel_id,
            own_user_id: None,
            last_seen: None,
            last_command: Utc::now(),
            busy: false,
            inactivity_threshold: chrono::Duration::seconds(inactivity_threshold_secs as i64),
        }
    }

    /// The bot's own user id; its messages are skipped while polling.
    pub fn set_own_user(&mut self, user_id: u64) {
        self.own_user_id = Some(user_id);
    }

    /// Post a fresh help listing and track it. Runs once at startup, after
    /// the channel has been purged (any previously persisted id is stale).
    pub async fn post_help(&mut self) -> Result<()> {
        let message = self.chat.send_message(self.channel_id, &help_text()).await?;
        self.tracker.set(message.id)?;
        self.last_seen = Some(message.id);
        Ok(())
    }

    /// Fetch and dispatch messages that arrived since the last poll.
    pub async fn poll_once(&mut self) -> Result<()> {
        let messages = self.chat.messages_after(self.channel_id, self.last_seen).await?;
        for message in messages {
            if message.id > self.last_seen.unwrap_or(0) {
                self.last_seen = Some(message.id);
            }
            if message.author.bot || Some(message.author.id) == self.own_user_id {
                continue;
            }
            self.handle_message(&message).await;
        }
        Ok(())
    }

    /// Process one user message: delete it, then dispatch if it carries the
    /// command prefix. Unrecognized names are reported without any API call.
    pub async fn handle_message(&mut self, message: &ChatMessage) {
        if let Err(err) = self.chat.delete_message(message.channel_id, message.id).await {
            tracing::warn!(%err, message_id = message.id, "failed to delete user message");
        }

        let Some(raw) = message.content.strip_prefix(COMMAND_PREFIX) else {
            return;
        };
        let name = raw.split_whitespace().next().unwrap_or("");
        self.last_command = Utc::now();

        match name.parse::<Command>() {
            Ok(command) => {
                self.execute(CommandRequest {
                    command,
                    user: message.author.username.clone(),
                })
                .await;
            }
            Err(err) => {
                tracing::info!(name, "rejected invalid command");
                if let Err(send_err) = self
                    .chat
                    .send_message(self.channel_id, &format!("Error: \n{err}"))
                    .await
                {
                    tracing::error!(%send_err, "failed to report invalid command");
                }
            }
        }
    }

    /// Run one command to completion. Every failure ends up as exactly one
    /// user-visible message; nothing is retried.
    pub async fn execute(&mut self, request: CommandRequest) {
        self.last_command = Utc::now();
        self.busy = true;
        // The live handle resolved during this invocation. Distinct from
        // the persisted id: a remembered id whose fetch fails leaves this
        // `None`, so the error lands in a fresh message instead of an edit
        // against the very message that is gone.
        let mut handle: Option<u64> = None;
        if let Err(err) = self.execute_inner(&request, &mut handle).await {
            tracing::error!(%err, command = %request.command, "command failed");
            self.report_error(handle, &err).await;
        }
        self.busy = false;
    }

    async fn execute_inner(
        &mut self,
        request: &CommandRequest,
        handle: &mut Option<u64>,
    ) -> Result<()> {
        let notice = in_progress_notice(request);

        // Resolve the tracked status message. A remembered id that no
        // longer resolves fails the command; there is no auto-heal.
        let message_id = match self.tracker.get() {
            Some(id) => {
                self.chat.fetch_message(self.channel_id, id).await?;
                id
            }
            None => {
                let message = self.chat.send_message(self.channel_id, &notice).await?;
                self.tracker.set(message.id)?;
                message.id
            }
        };
        *handle = Some(message_id);

        self.chat.edit_message(self.channel_id, message_id, &notice).await?;

        let reply = self.api.send(request.command).await?;
        let content = reply
            .bot_reply
            .unwrap_or_else(|| fallback_apology(&request.user));
        self.chat.edit_message(self.channel_id, message_id, &content).await?;
        Ok(())
    }

    /// Surface `err` to the user: edit the handle resolved this invocation
    /// if there is one, otherwise (or if that edit fails too) send a fresh
    /// error message.
    async fn report_error(&mut self, handle: Option<u64>, err: &RelayError) {
        let content = format!("Error: \n{err}");
        if let Some(id) = handle {
            match self.chat.edit_message(self.channel_id, id, &content).await {
                Ok(_) => return,
                Err(edit_err) => {
                    tracing::warn!(%edit_err, "failed to edit error into status message");
                }
            }
        }
        if let Err(send_err) = self.chat.send_message(self.channel_id, &content).await {
            tracing::error!(%send_err, "failed to send error message");
        }
    }

    /// Reset the tracked message to the help listing once the channel has
    /// been idle past the threshold. No-op while a command is in flight.
    pub async fn check_inactivity(&mut self) {
        if self.busy {
            return;
        }
        if Utc::now() - self.last_command < self.inactivity_threshold {
            return;
        }
        let Some(id) = self.tracker.get() else { return };
        if let Err(err) = self.chat.edit_message(self.channel_id, id, &help_text()).await {
            tracing::warn!(%err, "inactivity reset failed");
        }
    }

    /// Poll for commands and run the periodic inactivity check until ctrl-c.
    pub async fn run(mut self, poll_interval: Duration, check_interval: Duration) -> Result<()> {
        let mut poll = tokio::time::interval(poll_interval);
        let mut check = tokio::time::interval(check_interval);
        loop {
            tokio::select! {
                _ = poll.tick() => {
                    if let Err(err) = self.poll_once().await {
                        tracing::error!(%err, "poll failed");
                    }
                }
                _ = check.tick() => self.check_inactivity().await,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutting down relay");
                    return Ok(());
                }
            }
        }
    }
}
