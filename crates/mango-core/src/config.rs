//! Environment configuration.
//!
//! Both processes read their configuration from the environment and
//! validate it eagerly: every missing required name is collected and
//! reported in one [`MangoError::MissingConfig`] before any work begins.
//! Lookup goes through a closure so tests can supply a map instead of
//! mutating the process environment.

use crate::error::{MangoError, Result};
use serde::Deserialize;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Job configuration (infrastructure runner)
// ---------------------------------------------------------------------------

/// Deployment tags, decoded from the JSON-encoded `TAGS_JSON` map.
#[derive(Debug, Clone, Deserialize)]
pub struct Tags {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Namespace")]
    pub namespace: String,
    #[serde(rename = "Stage")]
    pub stage: String,
}

#[derive(Debug, Clone)]
pub struct JobConfig {
    // Minecraft
    pub mc_server_ip: String,
    pub mc_port: String,
    // Fargate
    pub cluster: String,
    pub container_name: String,
    pub subnet_id: String,
    pub security_group_id: String,
    pub task_definition_name: String,
    pub tags: Tags,
    // Parameter store
    pub ssm_endpoint: String,
    pub git_key_param: String,
    pub tf_token_param: String,
    pub command_param: String,
    // Manifests repository
    pub manifest_repo_url: String,
    pub manifest_repo_branch: String,
    /// Opt-in to skipping SSH host-key verification for git.
    pub git_accept_any_host_key: bool,
}

const JOB_REQUIRED: &[&str] = &[
    "MC_SERVER_IP",
    "MC_PORT",
    "CLUSTER",
    "CONTAINER_NAME",
    "SUBNET_ID",
    "SECURITY_GROUP_ID",
    "TASK_DEFINITION_NAME",
    "TAGS_JSON",
    "SSM_ENDPOINT",
];

impl JobConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let missing: Vec<String> = JOB_REQUIRED
            .iter()
            .filter(|key| lookup(key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(MangoError::MissingConfig(missing));
        }

        let tags_json = lookup("TAGS_JSON").unwrap_or_default();
        let tags: Tags = serde_json::from_str(&tags_json)
            .map_err(|e| MangoError::InvalidTags(e.to_string()))?;

        let get = |key: &str| lookup(key).unwrap_or_default();
        Ok(Self {
            mc_server_ip: get("MC_SERVER_IP"),
            mc_port: get("MC_PORT"),
            cluster: get("CLUSTER"),
            container_name: get("CONTAINER_NAME"),
            subnet_id: get("SUBNET_ID"),
            security_group_id: get("SECURITY_GROUP_ID"),
            task_definition_name: get("TASK_DEFINITION_NAME"),
            tags,
            ssm_endpoint: get("SSM_ENDPOINT"),
            git_key_param: lookup("GIT_KEY_PARAM")
                .unwrap_or_else(|| "mango-git-private-key".to_string()),
            tf_token_param: lookup("TF_TOKEN_PARAM")
                .unwrap_or_else(|| "terraform-cloud-user-api".to_string()),
            command_param: lookup("BOT_COMMAND_PARAM").unwrap_or_else(|| "BOT_COMMAND".to_string()),
            manifest_repo_url: lookup("MANIFEST_REPO_URL")
                .unwrap_or_else(|| "git@github.com:mango-ops/minecraft-aws-server.git".to_string()),
            manifest_repo_branch: lookup("MANIFEST_REPO_BRANCH")
                .unwrap_or_else(|| "main".to_string()),
            git_accept_any_host_key: lookup("GIT_ACCEPT_ANY_HOST_KEY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }
}

// ---------------------------------------------------------------------------
// Relay configuration (chat bot)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub discord_token: String,
    /// Base URL of the control-plane API (the `/minecraft-prod/command`
    /// path is appended per request).
    pub api_url: String,
    /// Base URL of the chat REST API; overridable for tests.
    pub chat_api_base: String,
    pub guild_id: u64,
    pub channel_name: String,
    pub category_name: String,
    pub state_file: PathBuf,
    pub inactivity_threshold_secs: u64,
    pub poll_interval_secs: u64,
}

const RELAY_REQUIRED: &[&str] = &["DISCORD_TOKEN", "API_URL", "DISCORD_GUILD"];

impl RelayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let missing: Vec<String> = RELAY_REQUIRED
            .iter()
            .filter(|key| lookup(key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(MangoError::MissingConfig(missing));
        }

        let guild_raw = lookup("DISCORD_GUILD").unwrap_or_default();
        let guild_id = guild_raw
            .trim()
            .parse()
            .map_err(|_| MangoError::MissingConfig(vec!["DISCORD_GUILD (not a number)".into()]))?;

        Ok(Self {
            discord_token: lookup("DISCORD_TOKEN").unwrap_or_default(),
            api_url: lookup("API_URL").unwrap_or_default(),
            chat_api_base: lookup("MANGO_CHAT_API_BASE")
                .unwrap_or_else(|| "https://discord.com/api/v10".to_string()),
            guild_id,
            channel_name: lookup("MANGO_CHANNEL").unwrap_or_else(|| "mango-minecraft".to_string()),
            category_name: lookup("MANGO_CATEGORY").unwrap_or_else(|| "BOT".to_string()),
            state_file: lookup("MANGO_STATE_FILE")
                .unwrap_or_else(|| "bot_message_id.txt".to_string())
                .into(),
            inactivity_threshold_secs: lookup("MANGO_INACTIVITY_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
            poll_interval_secs: lookup("MANGO_POLL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        })
    }
}
