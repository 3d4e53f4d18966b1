use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mango_core::config::{JobConfig, RelayConfig};
use mango_core::job::JobRunner;
use mango_core::keys;
use mango_relay::{bootstrap_channel, ChatClient, CommandApi, RelaySession, StatusTracker};
use tracing_subscriber::EnvFilter;

/// Interval of the periodic inactivity check.
const INACTIVITY_CHECK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(
    name = "mango",
    about = "Chat-driven Minecraft server orchestration — relay commands to the control plane and drive terraform runs",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the chat relay until ctrl-c
    Relay,

    /// Execute one infrastructure job
    Job {
        /// Command to run; defaults to the pending command in the parameter store
        #[arg(long)]
        command: Option<String>,
    },

    /// Generate an RSA key pair (operator utility)
    Keygen {
        /// Directory the private key is written into
        #[arg(long)]
        dir: PathBuf,
        /// Private key file name
        #[arg(long, default_value = "terraform_key.pem")]
        file: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Relay => run_relay(),
        Commands::Job { command } => run_job(command),
        Commands::Keygen { dir, file } => {
            let path = keys::generate_key_pair(&dir, &file)?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn run_relay() -> anyhow::Result<()> {
    let config = RelayConfig::from_env().context("relay configuration")?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let chat = ChatClient::new(&config.chat_api_base, &config.discord_token)?;
        let channel_id = bootstrap_channel(
            &chat,
            config.guild_id,
            &config.category_name,
            &config.channel_name,
        )
        .await?;
        let own_user = chat.current_user().await?;

        let api = CommandApi::new(&config.api_url)?;
        let tracker = StatusTracker::load(&config.state_file);
        tracing::info!(
            state_file = %tracker.path().display(),
            tracked = ?tracker.get(),
            "status tracker loaded"
        );
        let mut session =
            RelaySession::new(chat, api, tracker, channel_id, config.inactivity_threshold_secs);
        session.set_own_user(own_user);
        session.post_help().await?;
        tracing::info!(channel_id, "relay ready");

        session
            .run(
                Duration::from_secs(config.poll_interval_secs),
                INACTIVITY_CHECK_INTERVAL,
            )
            .await?;
        Ok(())
    })
}

fn run_job(command: Option<String>) -> anyhow::Result<()> {
    let config = JobConfig::from_env().context("job configuration")?;
    let runner = JobRunner::new(config)?;
    match command {
        Some(name) => runner.run(name.parse()?)?,
        None => runner.run_pending()?,
    }
    Ok(())
}
