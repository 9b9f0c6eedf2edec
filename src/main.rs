mod gateway;
mod server;

use clap::{Parser, Subcommand};
use gateway::Gateway;
use kana_core::config::{self, load_system_prompt};
use kana_handlers::{
    CalendarHandler, CodeAssistantHandler, DeviceControlHandler, HandlerRegistry,
    IssueTrackerHandler, LocalFactsHandler, RepositoryStatusHandler,
};
use kana_memory::Store;
use kana_providers::{GeminiClient, VoicevoxClient};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "kana", version, about = "Kana — voice assistant backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP backend.
    Start,
    /// Check integration availability.
    Status,
    /// Send a one-shot message through the pipeline.
    Ask {
        /// The message to send.
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Start => {
            let cfg = config::load(&cli.config)?;
            let gateway = Arc::new(build_gateway(&cfg).await?);
            println!("Kana — starting backend...");
            server::serve(gateway, &cfg.server).await?;
        }
        Commands::Status => {
            let cfg = config::load(&cli.config)?;
            println!("Kana — Status Check\n");
            println!("Config: {}", cli.config);
            println!("Model: {}", cfg.gemini.model);
            println!();

            let gemini = GeminiClient::from_config(&cfg.gemini);
            println!(
                "  gemini:   {}",
                if gemini.is_available().await {
                    "available"
                } else {
                    "not available"
                }
            );

            let voicevox = VoicevoxClient::from_config(&cfg.voicevox);
            println!(
                "  voicevox: {}",
                if voicevox.is_available().await {
                    "available"
                } else {
                    "not available"
                }
            );

            println!(
                "  claude:   {}",
                if check_cli("claude").await {
                    "available"
                } else {
                    "not found"
                }
            );
            println!(
                "  gh:       {}",
                if check_cli("gh").await {
                    "available"
                } else {
                    "not found"
                }
            );
        }
        Commands::Ask { message } => {
            if message.is_empty() {
                anyhow::bail!("no message provided. Usage: kana ask <message>");
            }

            let cfg = config::load(&cli.config)?;
            let gateway = build_gateway(&cfg).await?;
            let reply = gateway.handle_chat(&message.join(" ")).await?;
            println!("{}", reply.display);
        }
    }

    Ok(())
}

/// Wire up the full pipeline from config. Handler registration order is
/// dispatch priority and must not be reordered.
async fn build_gateway(cfg: &config::Config) -> anyhow::Result<Gateway> {
    let system_prompt = load_system_prompt(&cfg.persona);
    let model = GeminiClient::from_config(&cfg.gemini);
    let tts = VoicevoxClient::from_config(&cfg.voicevox);
    let store = Store::new(&cfg.memory).await?;

    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(LocalFactsHandler));
    registry.register(Arc::new(DeviceControlHandler::from_config(&cfg.switchbot)));
    registry.register(Arc::new(RepositoryStatusHandler::new(
        &cfg.tools.repo_path,
        cfg.tools.cli_timeout_secs,
    )));
    registry.register(Arc::new(IssueTrackerHandler::new(
        cfg.tools.cli_timeout_secs,
    )));
    registry.register(Arc::new(CalendarHandler::from_config(&cfg.calendar)));
    registry.register(Arc::new(CodeAssistantHandler::new(
        model.clone(),
        system_prompt.clone(),
        cfg.tools.code_timeout_secs,
    )));

    Ok(Gateway::new(
        Arc::new(model),
        tts,
        registry,
        store,
        system_prompt,
    ))
}

/// Is a CLI tool on PATH and answering `--version`?
async fn check_cli(program: &str) -> bool {
    let probe = tokio::process::Command::new(program)
        .arg("--version")
        .output();
    matches!(
        tokio::time::timeout(Duration::from_secs(5), probe).await,
        Ok(Ok(output)) if output.status.success()
    )
}
